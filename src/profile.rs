//! The profile data type and its input validation.
//!
//! A profile is a named pair of credentials: the auth token and the base URL
//! of the API endpoint. Validation happens at the input boundary (prompts and
//! CLI flags); the store itself trusts what it is given.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ValidationError;

/// Environment variable holding the auth token
pub const TOKEN_VAR: &str = "ANTHROPIC_AUTH_TOKEN";
/// Environment variable holding the API base URL
pub const BASE_URL_VAR: &str = "ANTHROPIC_BASE_URL";

/// Name used when none can be derived from a URL
pub const DEFAULT_PROFILE_NAME: &str = "default";

const MAX_NAME_LEN: usize = 64;

/// One API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,

    #[serde(rename = "ANTHROPIC_AUTH_TOKEN")]
    pub auth_token: String,

    #[serde(rename = "ANTHROPIC_BASE_URL")]
    pub base_url: String,
}

impl Profile {
    pub fn new(
        name: impl Into<String>,
        auth_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            auth_token: auth_token.into(),
            base_url: base_url.into(),
        }
    }

    /// The two variables this profile exports, in the order they are applied
    pub fn vars(&self) -> [(&'static str, &str); 2] {
        [
            (TOKEN_VAR, self.auth_token.as_str()),
            (BASE_URL_VAR, self.base_url.as_str()),
        ]
    }

    /// Token with everything but the edges hidden, for display
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.auth_token.chars().collect();
        if chars.len() <= 8 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }

    /// Base URL without the scheme, truncated for list output
    pub fn short_url(&self, max: usize) -> String {
        let url = self
            .base_url
            .strip_prefix("https://")
            .or_else(|| self.base_url.strip_prefix("http://"))
            .unwrap_or(&self.base_url);
        url.chars().take(max).collect()
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Validate profile name
///
/// Only allows alphanumeric characters, underscores, and hyphens.
pub fn validate_profile_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong(MAX_NAME_LEN));
    }

    if !name.chars().all(is_name_char) {
        return Err(ValidationError::InvalidName(name.to_string()));
    }

    Ok(())
}

pub fn validate_token(token: &str) -> Result<(), ValidationError> {
    if token.trim().is_empty() {
        return Err(ValidationError::EmptyToken);
    }
    Ok(())
}

/// Syntactic URL check only; reachability is never tested
pub fn validate_base_url(url: &str) -> Result<(), ValidationError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }

    Url::parse(url).map_err(|e| ValidationError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    Ok(())
}

/// Derive a profile name from the last path segment of a URL.
///
/// `https://proxy.example.com/team-a` gives `team-a`. Falls back to
/// [`DEFAULT_PROFILE_NAME`] when the URL does not parse, has an empty path, or
/// the segment contains characters a profile name cannot hold.
pub fn name_from_url(base_url: &str) -> String {
    Url::parse(base_url.trim())
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string)
        })
        .filter(|segment| validate_profile_name(segment).is_ok())
        .unwrap_or_else(|| DEFAULT_PROFILE_NAME.to_string())
}
