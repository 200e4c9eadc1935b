//! Persistent profile storage.
//!
//! The whole durable state is a single JSON document at
//! `~/.claude/sc-profiles.json`:
//!
//! ```json
//! {
//!   "current": "work",
//!   "profiles": {
//!     "work": { "name": "work", "ANTHROPIC_AUTH_TOKEN": "...", "ANTHROPIC_BASE_URL": "..." }
//!   }
//! }
//! ```
//!
//! [`ProfileSet`] holds the in-memory logic. [`ProfileStore`] ties a set to its
//! file: it is loaded once per process and saved after every mutation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::fs_utils::{read_optional, write_atomic};
use crate::profile::{Profile, name_from_url};

/// All profiles plus the current selection.
///
/// `profiles` keeps insertion order, which decides who becomes current when
/// the current profile is removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSet {
    #[serde(default)]
    pub current: Option<String>,

    #[serde(default)]
    pub profiles: IndexMap<String, Profile>,
}

impl ProfileSet {
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn current_profile(&self) -> Option<&Profile> {
        self.current.as_deref().and_then(|name| self.profiles.get(name))
    }

    /// Add a profile; the first profile added becomes current
    pub fn insert(&mut self, profile: Profile) -> Result<(), StoreError> {
        if self.profiles.contains_key(&profile.name) {
            return Err(StoreError::DuplicateName(profile.name));
        }

        if self.current.is_none() {
            self.current = Some(profile.name.clone());
        }
        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Remove a profile. If it was current, the first remaining profile (in
    /// insertion order) becomes current, or none if the set is now empty.
    pub fn remove(&mut self, name: &str) -> Result<Profile, StoreError> {
        let removed = self
            .profiles
            .shift_remove(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        if self.current.as_deref() == Some(name) {
            self.current = self.profiles.keys().next().cloned();
        }
        Ok(removed)
    }

    /// Replace token and URL of an existing profile, keeping its position
    pub fn update(&mut self, name: &str, token: &str, url: &str) -> Result<(), StoreError> {
        let profile = self
            .profiles
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        *profile = Profile::new(name, token, url);
        Ok(())
    }

    pub fn select(&mut self, name: &str) -> Result<Profile, StoreError> {
        let profile = self
            .profiles
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        self.current = Some(name.to_string());
        Ok(profile)
    }

    /// Restore the `current ∈ profiles` invariant on a set read from disk.
    /// Returns true if anything changed.
    fn repair(&mut self) -> bool {
        match &self.current {
            Some(name) if !self.profiles.contains_key(name) => {
                self.current = self.profiles.keys().next().cloned();
                true
            }
            _ => false,
        }
    }
}

/// A [`ProfileSet`] bound to the file it was loaded from
#[derive(Debug)]
pub struct ProfileStore {
    path: PathBuf,
    set: ProfileSet,
}

impl ProfileStore {
    /// Load the store, degrading to an empty set if the file is missing,
    /// unreadable or malformed. Never fails.
    pub fn load(path: &Path) -> Self {
        let set = match Self::try_load(path) {
            Ok(set) => set,
            Err(e) => {
                warn!("{}; starting with an empty profile store", e);
                ProfileSet::default()
            }
        };

        Self {
            path: path.to_path_buf(),
            set,
        }
    }

    /// Strict load: report unreadable or corrupt files instead of recovering
    pub fn try_load(path: &Path) -> Result<ProfileSet, StoreError> {
        let Some(content) = read_optional(path).map_err(|e| StoreError::io(path, e))? else {
            debug!(path = %path.display(), "profile store absent");
            return Ok(ProfileSet::default());
        };

        if content.trim().is_empty() {
            return Ok(ProfileSet::default());
        }

        let mut set: ProfileSet =
            serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        if set.repair() {
            warn!(
                current = ?set.current,
                "current profile was missing from the store; reassigned"
            );
        }

        Ok(set)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.set.profiles.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.set.profiles.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.set.get(name)
    }

    pub fn current(&self) -> Option<&Profile> {
        self.set.current_profile()
    }

    pub fn current_name(&self) -> Option<&str> {
        self.set.current.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Write the store atomically, creating `~/.claude` if needed
    pub fn save(&self) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(&self.set)?;
        write_atomic(&self.path, &content).map_err(|e| StoreError::io(&self.path, e))?;
        debug!(path = %self.path.display(), profiles = self.set.profiles.len(), "saved profile store");
        Ok(())
    }

    pub fn add(&mut self, name: &str, token: &str, url: &str) -> Result<(), StoreError> {
        self.set.insert(Profile::new(name, token, url))?;
        self.save()
    }

    pub fn remove(&mut self, name: &str) -> Result<Profile, StoreError> {
        let removed = self.set.remove(name)?;
        self.save()?;
        Ok(removed)
    }

    pub fn update(&mut self, name: &str, token: &str, url: &str) -> Result<(), StoreError> {
        self.set.update(name, token, url)?;
        self.save()
    }

    pub fn set_current(&mut self, name: &str) -> Result<Profile, StoreError> {
        let profile = self.set.select(name)?;
        self.save()?;
        Ok(profile)
    }

    /// One-time bootstrap from pre-existing credentials.
    ///
    /// Only acts when the store is empty and both values are non-empty. The
    /// profile is named after the URL's last path segment (see
    /// [`name_from_url`]) and selected.
    pub fn seed_from_environment(
        &mut self,
        token: &str,
        url: &str,
    ) -> Result<Option<Profile>, StoreError> {
        let (token, url) = (token.trim(), url.trim());
        if !self.set.is_empty() || token.is_empty() || url.is_empty() {
            return Ok(None);
        }

        let profile = Profile::new(name_from_url(url), token, url);
        self.set.insert(profile.clone())?;
        self.save()?;

        debug!(name = %profile.name, "seeded profile store");
        Ok(Some(profile))
    }
}
