//! Shell detection and shell-syntax generation.
//!
//! Works out which shell the user runs and which startup file sc should
//! manage, renders export statements for `sc env`, and scans existing startup
//! files for credentials exported by hand.

use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

use crate::profile::{BASE_URL_VAR, Profile, TOKEN_VAR};

/// Host operating system family, as far as shell defaults are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    MacOs,
    Windows,
    Other,
}

impl HostOs {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(windows) {
            Self::Windows
        } else {
            Self::Other
        }
    }
}

/// Shells whose startup files sc knows how to manage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Zsh,
    Bash,
}

impl Shell {
    /// Recognize a shell from a path or process name (`/bin/zsh`, `-bash`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        if name.contains("zsh") {
            Some(Self::Zsh)
        } else if name.contains("bash") {
            Some(Self::Bash)
        } else {
            None
        }
    }

    /// Detect the user's shell from `$SHELL`, then the parent process, then
    /// the host default.
    pub fn detect() -> Self {
        let shell_var = std::env::var("SHELL").ok();
        let shell = Self::resolve(shell_var.as_deref(), parent_process_name, HostOs::current());
        debug!(?shell, "detected shell");
        shell
    }

    /// Detection policy with its inputs made explicit.
    ///
    /// `parent` is only called when `shell_var` does not name a known shell.
    pub fn resolve(
        shell_var: Option<&str>,
        parent: impl FnOnce() -> Option<String>,
        os: HostOs,
    ) -> Self {
        shell_var
            .and_then(Self::from_name)
            .or_else(|| parent().as_deref().and_then(Self::from_name))
            .unwrap_or(match os {
                HostOs::MacOs => Self::Zsh,
                _ => Self::Bash,
            })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Zsh => "zsh",
            Self::Bash => "bash",
        }
    }

    /// The startup file sc writes the managed block into.
    ///
    /// Bash on macOS uses `~/.bash_profile` (login shells) when it already
    /// exists; everything else uses the interactive rc file.
    pub fn rc_path(&self, home: &Path, os: HostOs) -> PathBuf {
        match self {
            Self::Zsh => home.join(".zshrc"),
            Self::Bash => {
                let bash_profile = home.join(".bash_profile");
                if os == HostOs::MacOs && bash_profile.exists() {
                    bash_profile
                } else {
                    home.join(".bashrc")
                }
            }
        }
    }

    /// Body of the completion block for this shell's startup file
    pub fn completion_hook(&self, bin: &str) -> String {
        format!(
            "if command -v {bin} >/dev/null 2>&1; then\n  source <({bin} completions {shell})\nfi",
            bin = bin,
            shell = self.name()
        )
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Command name of the parent process, via `ps`
#[cfg(unix)]
fn parent_process_name() -> Option<String> {
    let ppid = std::os::unix::process::parent_id();
    let output = std::process::Command::new("ps")
        .args(["-o", "comm=", "-p", &ppid.to_string()])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!name.is_empty()).then_some(name)
}

#[cfg(not(unix))]
fn parent_process_name() -> Option<String> {
    None
}

/// Syntax of the statements printed by `sc env`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvFormat {
    /// `export NAME="value"` for sh, bash and zsh
    Posix,
    /// `$env:NAME="value"`
    PowerShell,
    /// `set NAME=value`
    Cmd,
}

impl EnvFormat {
    pub fn statement(&self, name: &str, value: &str) -> String {
        match self {
            Self::Posix => format!("export {}=\"{}\"", name, escape_posix(value)),
            Self::PowerShell => format!("$env:{}=\"{}\"", name, escape_powershell(value)),
            Self::Cmd => format!("set {}={}", name, value),
        }
    }

    /// Both statements for a profile, one per line, no trailing newline
    pub fn render(&self, profile: &Profile) -> String {
        profile
            .vars()
            .iter()
            .map(|(name, value)| self.statement(name, value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromStr for EnvFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "posix" | "sh" | "bash" | "zsh" => Ok(Self::Posix),
            "powershell" | "pwsh" => Ok(Self::PowerShell),
            "cmd" => Ok(Self::Cmd),
            _ => Err(format!("invalid env format: {}", s)),
        }
    }
}

/// Escape for the inside of a POSIX double-quoted string
fn escape_posix(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape for the inside of a PowerShell double-quoted string
fn escape_powershell(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '`' | '"' | '$') {
            out.push('`');
        }
        out.push(c);
    }
    out
}

/// Credentials found in a startup file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedExports {
    pub token: Option<String>,
    pub base_url: Option<String>,
}

impl ScannedExports {
    pub fn both(&self) -> Option<(&str, &str)> {
        Some((self.token.as_deref()?, self.base_url.as_deref()?))
    }
}

static TOKEN_EXPORT: LazyLock<Regex> = LazyLock::new(|| export_regex(TOKEN_VAR));
static BASE_URL_EXPORT: LazyLock<Regex> = LazyLock::new(|| export_regex(BASE_URL_VAR));

fn export_regex(var: &str) -> Regex {
    // Value: double-quoted (with backslash escapes), single-quoted, or bare
    Regex::new(&format!(
        r#"(?m)^[ \t]*export[ \t]+{}[ \t]*=[ \t]*(?:"((?:[^"\\\n]|\\.)*)"|'([^'\n]*)'|([^\s"'#;]+))"#,
        regex::escape(var)
    ))
    .expect("export pattern is valid")
}

/// Undo POSIX double-quote escaping: a backslash only escapes `\ " $ \``
fn unescape_double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if matches!(next, '\\' | '"' | '$' | '`') {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Unquoted words: a backslash escapes any character
fn unescape_bare(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

fn export_value(caps: &regex::Captures<'_>) -> Option<String> {
    if let Some(m) = caps.get(1) {
        Some(unescape_double_quoted(m.as_str()))
    } else if let Some(m) = caps.get(2) {
        Some(m.as_str().to_string())
    } else {
        caps.get(3).map(|m| unescape_bare(m.as_str()))
    }
}

/// Find `export ANTHROPIC_AUTH_TOKEN=...` / `export ANTHROPIC_BASE_URL=...`
/// lines. Commented-out lines are ignored; when a variable is exported more
/// than once the last assignment wins, as it would in the shell. Quoting and
/// escaping are undone the way the shell would, so values written by
/// [`EnvFormat::Posix`] read back unchanged.
pub fn scan_exports(content: &str) -> ScannedExports {
    let last = |re: &Regex| {
        re.captures_iter(content)
            .last()
            .and_then(|caps| export_value(&caps))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    ScannedExports {
        token: last(&TOKEN_EXPORT),
        base_url: last(&BASE_URL_EXPORT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_from_name() {
        assert_eq!(Shell::from_name("/bin/zsh"), Some(Shell::Zsh));
        assert_eq!(Shell::from_name("-bash"), Some(Shell::Bash));
        assert_eq!(Shell::from_name("/usr/local/bin/bash"), Some(Shell::Bash));
        assert_eq!(Shell::from_name("fish"), None);
    }

    #[test]
    fn test_resolve_prefers_shell_var() {
        let shell = Shell::resolve(
            Some("/bin/zsh"),
            || panic!("parent lookup should not run"),
            HostOs::Other,
        );
        assert_eq!(shell, Shell::Zsh);
    }

    #[test]
    fn test_resolve_falls_back_to_parent() {
        let shell = Shell::resolve(Some("/usr/bin/fish"), || Some("bash".into()), HostOs::MacOs);
        assert_eq!(shell, Shell::Bash);

        let shell = Shell::resolve(None, || Some("-zsh".into()), HostOs::Other);
        assert_eq!(shell, Shell::Zsh);
    }

    #[test]
    fn test_resolve_host_default() {
        assert_eq!(Shell::resolve(None, || None, HostOs::MacOs), Shell::Zsh);
        assert_eq!(Shell::resolve(None, || None, HostOs::Other), Shell::Bash);
        assert_eq!(
            Shell::resolve(Some("nu"), || Some("nu".into()), HostOs::Other),
            Shell::Bash
        );
    }

    #[test]
    #[serial]
    fn test_detect_reads_shell_var() {
        let saved = std::env::var("SHELL").ok();
        // SAFETY: serialized with other env-mutating tests
        unsafe { std::env::set_var("SHELL", "/opt/homebrew/bin/zsh") };

        assert_eq!(Shell::detect(), Shell::Zsh);

        unsafe {
            match saved {
                Some(v) => std::env::set_var("SHELL", v),
                None => std::env::remove_var("SHELL"),
            }
        }
    }

    #[test]
    fn test_rc_path() {
        let temp_dir = TempDir::new().unwrap();
        let home = temp_dir.path();

        assert_eq!(Shell::Zsh.rc_path(home, HostOs::MacOs), home.join(".zshrc"));
        assert_eq!(Shell::Bash.rc_path(home, HostOs::MacOs), home.join(".bashrc"));

        fs::write(home.join(".bash_profile"), "").unwrap();
        assert_eq!(
            Shell::Bash.rc_path(home, HostOs::MacOs),
            home.join(".bash_profile")
        );
        // Only macOS prefers the login profile
        assert_eq!(Shell::Bash.rc_path(home, HostOs::Other), home.join(".bashrc"));
    }

    #[test]
    fn test_render_posix() {
        let profile = Profile::new("p", "sk-123", "https://api.example.com");
        assert_eq!(
            EnvFormat::Posix.render(&profile),
            "export ANTHROPIC_AUTH_TOKEN=\"sk-123\"\nexport ANTHROPIC_BASE_URL=\"https://api.example.com\""
        );
    }

    #[test]
    fn test_render_escapes_special_chars() {
        assert_eq!(
            EnvFormat::Posix.statement("X", r#"a"b$c`d\e"#),
            r#"export X="a\"b\$c\`d\\e""#
        );
        assert_eq!(
            EnvFormat::PowerShell.statement("X", r#"a"b$c"#),
            "$env:X=\"a`\"b`$c\""
        );
    }

    #[test]
    fn test_render_windows_formats() {
        let profile = Profile::new("p", "tok", "https://a.example.com");
        assert_eq!(
            EnvFormat::PowerShell.render(&profile),
            "$env:ANTHROPIC_AUTH_TOKEN=\"tok\"\n$env:ANTHROPIC_BASE_URL=\"https://a.example.com\""
        );
        assert_eq!(
            EnvFormat::Cmd.render(&profile),
            "set ANTHROPIC_AUTH_TOKEN=tok\nset ANTHROPIC_BASE_URL=https://a.example.com"
        );
    }

    #[test]
    fn test_env_format_parse() {
        assert_eq!("posix".parse::<EnvFormat>().unwrap(), EnvFormat::Posix);
        assert_eq!("PowerShell".parse::<EnvFormat>().unwrap(), EnvFormat::PowerShell);
        assert_eq!("cmd".parse::<EnvFormat>().unwrap(), EnvFormat::Cmd);
        assert!("fish".parse::<EnvFormat>().is_err());
    }

    #[test]
    fn test_scan_exports() {
        let content = r#"
export PATH="$HOME/bin:$PATH"
export ANTHROPIC_AUTH_TOKEN="sk-old"
# export ANTHROPIC_BASE_URL="https://commented.example.com"
export ANTHROPIC_BASE_URL='https://proxy.example.com/team'
export ANTHROPIC_AUTH_TOKEN=sk-new
"#;
        let scanned = scan_exports(content);
        assert_eq!(scanned.token.as_deref(), Some("sk-new"));
        assert_eq!(
            scanned.base_url.as_deref(),
            Some("https://proxy.example.com/team")
        );
        assert_eq!(
            scanned.both(),
            Some(("sk-new", "https://proxy.example.com/team"))
        );
    }

    #[test]
    fn test_scan_exports_partial() {
        let scanned = scan_exports("export ANTHROPIC_AUTH_TOKEN=\"t\"\n");
        assert_eq!(scanned.token.as_deref(), Some("t"));
        assert!(scanned.both().is_none());
        assert_eq!(scan_exports(""), ScannedExports::default());
    }

    #[test]
    fn test_scan_exports_reads_back_rendered_profile() {
        let profile = Profile::new("odd", r#"sk-a$b"c\d`e"#, "https://p.example.com/x?a=1&b=2");
        let content = format!("# header\n{}\n", EnvFormat::Posix.render(&profile));

        let scanned = scan_exports(&content);
        assert_eq!(scanned.token.as_deref(), Some(profile.auth_token.as_str()));
        assert_eq!(scanned.base_url.as_deref(), Some(profile.base_url.as_str()));
    }

    #[test]
    fn test_scan_exports_quoting() {
        let scanned = scan_exports(
            "export ANTHROPIC_AUTH_TOKEN='sk-$literal\\x'\nexport ANTHROPIC_BASE_URL=https://a.example.com # note\n",
        );
        assert_eq!(scanned.token.as_deref(), Some("sk-$literal\\x"));
        assert_eq!(scanned.base_url.as_deref(), Some("https://a.example.com"));

        let scanned = scan_exports("export ANTHROPIC_AUTH_TOKEN=\"a\\nb\"\n");
        assert_eq!(scanned.token.as_deref(), Some("a\\nb"));
    }

    #[test]
    fn test_completion_hook() {
        let hook = Shell::Zsh.completion_hook("sc");
        assert!(hook.contains("source <(sc completions zsh)"));
    }
}
