//! Materializing the current profile into the user's environment.
//!
//! Two mechanisms, picked once at startup by [`EnvironmentTarget::for_host`]:
//!
//! - [`FileBlockTarget`] (macOS, Linux, BSD): maintain a managed block of
//!   `export` lines in the shell startup file via [`crate::block`].
//! - [`KeyValueTarget`] (Windows): set user-scope environment variables
//!   through the OS. No file, no markers.

use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::block::{self, COMPLETION_MARKERS, LEGACY_PROFILE_MARKERS, PROFILE_MARKERS, UpsertAction};
use crate::error::ApplyError;
use crate::fs_utils::{backup_file, read_optional, write_in_place};
use crate::paths::Paths;
use crate::profile::{BASE_URL_VAR, Profile, TOKEN_VAR};
use crate::shell::{EnvFormat, HostOs, Shell};

/// Longest value `setx` stores without truncating
pub const SETX_VALUE_LIMIT: usize = 1024;

/// What [`EnvironmentTarget::apply`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    ShellFile {
        path: PathBuf,
        shell: Shell,
        action: UpsertAction,
        backup: Option<PathBuf>,
    },
    UserEnvironment,
}

/// What [`EnvironmentTarget::clear`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearOutcome {
    ShellFile { path: PathBuf, removed: bool },
    UserEnvironment,
}

/// Where the current profile is mirrored
#[derive(Debug)]
pub enum EnvironmentTarget<E: UserEnvironment = SetxEnvironment> {
    FileBlock(FileBlockTarget),
    KeyValue(KeyValueTarget<E>),
}

impl EnvironmentTarget {
    /// Select the mechanism for the host OS
    pub fn for_host(paths: &Paths) -> Self {
        match HostOs::current() {
            HostOs::Windows => Self::KeyValue(KeyValueTarget::new(SetxEnvironment)),
            os => Self::FileBlock(FileBlockTarget::detect(paths, os)),
        }
    }
}

impl<E: UserEnvironment> EnvironmentTarget<E> {
    pub fn apply(&self, profile: &Profile) -> Result<ApplyOutcome, ApplyError> {
        match self {
            Self::FileBlock(target) => target.apply(profile),
            Self::KeyValue(target) => target.apply(profile),
        }
    }

    pub fn clear(&self) -> Result<ClearOutcome, ApplyError> {
        match self {
            Self::FileBlock(target) => target.clear(),
            Self::KeyValue(target) => target.clear(),
        }
    }

    /// Statement syntax `sc env` should print for this target
    pub fn env_format(&self) -> EnvFormat {
        match self {
            Self::FileBlock(_) => EnvFormat::Posix,
            Self::KeyValue(_) => EnvFormat::PowerShell,
        }
    }

    /// Human-readable description of where profiles are applied
    pub fn describe(&self) -> String {
        match self {
            Self::FileBlock(target) => format!("{} ({})", target.rc_path.display(), target.shell),
            Self::KeyValue(_) => "user environment variables".to_string(),
        }
    }
}

/// Managed block in a shell startup file
#[derive(Debug, Clone)]
pub struct FileBlockTarget {
    pub shell: Shell,
    pub rc_path: PathBuf,
    pub backups_dir: PathBuf,
}

impl FileBlockTarget {
    pub fn new(shell: Shell, rc_path: PathBuf, backups_dir: PathBuf) -> Self {
        Self {
            shell,
            rc_path,
            backups_dir,
        }
    }

    /// Detect the shell and resolve its startup file under `paths.home_dir`
    pub fn detect(paths: &Paths, os: HostOs) -> Self {
        let shell = Shell::detect();
        let rc_path = shell.rc_path(&paths.home_dir, os);
        Self::new(shell, rc_path, paths.backups_dir.clone())
    }

    /// Current content of the startup file; empty if it does not exist
    pub fn read(&self) -> Result<String, ApplyError> {
        Ok(read_optional(&self.rc_path)
            .map_err(|e| ApplyError::io(&self.rc_path, e))?
            .unwrap_or_default())
    }

    fn write(&self, content: &str) -> Result<(), ApplyError> {
        write_in_place(&self.rc_path, content).map_err(|e| ApplyError::io(&self.rc_path, e))?;
        debug!(path = %self.rc_path.display(), "wrote shell startup file");
        Ok(())
    }

    /// Write the profile's exports into the managed block.
    ///
    /// The file is backed up the first time sc touches it, i.e. when a block
    /// has to be appended.
    pub fn apply(&self, profile: &Profile) -> Result<ApplyOutcome, ApplyError> {
        let content = self.read()?;
        let body = EnvFormat::Posix.render(profile);
        let upserted = block::upsert(
            &content,
            &body,
            &PROFILE_MARKERS,
            Some(&LEGACY_PROFILE_MARKERS),
        );

        let backup = if upserted.action == UpsertAction::Appended {
            backup_file(&self.rc_path, &self.backups_dir)
                .map_err(|e| ApplyError::io(&self.backups_dir, e))?
        } else {
            None
        };

        if upserted.content != content {
            self.write(&upserted.content)?;
        }

        if upserted.action == UpsertAction::Migrated {
            info!(path = %self.rc_path.display(), "migrated legacy managed block");
        }

        Ok(ApplyOutcome::ShellFile {
            path: self.rc_path.clone(),
            shell: self.shell,
            action: upserted.action,
            backup,
        })
    }

    /// Remove the managed block, in both the current and the legacy format
    pub fn clear(&self) -> Result<ClearOutcome, ApplyError> {
        let content = self.read()?;
        let cleaned = block::remove(
            &block::remove(&content, &PROFILE_MARKERS),
            &LEGACY_PROFILE_MARKERS,
        );

        let removed = cleaned != content;
        if removed {
            self.write(&cleaned)?;
        }

        Ok(ClearOutcome::ShellFile {
            path: self.rc_path.clone(),
            removed,
        })
    }

    /// Install (or refresh) the completion hook block. Returns true if the
    /// file changed.
    pub fn install_completions(&self, bin: &str) -> Result<bool, ApplyError> {
        let content = self.read()?;
        let upserted = block::upsert(
            &content,
            &self.shell.completion_hook(bin),
            &COMPLETION_MARKERS,
            None,
        );

        if upserted.content == content {
            return Ok(false);
        }
        self.write(&upserted.content)?;
        Ok(true)
    }
}

/// Platform store of user-scope environment variables
pub trait UserEnvironment {
    fn set_var(&self, name: &str, value: &str) -> Result<(), ApplyError>;

    /// Removing a variable that does not exist is not an error
    fn remove_var(&self, name: &str) -> Result<(), ApplyError>;
}

/// User environment variables as a key-value store
#[derive(Debug)]
pub struct KeyValueTarget<E: UserEnvironment> {
    env: E,
}

impl<E: UserEnvironment> KeyValueTarget<E> {
    pub fn new(env: E) -> Self {
        Self { env }
    }

    /// Set both variables in order. Stops at the first failure; a variable
    /// that was already set is left as is, not rolled back.
    pub fn apply(&self, profile: &Profile) -> Result<ApplyOutcome, ApplyError> {
        for (name, value) in profile.vars() {
            if value.chars().count() > SETX_VALUE_LIMIT {
                warn!(
                    var = name,
                    len = value.chars().count(),
                    "value exceeds {} characters and may be truncated",
                    SETX_VALUE_LIMIT
                );
            }
            self.env.set_var(name, value)?;
        }
        Ok(ApplyOutcome::UserEnvironment)
    }

    pub fn clear(&self) -> Result<ClearOutcome, ApplyError> {
        for name in [TOKEN_VAR, BASE_URL_VAR] {
            self.env.remove_var(name)?;
        }
        Ok(ClearOutcome::UserEnvironment)
    }
}

/// Windows user environment through `setx` and `reg delete`
#[derive(Debug, Clone, Copy, Default)]
pub struct SetxEnvironment;

impl SetxEnvironment {
    fn ensure_windows() -> Result<(), ApplyError> {
        if HostOs::current() != HostOs::Windows {
            return Err(ApplyError::Platform(
                "User environment variables can only be set on Windows".to_string(),
            ));
        }
        Ok(())
    }

    fn run(program: &str, args: &[&str]) -> Result<std::process::Output, ApplyError> {
        std::process::Command::new(program)
            .args(args)
            .output()
            .map_err(|e| ApplyError::Command {
                program: program.to_string(),
                message: e.to_string(),
            })
    }
}

impl UserEnvironment for SetxEnvironment {
    fn set_var(&self, name: &str, value: &str) -> Result<(), ApplyError> {
        Self::ensure_windows()?;

        let output = Self::run("setx", &[name, value])?;
        if !output.status.success() {
            return Err(ApplyError::Command {
                program: "setx".to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        debug!(var = name, "set user environment variable");
        Ok(())
    }

    fn remove_var(&self, name: &str) -> Result<(), ApplyError> {
        Self::ensure_windows()?;

        let output = Self::run("reg", &["delete", r"HKCU\Environment", "/v", name, "/f"])?;
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("not find") {
            return Ok(());
        }
        Err(ApplyError::Command {
            program: "reg".to_string(),
            message: stderr.trim().to_string(),
        })
    }
}
