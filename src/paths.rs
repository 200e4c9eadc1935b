use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::PathBuf;

/// All computed paths used by sc
#[derive(Debug, Clone)]
pub struct Paths {
    /// The user's home directory, where shell startup files live
    pub home_dir: PathBuf,
    /// ~/.claude
    pub config_dir: PathBuf,
    /// ~/.claude/sc-profiles.json
    pub store_file: PathBuf,
    /// ~/.claude/sc-backups
    pub backups_dir: PathBuf,
}

impl Paths {
    pub fn new() -> Result<Self> {
        let base_dirs = BaseDirs::new().context("Failed to determine home directory")?;
        Ok(Self::with_home(base_dirs.home_dir().to_path_buf()))
    }

    /// Compute every location relative to the given home directory
    pub fn with_home(home_dir: PathBuf) -> Self {
        let config_dir = home_dir.join(".claude");
        let store_file = config_dir.join("sc-profiles.json");
        let backups_dir = config_dir.join("sc-backups");

        Self {
            home_dir,
            config_dir,
            store_file,
            backups_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_file_path() {
        let paths = Paths::with_home(PathBuf::from("/home/alice"));
        assert_eq!(
            paths.store_file,
            PathBuf::from("/home/alice/.claude/sc-profiles.json")
        );
        assert!(paths.backups_dir.starts_with(&paths.config_dir));
    }
}
