//! Test utilities shared across test modules

use crate::paths::Paths;
use tempfile::TempDir;

/// Create a Paths struct for testing using a temporary directory as `$HOME`
///
/// The store, backups and shell startup files all land inside the temp dir,
/// mimicking the real ~/.claude/ and ~/.zshrc layout.
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    Paths::with_home(temp_dir.path().to_path_buf())
}
