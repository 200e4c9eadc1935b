//! Filesystem utility functions
//!
//! Small helpers shared by the profile store and the shell-file applier.
//! They return plain `std::io::Result` so each caller can attach its own error
//! type and path.

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Number of backups to keep per backed-up file
pub const MAX_BACKUPS: usize = 5;

/// Read a whole file, treating a missing file as `None`
pub fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write a file atomically: write to a sibling temp file, then rename it over
/// the target. Creates the parent directory if needed.
///
/// A crash mid-write leaves either the old content or the new, never a
/// truncated file.
pub fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_sibling(path);
    fs::write(&temp_path, content)?;

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}

/// Overwrite a file in place, following symlinks and keeping the existing
/// file's permissions. Creates the file and its parent directory if needed.
///
/// Used for files sc does not own, such as shell startup files.
pub fn write_in_place(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(content.as_bytes())?;
    file.flush()
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".sc-tmp");
    path.with_file_name(name)
}

/// Copy `path` into `backups_dir` as `<name>.<timestamp>.bak`, then rotate old
/// backups of the same file. Returns the backup path, or `None` if there was
/// nothing to back up.
pub fn backup_file(path: &Path, backups_dir: &Path) -> io::Result<Option<PathBuf>> {
    if !path.is_file() {
        return Ok(None);
    }

    fs::create_dir_all(backups_dir)?;

    let prefix = backup_prefix(path);
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = backups_dir.join(format!("{}.{}.bak", prefix, timestamp));

    fs::copy(path, &backup_path)?;
    cleanup_old_backups(backups_dir, &prefix)?;

    Ok(Some(backup_path))
}

/// `.zshrc` -> `zshrc`, so backups are not hidden files
fn backup_prefix(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    name.trim_start_matches('.').to_string()
}

fn cleanup_old_backups(backups_dir: &Path, prefix: &str) -> io::Result<()> {
    let dotted = format!("{}.", prefix);
    let mut backups: Vec<_> = fs::read_dir(backups_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(&dotted) && n.ends_with(".bak"))
        })
        .collect();

    if backups.len() <= MAX_BACKUPS {
        return Ok(());
    }

    // Timestamps sort lexicographically, oldest first
    backups.sort_by_key(|e| e.file_name());

    let to_remove = backups.len() - MAX_BACKUPS;
    for entry in backups.iter().take(to_remove) {
        fs::remove_file(entry.path())?;
    }

    Ok(())
}
