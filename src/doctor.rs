//! Diagnostic tool for sc.
//!
//! This module implements the `sc doctor` command, which checks the system
//! for common issues:
//! - Existence of the config directory.
//! - Validity of the profile store and its current profile.
//! - State of the managed block in the shell startup file.
//! - Whether this shell session sees the current profile.
//!
//! It reports issues to the user with a pass/fail/warn status.

use anstyle::AnsiColor;
use std::env;
use std::fs;

use crate::apply::{EnvironmentTarget, UserEnvironment};
use crate::block::{self, COMPLETION_MARKERS, LEGACY_PROFILE_MARKERS, PROFILE_MARKERS};
use crate::paths::Paths;
use crate::profile::{BASE_URL_VAR, Profile, TOKEN_VAR};
use crate::shell::EnvFormat;
use crate::store::ProfileStore;
use crate::ui::Ui;

/// Run the doctor diagnostics. Returns true if no check failed.
pub fn run_doctor<E: UserEnvironment>(
    paths: &Paths,
    store: &ProfileStore,
    target: &EnvironmentTarget<E>,
    ui: &Ui,
) -> bool {
    ui.section("sc Doctor");
    ui.newline();

    let mut healthy = true;

    // 1. Directories
    healthy &= check_step(ui, "Directories", || {
        if paths.config_dir.exists() {
            ui.println(format!(
                "  {} Config directory exists: {}",
                ui.icon_ok(),
                paths.config_dir.display()
            ));
        } else {
            // Created on first save
            ui.println(format!(
                "  {} Config directory missing: {}",
                ui.icon_warn(),
                paths.config_dir.display()
            ));
        }
        true
    });

    // 2. Profile store, read strictly so corruption is reported
    let current = store.current().cloned();
    healthy &= check_step(ui, "Profile Store", || {
        match ProfileStore::try_load(store.path()) {
            Ok(set) => {
                if store.path().exists() {
                    ui.println(format!("  {} Store file readable", ui.icon_ok()));
                } else {
                    ui.println(format!(
                        "  {} Store file missing (fresh install?)",
                        ui.icon_warn()
                    ));
                }
                ui.println(format!(
                    "  {} {} profile(s) configured",
                    ui.icon_info(),
                    set.profiles.len()
                ));
                match &set.current {
                    Some(name) => ui.println(format!(
                        "  {} Current profile: {}",
                        ui.icon_ok(),
                        name
                    )),
                    None if set.is_empty() => {}
                    None => ui.println(format!("  {} No current profile set", ui.icon_warn())),
                }
                true
            }
            Err(e) => {
                ui.println(format!("  {} {}", ui.icon_err(), e));
                false
            }
        }
    });

    // 3. Where the profile is applied
    healthy &= check_step(ui, "Shell Config", || match target {
        EnvironmentTarget::FileBlock(file) => {
            ui.println(format!("  {} Target: {}", ui.icon_info(), target.describe()));
            let content = match file.read() {
                Ok(content) => content,
                Err(e) => {
                    ui.println(format!("  {} {}", ui.icon_err(), e));
                    return false;
                }
            };
            check_managed_block(ui, &content, current.as_ref());

            if block::contains(&content, &COMPLETION_MARKERS) {
                ui.println(format!("  {} Completion hook installed", ui.icon_ok()));
            } else {
                ui.println(format!(
                    "  {} Completion hook not installed (run: sc setup)",
                    ui.icon_info()
                ));
            }
            true
        }
        EnvironmentTarget::KeyValue(_) => {
            ui.println(format!("  {} Target: {}", ui.icon_info(), target.describe()));
            true
        }
    });

    // 4. This shell session
    healthy &= check_step(ui, "Environment", || {
        for var in [TOKEN_VAR, BASE_URL_VAR] {
            let expected = current.as_ref().and_then(|p| {
                p.vars()
                    .into_iter()
                    .find(|(name, _)| *name == var)
                    .map(|(_, value)| value.to_string())
            });
            match (env::var(var).ok(), expected) {
                (Some(actual), Some(expected)) if actual == expected => {
                    ui.println(format!("  {} {} matches the current profile", ui.icon_ok(), var))
                }
                (Some(_), Some(_)) => ui.println(format!(
                    "  {} {} differs from the current profile (run: eval \"$(sc env)\")",
                    ui.icon_warn(),
                    var
                )),
                (Some(_), None) => ui.println(format!("  {} {} set", ui.icon_info(), var)),
                (None, _) => ui.println(format!("  {} {} not set", ui.icon_info(), var)),
            }
        }
        true
    });

    // 5. Backups
    check_step(ui, "Backups", || {
        let count = fs::read_dir(&paths.backups_dir)
            .map(|entries| entries.filter_map(Result::ok).count())
            .unwrap_or(0);
        ui.println(format!(
            "  {} {} backup(s) in {}",
            ui.icon_info(),
            count,
            paths.backups_dir.display()
        ));
        true
    });

    healthy
}

fn check_managed_block(ui: &Ui, content: &str, current: Option<&Profile>) {
    let Some(range) = block::find(content, &PROFILE_MARKERS) else {
        if block::contains(content, &LEGACY_PROFILE_MARKERS) {
            ui.println(format!(
                "  {} Managed block uses the old format (rewritten on next switch)",
                ui.icon_warn()
            ));
        } else if current.is_some() {
            ui.println(format!(
                "  {} No managed block (run: sc use <name>)",
                ui.icon_warn()
            ));
        } else {
            ui.println(format!("  {} No managed block", ui.icon_info()));
        }
        return;
    };

    ui.println(format!("  {} Managed block present", ui.icon_ok()));
    if content.matches(PROFILE_MARKERS.start).count() > 1 {
        ui.println(format!(
            "  {} Multiple managed blocks found; only one is updated on switch",
            ui.icon_warn()
        ));
    }

    if let Some(profile) = current {
        let expected = block::render_block(&EnvFormat::Posix.render(profile), &PROFILE_MARKERS);
        if content[range].trim_end() == expected.trim_end() {
            ui.println(format!("  {} Block matches the current profile", ui.icon_ok()));
        } else {
            ui.println(format!(
                "  {} Block is out of date (run: sc use {})",
                ui.icon_warn(),
                profile.name
            ));
        }
    }
}

fn check_step<F>(ui: &Ui, name: &str, check_fn: F) -> bool
where
    F: FnOnce() -> bool,
{
    ui.println(ui.bold(format!("Checking {}...", name)));
    let success = check_fn();
    if !success {
        ui.println(ui.colored("  Issues detected!", AnsiColor::Red));
    }
    ui.newline();
    success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::{FileBlockTarget, SetxEnvironment};
    use crate::shell::{HostOs, Shell};
    use crate::test_utils::setup_test_paths;
    use crate::ui::ColorMode;
    use tempfile::TempDir;

    fn file_target(paths: &Paths) -> EnvironmentTarget<SetxEnvironment> {
        EnvironmentTarget::FileBlock(FileBlockTarget::new(
            Shell::Bash,
            Shell::Bash.rc_path(&paths.home_dir, HostOs::Other),
            paths.backups_dir.clone(),
        ))
    }

    #[test]
    fn test_doctor_fresh_install() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let store = ProfileStore::load(&paths.store_file);
        let ui = Ui::new(ColorMode::Never, false);

        assert!(run_doctor(&paths, &store, &file_target(&paths), &ui));
    }

    #[test]
    fn test_doctor_reports_corrupt_store() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        fs::create_dir_all(&paths.config_dir).unwrap();
        fs::write(&paths.store_file, "{ not json").unwrap();
        let store = ProfileStore::load(&paths.store_file);
        let ui = Ui::new(ColorMode::Never, false);

        assert!(!run_doctor(&paths, &store, &file_target(&paths), &ui));
    }

    #[test]
    fn test_doctor_with_applied_profile() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let mut store = ProfileStore::load(&paths.store_file);
        store.add("work", "sk-w", "https://w.example.com").unwrap();
        let target = file_target(&paths);
        target.apply(store.current().unwrap()).unwrap();
        let ui = Ui::new(ColorMode::Never, false);

        assert!(run_doctor(&paths, &store, &target, &ui));
    }
}
