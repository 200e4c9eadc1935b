//! High-level command orchestration for the CLI.
//!
//! This module contains the handler functions for each CLI command (`use`,
//! `add`, `remove`, `list`, `env`, ...). It serves as the coordination layer,
//! interacting with:
//! - `crate::ui` for output and `inquire` for prompts.
//! - `crate::store` for the persisted profiles.
//! - `crate::apply` to mirror the current profile into the environment.
//!
//! Store errors are fatal to a command; environment errors are not. The store
//! is the source of truth, so a failed shell-file update only produces a
//! warning.

use anstyle::AnsiColor;
use anyhow::{Context, Result, bail};
use inquire::validator::Validation;
use inquire::{Confirm, CustomUserError, Select, Text};
use std::fmt;
use tracing::warn;

use crate::apply::{ApplyOutcome, ClearOutcome, EnvironmentTarget, UserEnvironment};
use crate::block::{self, LEGACY_PROFILE_MARKERS, PROFILE_MARKERS, UpsertAction};
use crate::paths::Paths;
use crate::profile::{
    BASE_URL_VAR, Profile, TOKEN_VAR, validate_base_url, validate_profile_name, validate_token,
};
use crate::shell::{EnvFormat, scan_exports};
use crate::store::ProfileStore;
use crate::ui::Ui;

/// Name of the installed binary, used in hints and the completion hook
pub const BIN_NAME: &str = "sc";

/// Values for `add`/`edit` given on the command line; missing ones are
/// prompted for
#[derive(Debug, Clone, Default)]
pub struct ProfileInput {
    pub name: Option<String>,
    pub token: Option<String>,
    pub base_url: Option<String>,
}

/// One entry of the interactive profile picker
struct ProfileChoice {
    name: String,
    current: bool,
}

impl fmt::Display for ProfileChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.current {
            write!(f, "{} (current)", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

// -----------------------------------------------------------------------------
// Prompts
// -----------------------------------------------------------------------------

/// Let the user pick a profile; the cursor starts on the current one
fn select_profile(store: &ProfileStore, message: &str) -> Result<String> {
    let current = store.current_name();
    let choices: Vec<ProfileChoice> = store
        .profiles()
        .map(|p| ProfileChoice {
            name: p.name.clone(),
            current: Some(p.name.as_str()) == current,
        })
        .collect();
    let cursor = choices.iter().position(|c| c.current).unwrap_or(0);

    let selected = Select::new(message, choices)
        .with_starting_cursor(cursor)
        .prompt()
        .context("Profile selection cancelled")?;

    Ok(selected.name)
}

fn to_validation<E: fmt::Display>(result: Result<(), E>) -> Result<Validation, CustomUserError> {
    Ok(match result {
        Ok(()) => Validation::Valid,
        Err(e) => Validation::Invalid(e.to_string().into()),
    })
}

fn prompt_name() -> Result<String> {
    let name = Text::new("Profile name:")
        .with_validator(|input: &str| to_validation(validate_profile_name(input.trim())))
        .prompt()
        .context("Input cancelled")?;
    Ok(name.trim().to_string())
}

fn prompt_token(default: Option<&str>) -> Result<String> {
    let message = format!("{}:", TOKEN_VAR);
    let mut prompt =
        Text::new(&message).with_validator(|input: &str| to_validation(validate_token(input)));
    if let Some(default) = default {
        prompt = prompt.with_default(default);
    }
    let token = prompt.prompt().context("Input cancelled")?;
    Ok(token.trim().to_string())
}

fn prompt_base_url(default: Option<&str>) -> Result<String> {
    let message = format!("{}:", BASE_URL_VAR);
    let mut prompt =
        Text::new(&message).with_validator(|input: &str| to_validation(validate_base_url(input)));
    if let Some(default) = default {
        prompt = prompt.with_default(default);
    }
    let url = prompt.prompt().context("Input cancelled")?;
    Ok(url.trim().to_string())
}

fn confirm(message: &str, help: &str) -> Result<bool> {
    Confirm::new(message)
        .with_default(false)
        .with_help_message(help)
        .prompt()
        .context("Confirmation cancelled")
}

// -----------------------------------------------------------------------------
// Environment helpers
// -----------------------------------------------------------------------------

/// Mirror a profile into the environment. Failures are downgraded to a
/// warning; returns whether the environment was updated.
fn apply_profile<E: UserEnvironment>(
    target: &EnvironmentTarget<E>,
    profile: &Profile,
    ui: &Ui,
) -> bool {
    match target.apply(profile) {
        Ok(outcome) => {
            report_apply(&outcome, ui);
            true
        }
        Err(e) => {
            warn!(error = %e, "environment update failed");
            ui.warn(format!("Failed to update shell config: {}", e));
            false
        }
    }
}

fn report_apply(outcome: &ApplyOutcome, ui: &Ui) {
    let ApplyOutcome::ShellFile {
        path,
        action,
        backup,
        ..
    } = outcome
    else {
        return;
    };

    if let Some(backup) = backup {
        ui.println(ui.dim(format!("   Backed up {} to {}", path.display(), backup.display())));
    }
    if *action == UpsertAction::Migrated {
        ui.println(ui.dim(format!("   Migrated the sc block in {} to the new format", path.display())));
    }
}

/// Command that loads the current profile into the running shell
fn session_apply_command<E: UserEnvironment>(target: &EnvironmentTarget<E>) -> String {
    match target {
        EnvironmentTarget::KeyValue(_) => format!("{} env | Invoke-Expression", BIN_NAME),
        EnvironmentTarget::FileBlock(_) => format!("eval \"$({} env)\"", BIN_NAME),
    }
}

fn print_switch_hint<E: UserEnvironment>(target: &EnvironmentTarget<E>, ui: &Ui) {
    ui.newline();
    match target {
        EnvironmentTarget::KeyValue(_) => {
            ui.hint("Changes will take effect in new terminal windows.");
            ui.hint("To apply in the current session (PowerShell):");
            ui.println(ui.colored(format!("   {}", session_apply_command(target)), AnsiColor::Cyan));
        }
        EnvironmentTarget::FileBlock(_) => {
            ui.hint("Run the following command to apply changes immediately:");
            ui.println(ui.colored(format!("   {}", session_apply_command(target)), AnsiColor::Cyan));
        }
    }
}

/// Select `name` in the store, then mirror it into the environment
fn switch_to<E: UserEnvironment>(
    store: &mut ProfileStore,
    target: &EnvironmentTarget<E>,
    name: &str,
    ui: &Ui,
) -> Result<()> {
    let spinner = ui.spinner(format!("Switching to profile '{}'...", name));

    let profile = match store.set_current(name) {
        Ok(profile) => {
            ui.spinner_finish_ok(&spinner, format!("Switched to {}", ui.bold(name)));
            profile
        }
        Err(e) => {
            ui.spinner_finish_err(&spinner, "Failed to switch profile");
            bail!(
                "{}\nHint: Use '{} list' to see available profiles.",
                e,
                BIN_NAME
            );
        }
    };

    apply_profile(target, &profile, ui);
    print_switch_hint(target, ui);
    Ok(())
}

// -----------------------------------------------------------------------------
// Commands
// -----------------------------------------------------------------------------

/// Seed the store from `ANTHROPIC_AUTH_TOKEN` / `ANTHROPIC_BASE_URL` on first
/// run. Failures are logged, never fatal.
pub fn seed_from_env(store: &mut ProfileStore, ui: &Ui, announce: bool) {
    let token = std::env::var(TOKEN_VAR).unwrap_or_default();
    let url = std::env::var(BASE_URL_VAR).unwrap_or_default();

    match store.seed_from_environment(&token, &url) {
        Ok(Some(profile)) if announce => {
            ui.ok("Detected system environment variables.");
            ui.hint(format!("Created profile \"{}\" as default.", profile.name));
            ui.newline();
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "could not seed profile store from environment"),
    }
}

/// Interactive switch (the default command)
pub fn switch_interactive<E: UserEnvironment>(
    store: &mut ProfileStore,
    target: &EnvironmentTarget<E>,
    ui: &Ui,
) -> Result<()> {
    if store.is_empty() {
        ui.warn(format!("No profiles configured. Use \"{} add\" to add one.", BIN_NAME));
        return Ok(());
    }

    let selected = select_profile(store, "Select API profile to switch to:")?;
    switch_to(store, target, &selected, ui)
}

/// Switch to a profile by name
pub fn use_profile<E: UserEnvironment>(
    store: &mut ProfileStore,
    target: &EnvironmentTarget<E>,
    name: &str,
    ui: &Ui,
) -> Result<()> {
    switch_to(store, target, name, ui)
}

/// Add a new profile, prompting for anything not given
pub fn add<E: UserEnvironment>(
    store: &mut ProfileStore,
    target: &EnvironmentTarget<E>,
    input: ProfileInput,
    ui: &Ui,
) -> Result<()> {
    let name = match input.name {
        Some(name) => {
            validate_profile_name(&name)?;
            name
        }
        None => prompt_name()?,
    };

    if store.get(&name).is_some() {
        bail!(
            "Profile '{}' already exists.\nHint: Use '{} edit {}' to modify it, or choose a different name.",
            name,
            BIN_NAME,
            name
        );
    }

    let token = match input.token {
        Some(token) => {
            validate_token(&token)?;
            token.trim().to_string()
        }
        None => prompt_token(None)?,
    };
    let base_url = match input.base_url {
        Some(url) => {
            validate_base_url(&url)?;
            url.trim().to_string()
        }
        None => prompt_base_url(None)?,
    };

    store.add(&name, &token, &base_url)?;
    ui.ok(format!("Profile \"{}\" added successfully", name));

    // The first profile becomes current and is applied right away
    if store.current_name() == Some(name.as_str()) {
        if let Some(profile) = store.current().cloned() {
            ui.hint("Set as current profile.");
            apply_profile(target, &profile, ui);
            print_switch_hint(target, ui);
        }
    }

    Ok(())
}

/// Remove a profile. If it was current, the next profile is applied, or the
/// environment is cleared when none is left.
pub fn remove<E: UserEnvironment>(
    store: &mut ProfileStore,
    target: &EnvironmentTarget<E>,
    name: Option<&str>,
    force: bool,
    ui: &Ui,
) -> Result<()> {
    if store.is_empty() {
        ui.warn("No profiles to remove.");
        return Ok(());
    }

    let name = match name {
        Some(name) => name.to_string(),
        None => select_profile(store, "Select profile to remove:")?,
    };

    if store.get(&name).is_none() {
        bail!(
            "Profile '{}' does not exist.\nHint: Use '{} list' to see available profiles.",
            name,
            BIN_NAME
        );
    }

    if !force
        && !confirm(
            &format!("Are you sure you want to remove \"{}\"?", name),
            "The token and URL stored in this profile will be deleted",
        )?
    {
        ui.println(ui.dim("Cancelled."));
        return Ok(());
    }

    let was_current = store.current_name() == Some(name.as_str());
    store.remove(&name)?;
    ui.ok(format!("Profile \"{}\" removed", name));

    if !was_current {
        return Ok(());
    }

    match store.current().cloned() {
        Some(next) => {
            ui.hint(format!("Switched to \"{}\"", next.name));
            apply_profile(target, &next, ui);
        }
        None => match target.clear() {
            Ok(_) => ui.hint("No profiles left; cleared the environment."),
            Err(e) => ui.warn(format!("Failed to clear shell config: {}", e)),
        },
    }

    Ok(())
}

/// Edit a profile's token and URL
pub fn edit<E: UserEnvironment>(
    store: &mut ProfileStore,
    target: &EnvironmentTarget<E>,
    input: ProfileInput,
    ui: &Ui,
) -> Result<()> {
    if store.is_empty() {
        ui.warn("No profiles to edit.");
        return Ok(());
    }

    let name = match input.name {
        Some(name) => name,
        None => select_profile(store, "Select profile to edit:")?,
    };

    let Some(existing) = store.get(&name).cloned() else {
        bail!(
            "Profile '{}' does not exist.\nHint: Use '{} list' to see available profiles.",
            name,
            BIN_NAME
        );
    };

    // With neither flag given, prompt for both using the stored values
    let interactive = input.token.is_none() && input.base_url.is_none();

    let token = match input.token {
        Some(token) => {
            validate_token(&token)?;
            token.trim().to_string()
        }
        None if interactive => prompt_token(Some(&existing.auth_token))?,
        None => existing.auth_token.clone(),
    };
    let base_url = match input.base_url {
        Some(url) => {
            validate_base_url(&url)?;
            url.trim().to_string()
        }
        None if interactive => prompt_base_url(Some(&existing.base_url))?,
        None => existing.base_url.clone(),
    };

    store.update(&name, &token, &base_url)?;
    ui.ok(format!("Profile \"{}\" updated", name));

    if store.current_name() == Some(name.as_str()) {
        if let Some(profile) = store.current().cloned() {
            if apply_profile(target, &profile, ui) {
                ui.hint("Shell config updated.");
            }
        }
    }

    Ok(())
}

/// List all profiles
pub fn list(store: &ProfileStore, ui: &Ui) -> Result<()> {
    if store.is_empty() {
        ui.warn("No profiles configured.");
        ui.newline();
        ui.println("Create one with:");
        ui.println(format!("  {} add", ui.bold(BIN_NAME)));
        return Ok(());
    }

    let current = store.current_name();

    let mut table = ui.simple_table();
    table.set_header(vec![
        ui.header_cell(""),
        ui.header_cell("Profile"),
        ui.header_cell("Base URL"),
        ui.header_cell("Status"),
    ]);

    for profile in store.profiles() {
        let is_current = Some(profile.name.as_str()) == current;
        let (icon, name_cell, status_cell) = if is_current {
            (
                ui.icon_current(),
                ui.colored_cell(&profile.name, AnsiColor::Green),
                ui.colored_cell("current", AnsiColor::Green),
            )
        } else {
            (" ", ui.cell(&profile.name), ui.colored_cell("-", AnsiColor::BrightBlack))
        };

        table.add_row(vec![
            ui.cell(icon),
            name_cell,
            ui.colored_cell(profile.short_url(40), AnsiColor::BrightBlack),
            status_cell,
        ]);
    }

    ui.section("API Profiles");
    ui.println(table.to_string());

    Ok(())
}

/// Show the current profile and whether the environment mirrors it
pub fn current<E: UserEnvironment>(
    store: &ProfileStore,
    target: &EnvironmentTarget<E>,
    ui: &Ui,
) -> Result<()> {
    ui.section("Current Profile");
    ui.newline();

    let mut table = ui.simple_table();

    let Some(profile) = store.current() else {
        table.add_row(vec![ui.cell("Selected profile:"), ui.cell("(none)")]);
        ui.println(table.to_string());
        return Ok(());
    };

    table.add_row(vec![ui.cell("Selected profile:"), ui.header_cell(&profile.name)]);
    table.add_row(vec![ui.cell("Base URL:"), ui.cell(&profile.base_url)]);
    table.add_row(vec![ui.cell("Token:"), ui.cell(profile.masked_token())]);
    table.add_row(vec![ui.cell("Applied to:"), ui.cell(target.describe())]);

    if let EnvironmentTarget::FileBlock(file) = target {
        let block_cell = match file.read() {
            Ok(content) if block::contains(&content, &PROFILE_MARKERS) => {
                ui.colored_cell("present", AnsiColor::Green)
            }
            Ok(content) if block::contains(&content, &LEGACY_PROFILE_MARKERS) => {
                ui.colored_cell("legacy format (updated on next switch)", AnsiColor::Yellow)
            }
            Ok(_) => ui.colored_cell("missing", AnsiColor::Yellow),
            Err(e) => {
                warn!(error = %e, "could not read shell startup file");
                ui.colored_cell("unreadable", AnsiColor::Red)
            }
        };
        table.add_row(vec![ui.cell("Managed block:"), block_cell]);
    }

    let session_url = std::env::var(BASE_URL_VAR).ok();
    let session_cell = if session_url.as_deref() == Some(profile.base_url.as_str()) {
        ui.colored_cell("in sync", AnsiColor::Green)
    } else {
        ui.colored_cell(format!("stale (run: {})", session_apply_command(target)), AnsiColor::Yellow)
    };
    table.add_row(vec![ui.cell("This shell:"), session_cell]);

    ui.println(table.to_string());
    Ok(())
}

/// Export statements for the current profile, or `None` without one
pub fn env_output(store: &ProfileStore, format: EnvFormat) -> Option<String> {
    store.current().map(|profile| format.render(profile))
}

/// Remove the managed block or user variables
pub fn clear<E: UserEnvironment>(target: &EnvironmentTarget<E>, ui: &Ui) -> Result<()> {
    match target.clear()? {
        ClearOutcome::ShellFile {
            path,
            removed: true,
        } => ui.ok(format!("Removed the sc block from {}", path.display())),
        ClearOutcome::ShellFile {
            path,
            removed: false,
        } => ui.info(format!("No sc block found in {}", path.display())),
        ClearOutcome::UserEnvironment => {
            ui.ok(format!("Removed {} and {} from the user environment", TOKEN_VAR, BASE_URL_VAR))
        }
    }
    ui.hint(format!("Run '{} use <name>' to apply a profile again.", BIN_NAME));
    Ok(())
}

/// Install the completion hook and import credentials already exported in
/// the shell startup file
pub fn setup<E: UserEnvironment>(
    store: &mut ProfileStore,
    target: &EnvironmentTarget<E>,
    ui: &Ui,
) -> Result<()> {
    let EnvironmentTarget::FileBlock(file) = target else {
        ui.info("Shell completion and config import are only available for bash and zsh.");
        return Ok(());
    };

    if file.install_completions(BIN_NAME)? {
        ui.ok(format!("Shell completion installed to {}", file.rc_path.display()));
        ui.hint(format!("Restart your terminal or run: source {}", file.rc_path.display()));
    } else {
        ui.info(format!("Shell completion already installed in {}", file.rc_path.display()));
    }

    if !store.is_empty() {
        return Ok(());
    }

    let scanned = scan_exports(&file.read()?);
    match scanned.both() {
        Some((token, url)) => {
            if let Some(profile) = store.seed_from_environment(token, url)? {
                ui.ok(format!("Imported existing config as profile \"{}\"", profile.name));
            }
        }
        None => ui.info(format!(
            "No existing {} / {} exports found to import",
            TOKEN_VAR, BASE_URL_VAR
        )),
    }

    Ok(())
}

/// Run diagnostics
pub fn doctor<E: UserEnvironment>(
    paths: &Paths,
    store: &ProfileStore,
    target: &EnvironmentTarget<E>,
    ui: &Ui,
) -> Result<()> {
    if !crate::doctor::run_doctor(paths, store, target, ui) {
        ui.warn("Some checks failed. See above for details.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::{FileBlockTarget, KeyValueTarget, SetxEnvironment};
    use crate::shell::{HostOs, Shell};
    use crate::test_utils::setup_test_paths;
    use crate::ui::ColorMode;
    use std::fs;
    use tempfile::TempDir;

    fn test_ui() -> Ui {
        Ui::new(ColorMode::Never, false)
    }

    struct Fixture {
        _temp_dir: TempDir,
        store: ProfileStore,
        target: EnvironmentTarget<SetxEnvironment>,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let store = ProfileStore::load(&paths.store_file);
        let rc_path = Shell::Zsh.rc_path(&paths.home_dir, HostOs::Other);
        let target = EnvironmentTarget::FileBlock(FileBlockTarget::new(
            Shell::Zsh,
            rc_path,
            paths.backups_dir.clone(),
        ));
        Fixture {
            _temp_dir: temp_dir,
            store,
            target,
        }
    }

    fn input(name: &str, token: &str, url: &str) -> ProfileInput {
        ProfileInput {
            name: Some(name.to_string()),
            token: Some(token.to_string()),
            base_url: Some(url.to_string()),
        }
    }

    fn rc_content(target: &EnvironmentTarget<SetxEnvironment>) -> String {
        let EnvironmentTarget::FileBlock(file) = target else {
            unreachable!()
        };
        fs::read_to_string(&file.rc_path).unwrap_or_default()
    }

    #[test]
    fn test_list_empty() {
        let f = fixture();
        assert!(list(&f.store, &test_ui()).is_ok());
    }

    #[test]
    fn test_add_first_applies() {
        let mut f = fixture();
        let ui = test_ui();

        add(&mut f.store, &f.target, input("work", "sk-w", "https://w.example.com"), &ui).unwrap();

        assert_eq!(f.store.current_name(), Some("work"));
        assert!(rc_content(&f.target).contains("export ANTHROPIC_AUTH_TOKEN=\"sk-w\""));
        assert!(list(&f.store, &ui).is_ok());
    }

    #[test]
    fn test_add_second_does_not_apply() {
        let mut f = fixture();
        let ui = test_ui();

        add(&mut f.store, &f.target, input("work", "sk-w", "https://w.example.com"), &ui).unwrap();
        add(&mut f.store, &f.target, input("home", "sk-h", "https://h.example.com"), &ui).unwrap();

        assert_eq!(f.store.current_name(), Some("work"));
        assert!(!rc_content(&f.target).contains("sk-h"));
    }

    #[test]
    fn test_add_duplicate() {
        let mut f = fixture();
        let ui = test_ui();

        add(&mut f.store, &f.target, input("work", "t", "https://w.example.com"), &ui).unwrap();
        assert!(add(&mut f.store, &f.target, input("work", "t", "https://w.example.com"), &ui).is_err());
    }

    #[test]
    fn test_add_rejects_invalid_input() {
        let mut f = fixture();
        let ui = test_ui();

        assert!(add(&mut f.store, &f.target, input("bad name", "t", "https://a.example.com"), &ui).is_err());
        assert!(add(&mut f.store, &f.target, input("ok", " ", "https://a.example.com"), &ui).is_err());
        assert!(add(&mut f.store, &f.target, input("ok", "t", "nope"), &ui).is_err());
        assert!(f.store.is_empty());
    }

    #[test]
    fn test_use_switches_and_applies() {
        let mut f = fixture();
        let ui = test_ui();
        add(&mut f.store, &f.target, input("a", "ta", "https://a.example.com"), &ui).unwrap();
        add(&mut f.store, &f.target, input("b", "tb", "https://b.example.com"), &ui).unwrap();

        use_profile(&mut f.store, &f.target, "b", &ui).unwrap();

        assert_eq!(f.store.current_name(), Some("b"));
        let content = rc_content(&f.target);
        assert!(content.contains("\"tb\""));
        assert!(!content.contains("\"ta\""));
        assert_eq!(content.matches(PROFILE_MARKERS.start).count(), 1);
    }

    #[test]
    fn test_use_nonexistent() {
        let mut f = fixture();
        assert!(use_profile(&mut f.store, &f.target, "nonexistent", &test_ui()).is_err());
    }

    #[test]
    fn test_remove_current_applies_next() {
        let mut f = fixture();
        let ui = test_ui();
        add(&mut f.store, &f.target, input("a", "ta", "https://a.example.com"), &ui).unwrap();
        add(&mut f.store, &f.target, input("b", "tb", "https://b.example.com"), &ui).unwrap();

        remove(&mut f.store, &f.target, Some("a"), true, &ui).unwrap();

        assert_eq!(f.store.current_name(), Some("b"));
        assert!(rc_content(&f.target).contains("\"tb\""));
    }

    #[test]
    fn test_remove_last_clears_block() {
        let mut f = fixture();
        let ui = test_ui();
        add(&mut f.store, &f.target, input("a", "ta", "https://a.example.com"), &ui).unwrap();

        remove(&mut f.store, &f.target, Some("a"), true, &ui).unwrap();

        assert!(f.store.is_empty());
        assert!(!block::contains(&rc_content(&f.target), &PROFILE_MARKERS));
    }

    #[test]
    fn test_remove_unknown() {
        let mut f = fixture();
        let ui = test_ui();
        add(&mut f.store, &f.target, input("a", "ta", "https://a.example.com"), &ui).unwrap();
        assert!(remove(&mut f.store, &f.target, Some("zzz"), true, &ui).is_err());
    }

    #[test]
    fn test_edit_with_flags() {
        let mut f = fixture();
        let ui = test_ui();
        add(&mut f.store, &f.target, input("a", "ta", "https://a.example.com"), &ui).unwrap();

        let edit_input = ProfileInput {
            name: Some("a".to_string()),
            token: Some("ta2".to_string()),
            base_url: None,
        };
        edit(&mut f.store, &f.target, edit_input, &ui).unwrap();

        let profile = f.store.get("a").unwrap();
        assert_eq!(profile.auth_token, "ta2");
        assert_eq!(profile.base_url, "https://a.example.com");
        assert!(rc_content(&f.target).contains("\"ta2\""));
    }

    #[test]
    fn test_env_output() {
        let mut f = fixture();
        assert!(env_output(&f.store, EnvFormat::Posix).is_none());

        f.store.add("a", "ta", "https://a.example.com").unwrap();
        assert_eq!(
            env_output(&f.store, EnvFormat::Posix).unwrap(),
            "export ANTHROPIC_AUTH_TOKEN=\"ta\"\nexport ANTHROPIC_BASE_URL=\"https://a.example.com\""
        );
    }

    #[test]
    fn test_setup_imports_existing_exports() {
        let mut f = fixture();
        let ui = test_ui();
        let EnvironmentTarget::FileBlock(file) = &f.target else {
            unreachable!()
        };
        fs::write(
            &file.rc_path,
            "export ANTHROPIC_AUTH_TOKEN=\"sk-x\"\nexport ANTHROPIC_BASE_URL=\"https://p.example.com/team\"\n",
        )
        .unwrap();

        setup(&mut f.store, &f.target, &ui).unwrap();

        assert_eq!(f.store.current_name(), Some("team"));
        assert_eq!(f.store.get("team").unwrap().auth_token, "sk-x");
        assert!(rc_content(&f.target).contains("sc completions zsh"));
    }

    #[test]
    fn test_clear_and_current() {
        let mut f = fixture();
        let ui = test_ui();
        assert!(current(&f.store, &f.target, &ui).is_ok());

        add(&mut f.store, &f.target, input("a", "ta", "https://a.example.com"), &ui).unwrap();
        assert!(current(&f.store, &f.target, &ui).is_ok());

        clear(&f.target, &ui).unwrap();
        assert!(!block::contains(&rc_content(&f.target), &PROFILE_MARKERS));
        // The store is untouched
        assert_eq!(f.store.current_name(), Some("a"));
    }

    #[test]
    fn test_session_apply_command_per_target() {
        let f = fixture();
        assert_eq!(session_apply_command(&f.target), "eval \"$(sc env)\"");

        let windows: EnvironmentTarget<SetxEnvironment> =
            EnvironmentTarget::KeyValue(KeyValueTarget::new(SetxEnvironment));
        assert_eq!(session_apply_command(&windows), "sc env | Invoke-Expression");
    }

    #[test]
    fn test_current_survives_unreadable_rc_file() {
        let mut f = fixture();
        f.store.add("a", "ta", "https://a.example.com").unwrap();
        let EnvironmentTarget::FileBlock(file) = &f.target else {
            unreachable!()
        };
        // A directory where the startup file should be cannot be read
        fs::create_dir_all(&file.rc_path).unwrap();

        assert!(file.read().is_err());
        assert!(current(&f.store, &f.target, &test_ui()).is_ok());
    }
}
