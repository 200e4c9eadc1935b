use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;
use tracing_subscriber::EnvFilter;

use ccswitch::{
    apply::EnvironmentTarget,
    commands::{self, BIN_NAME, ProfileInput},
    paths::Paths,
    shell::EnvFormat,
    store::ProfileStore,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "sc")]
#[command(about = "Switch between Claude API profiles (token + base URL)")]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    /// Log debug diagnostics to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Without a command, pick a profile interactively
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Switch to a profile by name
    Use {
        /// Name of the profile to switch to
        name: String,
    },

    /// Add a new profile (prompts for anything not given)
    Add {
        /// Name of the profile
        #[arg(long)]
        name: Option<String>,

        /// API token (ANTHROPIC_AUTH_TOKEN)
        #[arg(long)]
        token: Option<String>,

        /// API base URL (ANTHROPIC_BASE_URL)
        #[arg(long)]
        url: Option<String>,
    },

    /// Remove a profile
    #[command(alias = "rm")]
    Remove {
        /// Name of the profile to remove (omit to pick interactively)
        name: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Edit a profile's token and base URL
    Edit {
        /// Name of the profile to edit (omit to pick interactively)
        name: Option<String>,

        /// New API token
        #[arg(long)]
        token: Option<String>,

        /// New API base URL
        #[arg(long)]
        url: Option<String>,
    },

    /// List all profiles
    #[command(alias = "ls")]
    List,

    /// Show the current profile and where it is applied
    Current,

    /// Print export statements for the current profile, for use with eval
    Env {
        /// Statement syntax: posix, powershell, cmd (default depends on the OS)
        #[arg(long, value_name = "FORMAT")]
        format: Option<EnvFormat>,
    },

    /// Remove sc's managed block or user environment variables
    Clear,

    /// Install shell completion and import existing exports from the shell config
    Setup,

    /// Print a shell completion script
    Completions {
        /// Shell to generate completions for
        shell: CompletionShell,
    },

    /// Run diagnostics on the sc setup
    Doctor,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(
    command: Option<Commands>,
    paths: &Paths,
    store: &mut ProfileStore,
    target: &EnvironmentTarget,
    ui: &Ui,
) -> Result<()> {
    let Some(command) = command else {
        return commands::switch_interactive(store, target, ui);
    };

    match command {
        Commands::Use { name } => commands::use_profile(store, target, &name, ui),
        Commands::Add { name, token, url } => commands::add(
            store,
            target,
            ProfileInput {
                name,
                token,
                base_url: url,
            },
            ui,
        ),
        Commands::Remove { name, force } => {
            commands::remove(store, target, name.as_deref(), force, ui)
        }
        Commands::Edit { name, token, url } => commands::edit(
            store,
            target,
            ProfileInput {
                name,
                token,
                base_url: url,
            },
            ui,
        ),
        Commands::List => commands::list(store, ui),
        Commands::Current => commands::current(store, target, ui),
        Commands::Env { format } => {
            // Plain stdout: this output is evaluated by the shell
            let format = format.unwrap_or_else(|| target.env_format());
            if let Some(statements) = commands::env_output(store, format) {
                println!("{}", statements);
            }
            Ok(())
        }
        Commands::Clear => commands::clear(target, ui),
        Commands::Setup => commands::setup(store, target, ui),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), BIN_NAME, &mut std::io::stdout());
            Ok(())
        }
        Commands::Doctor => commands::doctor(paths, store, target, ui),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ui = Ui::new(cli.color, cli.no_color);
    let paths = Paths::new()?;
    let mut store = ProfileStore::load(&paths.store_file);
    let target = EnvironmentTarget::for_host(&paths);

    let evaluated = matches!(
        cli.command,
        Some(Commands::Env { .. } | Commands::Completions { .. })
    );
    commands::seed_from_env(&mut store, &ui, !evaluated);

    // Only a failed `use` exits non-zero
    let exit_on_error = matches!(cli.command, Some(Commands::Use { .. }));
    if let Err(e) = run(cli.command, &paths, &mut store, &target, &ui) {
        ui.err(e.to_string());
        if exit_on_error {
            std::process::exit(1);
        }
    }

    Ok(())
}
