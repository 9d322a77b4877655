use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use unrealpm_resolver::Config;

mod commands;

/// UnrealPM resolver - resolve Unreal Engine plugin dependencies against local catalogs
#[derive(Parser)]
#[command(name = "unrealpm-resolver")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log resolver internals (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a plugin and its dependencies
    Resolve {
        /// Plugin name with optional range (e.g., Http@>=3.0.0)
        plugin: String,

        /// Catalog directory to resolve against (repeatable, highest priority first)
        #[arg(short, long = "catalog")]
        catalogs: Vec<PathBuf>,

        /// Lockfile marking installed versions
        #[arg(long, default_value = unrealpm_resolver::LOCKFILE_NAME)]
        lockfile: PathBuf,

        /// Only allow the versions recorded in the lockfile
        #[arg(long)]
        locked: bool,

        /// Write the resolution to the lockfile
        #[arg(long, conflicts_with = "locked")]
        write_lock: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the catalog versions of a plugin, most preferred first
    Versions {
        /// Plugin name
        plugin: String,

        /// Catalog directory (repeatable, highest priority first)
        #[arg(short, long = "catalog")]
        catalogs: Vec<PathBuf>,

        /// Lockfile marking installed versions
        #[arg(long, default_value = unrealpm_resolver::LOCKFILE_NAME)]
        lockfile: PathBuf,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., resolver.max_depth)
        key: String,
        /// Configuration value
        value: String,
    },

    /// Add a catalog directory as a remote
    AddRemote {
        /// Remote name
        name: String,
        /// Path to the catalog directory
        path: String,
    },

    /// Remove a remote
    RemoveRemote {
        /// Remote name
        name: String,
    },
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "debug".to_string()
    } else {
        Config::load()
            .map(|c| c.logging.level)
            .unwrap_or_else(|_| "warn".to_string())
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Resolve {
            plugin,
            catalogs,
            lockfile,
            locked,
            write_lock,
            json,
        } => commands::resolve::run(commands::resolve::ResolveArgs {
            plugin,
            catalogs,
            lockfile,
            locked,
            write_lock,
            json,
        }),
        Commands::Versions {
            plugin,
            catalogs,
            lockfile,
        } => commands::versions::run(&plugin, catalogs, &lockfile),
        Commands::Config { action } => commands::config::run(&action),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "unrealpm-resolver", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let code = e
            .downcast_ref::<unrealpm_resolver::Error>()
            .map(unrealpm_resolver::Error::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
