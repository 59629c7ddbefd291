mod commands;
mod render;
mod utils;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use rota_core::{ErrorCategory, ReconcileMode, SyncError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rota")]
#[command(about = "Share and back up the clinic roster through a common cloud folder")]
struct Cli {
    /// Show debug logs (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect a Google account
    Auth {
        /// Remove the stored session instead
        #[arg(long)]
        sign_out: bool,
    },
    /// Upload the local roster to the shared file
    Save,
    /// Download the shared file and combine it with the local roster
    Pull {
        /// How incoming records are combined with local ones
        #[arg(short, long, default_value_t = ReconcileMode::Merge)]
        mode: ReconcileMode,
    },
    /// Create a timestamped backup in the shared folder
    Backup,
    /// List the backups this account can open
    Backups,
    /// Restore from a listed backup
    Restore {
        artifact_id: String,

        #[arg(short, long, default_value_t = ReconcileMode::Merge)]
        mode: ReconcileMode,
    },
    /// Delete a backup from the shared folder
    Delete {
        artifact_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Write the local roster to a backup file on disk
    Export,
    /// Combine a backup file from disk with the local roster
    Import {
        path: PathBuf,

        #[arg(short, long, default_value_t = ReconcileMode::Merge)]
        mode: ReconcileMode,
    },
    /// Stop asking for confirmation on local exports
    ResetExportCounter,
    /// Keep a local copy of the roster if the backup interval has elapsed
    AutoBackup,
    /// Show which shared folder is used
    Resolve,
    /// Show config and data paths
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", describe(&e).red());
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Auth { sign_out } => commands::auth::run(sign_out).await,
        Commands::Save => commands::save::run().await,
        Commands::Pull { mode } => commands::pull::run(mode).await,
        Commands::Backup => commands::backup::run().await,
        Commands::Backups => commands::backups::run().await,
        Commands::Restore { artifact_id, mode } => commands::restore::run(&artifact_id, mode).await,
        Commands::Delete { artifact_id, force } => commands::delete::run(&artifact_id, force).await,
        Commands::Export => commands::export::run(),
        Commands::Import { path, mode } => commands::import::run(&path, mode),
        Commands::ResetExportCounter => commands::export::reset_counter(),
        Commands::AutoBackup => commands::auto_backup::run(),
        Commands::Resolve => commands::resolve::run().await,
        Commands::Config => commands::config::run(),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// The category message for sync failures, the full chain for anything else.
fn describe(error: &anyhow::Error) -> String {
    let Some(e) = error.downcast_ref::<SyncError>() else {
        return format!("{error:#}");
    };

    if e.category() == ErrorCategory::Local {
        format!("{error:#}")
    } else if e.is_auth() {
        format!("{}\n{e}", e.user_message())
    } else {
        format!("{}\n  ({e})", e.user_message())
    }
}
