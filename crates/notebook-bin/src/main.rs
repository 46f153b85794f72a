//! Notebook CLI - drives the sync engine against a persisted state directory.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commands::{FilterCommand, NoteCommand, SectionCommand, TagCommand};

/// Notebook command-line interface.
#[derive(Parser)]
#[command(name = "notebook")]
#[command(about = "Sectioned, tagged notes with offline-first sync")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "NOTEBOOK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Base directory for config, state and logs. Defaults to ~/.notebook
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print sections, tags and notes as JSON
    Show {
        /// Only this section
        #[arg(long)]
        section: Option<u64>,
    },
    /// Print session and server reachability
    Status,
    /// Pull sections and the content of every section
    Sync,
    /// Sign in to an existing account
    SignIn {
        #[arg(long)]
        username: String,
        #[arg(long, env = "NOTEBOOK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    SignUp {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "NOTEBOOK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out; local content stays available in guest mode
    SignOut,
    #[command(subcommand)]
    Section(SectionCommand),
    #[command(subcommand)]
    Tag(TagCommand),
    #[command(subcommand)]
    Filter(FilterCommand),
    #[command(subcommand)]
    Note(NoteCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::run(cli).await
}
