//! Auri CLI - read and write Auri reviews from the terminal
//!
//! Works against the same Appwrite collection as the website and keeps a
//! local cache so `list` still answers when the server does not.

mod cli;
mod commands;
mod config_profiles;
mod cookie_vault;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::GlobalOptions;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::stats::run_stats;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("auri=info".parse().map_err(|error| {
                    CliError::Config(format!("invalid log directive: {error}"))
                })?),
        )
        .init();

    let cli = Cli::parse();
    let options = GlobalOptions {
        profile: cli.profile,
        storage_dir: cli.storage_dir,
        offline: cli.offline,
    };

    match cli.command {
        Commands::List { limit, json } => run_list(limit, json, &options).await?,
        Commands::Add {
            message,
            name,
            rating,
        } => run_add(&message, name, rating, &options).await?,
        Commands::Edit {
            id,
            rating,
            message,
        } => run_edit(&id, rating, message, &options).await?,
        Commands::Delete { id } => run_delete(&id, &options).await?,
        Commands::Sync => run_sync(&options).await?,
        Commands::Stats { json } => run_stats(json, &options).await?,
        Commands::Auth { command } => run_auth(command, &options).await?,
        Commands::Config { command } => run_config(command, &options)?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
