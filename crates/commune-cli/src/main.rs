//! Commune CLI - back office for the commune portal from the terminal
//!
//! Lists, edits and moderates portal content through the same synchronized
//! resource layer the portal views use.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use commune_core::{ItemId, ListQuery};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::{ClientContext, GlobalOptions};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::list::run_list;
use crate::commands::mutate::{run_create, run_update};
use crate::commands::show::run_show;
use crate::commands::status::run_status;
use crate::commands::store::run_store;
use crate::commands::upload::run_upload;
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "warn";

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
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let options = GlobalOptions {
        profile: cli.profile,
        config_path: cli.config,
    };

    match cli.command {
        Commands::Config { command } => run_config(command, &options),
        Commands::Auth { command } => run_auth(command, options.profile.as_deref()),
        Commands::Store { command } => run_store(command, &options),
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        command => run_networked(command, &options).await,
    }
}

/// Commands that talk to the portal API share one client context.
async fn run_networked(command: Commands, options: &GlobalOptions) -> Result<(), CliError> {
    let context = ClientContext::open(options)?;
    let result = match command {
        Commands::List {
            resource,
            search,
            status,
            category,
            page,
            limit,
            json,
        } => {
            let query = build_query(search, status, category, page, limit);
            run_list(&context, resource, query, json).await
        }
        Commands::Show { resource, id, json } => {
            run_show(&context, resource, &parse_id(&id)?, json).await
        }
        Commands::Create { resource, payload } => run_create(&context, resource, &payload).await,
        Commands::Update {
            resource,
            id,
            payload,
        } => run_update(&context, resource, &parse_id(&id)?, &payload).await,
        Commands::Delete { resource, id, yes } => {
            run_delete(&context, resource, &parse_id(&id)?, yes).await
        }
        Commands::Status {
            resource,
            id,
            status,
        } => run_status(&context, resource, &parse_id(&id)?, &status).await,
        Commands::Upload { path, document } => run_upload(&context, &path, document).await,
        Commands::Config { .. }
        | Commands::Auth { .. }
        | Commands::Store { .. }
        | Commands::Completions { .. } => Ok(()),
    };
    context.finish();
    result
}

fn parse_id(raw: &str) -> Result<ItemId, CliError> {
    raw.parse()
        .map_err(|error: commune_core::models::ValidationError| {
            CliError::InvalidInput(error.to_string())
        })
}

fn build_query(
    search: Option<String>,
    status: Option<String>,
    category: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
) -> ListQuery {
    ListQuery {
        search,
        status,
        category,
        page,
        limit,
    }
    .normalized()
}
