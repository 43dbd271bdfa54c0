//! YNAB MCP server entry point.
//!
//! `serve` (the default) reads `YNAB_API_TOKEN` from the environment and
//! serves MCP tools over stdio. `gateway` serves HTTP and routes each
//! caller's token to a pooled `serve` child process.

extern crate alloc;

mod analysis;
mod cache;
mod cli;
mod error;
mod gateway;
mod money;
mod params;
mod pool;
mod prompts;
mod response;
mod server;
mod session;
mod tools;
mod ynab;

use alloc::sync::Arc;
use core::time::Duration;

use clap::Parser;
use rmcp::ServiceExt;
use tracing_subscriber::EnvFilter;

use crate::cache::TtlCache;
use crate::cli::{Cli, Command, GatewayArgs, ServeArgs};
use crate::pool::ClientPool;
use crate::server::YnabMcpServer;
use crate::session::ChildProcessConnector;
use crate::tools::YnabTools;
use crate::ynab::{YnabClient, redact};

/// Serves MCP tools over stdio.
///
/// # Errors
///
/// Returns an error if the token is missing, the client cannot be built,
/// or the stdio transport encounters an error.
async fn serve_stdio(args: ServeArgs) -> Result<(), Box<dyn core::error::Error>> {
    let token = args
        .token
        .filter(|token| !token.trim().is_empty())
        .ok_or("YNAB_API_TOKEN environment variable is required")?;
    let default_budget = args.budget_id.filter(|id| !id.is_empty());

    tracing::info!(
        token = %redact(&token),
        budget_id = ?default_budget,
        api_url = %args.api_url,
        "starting YNAB MCP server"
    );

    let client = YnabClient::new(token, &args.api_url)?;
    let cache = TtlCache::new(Duration::from_secs(args.cache_ttl_secs));
    let mcp_server = YnabMcpServer::new(YnabTools::new(client, cache, default_budget));

    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let service = mcp_server.serve(transport).await?;

    tracing::info!("MCP server running on stdio");
    let _quit_reason = service.waiting().await?;

    Ok(())
}

/// Serves the pooled HTTP gateway.
///
/// # Errors
///
/// Returns an error if the server executable cannot be located or the
/// listener fails.
async fn run_gateway(args: GatewayArgs) -> Result<(), Box<dyn core::error::Error>> {
    let program = match args.server_command {
        Some(program) => program,
        None => std::env::current_exe()?,
    };
    tracing::info!(
        program = %program.display(),
        idle_timeout_secs = args.idle_timeout_secs,
        "starting YNAB MCP gateway"
    );

    let connector = ChildProcessConnector::new(
        program,
        vec!["serve".to_owned()],
        Duration::from_secs(args.handshake_timeout_secs),
    );
    let pool = Arc::new(ClientPool::new(
        connector,
        Duration::from_secs(args.idle_timeout_secs),
    ));
    gateway::serve(
        args.listen,
        pool,
        Duration::from_secs(args.sweep_interval_secs),
    )
    .await?;

    tracing::info!("gateway stopped");
    Ok(())
}

/// Runs the selected mode.
async fn run() -> Result<(), Box<dyn core::error::Error>> {
    let command = Cli::parse().into_command();

    // Initialise tracing to stderr (stdout is used for MCP stdio transport).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match command {
        Command::Serve(args) => serve_stdio(args).await,
        Command::Gateway(args) => run_gateway(args).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(%err, "fatal error");
        std::process::exit(1);
    }
}
