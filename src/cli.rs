//! Command-line interface.
//!
//! Without a subcommand the binary runs `serve`, so MCP clients can launch
//! it with nothing but environment variables.

use core::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::cache::DEFAULT_TTL;
use crate::pool::{DEFAULT_IDLE_TIMEOUT, DEFAULT_SWEEP_INTERVAL};
use crate::session::DEFAULT_HANDSHAKE_TIMEOUT;
use crate::ynab::{DEFAULT_BASE_URL, redact};

/// YNAB MCP server and pooled HTTP gateway.
#[derive(Debug, Parser)]
#[command(name = "ynab-mcp", version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub(crate) struct Cli {
    /// Mode to run in; defaults to `serve`.
    #[command(subcommand)]
    command: Option<Command>,

    /// Options of the implicit `serve` mode.
    #[command(flatten)]
    serve: ServeArgs,
}

impl Cli {
    /// Resolves the mode to run.
    pub(crate) fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

/// Run modes.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Serve MCP tools over stdio for a single access token.
    Serve(ServeArgs),
    /// Serve an HTTP gateway that pools one MCP session per access token.
    Gateway(GatewayArgs),
}

/// Options of `serve`.
#[derive(Clone, Args)]
pub(crate) struct ServeArgs {
    /// YNAB personal access token.
    #[arg(long, env = "YNAB_API_TOKEN", hide_env_values = true)]
    pub(crate) token: Option<String>,

    /// Budget used when a tool call omits budgetId.
    #[arg(long, env = "YNAB_BUDGET_ID")]
    pub(crate) budget_id: Option<String>,

    /// Base URL of the YNAB API.
    #[arg(long, env = "YNAB_API_URL", default_value = DEFAULT_BASE_URL)]
    pub(crate) api_url: String,

    /// Lifetime of cached read results, in seconds.
    #[arg(long, env = "YNAB_CACHE_TTL_SECS", default_value_t = DEFAULT_TTL.as_secs())]
    pub(crate) cache_ttl_secs: u64,
}

impl core::fmt::Debug for ServeArgs {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServeArgs")
            .field("token", &self.token.as_deref().map(redact))
            .field("budget_id", &self.budget_id)
            .field("api_url", &self.api_url)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .finish()
    }
}

/// Options of `gateway`.
#[derive(Debug, Clone, Args)]
pub(crate) struct GatewayArgs {
    /// Address to listen on.
    #[arg(long, env = "YNAB_MCP_LISTEN", default_value = "127.0.0.1:8080")]
    pub(crate) listen: SocketAddr,

    /// Close sessions idle for longer than this many seconds.
    #[arg(long, default_value_t = DEFAULT_IDLE_TIMEOUT.as_secs())]
    pub(crate) idle_timeout_secs: u64,

    /// Seconds between idle sweeps.
    #[arg(
        long,
        default_value_t = DEFAULT_SWEEP_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub(crate) sweep_interval_secs: u64,

    /// Seconds allowed for a session to start and finish its handshake.
    #[arg(long, default_value_t = DEFAULT_HANDSHAKE_TIMEOUT.as_secs())]
    pub(crate) handshake_timeout_secs: u64,

    /// MCP server executable; defaults to this binary.
    #[arg(long)]
    pub(crate) server_command: Option<PathBuf>,
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Command};

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["ynab-mcp", "--budget-id", "b1"]).expect("parse");
        let Command::Serve(args) = cli.into_command() else {
            unreachable!("expected serve mode");
        };
        assert_eq!(args.budget_id.as_deref(), Some("b1"));
    }

    #[test]
    fn gateway_flags() {
        let cli = Cli::try_parse_from([
            "ynab-mcp",
            "gateway",
            "--listen",
            "0.0.0.0:9000",
            "--idle-timeout-secs",
            "60",
            "--server-command",
            "/usr/local/bin/ynab-mcp",
        ])
        .expect("parse");
        let Command::Gateway(args) = cli.into_command() else {
            unreachable!("expected gateway mode");
        };
        assert_eq!(args.listen.port(), 9000);
        assert_eq!(args.idle_timeout_secs, 60);
        assert_eq!(args.sweep_interval_secs, 300);
        assert!(args.server_command.is_some());
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let parsed = Cli::try_parse_from(["ynab-mcp", "gateway", "--sweep-interval-secs", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let cli = Cli::try_parse_from(["ynab-mcp", "serve", "--token", "secret-token-1234"])
            .expect("parse");
        let rendered = format!("{:?}", cli.into_command());
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("1234"));
    }
}
