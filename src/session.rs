//! Child-process MCP sessions.
//!
//! The production [`Connector`] for the gateway pool: it launches this
//! binary in `serve` mode with the credential in `YNAB_API_TOKEN` and talks
//! MCP over the child's stdio through the `rmcp` client.

use core::time::Duration;
use std::path::PathBuf;

use rmcp::ServiceExt;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use rmcp::service::{Peer, RoleClient, RunningService, ServiceError};
use rmcp::transport::TokioChildProcess;
use serde_json::json;
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::pool::{Connector, PoolError, Session};
use crate::ynab::redact;

/// Time allowed for spawn plus the initialize handshake.
pub(crate) const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable carrying the credential into the child.
const TOKEN_ENV: &str = "YNAB_API_TOKEN";

/// Classifies a failed request: JSON-RPC errors leave the session usable,
/// everything else means the transport is gone.
fn request_error(err: ServiceError) -> PoolError {
    match err {
        ServiceError::McpError(data) => PoolError::Rejected(data),
        other => PoolError::Call(other.to_string()),
    }
}

/// Spawns one MCP server process per credential.
#[derive(Debug, Clone)]
pub(crate) struct ChildProcessConnector {
    /// Server executable.
    program: PathBuf,
    /// Arguments passed to the executable.
    args: Vec<String>,
    /// Bound on spawn plus handshake.
    handshake_timeout: Duration,
}

impl ChildProcessConnector {
    /// Creates a connector launching `program` with `args`.
    pub(crate) const fn new(
        program: PathBuf,
        args: Vec<String>,
        handshake_timeout: Duration,
    ) -> Self {
        Self {
            program,
            args,
            handshake_timeout,
        }
    }
}

impl Connector for ChildProcessConnector {
    type Session = ChildProcessSession;

    async fn connect(&self, credential: &str) -> Result<ChildProcessSession, PoolError> {
        let mut command = Command::new(&self.program);
        let _configured = command
            .args(&self.args)
            .env(TOKEN_ENV, credential)
            .kill_on_drop(true);
        let transport = TokioChildProcess::new(command).map_err(|err| {
            PoolError::Spawn(format!("{}: {err}", self.program.display()))
        })?;

        let service = tokio::time::timeout(self.handshake_timeout, ().serve(transport))
            .await
            .map_err(|_elapsed| PoolError::Timeout(self.handshake_timeout))?
            .map_err(|err| PoolError::Handshake(err.to_string()))?;
        tracing::info!(
            token = %redact(credential),
            program = %self.program.display(),
            "MCP session ready"
        );
        Ok(ChildProcessSession {
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
        })
    }
}

/// MCP client session over a child process's stdio.
pub(crate) struct ChildProcessSession {
    /// Request handle; concurrent requests are multiplexed by JSON-RPC id.
    peer: Peer<RoleClient>,
    /// Running client, taken on close.
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
}

impl core::fmt::Debug for ChildProcessSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChildProcessSession").finish_non_exhaustive()
    }
}

impl Session for ChildProcessSession {
    async fn list_tools(&self) -> Result<Vec<Tool>, PoolError> {
        self.peer.list_all_tools().await.map_err(request_error)
    }

    async fn call_tool(
        &self,
        name: String,
        arguments: JsonObject,
    ) -> Result<CallToolResult, PoolError> {
        let request = serde_json::from_value(json!({
            "name": name,
            "arguments": arguments,
        }))
        .map_err(|err| PoolError::Call(format!("invalid tool call: {err}")))?;
        self.peer.call_tool(request).await.map_err(request_error)
    }

    async fn close(&self) -> Result<(), PoolError> {
        let running = self.service.lock().await.take();
        if let Some(service) = running {
            let reason = service
                .cancel()
                .await
                .map_err(|err| PoolError::Close(err.to_string()))?;
            tracing::debug!(?reason, "MCP session closed");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::missing_docs_in_private_items, reason = "test code")]
mod tests {
    use core::time::Duration;
    use std::path::PathBuf;

    use rmcp::ErrorData;
    use rmcp::service::ServiceError;

    use super::{ChildProcessConnector, request_error};
    use crate::pool::{Connector, PoolError};

    #[test]
    fn json_rpc_errors_are_rejections() {
        let rejected = request_error(ServiceError::McpError(ErrorData::invalid_params(
            "missing field `transactionId`",
            None,
        )));
        assert!(matches!(rejected, PoolError::Rejected(_)));
        assert!(!rejected.is_fatal());

        let closed = request_error(ServiceError::TransportClosed);
        assert!(matches!(closed, PoolError::Call(_)));
        assert!(closed.is_fatal());
    }

    #[tokio::test]
    async fn missing_executable_is_a_spawn_error() {
        let connector = ChildProcessConnector::new(
            PathBuf::from("/nonexistent/ynab-mcp"),
            vec!["serve".to_owned()],
            Duration::from_secs(5),
        );

        let outcome = connector.connect("token-abc").await;

        assert!(matches!(outcome, Err(PoolError::Spawn(_))));
    }

    #[tokio::test]
    async fn silent_child_times_out() {
        let connector = ChildProcessConnector::new(
            PathBuf::from("sleep"),
            vec!["5".to_owned()],
            Duration::from_millis(200),
        );

        let outcome = connector.connect("token-abc").await;

        assert!(matches!(outcome, Err(PoolError::Timeout(_))));
    }
}
