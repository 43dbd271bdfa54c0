//! HTTP gateway over the session pool.
//!
//! Each request carries a YNAB access token; the gateway routes it to the
//! pooled MCP session of that token, opening one on first use.

extern crate alloc;

use alloc::sync::Arc;
use core::net::SocketAddr;
use core::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use rmcp::model::{CallToolResult, JsonObject};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::pool::{ClientPool, Connector, PoolError, Session};
use crate::ynab::redact;

/// Header carrying the access token.
const TOKEN_HEADER: &str = "x-ynab-token";
/// Header carrying a default budget for the call.
const BUDGET_HEADER: &str = "x-ynab-budget-id";

/// Failure of a gateway request.
#[derive(Debug, thiserror::Error)]
pub(crate) enum GatewayError {
    /// No token in the request headers.
    #[error("missing YNAB access token; send it as x-ynab-token or Authorization: Bearer")]
    MissingCredential,
    /// The request body could not be parsed.
    #[error("invalid request body: {0}")]
    BadRequest(String),
    /// The pooled session failed.
    #[error(transparent)]
    Upstream(#[from] PoolError),
    /// The listener could not be bound or served.
    #[error("gateway I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// HTTP status of the error.
    const fn status(&self) -> StatusCode {
        match *self {
            Self::MissingCredential | Self::Upstream(PoolError::InvalidCredential) => {
                StatusCode::UNAUTHORIZED
            }
            Self::BadRequest(_) | Self::Upstream(PoolError::Rejected(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "gateway request failed");
        }
        let body = match &self {
            Self::Upstream(PoolError::Rejected(data)) => json!({
                "error": self.to_string(),
                "code": data.code.0,
                "data": data.data,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Body of `POST /api/tools/call`.
#[derive(Debug, Deserialize)]
struct ToolCallRequest {
    /// Tool name.
    name: String,
    /// Tool arguments.
    #[serde(default)]
    arguments: JsonObject,
}

/// Reads a non-empty header value.
fn header<'headers>(headers: &'headers HeaderMap, name: &str) -> Option<&'headers str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Extracts the caller's token from `x-ynab-token` or a bearer header.
fn credential(headers: &HeaderMap) -> Result<String, GatewayError> {
    header(headers, TOKEN_HEADER)
        .or_else(|| {
            header(headers, AUTHORIZATION.as_str())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::trim)
                .filter(|token| !token.is_empty())
        })
        .map(str::to_owned)
        .ok_or(GatewayError::MissingCredential)
}

/// Builds the gateway routes.
pub(crate) fn router<C: Connector>(pool: Arc<ClientPool<C>>) -> Router {
    Router::new()
        .route("/health", get(health::<C>))
        .route("/api/tools", get(list_tools::<C>))
        .route("/api/tools/call", post(call_tool::<C>))
        .with_state(pool)
}

/// `GET /health`.
async fn health<C: Connector>(State(pool): State<Arc<ClientPool<C>>>) -> Json<Value> {
    Json(json!({ "status": "ok", "pooled_sessions": pool.len() }))
}

/// `GET /api/tools`.
async fn list_tools<C: Connector>(
    State(pool): State<Arc<ClientPool<C>>>,
    headers: HeaderMap,
) -> Result<Json<Value>, GatewayError> {
    let token = credential(&headers)?;
    let session = pool.acquire(&token).await?;
    match session.list_tools().await {
        Ok(tools) => Ok(Json(json!({ "tools": tools }))),
        Err(err) => {
            if err.is_fatal() {
                pool.evict(&token).await;
            }
            Err(err.into())
        }
    }
}

/// `POST /api/tools/call`.
async fn call_tool<C: Connector>(
    State(pool): State<Arc<ClientPool<C>>>,
    headers: HeaderMap,
    body: Result<Json<ToolCallRequest>, JsonRejection>,
) -> Result<Json<CallToolResult>, GatewayError> {
    let token = credential(&headers)?;
    let Json(mut request) = body.map_err(|err| GatewayError::BadRequest(err.body_text()))?;
    let has_budget = request.arguments.contains_key("budgetId")
        || request.arguments.contains_key("budget_id");
    if let Some(budget_id) = header(&headers, BUDGET_HEADER).filter(|_| !has_budget) {
        let _previous = request
            .arguments
            .insert("budgetId".to_owned(), Value::String(budget_id.to_owned()));
    }

    let session = pool.acquire(&token).await?;
    tracing::info!(token = %redact(&token), tool = %request.name, "forwarding tool call");
    match session.call_tool(request.name, request.arguments).await {
        Ok(result) => Ok(Json(result)),
        Err(err) => {
            if err.is_fatal() {
                pool.evict(&token).await;
            }
            Err(err.into())
        }
    }
}

/// Serves the gateway on `listen` until Ctrl-C, then stops the reaper and
/// closes every pooled session.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub(crate) async fn serve<C: Connector>(
    listen: SocketAddr,
    pool: Arc<ClientPool<C>>,
    sweep_interval: Duration,
) -> Result<(), GatewayError> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let reaper = pool.spawn_reaper(sweep_interval, shutdown_rx);

    let listener = TcpListener::bind(listen).await?;
    tracing::info!(%listen, "gateway listening");
    let served = axum::serve(listener, router(Arc::clone(&pool)))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if shutdown_tx.send(()).is_err() {
        tracing::debug!("session reaper already stopped");
    }
    if let Err(err) = reaper.await {
        tracing::warn!(%err, "session reaper panicked");
    }
    pool.close_all().await;
    served.map_err(GatewayError::from)
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to install Ctrl-C handler");
        core::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect and indexing for readability"
)]
mod tests {
    extern crate alloc;

    use alloc::sync::Arc;
    use core::sync::atomic::Ordering;
    use core::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::router;
    use crate::pool::ClientPool;
    use crate::pool::fakes::{FakeConnector, FakeState};

    fn gateway() -> (Arc<FakeState>, Arc<ClientPool<FakeConnector>>) {
        let connector = FakeConnector::default();
        let state = Arc::clone(&connector.state);
        let pool = Arc::new(ClientPool::new(connector, Duration::from_secs(15 * 60)));
        (state, pool)
    }

    async fn send(
        pool: &Arc<ClientPool<FakeConnector>>,
        request: Request<Body>,
    ) -> (StatusCode, Value) {
        let response = router(Arc::clone(pool))
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = serde_json::from_slice(&bytes).expect("JSON body");
        (status, body)
    }

    fn call(headers: &[(&str, &str)], body: &str) -> Request<Body> {
        let mut builder = Request::post("/api/tools/call").header("content-type", "application/json");
        for &(name, value) in headers {
            builder = builder.header(name, value);
        }
        builder.body(Body::from(body.to_owned())).expect("request")
    }

    fn echoed(body: &Value) -> Value {
        let text = body["content"][0]["text"].as_str().expect("text content");
        serde_json::from_str(text).expect("echo is JSON")
    }

    #[tokio::test]
    async fn health_reports_pool_size() {
        let (_state, pool) = gateway();
        let _session = pool.acquire("token-abc").await.expect("acquire");

        let request = Request::get("/health").body(Body::empty()).expect("request");
        let (status, body) = send(&pool, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "pooled_sessions": 1}));
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let (state, pool) = gateway();

        let (status, body) = send(&pool, call(&[], r#"{"name": "list_budgets"}"#)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].as_str().is_some_and(|msg| msg.contains("x-ynab-token")));
        assert_eq!(FakeState::count(&state.connects), 0);
    }

    #[tokio::test]
    async fn invalid_body_is_bad_request() {
        let (_state, pool) = gateway();

        let (status, body) = send(&pool, call(&[("x-ynab-token", "token-abc")], "{not json")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn bearer_token_routes_call_and_injects_budget() {
        let (state, pool) = gateway();

        let request = call(
            &[("authorization", "Bearer token-abc"), ("x-ynab-budget-id", "b1")],
            r#"{"name": "list_accounts", "arguments": {}}"#,
        );
        let (status, body) = send(&pool, request).await;

        assert_eq!(status, StatusCode::OK);
        let echo = echoed(&body);
        assert_eq!(echo["credential"], "token-abc");
        assert_eq!(echo["name"], "list_accounts");
        assert_eq!(echo["arguments"], json!({"budgetId": "b1"}));
        assert_eq!(FakeState::count(&state.connects), 1);
    }

    #[tokio::test]
    async fn explicit_budget_wins_over_header() {
        let (_state, pool) = gateway();

        let request = call(
            &[("x-ynab-token", "token-abc"), ("x-ynab-budget-id", "b1")],
            r#"{"name": "list_accounts", "arguments": {"budgetId": "b2"}}"#,
        );
        let (_status, body) = send(&pool, request).await;

        assert_eq!(echoed(&body)["arguments"], json!({"budgetId": "b2"}));
    }

    #[tokio::test]
    async fn sessions_are_reused_across_requests() {
        let (state, pool) = gateway();

        for _ in 0_u8..3 {
            let request = call(&[("x-ynab-token", "token-abc")], r#"{"name": "list_budgets"}"#);
            let (status, _body) = send(&pool, request).await;
            assert_eq!(status, StatusCode::OK);
        }

        assert_eq!(FakeState::count(&state.connects), 1);
    }

    #[tokio::test]
    async fn list_tools_uses_callers_session() {
        let (_state, pool) = gateway();

        let request = Request::get("/api/tools")
            .header("x-ynab-token", "token-abc")
            .body(Body::empty())
            .expect("request");
        let (status, body) = send(&pool, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tools"][0]["name"], "list_budgets");
    }

    #[tokio::test]
    async fn failed_connect_is_bad_gateway() {
        let (state, pool) = gateway();
        state.fail_connect.store(true, Ordering::SeqCst);

        let request = call(&[("x-ynab-token", "token-abc")], r#"{"name": "list_budgets"}"#);
        let (status, body) = send(&pool, request).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().is_some_and(|msg| msg.contains("refused")));
        assert_eq!(pool.len(), 0);
    }

    #[tokio::test]
    async fn rejected_call_is_bad_request_and_keeps_session() {
        let (state, pool) = gateway();

        let request = call(&[("x-ynab-token", "token-abc")], r#"{"name": "missing_tool"}"#);
        let (status, body) = send(&pool, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!(-32602));
        assert!(body["error"].as_str().is_some_and(|msg| msg.contains("tool not found")));
        assert_eq!(pool.len(), 1);
        assert_eq!(FakeState::count(&state.closes), 0);

        let retry = call(&[("x-ynab-token", "token-abc")], r#"{"name": "list_budgets"}"#);
        let (status, _body) = send(&pool, retry).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(FakeState::count(&state.connects), 1);
    }

    #[tokio::test]
    async fn transport_failure_evicts_session() {
        let (state, pool) = gateway();
        let _warm = pool.acquire("token-abc").await.expect("acquire");
        state.fail_calls.store(true, Ordering::SeqCst);

        let request = call(&[("x-ynab-token", "token-abc")], r#"{"name": "list_budgets"}"#);
        let (status, _body) = send(&pool, request).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(pool.len(), 0);
        assert_eq!(FakeState::count(&state.closes), 1);
    }
}
