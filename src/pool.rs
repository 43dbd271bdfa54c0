//! Per-credential pool of MCP client sessions.
//!
//! Each credential maps to at most one live session. Sessions are created
//! lazily on first use, shared by concurrent callers, and closed by a
//! background sweep once idle longer than the configured threshold.

extern crate alloc;

use alloc::sync::Arc;
use core::future::Future;
use core::time::Duration;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rmcp::ErrorData;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use tokio::sync::{OnceCell, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::ynab::redact;

/// Idle time after which a session is closed.
pub(crate) const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);
/// Interval between idle sweeps.
pub(crate) const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Errors surfaced by the pool and its sessions.
#[derive(Debug, Clone, thiserror::Error)]
pub(crate) enum PoolError {
    /// The credential was empty.
    #[error("a non-empty YNAB access token is required")]
    InvalidCredential,
    /// The session process could not be started.
    #[error("failed to start MCP session: {0}")]
    Spawn(String),
    /// The session did not complete its handshake.
    #[error("MCP session handshake failed: {0}")]
    Handshake(String),
    /// The handshake did not finish in time.
    #[error("MCP session handshake timed out after {0:?}")]
    Timeout(Duration),
    /// A request on a live session failed in transport.
    #[error("MCP request failed: {0}")]
    Call(String),
    /// The session answered a request with a JSON-RPC error.
    #[error("MCP server rejected the request: {}", .0.message)]
    Rejected(ErrorData),
    /// Shutting a session down failed.
    #[error("failed to close MCP session: {0}")]
    Close(String),
}

impl PoolError {
    /// Whether the session that produced the error can no longer be used.
    pub(crate) const fn is_fatal(&self) -> bool {
        !matches!(*self, Self::Rejected(_))
    }
}

/// A live MCP client session.
pub(crate) trait Session: Send + Sync + 'static {
    /// Lists the tools the session exposes.
    fn list_tools(&self) -> impl Future<Output = Result<Vec<Tool>, PoolError>> + Send;

    /// Invokes a tool.
    fn call_tool(
        &self,
        name: String,
        arguments: JsonObject,
    ) -> impl Future<Output = Result<CallToolResult, PoolError>> + Send;

    /// Shuts the session down.
    fn close(&self) -> impl Future<Output = Result<(), PoolError>> + Send;
}

/// Opens sessions for credentials.
pub(crate) trait Connector: Send + Sync + 'static {
    /// Session type produced by this connector.
    type Session: Session;

    /// Opens a session authenticated with `credential`, including the
    /// initialize handshake.
    fn connect(
        &self,
        credential: &str,
    ) -> impl Future<Output = Result<Self::Session, PoolError>> + Send;
}

/// Pool entry for one credential.
#[derive(Debug)]
struct Slot<S> {
    /// Outcome of the one connect attempt made for this entry.
    session: OnceCell<Result<Arc<S>, PoolError>>,
    /// Last time a caller acquired this entry.
    last_used: Mutex<Instant>,
}

impl<S> Slot<S> {
    /// Creates an empty slot used now.
    fn new() -> Self {
        Self {
            session: OnceCell::new(),
            last_used: Mutex::new(Instant::now()),
        }
    }

    /// Records a use.
    fn touch(&self) {
        *self.last_used.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Last use.
    fn last_used(&self) -> Instant {
        *self.last_used.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Session, if the connect succeeded.
    fn live(&self) -> Option<&Arc<S>> {
        self.session.get().and_then(|outcome| outcome.as_ref().ok())
    }
}

/// Credential-keyed session pool.
pub(crate) struct ClientPool<C: Connector> {
    /// Opens new sessions.
    connector: C,
    /// Idle threshold of the sweep.
    idle_timeout: Duration,
    /// Entries by credential.
    slots: Mutex<HashMap<String, Arc<Slot<C::Session>>>>,
}

impl<C: Connector> core::fmt::Debug for ClientPool<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClientPool")
            .field("idle_timeout", &self.idle_timeout)
            .field("sessions", &self.len())
            .finish_non_exhaustive()
    }
}

impl<C: Connector> ClientPool<C> {
    /// Creates an empty pool.
    pub(crate) fn new(connector: C, idle_timeout: Duration) -> Self {
        Self {
            connector,
            idle_timeout,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Locks the slot map, recovering from a poisoned lock.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Slot<C::Session>>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the session for `credential`, opening one if needed.
    ///
    /// Concurrent first calls for one credential share a single connect and
    /// all observe its outcome. A failed connect leaves no entry behind, so
    /// the next call tries again.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidCredential`] for an empty credential and
    /// the connector's error when the session cannot be opened.
    pub(crate) async fn acquire(&self, credential: &str) -> Result<Arc<C::Session>, PoolError> {
        if credential.trim().is_empty() {
            return Err(PoolError::InvalidCredential);
        }
        let slot = Arc::clone(
            self.lock()
                .entry(credential.to_owned())
                .or_insert_with(|| Arc::new(Slot::new())),
        );
        slot.touch();

        let opened = slot
            .session
            .get_or_init(|| async {
                tracing::info!(token = %redact(credential), "opening MCP session");
                let outcome = self.connector.connect(credential).await.map(Arc::new);
                if let Err(err) = &outcome {
                    tracing::warn!(token = %redact(credential), %err, "failed to open MCP session");
                }
                outcome
            })
            .await;
        if opened.is_err() {
            let mut slots = self.lock();
            if slots
                .get(credential)
                .is_some_and(|current| Arc::ptr_eq(current, &slot))
            {
                let _failed = slots.remove(credential);
            }
        }
        opened.clone()
    }

    /// Removes and closes the session of `credential`, so the next
    /// [`ClientPool::acquire`] opens a fresh one.
    pub(crate) async fn evict(&self, credential: &str) {
        let removed = self.lock().remove(credential);
        if let Some(slot) = removed {
            tracing::info!(token = %redact(credential), "evicting MCP session");
            close_slot(credential, &slot).await;
        }
    }

    /// Closes every session idle longer than the threshold. Returns the
    /// number of entries removed.
    pub(crate) async fn sweep(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<(String, Arc<Slot<C::Session>>)> = {
            let mut slots = self.lock();
            let keys: Vec<String> = slots
                .iter()
                .filter(|&(_, slot)| {
                    now.saturating_duration_since(slot.last_used()) > self.idle_timeout
                })
                .map(|(key, _)| key.clone())
                .collect();
            keys.into_iter()
                .filter_map(|key| slots.remove_entry(&key))
                .collect()
        };
        for (credential, slot) in &expired {
            tracing::info!(token = %redact(credential), "closing idle MCP session");
            close_slot(credential, slot).await;
        }
        expired.len()
    }

    /// Closes every session.
    pub(crate) async fn close_all(&self) {
        let drained: Vec<(String, Arc<Slot<C::Session>>)> = self.lock().drain().collect();
        for (credential, slot) in &drained {
            close_slot(credential, slot).await;
        }
        tracing::info!(closed = drained.len(), "closed all MCP sessions");
    }

    /// Number of pooled entries.
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Last use of the entry for `credential`.
    #[cfg(test)]
    fn last_used(&self, credential: &str) -> Option<Instant> {
        self.lock().get(credential).map(|slot| slot.last_used())
    }

    /// Spawns the periodic idle sweep. The task stops when `shutdown`
    /// fires or its sender is dropped.
    pub(crate) fn spawn_reaper(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            let _started = ticker.tick().await;
            tracing::info!(interval_secs = interval.as_secs(), "session reaper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let closed = pool.sweep().await;
                        if closed > 0 {
                            tracing::info!(closed, remaining = pool.len(), "swept idle MCP sessions");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("received shutdown signal, stopping session reaper");
                        break;
                    }
                }
            }
        })
    }
}

/// Closes the session of a removed slot, logging failures.
async fn close_slot<S: Session>(credential: &str, slot: &Slot<S>) {
    if let Some(session) = slot.live() {
        if let Err(err) = session.close().await {
            tracing::warn!(token = %redact(credential), %err, "failed to close MCP session");
        }
    }
}

/// In-memory connector and session for tests.
#[cfg(test)]
pub(crate) mod fakes {
    extern crate alloc;

    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use core::time::Duration;

    use rmcp::ErrorData;
    use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
    use serde_json::{Value, json};

    use super::{Connector, PoolError, Session};

    /// Counters and failure switches shared by a connector and its sessions.
    #[derive(Debug, Default)]
    pub(crate) struct FakeState {
        /// Number of connect attempts.
        pub(crate) connects: AtomicUsize,
        /// Number of session closes.
        pub(crate) closes: AtomicUsize,
        /// Makes connects fail.
        pub(crate) fail_connect: AtomicBool,
        /// Number of upcoming connects that fail.
        pub(crate) failing_connects: AtomicUsize,
        /// Makes tool calls fail.
        pub(crate) fail_calls: AtomicBool,
    }

    impl FakeState {
        /// Reads a counter.
        pub(crate) fn count(counter: &AtomicUsize) -> usize {
            counter.load(Ordering::SeqCst)
        }
    }

    /// Session that echoes tool calls.
    #[derive(Debug)]
    pub(crate) struct FakeSession {
        /// Shared counters.
        state: Arc<FakeState>,
        /// Credential the session was opened with.
        credential: String,
    }

    impl Session for FakeSession {
        async fn list_tools(&self) -> Result<Vec<Tool>, PoolError> {
            let schema = Arc::new(JsonObject::new());
            Ok(vec![Tool::new("list_budgets", "List budgets", schema)])
        }

        async fn call_tool(
            &self,
            name: String,
            arguments: JsonObject,
        ) -> Result<CallToolResult, PoolError> {
            if self.state.fail_calls.load(Ordering::SeqCst) {
                return Err(PoolError::Call("transport closed".to_owned()));
            }
            if name == "missing_tool" {
                return Err(PoolError::Rejected(ErrorData::invalid_params(
                    "tool not found",
                    None,
                )));
            }
            let echo = json!({
                "credential": self.credential,
                "name": name,
                "arguments": Value::Object(arguments),
            });
            Ok(CallToolResult::success(vec![Content::text(echo.to_string())]))
        }

        async fn close(&self) -> Result<(), PoolError> {
            let _previous = self.state.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Connector producing [`FakeSession`]s after a short simulated handshake.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct FakeConnector {
        /// Shared counters.
        pub(crate) state: Arc<FakeState>,
    }

    impl Connector for FakeConnector {
        type Session = FakeSession;

        async fn connect(&self, credential: &str) -> Result<FakeSession, PoolError> {
            let _previous = self.state.connects.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            let scheduled_failure = self
                .state
                .failing_connects
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if scheduled_failure || self.state.fail_connect.load(Ordering::SeqCst) {
                return Err(PoolError::Handshake("refused".to_owned()));
            }
            Ok(FakeSession {
                state: Arc::clone(&self.state),
                credential: credential.to_owned(),
            })
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    extern crate alloc;

    use alloc::sync::Arc;
    use core::sync::atomic::Ordering;
    use core::time::Duration;

    use tokio::sync::broadcast;

    use super::fakes::{FakeConnector, FakeState};
    use super::{ClientPool, PoolError};

    const IDLE: Duration = Duration::from_secs(15 * 60);

    fn pool() -> (Arc<FakeState>, Arc<ClientPool<FakeConnector>>) {
        let connector = FakeConnector::default();
        let state = Arc::clone(&connector.state);
        (state, Arc::new(ClientPool::new(connector, IDLE)))
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_reuses_session_and_refreshes_last_used() {
        let (state, pool) = pool();

        let first = pool.acquire("token-abc").await.expect("first acquire");
        let first_used = pool.last_used("token-abc").expect("entry exists");
        tokio::time::advance(Duration::from_secs(60)).await;
        let second = pool.acquire("token-abc").await.expect("second acquire");
        let second_used = pool.last_used("token-abc").expect("entry exists");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(FakeState::count(&state.connects), 1);
        assert!(second_used > first_used);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_first_use_shares_one_connect() {
        let (state, pool) = pool();

        let (left, right) = tokio::join!(pool.acquire("token-abc"), pool.acquire("token-abc"));

        let left_session = left.expect("left acquire");
        let right_session = right.expect("right acquire");
        assert!(Arc::ptr_eq(&left_session, &right_session));
        assert_eq!(FakeState::count(&state.connects), 1);
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn credentials_get_separate_sessions() {
        let (state, pool) = pool();

        let alice = pool.acquire("token-alice").await.expect("alice");
        let bob = pool.acquire("token-bob").await.expect("bob");

        assert!(!Arc::ptr_eq(&alice, &bob));
        assert_eq!(FakeState::count(&state.connects), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_credential_is_rejected() {
        let (state, pool) = pool();

        let err = pool.acquire("  ").await.expect_err("empty credential");

        assert!(matches!(err, PoolError::InvalidCredential));
        assert_eq!(FakeState::count(&state.connects), 0);
        assert_eq!(pool.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connect_leaves_no_entry() {
        let (state, pool) = pool();
        state.fail_connect.store(true, Ordering::SeqCst);

        let err = pool.acquire("token-abc").await.expect_err("connect fails");
        assert!(matches!(err, PoolError::Handshake(_)));
        assert_eq!(pool.len(), 0);

        state.fail_connect.store(false, Ordering::SeqCst);
        let _session = pool.acquire("token-abc").await.expect("retry succeeds");
        assert_eq!(FakeState::count(&state.connects), 2);
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_share_the_outcome_of_a_failed_connect() {
        let (state, pool) = pool();
        state.failing_connects.store(1, Ordering::SeqCst);

        let (first, second) = tokio::join!(pool.acquire("token-abc"), pool.acquire("token-abc"));

        assert!(matches!(first, Err(PoolError::Handshake(_))));
        assert!(matches!(second, Err(PoolError::Handshake(_))));
        assert_eq!(FakeState::count(&state.connects), 1);
        assert_eq!(pool.len(), 0);

        let _session = pool.acquire("token-abc").await.expect("retry succeeds");
        assert_eq!(FakeState::count(&state.connects), 2);
        assert_eq!(pool.len(), 1);

        pool.close_all().await;
        assert_eq!(FakeState::count(&state.closes), 1);
    }

    #[test]
    fn only_rejections_keep_the_session() {
        let rejected = PoolError::Rejected(rmcp::ErrorData::invalid_params("bad", None));
        assert!(!rejected.is_fatal());
        assert!(PoolError::Call("closed".to_owned()).is_fatal());
        assert!(PoolError::Timeout(Duration::from_secs(1)).is_fatal());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_closes_only_idle_sessions_once() {
        let (state, pool) = pool();
        let _idle = pool.acquire("token-idle").await.expect("idle");
        tokio::time::advance(Duration::from_secs(10 * 60)).await;
        let _busy = pool.acquire("token-busy").await.expect("busy");
        tokio::time::advance(Duration::from_secs(6 * 60)).await;

        assert_eq!(pool.sweep().await, 1);
        assert_eq!(pool.len(), 1);
        assert!(pool.last_used("token-idle").is_none());
        assert_eq!(FakeState::count(&state.closes), 1);

        assert_eq!(pool.sweep().await, 0);
        assert_eq!(FakeState::count(&state.closes), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn evict_forces_a_fresh_session() {
        let (state, pool) = pool();
        let first = pool.acquire("token-abc").await.expect("first");

        pool.evict("token-abc").await;
        let second = pool.acquire("token-abc").await.expect("second");

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(FakeState::count(&state.connects), 2);
        assert_eq!(FakeState::count(&state.closes), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn close_all_empties_the_pool() {
        let (state, pool) = pool();
        let _alice = pool.acquire("token-alice").await.expect("alice");
        let _bob = pool.acquire("token-bob").await.expect("bob");

        pool.close_all().await;

        assert_eq!(pool.len(), 0);
        assert_eq!(FakeState::count(&state.closes), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reaper_sweeps_until_shutdown() {
        let (state, pool) = pool();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let reaper = pool.spawn_reaper(Duration::from_secs(5 * 60), shutdown_rx);
        let _session = pool.acquire("token-abc").await.expect("acquire");

        tokio::time::sleep(Duration::from_secs(21 * 60)).await;
        assert_eq!(pool.len(), 0);
        assert_eq!(FakeState::count(&state.closes), 1);

        let _receivers = shutdown_tx.send(()).expect("reaper is listening");
        reaper.await.expect("reaper stops cleanly");
    }
}
