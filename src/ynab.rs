//! Async client for the YNAB v1 REST API.
//!
//! Wraps `reqwest` with bearer auth, `{"data": ...}` envelope decoding and a
//! closed error enum. Only the endpoints used by the MCP tools are modelled.

pub(crate) mod models;

use core::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use models::{
    Account, AccountsData, BudgetData, BudgetSummary, BudgetsData, Category, CategoryData,
    Envelope, ErrorEnvelope, MonthData, MonthDetail, Payee, PayeeData, PayeesData,
    SaveScheduledTransaction, SaveTransaction, SaveTransactionsData, ScheduledTransaction,
    ScheduledTransactionData, ScheduledTransactionsData, Transaction, TransactionData,
    TransactionsData, User, UserData,
};

/// Production API root.
pub(crate) const DEFAULT_BASE_URL: &str = "https://api.ynab.com/v1";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors returned by [`YnabClient`].
#[derive(Debug, thiserror::Error)]
pub(crate) enum YnabError {
    /// The access token was rejected (HTTP 401).
    #[error("YNAB rejected the access token ({detail}); refresh the token and try again")]
    Unauthorized {
        /// Detail reported by the API.
        detail: String,
    },
    /// The requested resource does not exist (HTTP 404).
    #[error("not found: {detail}")]
    NotFound {
        /// Detail reported by the API.
        detail: String,
    },
    /// Any other non-success response.
    #[error("YNAB API error {status} ({name}): {detail}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error name reported by the API.
        name: String,
        /// Detail reported by the API.
        detail: String,
    },
    /// Connection, TLS or timeout failure.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Response body did not match the expected shape.
    #[error("failed to decode YNAB response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The configured API root is not a usable base URL.
    #[error("invalid YNAB API URL '{0}'")]
    InvalidBaseUrl(String),
    /// An ID cannot name a single path segment.
    #[error("invalid identifier '{0}'")]
    InvalidId(String),
}

/// Builds a [`YnabError`] from a non-success response body.
fn error_from_response(status: StatusCode, body: &[u8]) -> YnabError {
    let (name, detail) = serde_json::from_slice::<ErrorEnvelope>(body).map_or_else(
        |_| {
            (
                status.canonical_reason().unwrap_or("unknown").to_owned(),
                String::from_utf8_lossy(body).into_owned(),
            )
        },
        |envelope| {
            tracing::debug!(id = %envelope.error.id, "YNAB error envelope");
            (envelope.error.name, envelope.error.detail)
        },
    );
    match status {
        StatusCode::UNAUTHORIZED => YnabError::Unauthorized { detail },
        StatusCode::NOT_FOUND => YnabError::NotFound { detail },
        _ => YnabError::Api {
            status: status.as_u16(),
            name,
            detail,
        },
    }
}

/// Returns the last four characters of a credential for log output.
pub(crate) fn redact(token: &str) -> String {
    let tail: String = token
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("...{tail}")
}

/// YNAB API client bound to one access token.
pub(crate) struct YnabClient {
    /// Shared HTTP client.
    http: reqwest::Client,
    /// API root.
    base_url: Url,
    /// Personal access token or OAuth access token.
    token: String,
}

impl core::fmt::Debug for YnabClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("YnabClient")
            .field("base_url", &self.base_url)
            .field("token", &redact(&self.token))
            .finish_non_exhaustive()
    }
}

impl YnabClient {
    /// Creates a client for `base_url` authenticating with `token`.
    pub(crate) fn new(token: String, base_url: &str) -> Result<Self, YnabError> {
        let root = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| YnabError::InvalidBaseUrl(base_url.to_owned()))?;
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: root,
            token,
        })
    }

    /// Starts a request for the path made of `segments` under the API root.
    ///
    /// Segments are percent-encoded one by one, so an ID containing `/`, `?`
    /// or `#` stays inside its own segment. Empty and dot segments are
    /// rejected.
    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, YnabError> {
        if let Some(bad) = segments
            .iter()
            .find(|segment| matches!(**segment, "" | "." | ".."))
        {
            return Err(YnabError::InvalidId((*bad).to_owned()));
        }
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| YnabError::InvalidBaseUrl(self.base_url.to_string()))?;
            let _path = path.pop_if_empty().extend(segments);
        }
        Ok(self.http.request(method, url).bearer_auth(&self.token))
    }

    /// Sends a request and unwraps the `data` envelope.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, YnabError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let err = error_from_response(status, &body);
            tracing::warn!(status = status.as_u16(), %err, "YNAB request failed");
            return Err(err);
        }
        let envelope: Envelope<T> = serde_json::from_slice(&body)?;
        Ok(envelope.data)
    }

    /// `GET` helper.
    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, YnabError> {
        self.send(self.request(Method::GET, segments)?).await
    }

    /// Request-with-JSON-body helper.
    async fn send_json<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<T, YnabError> {
        self.send(self.request(method, segments)?.json(body)).await
    }

    /// Transaction list helper with optional `since_date` and `type` filters.
    async fn list_transactions_at(
        &self,
        segments: &[&str],
        since_date: Option<&str>,
        kind: Option<&str>,
    ) -> Result<Vec<Transaction>, YnabError> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(since) = since_date {
            query.push(("since_date", since));
        }
        if let Some(kind_filter) = kind {
            query.push(("type", kind_filter));
        }
        let data: TransactionsData = self
            .send(self.request(Method::GET, segments)?.query(&query))
            .await?;
        Ok(data.transactions)
    }

    // ── Read endpoints ──────────────────────────────────────────────

    /// Returns the authenticated user.
    pub(crate) async fn user(&self) -> Result<User, YnabError> {
        let data: UserData = self.get(&["user"]).await?;
        Ok(data.user)
    }

    /// Lists budgets visible to the token.
    pub(crate) async fn budgets(&self) -> Result<Vec<BudgetSummary>, YnabError> {
        let data: BudgetsData = self.get(&["budgets"]).await?;
        Ok(data.budgets)
    }

    /// Fetches one budget.
    pub(crate) async fn budget(&self, budget_id: &str) -> Result<BudgetSummary, YnabError> {
        let data: BudgetData = self.get(&["budgets", budget_id]).await?;
        Ok(data.budget)
    }

    /// Lists accounts of a budget, including closed and deleted ones.
    pub(crate) async fn accounts(&self, budget_id: &str) -> Result<Vec<Account>, YnabError> {
        let data: AccountsData = self.get(&["budgets", budget_id, "accounts"]).await?;
        Ok(data.accounts)
    }

    /// Fetches a budget month (`current` or `YYYY-MM-DD`).
    pub(crate) async fn month(
        &self,
        budget_id: &str,
        month: &str,
    ) -> Result<MonthDetail, YnabError> {
        let data: MonthData = self
            .get(&["budgets", budget_id, "months", month])
            .await?;
        Ok(data.month)
    }

    /// Fetches one category as seen in `month`.
    pub(crate) async fn month_category(
        &self,
        budget_id: &str,
        month: &str,
        category_id: &str,
    ) -> Result<Category, YnabError> {
        let data: CategoryData = self
            .get(&["budgets", budget_id, "months", month, "categories", category_id])
            .await?;
        Ok(data.category)
    }

    /// Lists budget transactions, optionally since a date or of a type
    /// (`unapproved`, `uncategorized`).
    pub(crate) async fn transactions(
        &self,
        budget_id: &str,
        since_date: Option<&str>,
        kind: Option<&str>,
    ) -> Result<Vec<Transaction>, YnabError> {
        self.list_transactions_at(&["budgets", budget_id, "transactions"], since_date, kind)
            .await
    }

    /// Lists transactions of one account.
    pub(crate) async fn account_transactions(
        &self,
        budget_id: &str,
        account_id: &str,
        since_date: Option<&str>,
    ) -> Result<Vec<Transaction>, YnabError> {
        self.list_transactions_at(
            &["budgets", budget_id, "accounts", account_id, "transactions"],
            since_date,
            None,
        )
        .await
    }

    /// Lists transactions of one category.
    pub(crate) async fn category_transactions(
        &self,
        budget_id: &str,
        category_id: &str,
        since_date: Option<&str>,
    ) -> Result<Vec<Transaction>, YnabError> {
        self.list_transactions_at(
            &["budgets", budget_id, "categories", category_id, "transactions"],
            since_date,
            None,
        )
        .await
    }

    /// Lists scheduled transactions.
    pub(crate) async fn scheduled_transactions(
        &self,
        budget_id: &str,
    ) -> Result<Vec<ScheduledTransaction>, YnabError> {
        let data: ScheduledTransactionsData = self
            .get(&["budgets", budget_id, "scheduled_transactions"])
            .await?;
        Ok(data.scheduled_transactions)
    }

    /// Lists payees.
    pub(crate) async fn payees(&self, budget_id: &str) -> Result<Vec<Payee>, YnabError> {
        let data: PayeesData = self.get(&["budgets", budget_id, "payees"]).await?;
        Ok(data.payees)
    }

    /// Fetches one payee.
    pub(crate) async fn payee(&self, budget_id: &str, payee_id: &str) -> Result<Payee, YnabError> {
        let data: PayeeData = self
            .get(&["budgets", budget_id, "payees", payee_id])
            .await?;
        Ok(data.payee)
    }

    // ── Write endpoints ─────────────────────────────────────────────

    /// Creates one transaction.
    pub(crate) async fn create_transaction(
        &self,
        budget_id: &str,
        transaction: &SaveTransaction,
    ) -> Result<SaveTransactionsData, YnabError> {
        self.send_json(
            Method::POST,
            &["budgets", budget_id, "transactions"],
            &json!({ "transaction": transaction }),
        )
        .await
    }

    /// Creates several transactions in one request.
    pub(crate) async fn create_transactions(
        &self,
        budget_id: &str,
        transactions: &[SaveTransaction],
    ) -> Result<SaveTransactionsData, YnabError> {
        self.send_json(
            Method::POST,
            &["budgets", budget_id, "transactions"],
            &json!({ "transactions": transactions }),
        )
        .await
    }

    /// Replaces the given fields of one transaction.
    pub(crate) async fn update_transaction(
        &self,
        budget_id: &str,
        transaction_id: &str,
        transaction: &SaveTransaction,
    ) -> Result<Transaction, YnabError> {
        let data: TransactionData = self
            .send_json(
                Method::PUT,
                &["budgets", budget_id, "transactions", transaction_id],
                &json!({ "transaction": transaction }),
            )
            .await?;
        Ok(data.transaction)
    }

    /// Updates several transactions, each identified by `id` or `import_id`.
    pub(crate) async fn update_transactions(
        &self,
        budget_id: &str,
        transactions: &[SaveTransaction],
    ) -> Result<SaveTransactionsData, YnabError> {
        self.send_json(
            Method::PATCH,
            &["budgets", budget_id, "transactions"],
            &json!({ "transactions": transactions }),
        )
        .await
    }

    /// Deletes one transaction and returns it.
    pub(crate) async fn delete_transaction(
        &self,
        budget_id: &str,
        transaction_id: &str,
    ) -> Result<Transaction, YnabError> {
        let data: TransactionData = self
            .send(self.request(
                Method::DELETE,
                &["budgets", budget_id, "transactions", transaction_id],
            )?)
            .await?;
        Ok(data.transaction)
    }

    /// Creates a scheduled transaction.
    pub(crate) async fn create_scheduled_transaction(
        &self,
        budget_id: &str,
        scheduled: &SaveScheduledTransaction,
    ) -> Result<ScheduledTransaction, YnabError> {
        let data: ScheduledTransactionData = self
            .send_json(
                Method::POST,
                &["budgets", budget_id, "scheduled_transactions"],
                &json!({ "scheduled_transaction": scheduled }),
            )
            .await?;
        Ok(data.scheduled_transaction)
    }

    /// Deletes a scheduled transaction and returns it.
    pub(crate) async fn delete_scheduled_transaction(
        &self,
        budget_id: &str,
        scheduled_id: &str,
    ) -> Result<ScheduledTransaction, YnabError> {
        let data: ScheduledTransactionData = self
            .send(self.request(
                Method::DELETE,
                &["budgets", budget_id, "scheduled_transactions", scheduled_id],
            )?)
            .await?;
        Ok(data.scheduled_transaction)
    }

    /// Sets the assigned amount of a category for `month`.
    pub(crate) async fn update_month_category(
        &self,
        budget_id: &str,
        month: &str,
        category_id: &str,
        budgeted: i64,
    ) -> Result<Category, YnabError> {
        let data: CategoryData = self
            .send_json(
                Method::PATCH,
                &["budgets", budget_id, "months", month, "categories", category_id],
                &json!({ "category": { "budgeted": budgeted } }),
            )
            .await?;
        Ok(data.category)
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{YnabClient, YnabError, redact};

    fn client_for(server: &MockServer) -> YnabClient {
        YnabClient::new("test-token-1234".to_owned(), &server.uri()).expect("client should build")
    }

    #[test]
    fn redact_keeps_last_four() {
        assert_eq!(redact("abcdefgh"), "...efgh");
        assert_eq!(redact("ab"), "...ab");
    }

    #[test]
    fn debug_hides_token() {
        let client =
            YnabClient::new("secret-token-9876".to_owned(), "http://localhost/").expect("build");
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("9876"));
    }

    #[tokio::test]
    async fn budgets_unwraps_envelope_and_sends_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets"))
            .and(header("authorization", "Bearer test-token-1234"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"budgets": [{"id": "b1", "name": "Main", "last_modified_on": null}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let budgets = client_for(&server).budgets().await.expect("budgets");
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets.first().map(|b| b.name.as_str()), Some("Main"));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_dedicated_variant() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"id": "401", "name": "unauthorized", "detail": "Unauthorized"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).user().await.expect_err("should fail");
        assert!(matches!(err, YnabError::Unauthorized { .. }));
        assert!(err.to_string().contains("refresh the token"));
    }

    #[tokio::test]
    async fn not_found_and_other_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/payees/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"id": "404.2", "name": "resource_not_found", "detail": "Resource not found"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/payees"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let missing = client.payee("b1", "missing").await.expect_err("404");
        assert!(matches!(missing, YnabError::NotFound { .. }));

        let limited = client.payees("b1").await.expect_err("429");
        assert!(matches!(limited, YnabError::Api { status: 429, .. }));
        assert!(limited.to_string().contains("slow down"));
    }

    #[tokio::test]
    async fn transactions_pass_query_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/transactions"))
            .and(query_param("since_date", "2025-01-01"))
            .and(query_param("type", "unapproved"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"transactions": [
                    {"id": "t1", "date": "2025-01-05", "amount": -12_500, "approved": false}
                ]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let txs = client_for(&server)
            .transactions("b1", Some("2025-01-01"), Some("unapproved"))
            .await
            .expect("transactions");
        assert_eq!(txs.len(), 1);
    }

    #[tokio::test]
    async fn update_month_category_sends_budgeted() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/budgets/b1/months/current/categories/c1"))
            .and(body_json(json!({"category": {"budgeted": 150_000}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"category": {
                    "id": "c1", "name": "Groceries", "hidden": false,
                    "budgeted": 150_000, "activity": -20_000, "balance": 130_000, "deleted": false
                }}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let category = client_for(&server)
            .update_month_category("b1", "current", "c1", 150_000)
            .await
            .expect("update");
        assert_eq!(category.balance, 130_000);
    }

    #[tokio::test]
    async fn ids_stay_inside_their_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/budgets/b1/transactions/t1%2F..%2F..%2Fother"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"id": "404.2", "name": "resource_not_found", "detail": "Resource not found"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .delete_transaction("b1", "t1/../../other")
            .await
            .expect_err("no such transaction");
        assert!(matches!(err, YnabError::NotFound { .. }));

        let requests = server.received_requests().await.unwrap_or_default();
        assert_eq!(requests.len(), 1);
        assert!(requests.iter().all(|request| {
            request.url.path().starts_with("/budgets/b1/transactions/")
        }));
    }

    #[tokio::test]
    async fn dot_and_empty_ids_are_rejected_before_sending() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        let dots = client.delete_transaction("b1", "..").await.expect_err("dots");
        let empty = client.payee("", "p1").await.expect_err("empty budget");

        assert!(matches!(dots, YnabError::InvalidId(_)));
        assert!(matches!(empty, YnabError::InvalidId(_)));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn base_url_path_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/budgets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"budgets": []}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = YnabClient::new("token".to_owned(), &format!("{}/v1/", server.uri()))
            .expect("client should build");
        let budgets = client.budgets().await.expect("budgets");
        assert!(budgets.is_empty());
    }

    #[test]
    fn relative_base_url_is_rejected() {
        let err = YnabClient::new("token".to_owned(), "api.ynab.com/v1").expect_err("relative");
        assert!(matches!(err, YnabError::InvalidBaseUrl(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server).budgets().await.expect_err("decode");
        assert!(matches!(err, YnabError::Decode(_)));
    }
}
