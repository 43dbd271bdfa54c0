//! Tool implementations on top of the YNAB client.
//!
//! Every operation resolves its budget, validates its arguments, talks to
//! YNAB and shapes the result. Idempotent reads are memoized in the injected
//! [`TtlCache`]; successful writes clear it so later reads see fresh data.

use core::future::Future;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::analysis::{monthly_report, report_totals, select_transactions, spending_by_category};
use crate::cache::TtlCache;
use crate::error::ToolError;
use crate::money::{
    first_of_month_before, format_dollars, from_milliunits, is_budget_month, months_before,
    parse_iso_date, to_milliunits,
};
use crate::params::{
    AnalyzeSpendingParams, AnalyzeTransactionsParams, ApproveTransactionParams, BudgetParams,
    ClearTransactionParams, CreateMultipleTransactionsParams, CreateScheduledTransactionParams,
    CreateSplitTransactionParams, CreateTransactionParams, CreateTransferParams, MonthParams,
    MoveFundsParams, PayeeParams, ScheduledTransactionRefParams, SpendingReportParams,
    SubTransactionInput, TransactionRefParams, UpdateCategoryBudgetParams,
    UpdateMultipleTransactionsParams, UpdateTransactionParams,
};
use crate::response::{
    AccountResponse, BudgetListResponse, BudgetResponse, BudgetSummaryResponse, BulkWriteResponse,
    CategoryBudgetResponse, CategoryResponse, HealthResponse, MonthDetailResponse,
    MoveFundsResponse, PayeeListResponse, PayeeResponse, ReportParameters,
    ScheduledTransactionResponse, ScheduledWriteResponse, SpendingAnalysisResponse,
    SpendingPeriod, SpendingReportResponse, SplitResponse, SummaryCategory, TransactionFilters,
    TransactionListResponse, TransactionResponse, TransactionSearchResponse,
    TransactionSearchSummary, TransactionWriteResponse, TransferResponse,
};
use crate::ynab::YnabClient;
use crate::ynab::models::{ClearedStatus, SaveTransaction, SaveTransactionsData};

/// Default window of `analyze_spending_by_category`.
const DEFAULT_SPENDING_MONTHS: u32 = 1;
/// Default window of `generate_spending_report`.
const DEFAULT_REPORT_MONTHS: u32 = 6;
/// Default row limit of `analyze_transactions`.
const DEFAULT_TRANSACTION_LIMIT: usize = 50;
/// Largest accepted difference between a split total and its lines, in dollars.
const SPLIT_TOLERANCE: f64 = 0.01;

/// Validates a `YYYY-MM-DD` argument.
fn require_date(value: &str, field: &str) -> Result<(), ToolError> {
    if parse_iso_date(value).is_some() {
        Ok(())
    } else {
        Err(ToolError::invalid(format!(
            "{field} must be a date in YYYY-MM-DD format, got '{value}'"
        )))
    }
}

/// Validates a budget month argument.
fn require_month(value: &str) -> Result<(), ToolError> {
    if is_budget_month(value) {
        Ok(())
    } else {
        Err(ToolError::invalid(format!(
            "month must be 'current' or a date in YYYY-MM-DD format, got '{value}'"
        )))
    }
}

/// Validates a strictly positive dollar amount.
fn require_positive(amount: f64) -> Result<(), ToolError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(ToolError::invalid(
            "amount must be a positive number in dollars (e.g. 50.00)",
        ))
    }
}

/// Validates a window length in months.
fn require_months(months: u32) -> Result<(), ToolError> {
    if months == 0 {
        return Err(ToolError::invalid("monthsBack must be at least 1"));
    }
    Ok(())
}

/// Current date in UTC.
fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Sum of split lines in dollars.
fn split_total(lines: &[SubTransactionInput]) -> f64 {
    lines.iter().map(|line| line.amount).sum()
}

/// Shapes a bulk create/update result.
fn bulk_response(requested: usize, data: SaveTransactionsData) -> BulkWriteResponse {
    BulkWriteResponse {
        total_requested: requested,
        total_saved: data.transaction_ids.len(),
        duplicates_found: data.duplicate_import_ids.len(),
        duplicate_import_ids: data.duplicate_import_ids,
        transaction_ids: data.transaction_ids,
    }
}

/// YNAB tool operations bound to one credential.
#[derive(Debug)]
pub(crate) struct YnabTools {
    /// API client.
    client: YnabClient,
    /// Memoized read results.
    cache: TtlCache<Value>,
    /// Budget used when a call omits `budgetId`.
    default_budget: Option<String>,
}

impl YnabTools {
    /// Creates the tool set.
    pub(crate) const fn new(
        client: YnabClient,
        cache: TtlCache<Value>,
        default_budget: Option<String>,
    ) -> Self {
        Self {
            client,
            cache,
            default_budget,
        }
    }

    /// Resolves the budget of a call: the argument if non-empty, else the
    /// server default.
    fn budget_id(&self, requested: Option<&str>) -> Result<String, ToolError> {
        requested
            .filter(|id| !id.is_empty())
            .or(self.default_budget.as_deref())
            .map(str::to_owned)
            .ok_or(ToolError::MissingBudgetId)
    }

    /// Returns the cached value under `key`, or runs `fetch` and caches its
    /// serialized output.
    async fn cached<T, F>(&self, key: String, fetch: F) -> Result<Value, ToolError>
    where
        T: Serialize,
        F: Future<Output = Result<T, ToolError>>,
    {
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(%key, "cache hit");
            return Ok(hit);
        }
        let value = serde_json::to_value(fetch.await?)?;
        self.cache.set(key, value.clone());
        Ok(value)
    }

    /// Drops every cached read after a successful write.
    fn invalidate(&self) {
        self.cache.clear();
    }

    // ── Read tools ──────────────────────────────────────────────────

    /// Lists budgets.
    pub(crate) async fn list_budgets(&self) -> Result<Value, ToolError> {
        self.cached("budgets:list".to_owned(), async {
            tracing::info!("listing budgets");
            let budgets = self.client.budgets().await?;
            Ok::<_, ToolError>(BudgetListResponse {
                budgets: budgets.iter().map(BudgetResponse::from_budget).collect(),
            })
        })
        .await
    }

    /// Lists non-deleted accounts.
    pub(crate) async fn list_accounts(&self, params: &BudgetParams) -> Result<Value, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        self.cached(format!("list_accounts:{budget_id}"), async {
            tracing::info!(%budget_id, "listing accounts");
            let accounts = self.client.accounts(&budget_id).await?;
            Ok::<_, ToolError>(accounts
                .iter()
                .filter(|account| !account.deleted)
                .map(AccountResponse::from_account)
                .collect::<Vec<_>>())
        })
        .await
    }

    /// Summarizes a budget month with open accounts and visible categories.
    pub(crate) async fn budget_summary(&self, params: &MonthParams) -> Result<Value, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        let month = params.month.as_deref().unwrap_or("current");
        require_month(month)?;
        self.cached(format!("budget_summary:{budget_id}:{month}"), async {
            tracing::info!(%budget_id, month, "summarizing budget");
            let (detail, accounts) = tokio::try_join!(
                self.client.month(&budget_id, month),
                self.client.accounts(&budget_id),
            )?;
            let categories: Vec<SummaryCategory> = detail
                .categories
                .iter()
                .filter(|category| !category.hidden && !category.deleted)
                .map(SummaryCategory::from_category)
                .collect();
            Ok::<_, ToolError>(BudgetSummaryResponse {
                month: detail.month.clone(),
                income: from_milliunits(detail.income),
                budgeted: from_milliunits(detail.budgeted),
                activity: from_milliunits(detail.activity),
                to_be_budgeted: from_milliunits(detail.to_be_budgeted),
                accounts: accounts
                    .iter()
                    .filter(|account| !account.closed && !account.deleted)
                    .map(AccountResponse::from_account)
                    .collect(),
                overspent_count: categories
                    .iter()
                    .filter(|category| category.overspent)
                    .count(),
                categories,
            })
        })
        .await
    }

    /// Returns a budget month with every category.
    pub(crate) async fn get_month_detail(
        &self,
        params: &MonthParams,
    ) -> Result<MonthDetailResponse, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        let month = params.month.as_deref().unwrap_or("current");
        require_month(month)?;
        tracing::info!(%budget_id, month, "fetching month detail");
        let detail = self.client.month(&budget_id, month).await?;
        Ok(MonthDetailResponse::from_month(&detail))
    }

    /// Groups recent outflows by category.
    pub(crate) async fn analyze_spending_by_category(
        &self,
        params: &AnalyzeSpendingParams,
    ) -> Result<Value, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        let months_back = params.months_back.unwrap_or(DEFAULT_SPENDING_MONTHS);
        require_months(months_back)?;
        self.cached(format!("analyze_spending:{budget_id}:{months_back}"), async {
            tracing::info!(%budget_id, months_back, "analyzing spending");
            let end = today();
            let start = months_before(end, months_back).to_string();
            let transactions = self
                .client
                .transactions(&budget_id, Some(&start), None)
                .await?;
            let breakdown = spending_by_category(&transactions);
            let (top_name, top_total) = breakdown
                .categories
                .first()
                .map_or(("N/A", 0.0), |top| (top.category.as_str(), top.total));
            let conversational_summary = format!(
                "Over the last {months_back} month(s), you spent a total of ${} across {} \
                 transactions. Your top spending category was \"{top_name}\" at ${}.",
                format_dollars(breakdown.total_spending),
                breakdown.transaction_count,
                format_dollars(top_total),
            );
            Ok::<_, ToolError>(SpendingAnalysisResponse {
                period: SpendingPeriod {
                    from: start,
                    to: end.to_string(),
                    months_back,
                },
                total_spending: breakdown.total_spending,
                category_breakdown: breakdown.categories,
                conversational_summary,
            })
        })
        .await
    }

    /// Searches transactions by account, category and date range.
    pub(crate) async fn analyze_transactions(
        &self,
        params: &AnalyzeTransactionsParams,
    ) -> Result<Value, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        if let Some(from) = params.from_date.as_deref() {
            require_date(from, "fromDate")?;
        }
        if let Some(to) = params.to_date.as_deref() {
            require_date(to, "toDate")?;
        }
        let limit = params.limit.unwrap_or(DEFAULT_TRANSACTION_LIMIT);
        if limit == 0 {
            return Err(ToolError::invalid("limit must be at least 1"));
        }
        let key = format!(
            "analyze_transactions:{budget_id}:{}:{}:{}:{}:{limit}",
            params.account_id.as_deref().unwrap_or("all"),
            params.category_id.as_deref().unwrap_or("all"),
            params.from_date.as_deref().unwrap_or("any"),
            params.to_date.as_deref().unwrap_or("any"),
        );
        self.cached(key, async {
            tracing::info!(%budget_id, "analyzing transactions");
            let since = params.from_date.as_deref();
            let (transactions, category_filter) = match (
                params.account_id.as_deref(),
                params.category_id.as_deref(),
            ) {
                (Some(account), category) => (
                    self.client
                        .account_transactions(&budget_id, account, since)
                        .await?,
                    category,
                ),
                (None, Some(category)) => (
                    self.client
                        .category_transactions(&budget_id, category, since)
                        .await?,
                    None,
                ),
                (None, None) => (
                    self.client.transactions(&budget_id, since, None).await?,
                    None,
                ),
            };
            let (total_found, rows) = select_transactions(
                transactions,
                category_filter,
                params.to_date.as_deref(),
                limit,
            );
            Ok::<_, ToolError>(TransactionSearchResponse {
                summary: TransactionSearchSummary {
                    total_found,
                    showing: rows.len(),
                    filters: TransactionFilters {
                        account_id: params.account_id.clone(),
                        category_id: params.category_id.clone(),
                        from_date: params.from_date.clone(),
                        to_date: params.to_date.clone(),
                    },
                },
                transactions: rows
                    .iter()
                    .map(TransactionResponse::from_transaction)
                    .collect(),
            })
        })
        .await
    }

    /// Reports income, expenses and net per month.
    pub(crate) async fn generate_spending_report(
        &self,
        params: &SpendingReportParams,
    ) -> Result<Value, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        let months_back = params.months_back.unwrap_or(DEFAULT_REPORT_MONTHS);
        require_months(months_back)?;
        self.cached(format!("spending_report:{budget_id}:{months_back}"), async {
            tracing::info!(%budget_id, months_back, "generating spending report");
            let from = first_of_month_before(today(), months_back).to_string();
            let transactions = self
                .client
                .transactions(&budget_id, Some(&from), None)
                .await?;
            let report = monthly_report(&transactions);
            let totals = report_totals(&report);
            let conversational_summary = format!(
                "Over the last {months_back} months, your average monthly income was ${} and \
                 average monthly expenses were ${}.",
                format_dollars(totals.average_income),
                format_dollars(totals.average_expenses),
            );
            Ok::<_, ToolError>(SpendingReportResponse {
                parameters: ReportParameters {
                    budget_id: budget_id.clone(),
                    months_back,
                    from,
                },
                monthly_report: report,
                totals,
                conversational_summary,
            })
        })
        .await
    }

    /// Lists transactions awaiting approval.
    pub(crate) async fn get_unapproved_transactions(
        &self,
        params: &BudgetParams,
    ) -> Result<TransactionListResponse, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        tracing::info!(%budget_id, "listing unapproved transactions");
        let transactions = self
            .client
            .transactions(&budget_id, None, Some("unapproved"))
            .await?;
        let rows: Vec<TransactionResponse> = transactions
            .iter()
            .filter(|tx| !tx.deleted)
            .map(TransactionResponse::from_transaction)
            .collect();
        Ok(TransactionListResponse {
            transaction_count: rows.len(),
            transactions: rows,
        })
    }

    /// Lists scheduled transactions by next occurrence.
    pub(crate) async fn list_scheduled_transactions(
        &self,
        params: &BudgetParams,
    ) -> Result<Value, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        self.cached(format!("scheduled_transactions:{budget_id}"), async {
            tracing::info!(%budget_id, "listing scheduled transactions");
            let scheduled = self.client.scheduled_transactions(&budget_id).await?;
            let mut rows: Vec<ScheduledTransactionResponse> = scheduled
                .iter()
                .filter(|entry| !entry.deleted)
                .map(ScheduledTransactionResponse::from_scheduled)
                .collect();
            rows.sort_by(|left, right| left.date_next.cmp(&right.date_next));
            Ok::<_, ToolError>(rows)
        })
        .await
    }

    /// Lists non-deleted payees.
    pub(crate) async fn get_payees(&self, params: &BudgetParams) -> Result<Value, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        self.cached(format!("payees:{budget_id}"), async {
            tracing::info!(%budget_id, "listing payees");
            let payees = self.client.payees(&budget_id).await?;
            let rows: Vec<PayeeResponse> = payees
                .iter()
                .filter(|payee| !payee.deleted)
                .map(PayeeResponse::from_payee)
                .collect();
            Ok::<_, ToolError>(PayeeListResponse {
                payee_count: rows.len(),
                payees: rows,
            })
        })
        .await
    }

    /// Fetches one payee.
    pub(crate) async fn get_single_payee(
        &self,
        params: &PayeeParams,
    ) -> Result<PayeeResponse, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        let payee = self.client.payee(&budget_id, &params.payee_id).await?;
        Ok(PayeeResponse::from_payee(&payee))
    }

    /// Checks connectivity and, when a budget is known, its reachability.
    pub(crate) async fn health_check(
        &self,
        params: &BudgetParams,
    ) -> Result<HealthResponse, ToolError> {
        let started = Instant::now();
        let user = self.client.user().await?;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let budget_status = match self.budget_id(params.budget_id.as_deref()) {
            Ok(budget_id) => match self.client.budget(&budget_id).await {
                Ok(budget) => format!("Connected to \"{}\"", budget.name),
                Err(err) => {
                    tracing::warn!(%budget_id, %err, "budget not reachable");
                    "Invalid budget ID or permission denied".to_owned()
                }
            },
            Err(_) => "Not checked".to_owned(),
        };
        Ok(HealthResponse {
            status: "ok",
            user_id: user.id,
            latency_ms,
            budget_status,
            api_version: "v1",
            server_version: concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION")),
        })
    }

    // ── Write tools ─────────────────────────────────────────────────

    /// Creates one transaction.
    pub(crate) async fn create_transaction(
        &self,
        params: &CreateTransactionParams,
    ) -> Result<TransactionWriteResponse, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        require_date(&params.transaction.date, "date")?;
        tracing::info!(%budget_id, account_id = %params.transaction.account_id, "creating transaction");
        let data = self
            .client
            .create_transaction(&budget_id, &params.transaction.to_save())
            .await?;
        self.invalidate();
        let message = if data.transaction.is_none() && !data.duplicate_import_ids.is_empty() {
            "Transaction skipped: its import ID already exists".to_owned()
        } else {
            format!(
                "Created a transaction of ${} on {}",
                format_dollars(params.transaction.amount),
                params.transaction.date
            )
        };
        Ok(TransactionWriteResponse {
            success: true,
            message,
            transaction: data
                .transaction
                .as_ref()
                .map(TransactionResponse::from_transaction),
        })
    }

    /// Creates several transactions in one request.
    pub(crate) async fn create_multiple_transactions(
        &self,
        params: &CreateMultipleTransactionsParams,
    ) -> Result<BulkWriteResponse, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        if params.transactions.is_empty() {
            return Err(ToolError::invalid(
                "transactions must contain at least one transaction",
            ));
        }
        for tx in &params.transactions {
            require_date(&tx.date, "date")?;
        }
        let bodies: Vec<SaveTransaction> = params
            .transactions
            .iter()
            .map(|tx| tx.to_save())
            .collect();
        tracing::info!(%budget_id, count = bodies.len(), "creating transactions");
        let data = self.client.create_transactions(&budget_id, &bodies).await?;
        self.invalidate();
        if !data.duplicate_import_ids.is_empty() {
            tracing::info!(
                duplicates = data.duplicate_import_ids.len(),
                "duplicate import IDs skipped"
            );
        }
        Ok(bulk_response(bodies.len(), data))
    }

    /// Turns an existing transaction into a split transaction.
    pub(crate) async fn create_split_transaction(
        &self,
        params: &CreateSplitTransactionParams,
    ) -> Result<SplitResponse, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        if params.subtransactions.len() < 2 {
            return Err(ToolError::invalid(
                "at least 2 subtransactions are required for a split transaction",
            ));
        }
        let lines_total = split_total(&params.subtransactions);
        if let Some(amount) = params
            .amount
            .filter(|amount| (lines_total - amount).abs() > SPLIT_TOLERANCE)
        {
            return Err(ToolError::invalid(format!(
                "subtransaction amounts ({}) do not match the total amount ({})",
                format_dollars(lines_total),
                format_dollars(amount)
            )));
        }
        if let Some(date) = params.date.as_deref() {
            require_date(date, "date")?;
        }
        let total = params.amount.unwrap_or(lines_total);
        let body = SaveTransaction {
            amount: Some(to_milliunits(total)),
            category_id: Some(None),
            subtransactions: Some(
                params
                    .subtransactions
                    .iter()
                    .map(SubTransactionInput::to_save)
                    .collect(),
            ),
            account_id: params.account_id.clone().filter(|id| !id.is_empty()),
            date: params.date.clone(),
            payee_id: params
                .payee_id
                .clone()
                .map(|id| Some(id).filter(|value| !value.is_empty())),
            payee_name: params
                .payee_name
                .clone()
                .map(|name| Some(name).filter(|value| !value.is_empty())),
            memo: params
                .memo
                .clone()
                .map(|memo| Some(memo).filter(|value| !value.is_empty())),
            ..SaveTransaction::default()
        };
        tracing::info!(%budget_id, transaction_id = %params.transaction_id, "splitting transaction");
        let updated = self
            .client
            .update_transaction(&budget_id, &params.transaction_id, &body)
            .await?;
        self.invalidate();
        let count = updated
            .subtransactions
            .iter()
            .filter(|sub| !sub.deleted)
            .count();
        Ok(SplitResponse {
            success: true,
            message: format!("Split the transaction into {count} categories"),
            transaction_id: updated.id,
            subtransaction_count: count,
            total_amount: from_milliunits(updated.amount),
        })
    }

    /// Moves money between two accounts of the budget.
    pub(crate) async fn create_transfer(
        &self,
        params: &CreateTransferParams,
    ) -> Result<TransferResponse, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        if params.from_account_id == params.to_account_id {
            return Err(ToolError::invalid(
                "cannot transfer to the same account; provide different from/to accounts",
            ));
        }
        require_positive(params.amount)?;
        require_date(&params.date, "date")?;

        let accounts = self.client.accounts(&budget_id).await?;
        let find = |id: &str| accounts.iter().find(|account| account.id == id);
        let to_account = find(&params.to_account_id).ok_or_else(|| {
            ToolError::invalid(format!(
                "destination account {} not found; call list_accounts to verify",
                params.to_account_id
            ))
        })?;
        let from_account = find(&params.from_account_id).ok_or_else(|| {
            ToolError::invalid(format!(
                "source account {} not found; call list_accounts to verify",
                params.from_account_id
            ))
        })?;
        let transfer_payee_id = to_account.transfer_payee_id.clone().ok_or_else(|| {
            ToolError::invalid(format!(
                "destination account '{}' has no transfer payee",
                to_account.name
            ))
        })?;

        let body = SaveTransaction {
            account_id: Some(params.from_account_id.clone()),
            date: Some(params.date.clone()),
            amount: Some(to_milliunits(params.amount).saturating_neg()),
            payee_id: Some(Some(transfer_payee_id)),
            memo: params.memo.clone().map(Some),
            cleared: Some(ClearedStatus::Cleared),
            approved: Some(true),
            ..SaveTransaction::default()
        };
        tracing::info!(%budget_id, from = %from_account.id, to = %to_account.id, "creating transfer");
        let data = self.client.create_transaction(&budget_id, &body).await?;
        self.invalidate();
        let created = data.transaction;
        Ok(TransferResponse {
            success: true,
            message: format!(
                "Transferred ${} from {} to {}",
                format_dollars(params.amount),
                from_account.name,
                to_account.name
            ),
            transaction_id: created.as_ref().map(|tx| tx.id.clone()),
            transfer_transaction_id: created.and_then(|tx| tx.transfer_transaction_id),
        })
    }

    /// Updates the given fields of one transaction.
    pub(crate) async fn update_single_transaction(
        &self,
        params: &UpdateTransactionParams,
    ) -> Result<TransactionWriteResponse, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        let body = params.to_save().ok_or_else(|| {
            ToolError::invalid(
                "at least one field to update is required (amount, category, date, payee, memo, \
                 cleared or approved)",
            )
        })?;
        if let Some(date) = body.date.as_deref() {
            require_date(date, "date")?;
        }
        self.put_transaction(&budget_id, &params.transaction_id, &body, "Updated")
            .await
    }

    /// Updates several transactions in one request.
    pub(crate) async fn update_multiple_transactions(
        &self,
        params: &UpdateMultipleTransactionsParams,
    ) -> Result<BulkWriteResponse, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        if params.transactions.is_empty() {
            return Err(ToolError::invalid(
                "transactions must contain at least one update",
            ));
        }
        let bodies = params
            .transactions
            .iter()
            .enumerate()
            .map(|(index, update)| {
                let body = update.to_save().map_err(|reason| {
                    ToolError::invalid(format!("transaction {index}: {reason}"))
                })?;
                if let Some(date) = body.date.as_deref() {
                    require_date(date, "date").map_err(|err| {
                        ToolError::invalid(format!("transaction {index}: {err}"))
                    })?;
                }
                Ok(body)
            })
            .collect::<Result<Vec<_>, ToolError>>()?;
        tracing::info!(%budget_id, count = bodies.len(), "updating transactions");
        let data = self.client.update_transactions(&budget_id, &bodies).await?;
        self.invalidate();
        Ok(bulk_response(bodies.len(), data))
    }

    /// Sets the approval flag of a transaction.
    pub(crate) async fn approve_transaction(
        &self,
        params: &ApproveTransactionParams,
    ) -> Result<TransactionWriteResponse, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        let approved = params.approved.unwrap_or(true);
        let body = SaveTransaction {
            approved: Some(approved),
            ..SaveTransaction::default()
        };
        let verb = if approved { "Approved" } else { "Unapproved" };
        self.put_transaction(&budget_id, &params.transaction_id, &body, verb)
            .await
    }

    /// Sets the cleared status of a transaction.
    pub(crate) async fn clear_transaction(
        &self,
        params: &ClearTransactionParams,
    ) -> Result<TransactionWriteResponse, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        let body = SaveTransaction {
            cleared: Some(params.cleared),
            ..SaveTransaction::default()
        };
        let verb = format!("Marked as {}", params.cleared.as_str());
        self.put_transaction(&budget_id, &params.transaction_id, &body, &verb)
            .await
    }

    /// Sends a PUT for one transaction and shapes the result.
    async fn put_transaction(
        &self,
        budget_id: &str,
        transaction_id: &str,
        body: &SaveTransaction,
        verb: &str,
    ) -> Result<TransactionWriteResponse, ToolError> {
        tracing::info!(budget_id, transaction_id, "updating transaction");
        let updated = self
            .client
            .update_transaction(budget_id, transaction_id, body)
            .await?;
        self.invalidate();
        Ok(TransactionWriteResponse {
            success: true,
            message: format!("{verb} transaction {}", updated.id),
            transaction: Some(TransactionResponse::from_transaction(&updated)),
        })
    }

    /// Deletes a transaction.
    pub(crate) async fn delete_transaction(
        &self,
        params: &TransactionRefParams,
    ) -> Result<TransactionWriteResponse, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        tracing::info!(%budget_id, transaction_id = %params.transaction_id, "deleting transaction");
        let deleted = self
            .client
            .delete_transaction(&budget_id, &params.transaction_id)
            .await?;
        self.invalidate();
        Ok(TransactionWriteResponse {
            success: true,
            message: format!("Deleted transaction {}", deleted.id),
            transaction: Some(TransactionResponse::from_transaction(&deleted)),
        })
    }

    /// Deletes a scheduled transaction.
    pub(crate) async fn delete_scheduled_transaction(
        &self,
        params: &ScheduledTransactionRefParams,
    ) -> Result<ScheduledWriteResponse, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        tracing::info!(
            %budget_id,
            scheduled_transaction_id = %params.scheduled_transaction_id,
            "deleting scheduled transaction"
        );
        let deleted = self
            .client
            .delete_scheduled_transaction(&budget_id, &params.scheduled_transaction_id)
            .await?;
        self.invalidate();
        Ok(ScheduledWriteResponse {
            success: true,
            message: format!("Deleted scheduled transaction {}", deleted.id),
            scheduled_transaction: ScheduledTransactionResponse::from_scheduled(&deleted),
        })
    }

    /// Creates a scheduled transaction.
    pub(crate) async fn create_scheduled_transaction(
        &self,
        params: &CreateScheduledTransactionParams,
    ) -> Result<ScheduledWriteResponse, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        require_date(&params.date, "date")?;
        tracing::info!(%budget_id, frequency = params.frequency.as_str(), "creating scheduled transaction");
        let created = self
            .client
            .create_scheduled_transaction(&budget_id, &params.to_save())
            .await?;
        self.invalidate();
        Ok(ScheduledWriteResponse {
            success: true,
            message: format!(
                "Scheduled ${} {} starting {}",
                format_dollars(params.amount),
                params.frequency.as_str(),
                params.date
            ),
            scheduled_transaction: ScheduledTransactionResponse::from_scheduled(&created),
        })
    }

    /// Sets the total assigned amount of a category for a month.
    pub(crate) async fn update_category_budget(
        &self,
        params: &UpdateCategoryBudgetParams,
    ) -> Result<CategoryBudgetResponse, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        require_month(&params.month)?;
        if !params.budgeted.is_finite() {
            return Err(ToolError::invalid("budgeted must be a finite amount"));
        }
        tracing::info!(%budget_id, category_id = %params.category_id, month = %params.month, "assigning category budget");
        let category = self
            .client
            .update_month_category(
                &budget_id,
                &params.month,
                &params.category_id,
                to_milliunits(params.budgeted),
            )
            .await?;
        self.invalidate();
        Ok(CategoryBudgetResponse {
            success: true,
            message: format!(
                "Set '{}' to ${} assigned for {}",
                category.name,
                format_dollars(from_milliunits(category.budgeted)),
                params.month
            ),
            category: CategoryResponse::from_category(&category),
        })
    }

    /// Moves assigned money from one category to another.
    ///
    /// Issues two sequential category updates without rollback. When the
    /// second update fails, the error states what the first one changed.
    pub(crate) async fn move_funds(
        &self,
        params: &MoveFundsParams,
    ) -> Result<MoveFundsResponse, ToolError> {
        let budget_id = self.budget_id(params.budget_id.as_deref())?;
        require_month(&params.month)?;
        if params.source_category_id == params.destination_category_id {
            return Err(ToolError::invalid(
                "source and destination categories must be different",
            ));
        }
        require_positive(params.amount)?;
        let month = params.month.as_str();
        let delta = to_milliunits(params.amount);

        let (source, destination) = tokio::try_join!(
            self.client
                .month_category(&budget_id, month, &params.source_category_id),
            self.client
                .month_category(&budget_id, month, &params.destination_category_id),
        )?;
        let new_source = source.budgeted.saturating_sub(delta);
        let new_destination = destination.budgeted.saturating_add(delta);
        tracing::info!(
            %budget_id,
            month,
            from = %source.id,
            to = %destination.id,
            amount = params.amount,
            "moving funds"
        );

        let _updated_source = self
            .client
            .update_month_category(&budget_id, month, &source.id, new_source)
            .await?;
        self.invalidate();
        if let Err(err) = self
            .client
            .update_month_category(&budget_id, month, &destination.id, new_destination)
            .await
        {
            tracing::error!(%budget_id, month, %err, "fund move left half-applied");
            return Err(ToolError::Partial {
                completed: format!(
                    "removed ${} from '{}' (assigned is now ${}) but did not add it to '{}'",
                    format_dollars(params.amount),
                    source.name,
                    format_dollars(from_milliunits(new_source)),
                    destination.name
                ),
                source: err,
            });
        }

        Ok(MoveFundsResponse {
            success: true,
            message: format!(
                "Moved ${} from '{}' to '{}' in {month}",
                format_dollars(params.amount),
                source.name,
                destination.name
            ),
            new_source_budgeted: from_milliunits(new_source),
            new_destination_budgeted: from_milliunits(new_destination),
        })
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::float_cmp,
    clippy::indexing_slicing,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect, indexing and exact float literals for readability"
)]
mod tests {
    use chrono::Utc;
    use serde::de::DeserializeOwned;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::YnabTools;
    use crate::cache::TtlCache;
    use crate::error::ToolError;
    use crate::money::first_of_month_before;
    use crate::params::{
        BudgetParams, CreateSplitTransactionParams, CreateTransferParams, MonthParams,
        MoveFundsParams, SubTransactionInput, UpdateCategoryBudgetParams,
        UpdateMultipleTransactionsParams, UpdateTransactionParams,
    };
    use crate::ynab::YnabClient;

    fn params<T: DeserializeOwned>(value: Value) -> T {
        serde_json::from_value(value).expect("valid params")
    }

    async fn no_requests_sent(server: &MockServer) -> bool {
        server.received_requests().await.unwrap_or_default().is_empty()
    }

    fn transaction(id: &str, date: &str, amount: i64, category_id: &str) -> Value {
        json!({"id": id, "date": date, "amount": amount, "category_id": category_id})
    }

    fn tools_for(server: &MockServer, default_budget: Option<&str>) -> YnabTools {
        let client =
            YnabClient::new("token-abc".to_owned(), &server.uri()).expect("client should build");
        YnabTools::new(
            client,
            TtlCache::default(),
            default_budget.map(str::to_owned),
        )
    }

    fn category(id: &str, name: &str, budgeted: i64) -> Value {
        json!({"data": {"category": {
            "id": id, "name": name, "hidden": false, "budgeted": budgeted,
            "activity": 0, "balance": budgeted, "deleted": false
        }}})
    }

    fn line(amount: f64, category: &str) -> SubTransactionInput {
        SubTransactionInput {
            amount,
            category_id: Some(category.to_owned()),
            payee_id: None,
            payee_name: None,
            memo: None,
        }
    }

    async fn mount_budgets(server: &MockServer, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/budgets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"budgets": [{"id": "b1", "name": "Main"}]}
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn list_budgets_is_served_from_cache() {
        let server = MockServer::start().await;
        mount_budgets(&server, 1).await;
        let tools = tools_for(&server, None);

        let first = tools.list_budgets().await.expect("first call");
        let second = tools.list_budgets().await.expect("second call");

        assert_eq!(first, json!({"budgets": [{"id": "b1", "name": "Main"}]}));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn writes_invalidate_cached_reads() {
        let server = MockServer::start().await;
        mount_budgets(&server, 2).await;
        Mock::given(method("PUT"))
            .and(path("/budgets/b1/transactions/t1"))
            .and(body_json(json!({"transaction": {"approved": true}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"transaction": {"id": "t1", "date": "2025-01-02", "amount": -1000, "approved": true}}
            })))
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let _before = tools.list_budgets().await.expect("first read");
        let update = UpdateTransactionParams {
            transaction_id: "t1".to_owned(),
            approved: Some(true),
            ..UpdateTransactionParams::default()
        };
        let written = tools
            .update_single_transaction(&update)
            .await
            .expect("update");
        let _after = tools.list_budgets().await.expect("second read");

        assert!(written.success);
        assert_eq!(written.message, "Updated transaction t1");
    }

    #[tokio::test]
    async fn missing_budget_id_is_reported() {
        let server = MockServer::start().await;
        let tools = tools_for(&server, None);

        let err = tools
            .list_accounts(&BudgetParams::default())
            .await
            .expect_err("no budget available");

        assert!(matches!(err, ToolError::MissingBudgetId));
    }

    #[tokio::test]
    async fn list_accounts_skips_deleted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"accounts": [
                {"id": "a1", "name": "Checking", "type": "checking", "on_budget": true,
                 "closed": false, "balance": 250_000, "deleted": false},
                {"id": "a2", "name": "Old", "type": "savings", "on_budget": true,
                 "closed": true, "balance": 0, "deleted": true}
            ]}})))
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let accounts = tools
            .list_accounts(&BudgetParams::default())
            .await
            .expect("accounts");

        assert_eq!(
            accounts,
            json!([{"id": "a1", "name": "Checking", "type": "checking",
                    "balance": 250.0, "on_budget": true, "closed": false}])
        );
    }

    #[tokio::test]
    async fn move_funds_patches_both_categories() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/months/2025-01-01/categories/dining"))
            .respond_with(ResponseTemplate::new(200).set_body_json(category("dining", "Dining", 300_000)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/months/2025-01-01/categories/groceries"))
            .respond_with(ResponseTemplate::new(200).set_body_json(category("groceries", "Groceries", 400_000)))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/budgets/b1/months/2025-01-01/categories/dining"))
            .and(body_json(json!({"category": {"budgeted": 250_000}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(category("dining", "Dining", 250_000)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/budgets/b1/months/2025-01-01/categories/groceries"))
            .and(body_json(json!({"category": {"budgeted": 450_000}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(category("groceries", "Groceries", 450_000)))
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let moved = tools
            .move_funds(&MoveFundsParams {
                budget_id: None,
                month: "2025-01-01".to_owned(),
                source_category_id: "dining".to_owned(),
                destination_category_id: "groceries".to_owned(),
                amount: 50.0,
            })
            .await
            .expect("move");

        assert_eq!(moved.new_source_budgeted, 250.0);
        assert_eq!(moved.new_destination_budgeted, 450.0);
        assert_eq!(
            moved.message,
            "Moved $50.00 from 'Dining' to 'Groceries' in 2025-01-01"
        );
    }

    #[tokio::test]
    async fn move_funds_reports_half_applied_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/months/current/categories/dining"))
            .respond_with(ResponseTemplate::new(200).set_body_json(category("dining", "Dining", 300_000)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/months/current/categories/groceries"))
            .respond_with(ResponseTemplate::new(200).set_body_json(category("groceries", "Groceries", 400_000)))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/budgets/b1/months/current/categories/dining"))
            .respond_with(ResponseTemplate::new(200).set_body_json(category("dining", "Dining", 250_000)))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/budgets/b1/months/current/categories/groceries"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": {"id": "500", "name": "internal_server_error", "detail": "try later"}
            })))
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let err = tools
            .move_funds(&MoveFundsParams {
                budget_id: None,
                month: "current".to_owned(),
                source_category_id: "dining".to_owned(),
                destination_category_id: "groceries".to_owned(),
                amount: 50.0,
            })
            .await
            .expect_err("second update fails");

        assert!(matches!(err, ToolError::Partial { .. }));
        assert_eq!(err.kind(), "api_error");
        let message = err.to_string();
        assert!(message.contains("removed $50.00 from 'Dining' (assigned is now $250.00)"));
        assert!(message.contains("try later"));
    }

    #[tokio::test]
    async fn move_funds_rejects_same_category_and_bad_amount() {
        let server = MockServer::start().await;
        let tools = tools_for(&server, Some("b1"));
        let mut params = MoveFundsParams {
            budget_id: None,
            month: "current".to_owned(),
            source_category_id: "dining".to_owned(),
            destination_category_id: "dining".to_owned(),
            amount: 10.0,
        };
        let same = tools.move_funds(&params).await.expect_err("same category");
        assert_eq!(same.kind(), "invalid_input");

        params.destination_category_id = "groceries".to_owned();
        params.amount = -5.0;
        let negative = tools.move_funds(&params).await.expect_err("negative");
        assert_eq!(negative.kind(), "invalid_input");

        params.amount = 5.0;
        params.month = "January".to_owned();
        let bad_month = tools.move_funds(&params).await.expect_err("bad month");
        assert_eq!(bad_month.kind(), "invalid_input");
    }

    #[tokio::test]
    async fn create_transfer_pays_destination_transfer_payee() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"accounts": [
                {"id": "chk", "name": "Checking", "type": "checking", "on_budget": true,
                 "closed": false, "balance": 0, "deleted": false, "transfer_payee_id": "payee-chk"},
                {"id": "sav", "name": "Savings", "type": "savings", "on_budget": true,
                 "closed": false, "balance": 0, "deleted": false, "transfer_payee_id": "payee-sav"}
            ]}})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/budgets/b1/transactions"))
            .and(body_json(json!({"transaction": {
                "account_id": "chk", "date": "2025-01-15", "amount": -500_000,
                "payee_id": "payee-sav", "cleared": "cleared", "approved": true
            }})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {
                "transaction_ids": ["t9"],
                "transaction": {"id": "t9", "date": "2025-01-15", "amount": -500_000,
                                "transfer_transaction_id": "t10"}
            }})))
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let transfer = tools
            .create_transfer(&CreateTransferParams {
                budget_id: None,
                from_account_id: "chk".to_owned(),
                to_account_id: "sav".to_owned(),
                amount: 500.0,
                date: "2025-01-15".to_owned(),
                memo: None,
            })
            .await
            .expect("transfer");

        assert_eq!(transfer.transaction_id.as_deref(), Some("t9"));
        assert_eq!(transfer.transfer_transaction_id.as_deref(), Some("t10"));
        assert_eq!(transfer.message, "Transferred $500.00 from Checking to Savings");
    }

    #[tokio::test]
    async fn split_validation_runs_before_any_request() {
        let server = MockServer::start().await;
        let tools = tools_for(&server, Some("b1"));

        let single = CreateSplitTransactionParams {
            budget_id: None,
            transaction_id: "t1".to_owned(),
            subtransactions: vec![line(-10.0, "c1")],
            amount: None,
            account_id: None,
            date: None,
            payee_id: None,
            payee_name: None,
            memo: None,
        };
        let too_few = tools
            .create_split_transaction(&single)
            .await
            .expect_err("one line");
        assert!(too_few.to_string().contains("at least 2"));

        let mismatched = CreateSplitTransactionParams {
            subtransactions: vec![line(-10.0, "c1"), line(-5.0, "c2")],
            amount: Some(-20.0),
            ..single
        };
        let err = tools
            .create_split_transaction(&mismatched)
            .await
            .expect_err("sum mismatch");
        assert_eq!(err.kind(), "invalid_input");
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn split_sends_null_category_and_lines() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/budgets/b1/transactions/t1"))
            .and(body_json(json!({"transaction": {
                "amount": -15_000,
                "category_id": null,
                "subtransactions": [
                    {"amount": -10_000, "category_id": "c1"},
                    {"amount": -5_000, "category_id": "c2"}
                ]
            }})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"transaction": {
                "id": "t1", "date": "2025-01-02", "amount": -15_000,
                "subtransactions": [
                    {"amount": -10_000, "category_id": "c1"},
                    {"amount": -5_000, "category_id": "c2"}
                ]
            }}})))
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let split = tools
            .create_split_transaction(&CreateSplitTransactionParams {
                budget_id: None,
                transaction_id: "t1".to_owned(),
                subtransactions: vec![line(-10.0, "c1"), line(-5.0, "c2")],
                amount: Some(-15.0),
                account_id: None,
                date: None,
                payee_id: None,
                payee_name: None,
                memo: None,
            })
            .await
            .expect("split");

        assert_eq!(split.subtransaction_count, 2);
        assert_eq!(split.total_amount, -15.0);
    }

    #[tokio::test]
    async fn bulk_update_rejects_ambiguous_entries() {
        let server = MockServer::start().await;
        let tools = tools_for(&server, Some("b1"));
        let params: UpdateMultipleTransactionsParams = serde_json::from_value(json!({
            "transactions": [
                {"id": "t1", "approved": true},
                {"approved": true}
            ]
        }))
        .expect("params");

        let err = tools
            .update_multiple_transactions(&params)
            .await
            .expect_err("second entry has no identifier");

        assert!(err.to_string().starts_with("transaction 1:"));
    }

    #[tokio::test]
    async fn spending_analysis_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/transactions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"transactions": [
                {"id": "t1", "date": "2025-01-02", "amount": -30_000, "category_name": "Dining", "category_id": "c1"},
                {"id": "t2", "date": "2025-01-03", "amount": -70_000, "category_name": "Groceries", "category_id": "c2"},
                {"id": "t3", "date": "2025-01-04", "amount": -99_000, "transfer_account_id": "sav"}
            ]}})))
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let analysis = tools
            .analyze_spending_by_category(&crate::params::AnalyzeSpendingParams::default())
            .await
            .expect("analysis");

        assert_eq!(analysis["total_spending"], json!(100.0));
        assert_eq!(analysis["period"]["months_back"], json!(1));
        assert_eq!(analysis["category_breakdown"][0]["category"], "Groceries");
        let summary = analysis["conversational_summary"].as_str().expect("summary");
        assert!(summary.contains("$100.00 across 2 transactions"));
        assert!(summary.contains("\"Groceries\" at $70.00"));
    }

    #[tokio::test]
    async fn bulk_update_validates_each_date() {
        let server = MockServer::start().await;
        let tools = tools_for(&server, Some("b1"));
        let update: UpdateMultipleTransactionsParams = params(json!({
            "transactions": [
                {"id": "t1", "date": "2025-01-02"},
                {"id": "t2", "date": "02/01/2025"}
            ]
        }));

        let err = tools
            .update_multiple_transactions(&update)
            .await
            .expect_err("second date is malformed");

        assert_eq!(err.kind(), "invalid_input");
        assert!(err.to_string().starts_with("transaction 1: date must be"));
        assert!(no_requests_sent(&server).await);
    }

    #[tokio::test]
    async fn analyze_transactions_prefers_account_scope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/accounts/a1/transactions"))
            .and(query_param("since_date", "2025-01-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"transactions": [
                transaction("t1", "2025-01-05", -10_000, "c1"),
                transaction("t2", "2025-01-06", -20_000, "c2"),
                transaction("t3", "2025-02-10", -30_000, "c1")
            ]}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/categories/c1/transactions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"transactions": []}
            })))
            .expect(0)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let found = tools
            .analyze_transactions(&params(json!({
                "accountId": "a1",
                "categoryId": "c1",
                "fromDate": "2025-01-01",
                "toDate": "2025-01-31"
            })))
            .await
            .expect("search");

        assert_eq!(found["summary"]["total_found"], json!(1));
        assert_eq!(found["summary"]["showing"], json!(1));
        assert_eq!(found["summary"]["filters"]["categoryId"], "c1");
        assert_eq!(found["transactions"][0]["id"], "t1");
        assert_eq!(found["transactions"][0]["amount"], json!(-10.0));
    }

    #[tokio::test]
    async fn analyze_transactions_by_category_uses_category_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/categories/c1/transactions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"transactions": [
                transaction("t1", "2025-01-05", -10_000, "c1"),
                transaction("t2", "2025-01-09", -20_000, "c1")
            ]}})))
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let found = tools
            .analyze_transactions(&params(json!({"categoryId": "c1", "limit": 1})))
            .await
            .expect("search");

        assert_eq!(found["summary"]["total_found"], json!(2));
        assert_eq!(found["summary"]["showing"], json!(1));
        assert_eq!(found["transactions"][0]["id"], "t2");
    }

    #[tokio::test]
    async fn budget_summary_filters_and_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/months/current"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"month": {
                "month": "2025-01-01", "income": 500_000, "budgeted": 400_000,
                "activity": -120_000, "to_be_budgeted": 100_000,
                "categories": [
                    {"id": "c1", "name": "Dining", "budgeted": 50_000, "activity": -55_000,
                     "balance": -5_000},
                    {"id": "c2", "name": "Hidden", "hidden": true, "budgeted": 0,
                     "activity": -1_000, "balance": -1_000},
                    {"id": "c3", "name": "Gone", "deleted": true, "budgeted": 0,
                     "activity": 0, "balance": -2_000},
                    {"id": "c4", "name": "Groceries", "budgeted": 100_000, "activity": -90_000,
                     "balance": 10_000}
                ]
            }}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/accounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"accounts": [
                {"id": "a1", "name": "Checking", "type": "checking", "on_budget": true,
                 "closed": false, "balance": 250_000, "deleted": false},
                {"id": "a2", "name": "Old card", "type": "creditCard", "on_budget": true,
                 "closed": true, "balance": 0, "deleted": false},
                {"id": "a3", "name": "Removed", "type": "savings", "on_budget": true,
                 "closed": false, "balance": 0, "deleted": true}
            ]}})))
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let summary = tools
            .budget_summary(&MonthParams::default())
            .await
            .expect("summary");
        let again = tools
            .budget_summary(&MonthParams::default())
            .await
            .expect("cached summary");

        assert_eq!(summary, again);
        assert_eq!(summary["to_be_budgeted"], json!(100.0));
        assert_eq!(summary["overspent_count"], json!(1));
        let categories = summary["categories"].as_array().expect("categories");
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0]["name"], "Dining");
        assert_eq!(categories[0]["overspent"], json!(true));
        let accounts = summary["accounts"].as_array().expect("accounts");
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0]["id"], "a1");
    }

    #[tokio::test]
    async fn spending_report_starts_on_first_of_month() {
        let since = first_of_month_before(Utc::now().date_naive(), 3).to_string();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/transactions"))
            .and(query_param("since_date", since.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"transactions": []}
            })))
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let report = tools
            .generate_spending_report(&params(json!({"monthsBack": 3})))
            .await
            .expect("report");

        assert_eq!(report["parameters"]["from"], since.as_str());
        assert!(since.ends_with("-01"));
        assert_eq!(report["parameters"]["monthsBack"], json!(3));
        assert_eq!(report["monthly_report"], json!([]));
    }

    #[tokio::test]
    async fn create_multiple_rejects_empty_list() {
        let server = MockServer::start().await;
        let tools = tools_for(&server, Some("b1"));

        let err = tools
            .create_multiple_transactions(&params(json!({"transactions": []})))
            .await
            .expect_err("empty list");

        assert_eq!(err.kind(), "invalid_input");
        assert!(no_requests_sent(&server).await);
    }

    #[tokio::test]
    async fn create_multiple_reports_duplicates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/budgets/b1/transactions"))
            .and(body_json(json!({"transactions": [
                {"account_id": "a1", "date": "2025-01-02", "amount": -10_000, "import_id": "imp-1"},
                {"account_id": "a1", "date": "2025-01-03", "amount": -20_000, "import_id": "imp-2"}
            ]})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {
                "transaction_ids": ["t1"],
                "duplicate_import_ids": ["imp-2"]
            }})))
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let created = tools
            .create_multiple_transactions(&params(json!({"transactions": [
                {"accountId": "a1", "date": "2025-01-02", "amount": -10.0, "importId": "imp-1"},
                {"accountId": "a1", "date": "2025-01-03", "amount": -20.0, "importId": "imp-2"}
            ]})))
            .await
            .expect("bulk create");

        assert_eq!(created.total_requested, 2);
        assert_eq!(created.total_saved, 1);
        assert_eq!(created.duplicates_found, 1);
        assert_eq!(created.duplicate_import_ids, ["imp-2"]);
    }

    #[tokio::test]
    async fn unapproved_transactions_use_type_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/transactions"))
            .and(query_param("type", "unapproved"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"transactions": [
                {"id": "t1", "date": "2025-01-05", "amount": -6_950, "approved": false},
                {"id": "t2", "date": "2025-01-06", "amount": -1_000, "approved": false,
                 "deleted": true}
            ]}})))
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let pending = tools
            .get_unapproved_transactions(&BudgetParams::default())
            .await
            .expect("unapproved");

        assert_eq!(pending.transaction_count, 1);
        assert_eq!(pending.transactions[0].id, "t1");
        assert_eq!(pending.transactions[0].amount, -6.95);
    }

    #[tokio::test]
    async fn scheduled_transactions_sorted_by_next_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/scheduled_transactions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {
                "scheduled_transactions": [
                    {"id": "s2", "date_first": "2024-03-01", "date_next": "2025-03-01",
                     "frequency": "yearly", "amount": -120_000},
                    {"id": "s1", "date_first": "2024-01-01", "date_next": "2025-02-01",
                     "frequency": "monthly", "amount": -15_990},
                    {"id": "s3", "date_first": "2024-01-01", "date_next": "2025-01-15",
                     "frequency": "monthly", "amount": -1_000, "deleted": true}
                ]
            }})))
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let scheduled = tools
            .list_scheduled_transactions(&BudgetParams::default())
            .await
            .expect("scheduled");

        let ids: Vec<&str> = scheduled
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|row| row["id"].as_str())
            .collect();
        assert_eq!(ids, ["s1", "s2"]);
    }

    #[tokio::test]
    async fn update_category_budget_sends_milliunits() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/budgets/b1/months/2025-01-01/categories/groceries"))
            .and(body_json(json!({"category": {"budgeted": 123_450}})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(category("groceries", "Groceries", 123_450)),
            )
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let updated = tools
            .update_category_budget(&params(json!({
                "month": "2025-01-01",
                "categoryId": "groceries",
                "budgeted": 123.45
            })))
            .await
            .expect("update");

        assert_eq!(updated.category.budgeted, 123.45);
        assert_eq!(
            updated.message,
            "Set 'Groceries' to $123.45 assigned for 2025-01-01"
        );
    }

    #[tokio::test]
    async fn update_category_budget_rejects_non_finite_amount() {
        let server = MockServer::start().await;
        let tools = tools_for(&server, Some("b1"));

        let err = tools
            .update_category_budget(&UpdateCategoryBudgetParams {
                budget_id: None,
                month: "current".to_owned(),
                category_id: "groceries".to_owned(),
                budgeted: f64::INFINITY,
            })
            .await
            .expect_err("infinite amount");

        assert_eq!(err.kind(), "invalid_input");
        assert!(no_requests_sent(&server).await);
    }

    #[tokio::test]
    async fn approve_transaction_can_unapprove() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/budgets/b1/transactions/t1"))
            .and(body_json(json!({"transaction": {"approved": false}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"transaction": {
                "id": "t1", "date": "2025-01-02", "amount": -1_000, "approved": false
            }}})))
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let written = tools
            .approve_transaction(&params(json!({"transactionId": "t1", "approved": false})))
            .await
            .expect("unapprove");

        assert_eq!(written.message, "Unapproved transaction t1");
    }

    #[tokio::test]
    async fn clear_transaction_sends_status() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/budgets/b1/transactions/t1"))
            .and(body_json(json!({"transaction": {"cleared": "reconciled"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"transaction": {
                "id": "t1", "date": "2025-01-02", "amount": -1_000, "cleared": "reconciled"
            }}})))
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let written = tools
            .clear_transaction(&params(json!({"transactionId": "t1", "cleared": "reconciled"})))
            .await
            .expect("clear");

        assert_eq!(written.message, "Marked as reconciled transaction t1");
        assert_eq!(
            written.transaction.map(|tx| tx.cleared).as_deref(),
            Some("reconciled")
        );
    }

    #[tokio::test]
    async fn payees_are_cached_until_a_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/payees"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"payees": [
                {"id": "p1", "name": "Cafe"},
                {"id": "p2", "name": "Closed shop", "deleted": true}
            ]}})))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/budgets/b1/transactions/t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"transaction": {
                "id": "t1", "date": "2025-01-02", "amount": -1_000, "deleted": true
            }}})))
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let first = tools.get_payees(&BudgetParams::default()).await.expect("payees");
        let _cached = tools.get_payees(&BudgetParams::default()).await.expect("cached");
        let deleted = tools
            .delete_transaction(&params(json!({"transactionId": "t1"})))
            .await
            .expect("delete");
        let _fresh = tools.get_payees(&BudgetParams::default()).await.expect("refetch");

        assert_eq!(first["payee_count"], json!(1));
        assert_eq!(first["payees"][0]["name"], "Cafe");
        assert_eq!(deleted.message, "Deleted transaction t1");
    }

    #[tokio::test]
    async fn delete_scheduled_transaction_reports_entry() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/budgets/b1/scheduled_transactions/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {
                "scheduled_transaction": {
                    "id": "s1", "date_first": "2025-01-01", "date_next": "2025-02-01",
                    "frequency": "monthly", "amount": -15_990, "deleted": true
                }
            }})))
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let deleted = tools
            .delete_scheduled_transaction(&params(json!({"scheduledTransactionId": "s1"})))
            .await
            .expect("delete");

        assert_eq!(deleted.message, "Deleted scheduled transaction s1");
        assert_eq!(deleted.scheduled_transaction.amount, -15.99);
    }

    #[tokio::test]
    async fn create_scheduled_transaction_sends_frequency() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/budgets/b1/scheduled_transactions"))
            .and(body_json(json!({"scheduled_transaction": {
                "account_id": "a1", "date": "2025-02-01", "amount": -15_990,
                "frequency": "monthly", "payee_name": "Streaming"
            }})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {
                "scheduled_transaction": {
                    "id": "s9", "date_first": "2025-02-01", "date_next": "2025-02-01",
                    "frequency": "monthly", "amount": -15_990, "payee_name": "Streaming"
                }
            }})))
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let created = tools
            .create_scheduled_transaction(&params(json!({
                "accountId": "a1",
                "date": "2025-02-01",
                "amount": -15.99,
                "frequency": "monthly",
                "payeeName": "Streaming"
            })))
            .await
            .expect("schedule");

        assert_eq!(created.scheduled_transaction.id, "s9");
        assert_eq!(created.message, "Scheduled $-15.99 monthly starting 2025-02-01");
    }

    #[tokio::test]
    async fn month_detail_keeps_every_category_and_skips_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/months/2025-01-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"month": {
                "month": "2025-01-01", "income": 0, "budgeted": 0, "activity": 0,
                "to_be_budgeted": 42_000, "age_of_money": 30,
                "categories": [
                    {"id": "c1", "name": "Dining", "budgeted": 0, "activity": 0, "balance": 0},
                    {"id": "c2", "name": "Hidden", "hidden": true, "budgeted": 0,
                     "activity": 0, "balance": 0}
                ]
            }}})))
            .expect(2)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));
        let month: MonthParams = params(json!({"month": "2025-01-01"}));

        let detail = tools.get_month_detail(&month).await.expect("detail");
        let _again = tools.get_month_detail(&month).await.expect("detail again");

        assert_eq!(detail.to_be_budgeted, 42.0);
        assert_eq!(detail.age_of_money, Some(30));
        assert_eq!(detail.categories.len(), 2);
    }

    #[tokio::test]
    async fn single_payee_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1/payees/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"payee": {
                "id": "p1", "name": "Transfer : Savings", "transfer_account_id": "sav"
            }}})))
            .expect(1)
            .mount(&server)
            .await;
        let tools = tools_for(&server, Some("b1"));

        let payee = tools
            .get_single_payee(&params(json!({"payeeId": "p1"})))
            .await
            .expect("payee");

        assert_eq!(payee.name, "Transfer : Savings");
        assert_eq!(payee.transfer_account_id.as_deref(), Some("sav"));
    }

    #[tokio::test]
    async fn health_check_reports_budget_reachability() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"user": {"id": "u1"}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/budgets/b1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"budget": {"id": "b1", "name": "Main"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let with_budget = tools_for(&server, Some("b1"))
            .health_check(&BudgetParams::default())
            .await
            .expect("health");
        let without_budget = tools_for(&server, None)
            .health_check(&BudgetParams::default())
            .await
            .expect("health");

        assert_eq!(with_budget.status, "ok");
        assert_eq!(with_budget.user_id, "u1");
        assert_eq!(with_budget.budget_status, "Connected to \"Main\"");
        assert_eq!(without_budget.budget_status, "Not checked");
    }
}
