//! Response structs for MCP tool outputs.
//!
//! Amounts are converted from milliunits to dollars and records are trimmed
//! to the fields an LLM assistant needs.

use serde::Serialize;

use crate::analysis::{CategorySpending, MonthStats, ReportTotals};
use crate::money::from_milliunits;
use crate::ynab::models::{
    Account, BudgetSummary, Category, MonthDetail, Payee, ScheduledTransaction, SubTransaction,
    Transaction,
};

/// Budget entry of `list_budgets`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct BudgetResponse {
    /// Budget ID.
    pub(crate) id: String,
    /// Budget name.
    pub(crate) name: String,
}

impl BudgetResponse {
    /// Converts an API budget.
    pub(crate) fn from_budget(budget: &BudgetSummary) -> Self {
        Self {
            id: budget.id.clone(),
            name: budget.name.clone(),
        }
    }
}

/// Output of `list_budgets`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct BudgetListResponse {
    /// Budgets.
    pub(crate) budgets: Vec<BudgetResponse>,
}

/// Account entry.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AccountResponse {
    /// Account ID.
    pub(crate) id: String,
    /// Account name.
    pub(crate) name: String,
    /// Account type.
    #[serde(rename = "type")]
    pub(crate) kind: String,
    /// Balance in dollars.
    pub(crate) balance: f64,
    /// Whether the account is on budget.
    pub(crate) on_budget: bool,
    /// Whether the account is closed.
    pub(crate) closed: bool,
}

impl AccountResponse {
    /// Converts an API account.
    pub(crate) fn from_account(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            kind: account.kind.clone(),
            balance: from_milliunits(account.balance),
            on_budget: account.on_budget,
            closed: account.closed,
        }
    }
}

/// Category as reported by `get_month_detail`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CategoryResponse {
    /// Category ID.
    pub(crate) id: String,
    /// Category name.
    pub(crate) name: String,
    /// Assigned amount in dollars.
    pub(crate) budgeted: f64,
    /// Activity in dollars.
    pub(crate) activity: f64,
    /// Available balance in dollars.
    pub(crate) balance: f64,
    /// Whether the category is hidden.
    pub(crate) hidden: bool,
    /// Whether the category is deleted.
    pub(crate) deleted: bool,
}

impl CategoryResponse {
    /// Converts an API category.
    pub(crate) fn from_category(category: &Category) -> Self {
        Self {
            id: category.id.clone(),
            name: category.name.clone(),
            budgeted: from_milliunits(category.budgeted),
            activity: from_milliunits(category.activity),
            balance: from_milliunits(category.balance),
            hidden: category.hidden,
            deleted: category.deleted,
        }
    }
}

/// Output of `get_month_detail`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct MonthDetailResponse {
    /// First day of the month.
    pub(crate) month: String,
    /// Month note.
    pub(crate) note: Option<String>,
    /// Ready to assign in dollars.
    pub(crate) to_be_budgeted: f64,
    /// Age of money in days.
    pub(crate) age_of_money: Option<i64>,
    /// Income in dollars.
    pub(crate) income: f64,
    /// Total assigned in dollars.
    pub(crate) budgeted: f64,
    /// Total activity in dollars.
    pub(crate) activity: f64,
    /// All categories of the month.
    pub(crate) categories: Vec<CategoryResponse>,
}

impl MonthDetailResponse {
    /// Converts an API month.
    pub(crate) fn from_month(month: &MonthDetail) -> Self {
        Self {
            month: month.month.clone(),
            note: month.note.clone(),
            to_be_budgeted: from_milliunits(month.to_be_budgeted),
            age_of_money: month.age_of_money,
            income: from_milliunits(month.income),
            budgeted: from_milliunits(month.budgeted),
            activity: from_milliunits(month.activity),
            categories: month
                .categories
                .iter()
                .map(CategoryResponse::from_category)
                .collect(),
        }
    }
}

/// Visible category in `budget_summary`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SummaryCategory {
    /// Category ID.
    pub(crate) id: String,
    /// Category name.
    pub(crate) name: String,
    /// Assigned amount in dollars.
    pub(crate) budgeted: f64,
    /// Activity in dollars.
    pub(crate) activity: f64,
    /// Available balance in dollars.
    pub(crate) balance: f64,
    /// Whether the balance is negative.
    pub(crate) overspent: bool,
}

impl SummaryCategory {
    /// Converts an API category.
    pub(crate) fn from_category(category: &Category) -> Self {
        Self {
            id: category.id.clone(),
            name: category.name.clone(),
            budgeted: from_milliunits(category.budgeted),
            activity: from_milliunits(category.activity),
            balance: from_milliunits(category.balance),
            overspent: category.balance < 0,
        }
    }
}

/// Output of `budget_summary`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct BudgetSummaryResponse {
    /// First day of the month.
    pub(crate) month: String,
    /// Income in dollars.
    pub(crate) income: f64,
    /// Total assigned in dollars.
    pub(crate) budgeted: f64,
    /// Total activity in dollars.
    pub(crate) activity: f64,
    /// Ready to assign in dollars.
    pub(crate) to_be_budgeted: f64,
    /// Open accounts.
    pub(crate) accounts: Vec<AccountResponse>,
    /// Visible categories.
    pub(crate) categories: Vec<SummaryCategory>,
    /// Number of overspent categories.
    pub(crate) overspent_count: usize,
}

/// Split line in a transaction response.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SubTransactionResponse {
    /// Amount in dollars.
    pub(crate) amount: f64,
    /// Category name.
    pub(crate) category_name: Option<String>,
    /// Memo.
    pub(crate) memo: Option<String>,
}

impl SubTransactionResponse {
    /// Converts an API subtransaction.
    pub(crate) fn from_sub(sub: &SubTransaction) -> Self {
        Self {
            amount: from_milliunits(sub.amount),
            category_name: sub.category_name.clone(),
            memo: sub.memo.clone(),
        }
    }
}

/// Transaction entry.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct TransactionResponse {
    /// Transaction ID.
    pub(crate) id: String,
    /// Date.
    pub(crate) date: String,
    /// Amount in dollars; negative for outflows.
    pub(crate) amount: f64,
    /// Memo.
    pub(crate) memo: Option<String>,
    /// Payee name.
    pub(crate) payee_name: Option<String>,
    /// Category name.
    pub(crate) category_name: Option<String>,
    /// Account ID.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub(crate) account_id: String,
    /// Account name.
    pub(crate) account_name: Option<String>,
    /// Cleared status.
    pub(crate) cleared: String,
    /// Approval flag.
    pub(crate) approved: bool,
    /// Counterpart account of a transfer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) transfer_account_id: Option<String>,
    /// Import ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) import_id: Option<String>,
    /// Live split lines.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) subtransactions: Vec<SubTransactionResponse>,
}

impl TransactionResponse {
    /// Converts an API transaction.
    pub(crate) fn from_transaction(tx: &Transaction) -> Self {
        Self {
            id: tx.id.clone(),
            date: tx.date.clone(),
            amount: from_milliunits(tx.amount),
            memo: tx.memo.clone(),
            payee_name: tx.payee_name.clone(),
            category_name: tx.category_name.clone(),
            account_id: tx.account_id.clone(),
            account_name: tx.account_name.clone(),
            cleared: tx.cleared.clone(),
            approved: tx.approved,
            transfer_account_id: tx.transfer_account_id.clone(),
            import_id: tx.import_id.clone(),
            subtransactions: tx
                .subtransactions
                .iter()
                .filter(|sub| !sub.deleted)
                .map(SubTransactionResponse::from_sub)
                .collect(),
        }
    }
}

/// Output of `get_unapproved_transactions`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct TransactionListResponse {
    /// Transactions.
    pub(crate) transactions: Vec<TransactionResponse>,
    /// Number of transactions.
    pub(crate) transaction_count: usize,
}

/// Filters echoed back by `analyze_transactions`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionFilters {
    /// Account filter.
    pub(crate) account_id: Option<String>,
    /// Category filter.
    pub(crate) category_id: Option<String>,
    /// Start date.
    pub(crate) from_date: Option<String>,
    /// End date.
    pub(crate) to_date: Option<String>,
}

/// Summary block of `analyze_transactions`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct TransactionSearchSummary {
    /// Matches before the limit was applied.
    pub(crate) total_found: usize,
    /// Rows returned.
    pub(crate) showing: usize,
    /// Filters in effect.
    pub(crate) filters: TransactionFilters,
}

/// Output of `analyze_transactions`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct TransactionSearchResponse {
    /// Counts and filters.
    pub(crate) summary: TransactionSearchSummary,
    /// Matching transactions, newest first.
    pub(crate) transactions: Vec<TransactionResponse>,
}

/// Date window of a spending analysis.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SpendingPeriod {
    /// First day included.
    pub(crate) from: String,
    /// Last day included.
    pub(crate) to: String,
    /// Window length in months.
    pub(crate) months_back: u32,
}

/// Output of `analyze_spending_by_category`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SpendingAnalysisResponse {
    /// Date window.
    pub(crate) period: SpendingPeriod,
    /// Total outflow in dollars.
    pub(crate) total_spending: f64,
    /// Categories, largest first.
    pub(crate) category_breakdown: Vec<CategorySpending>,
    /// One-sentence summary for the assistant.
    pub(crate) conversational_summary: String,
}

/// Parameters echoed back by `generate_spending_report`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReportParameters {
    /// Budget ID.
    pub(crate) budget_id: String,
    /// Window length in months.
    pub(crate) months_back: u32,
    /// First day included.
    pub(crate) from: String,
}

/// Output of `generate_spending_report`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SpendingReportResponse {
    /// Parameters in effect.
    pub(crate) parameters: ReportParameters,
    /// Rows per month, oldest first.
    pub(crate) monthly_report: Vec<MonthStats>,
    /// Totals and averages.
    pub(crate) totals: ReportTotals,
    /// One-sentence summary for the assistant.
    pub(crate) conversational_summary: String,
}

/// Scheduled transaction entry.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ScheduledTransactionResponse {
    /// Scheduled transaction ID.
    pub(crate) id: String,
    /// First occurrence.
    pub(crate) date_first: String,
    /// Next occurrence.
    pub(crate) date_next: String,
    /// Recurrence.
    pub(crate) frequency: String,
    /// Amount in dollars.
    pub(crate) amount: f64,
    /// Memo.
    pub(crate) memo: Option<String>,
    /// Account name.
    pub(crate) account_name: Option<String>,
    /// Payee name.
    pub(crate) payee_name: Option<String>,
    /// Category name, `Uncategorized` when unset.
    pub(crate) category_name: String,
}

impl ScheduledTransactionResponse {
    /// Converts an API scheduled transaction.
    pub(crate) fn from_scheduled(scheduled: &ScheduledTransaction) -> Self {
        Self {
            id: scheduled.id.clone(),
            date_first: scheduled.date_first.clone(),
            date_next: scheduled.date_next.clone(),
            frequency: scheduled.frequency.clone(),
            amount: from_milliunits(scheduled.amount),
            memo: scheduled.memo.clone(),
            account_name: scheduled.account_name.clone(),
            payee_name: scheduled.payee_name.clone(),
            category_name: scheduled
                .category_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "Uncategorized".to_owned()),
        }
    }
}

/// Payee entry.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct PayeeResponse {
    /// Payee ID.
    pub(crate) id: String,
    /// Payee name.
    pub(crate) name: String,
    /// Account this payee transfers into.
    pub(crate) transfer_account_id: Option<String>,
}

impl PayeeResponse {
    /// Converts an API payee.
    pub(crate) fn from_payee(payee: &Payee) -> Self {
        Self {
            id: payee.id.clone(),
            name: payee.name.clone(),
            transfer_account_id: payee.transfer_account_id.clone(),
        }
    }
}

/// Output of `get_payees`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct PayeeListResponse {
    /// Payees.
    pub(crate) payees: Vec<PayeeResponse>,
    /// Number of payees.
    pub(crate) payee_count: usize,
}

/// Output of `health_check`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct HealthResponse {
    /// Always `ok` when returned as a success.
    pub(crate) status: &'static str,
    /// Authenticated user ID.
    pub(crate) user_id: String,
    /// Round-trip time of the user lookup.
    pub(crate) latency_ms: u64,
    /// Reachability of the selected budget.
    pub(crate) budget_status: String,
    /// YNAB API version in use.
    pub(crate) api_version: &'static str,
    /// Server name and version.
    pub(crate) server_version: &'static str,
}

/// Output of single-transaction writes.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct TransactionWriteResponse {
    /// Always `true` when returned as a success.
    pub(crate) success: bool,
    /// Human-readable outcome.
    pub(crate) message: String,
    /// The transaction after the write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) transaction: Option<TransactionResponse>,
}

/// Output of bulk transaction writes.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct BulkWriteResponse {
    /// Number of transactions sent.
    pub(crate) total_requested: usize,
    /// Number of transactions saved.
    pub(crate) total_saved: usize,
    /// Number of rejected duplicate import IDs.
    pub(crate) duplicates_found: usize,
    /// Rejected duplicate import IDs.
    pub(crate) duplicate_import_ids: Vec<String>,
    /// IDs of the saved transactions.
    pub(crate) transaction_ids: Vec<String>,
}

/// Output of `create_split_transaction`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SplitResponse {
    /// Always `true` when returned as a success.
    pub(crate) success: bool,
    /// Human-readable outcome.
    pub(crate) message: String,
    /// Split transaction ID.
    pub(crate) transaction_id: String,
    /// Number of live split lines.
    pub(crate) subtransaction_count: usize,
    /// Total in dollars.
    pub(crate) total_amount: f64,
}

/// Output of `create_transfer`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct TransferResponse {
    /// Always `true` when returned as a success.
    pub(crate) success: bool,
    /// Human-readable outcome.
    pub(crate) message: String,
    /// ID of the outflow on the source account.
    pub(crate) transaction_id: Option<String>,
    /// ID of the linked inflow on the destination account.
    pub(crate) transfer_transaction_id: Option<String>,
}

/// Output of scheduled-transaction writes.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ScheduledWriteResponse {
    /// Always `true` when returned as a success.
    pub(crate) success: bool,
    /// Human-readable outcome.
    pub(crate) message: String,
    /// The scheduled transaction.
    pub(crate) scheduled_transaction: ScheduledTransactionResponse,
}

/// Output of `update_category_budget`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CategoryBudgetResponse {
    /// Always `true` when returned as a success.
    pub(crate) success: bool,
    /// Human-readable outcome.
    pub(crate) message: String,
    /// The category after the update.
    pub(crate) category: CategoryResponse,
}

/// Output of `move_funds`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct MoveFundsResponse {
    /// Always `true` when returned as a success.
    pub(crate) success: bool,
    /// Human-readable outcome.
    pub(crate) message: String,
    /// Source category's new assigned amount in dollars.
    pub(crate) new_source_budgeted: f64,
    /// Destination category's new assigned amount in dollars.
    pub(crate) new_destination_budgeted: f64,
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
    use serde_json::json;

    use super::{
        AccountResponse, ScheduledTransactionResponse, SummaryCategory, TransactionResponse,
    };
    use crate::ynab::models::{Account, Category, ScheduledTransaction, Transaction};

    #[test]
    fn account_balance_in_dollars() {
        let account: Account = serde_json::from_value(json!({
            "id": "a1", "name": "Checking", "type": "checking", "on_budget": true,
            "closed": false, "balance": 1_234_560, "deleted": false
        }))
        .expect("account");
        let response = AccountResponse::from_account(&account);
        assert_eq!(response.balance, 1234.56);
        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(value["type"], "checking");
    }

    #[test]
    fn negative_balance_is_overspent() {
        let category: Category = serde_json::from_value(json!({
            "id": "c1", "name": "Dining", "budgeted": 100_000,
            "activity": -130_000, "balance": -30_000
        }))
        .expect("category");
        let summary = SummaryCategory::from_category(&category);
        assert!(summary.overspent);
        assert_eq!(summary.balance, -30.0);
    }

    #[test]
    fn transaction_response_hides_deleted_splits() {
        let tx: Transaction = serde_json::from_value(json!({
            "id": "t1", "date": "2025-01-02", "amount": -60_000,
            "subtransactions": [
                {"amount": -40_000, "category_name": "Groceries", "deleted": false},
                {"amount": -20_000, "category_name": "Dining", "deleted": true}
            ]
        }))
        .expect("transaction");
        let response = TransactionResponse::from_transaction(&tx);
        assert_eq!(response.amount, -60.0);
        assert_eq!(response.subtransactions.len(), 1);
    }

    #[test]
    fn transaction_response_carries_account_id() {
        let tx: Transaction = serde_json::from_value(json!({
            "id": "t1", "date": "2025-01-02", "amount": -1_000,
            "account_id": "acc-1", "account_name": "Checking"
        }))
        .expect("transaction");
        let value = serde_json::to_value(TransactionResponse::from_transaction(&tx))
            .expect("serialize");
        assert_eq!(value["account_id"], "acc-1");
        assert_eq!(value["account_name"], "Checking");

        let bare: Transaction =
            serde_json::from_value(json!({"id": "t2", "date": "2025-01-03", "amount": 0}))
                .expect("transaction");
        let value = serde_json::to_value(TransactionResponse::from_transaction(&bare))
            .expect("serialize");
        assert!(value.get("account_id").is_none());
    }

    #[test]
    fn scheduled_without_category_is_uncategorized() {
        let scheduled: ScheduledTransaction = serde_json::from_value(json!({
            "id": "s1", "date_first": "2025-01-01", "date_next": "2025-02-01",
            "frequency": "monthly", "amount": -15_990
        }))
        .expect("scheduled");
        let response = ScheduledTransactionResponse::from_scheduled(&scheduled);
        assert_eq!(response.category_name, "Uncategorized");
        assert_eq!(response.amount, -15.99);
    }
}
