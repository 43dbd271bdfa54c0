//! Wire types for the subset of the YNAB v1 API the tools use.
//!
//! Response types only model the fields the tools read; unknown fields are
//! ignored. Request types skip unset optional fields so PATCH/PUT bodies only
//! touch what the caller asked to change. Amounts are milliunits.

use serde::{Deserialize, Serialize};

/// `{"data": ...}` success envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    /// Payload.
    pub(crate) data: T,
}

/// `{"error": ...}` error envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    /// Error detail.
    pub(crate) error: ApiErrorDetail,
}

/// Error detail returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorDetail {
    /// Error ID, usually the HTTP status as a string.
    pub(crate) id: String,
    /// Short machine-readable name.
    pub(crate) name: String,
    /// Human-readable description.
    pub(crate) detail: String,
}

/// Authenticated user.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct User {
    /// User ID.
    pub(crate) id: String,
}

/// Wrapper for `GET /user`.
#[derive(Debug, Deserialize)]
pub(crate) struct UserData {
    /// User.
    pub(crate) user: User,
}

/// Budget summary.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BudgetSummary {
    /// Budget ID.
    pub(crate) id: String,
    /// Budget name.
    pub(crate) name: String,
}

/// Wrapper for `GET /budgets`.
#[derive(Debug, Deserialize)]
pub(crate) struct BudgetsData {
    /// Budgets.
    pub(crate) budgets: Vec<BudgetSummary>,
}

/// Wrapper for `GET /budgets/{id}`.
#[derive(Debug, Deserialize)]
pub(crate) struct BudgetData {
    /// Budget.
    pub(crate) budget: BudgetSummary,
}

/// Account.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Account {
    /// Account ID.
    pub(crate) id: String,
    /// Display name.
    pub(crate) name: String,
    /// Account type (`checking`, `savings`, `creditCard`, ...).
    #[serde(rename = "type")]
    pub(crate) kind: String,
    /// Whether the account is on budget.
    pub(crate) on_budget: bool,
    /// Whether the account is closed.
    pub(crate) closed: bool,
    /// Balance in milliunits.
    pub(crate) balance: i64,
    /// Payee used when transferring into this account.
    #[serde(default)]
    pub(crate) transfer_payee_id: Option<String>,
    /// Whether the account is deleted.
    pub(crate) deleted: bool,
}

/// Wrapper for `GET /budgets/{id}/accounts`.
#[derive(Debug, Deserialize)]
pub(crate) struct AccountsData {
    /// Accounts.
    pub(crate) accounts: Vec<Account>,
}

/// Category as seen within a budget month.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Category {
    /// Category ID.
    pub(crate) id: String,
    /// Category name.
    pub(crate) name: String,
    /// Whether the category is hidden.
    #[serde(default)]
    pub(crate) hidden: bool,
    /// Assigned amount in milliunits.
    pub(crate) budgeted: i64,
    /// Activity in milliunits.
    pub(crate) activity: i64,
    /// Available balance in milliunits.
    pub(crate) balance: i64,
    /// Whether the category is deleted.
    #[serde(default)]
    pub(crate) deleted: bool,
}

/// Wrapper for month category endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct CategoryData {
    /// Category.
    pub(crate) category: Category,
}

/// Budget month detail.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MonthDetail {
    /// First day of the month.
    pub(crate) month: String,
    /// Month note.
    #[serde(default)]
    pub(crate) note: Option<String>,
    /// Income in milliunits.
    pub(crate) income: i64,
    /// Total assigned in milliunits.
    pub(crate) budgeted: i64,
    /// Total activity in milliunits.
    pub(crate) activity: i64,
    /// Ready to assign in milliunits.
    pub(crate) to_be_budgeted: i64,
    /// Age of money in days.
    #[serde(default)]
    pub(crate) age_of_money: Option<i64>,
    /// Categories.
    #[serde(default)]
    pub(crate) categories: Vec<Category>,
}

/// Wrapper for `GET /budgets/{id}/months/{month}`.
#[derive(Debug, Deserialize)]
pub(crate) struct MonthData {
    /// Month.
    pub(crate) month: MonthDetail,
}

/// Subtransaction of a split transaction.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SubTransaction {
    /// Amount in milliunits.
    pub(crate) amount: i64,
    /// Memo.
    #[serde(default)]
    pub(crate) memo: Option<String>,
    /// Category ID.
    #[serde(default)]
    pub(crate) category_id: Option<String>,
    /// Category name.
    #[serde(default)]
    pub(crate) category_name: Option<String>,
    /// Whether the subtransaction is deleted.
    #[serde(default)]
    pub(crate) deleted: bool,
}

/// Transaction.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Transaction {
    /// Transaction ID.
    pub(crate) id: String,
    /// Date, `YYYY-MM-DD`.
    pub(crate) date: String,
    /// Amount in milliunits; negative is an outflow.
    pub(crate) amount: i64,
    /// Memo.
    #[serde(default)]
    pub(crate) memo: Option<String>,
    /// Cleared status.
    #[serde(default)]
    pub(crate) cleared: String,
    /// Whether the transaction is approved.
    #[serde(default)]
    pub(crate) approved: bool,
    /// Account ID.
    #[serde(default)]
    pub(crate) account_id: String,
    /// Account name.
    #[serde(default)]
    pub(crate) account_name: Option<String>,
    /// Payee name.
    #[serde(default)]
    pub(crate) payee_name: Option<String>,
    /// Category ID.
    #[serde(default)]
    pub(crate) category_id: Option<String>,
    /// Category name.
    #[serde(default)]
    pub(crate) category_name: Option<String>,
    /// Set when the transaction is a transfer between accounts.
    #[serde(default)]
    pub(crate) transfer_account_id: Option<String>,
    /// Counterpart transaction of a transfer.
    #[serde(default)]
    pub(crate) transfer_transaction_id: Option<String>,
    /// Import ID.
    #[serde(default)]
    pub(crate) import_id: Option<String>,
    /// Whether the transaction is deleted.
    #[serde(default)]
    pub(crate) deleted: bool,
    /// Split lines.
    #[serde(default)]
    pub(crate) subtransactions: Vec<SubTransaction>,
}

/// Wrapper for endpoints returning a transaction list.
#[derive(Debug, Deserialize)]
pub(crate) struct TransactionsData {
    /// Transactions.
    pub(crate) transactions: Vec<Transaction>,
}

/// Wrapper for endpoints returning one transaction.
#[derive(Debug, Deserialize)]
pub(crate) struct TransactionData {
    /// Transaction.
    pub(crate) transaction: Transaction,
}

/// Result of a create/bulk-update call.
#[derive(Debug, Deserialize)]
pub(crate) struct SaveTransactionsData {
    /// IDs of the saved transactions.
    #[serde(default)]
    pub(crate) transaction_ids: Vec<String>,
    /// Import IDs rejected as duplicates.
    #[serde(default)]
    pub(crate) duplicate_import_ids: Vec<String>,
    /// The saved transaction when exactly one was sent.
    #[serde(default)]
    pub(crate) transaction: Option<Transaction>,
}

/// Scheduled transaction.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ScheduledTransaction {
    /// Scheduled transaction ID.
    pub(crate) id: String,
    /// First occurrence.
    pub(crate) date_first: String,
    /// Next occurrence.
    pub(crate) date_next: String,
    /// Recurrence frequency.
    pub(crate) frequency: String,
    /// Amount in milliunits.
    pub(crate) amount: i64,
    /// Memo.
    #[serde(default)]
    pub(crate) memo: Option<String>,
    /// Account name.
    #[serde(default)]
    pub(crate) account_name: Option<String>,
    /// Payee name.
    #[serde(default)]
    pub(crate) payee_name: Option<String>,
    /// Category name.
    #[serde(default)]
    pub(crate) category_name: Option<String>,
    /// Whether the scheduled transaction is deleted.
    #[serde(default)]
    pub(crate) deleted: bool,
}

/// Wrapper for `GET /budgets/{id}/scheduled_transactions`.
#[derive(Debug, Deserialize)]
pub(crate) struct ScheduledTransactionsData {
    /// Scheduled transactions.
    pub(crate) scheduled_transactions: Vec<ScheduledTransaction>,
}

/// Wrapper for endpoints returning one scheduled transaction.
#[derive(Debug, Deserialize)]
pub(crate) struct ScheduledTransactionData {
    /// Scheduled transaction.
    pub(crate) scheduled_transaction: ScheduledTransaction,
}

/// Payee.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Payee {
    /// Payee ID.
    pub(crate) id: String,
    /// Payee name.
    pub(crate) name: String,
    /// Account this payee transfers into, if any.
    #[serde(default)]
    pub(crate) transfer_account_id: Option<String>,
    /// Whether the payee is deleted.
    #[serde(default)]
    pub(crate) deleted: bool,
}

/// Wrapper for `GET /budgets/{id}/payees`.
#[derive(Debug, Deserialize)]
pub(crate) struct PayeesData {
    /// Payees.
    pub(crate) payees: Vec<Payee>,
}

/// Wrapper for `GET /budgets/{id}/payees/{payee_id}`.
#[derive(Debug, Deserialize)]
pub(crate) struct PayeeData {
    /// Payee.
    pub(crate) payee: Payee,
}

// ── Request bodies ──────────────────────────────────────────────────

/// Cleared status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ClearedStatus {
    /// Confirmed by the bank.
    Cleared,
    /// Pending.
    Uncleared,
    /// Locked after reconciliation.
    Reconciled,
}

impl ClearedStatus {
    /// Wire name of the status.
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Cleared => "cleared",
            Self::Uncleared => "uncleared",
            Self::Reconciled => "reconciled",
        }
    }
}

/// Recurrence of a scheduled transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) enum Frequency {
    /// One-off.
    Never,
    /// Every day.
    Daily,
    /// Every week.
    Weekly,
    /// Every two weeks.
    EveryOtherWeek,
    /// Twice a month.
    TwiceAMonth,
    /// Every four weeks.
    Every4Weeks,
    /// Every month.
    Monthly,
    /// Every two months.
    EveryOtherMonth,
    /// Every three months.
    Every3Months,
    /// Every four months.
    Every4Months,
    /// Twice a year.
    TwiceAYear,
    /// Every year.
    Yearly,
    /// Every two years.
    EveryOtherYear,
}

impl Frequency {
    /// Wire name of the frequency.
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::EveryOtherWeek => "everyOtherWeek",
            Self::TwiceAMonth => "twiceAMonth",
            Self::Every4Weeks => "every4Weeks",
            Self::Monthly => "monthly",
            Self::EveryOtherMonth => "everyOtherMonth",
            Self::Every3Months => "every3Months",
            Self::Every4Months => "every4Months",
            Self::TwiceAYear => "twiceAYear",
            Self::Yearly => "yearly",
            Self::EveryOtherYear => "everyOtherYear",
        }
    }
}

/// Split line for a new or updated transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct SaveSubTransaction {
    /// Amount in milliunits.
    pub(crate) amount: i64,
    /// Category ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) category_id: Option<String>,
    /// Payee ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) payee_id: Option<String>,
    /// Payee name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) payee_name: Option<String>,
    /// Memo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) memo: Option<String>,
}

/// Transaction fields for create, update and bulk-update calls.
///
/// Every field is optional so the same type serves PUT bodies, where unset
/// fields are left untouched. `Some(None)` on a nullable field sends an
/// explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct SaveTransaction {
    /// Transaction ID (bulk update).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<String>,
    /// Import ID (bulk update, create).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) import_id: Option<String>,
    /// Account ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) account_id: Option<String>,
    /// Date, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) date: Option<String>,
    /// Amount in milliunits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) amount: Option<i64>,
    /// Payee ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) payee_id: Option<Option<String>>,
    /// Payee name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) payee_name: Option<Option<String>>,
    /// Category ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) category_id: Option<Option<String>>,
    /// Memo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) memo: Option<Option<String>>,
    /// Cleared status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) cleared: Option<ClearedStatus>,
    /// Approval flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) approved: Option<bool>,
    /// Flag colour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) flag_color: Option<Option<String>>,
    /// Split lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) subtransactions: Option<Vec<SaveSubTransaction>>,
}

/// New scheduled transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SaveScheduledTransaction {
    /// Account ID.
    pub(crate) account_id: String,
    /// First occurrence, `YYYY-MM-DD`.
    pub(crate) date: String,
    /// Amount in milliunits.
    pub(crate) amount: i64,
    /// Recurrence.
    pub(crate) frequency: Frequency,
    /// Payee ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) payee_id: Option<String>,
    /// Payee name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) payee_name: Option<String>,
    /// Category ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) category_id: Option<String>,
    /// Memo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) memo: Option<String>,
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use serde_json::json;

    use super::{ClearedStatus, Frequency, SaveTransaction, Transaction};

    #[test]
    fn save_transaction_skips_unset_fields() {
        let body = SaveTransaction {
            approved: Some(true),
            ..SaveTransaction::default()
        };
        let value = serde_json::to_value(&body).expect("should serialize");
        assert_eq!(value, json!({"approved": true}));
    }

    #[test]
    fn save_transaction_sends_explicit_null() {
        let body = SaveTransaction {
            category_id: Some(None),
            cleared: Some(ClearedStatus::Reconciled),
            ..SaveTransaction::default()
        };
        let value = serde_json::to_value(&body).expect("should serialize");
        assert_eq!(value, json!({"category_id": null, "cleared": "reconciled"}));
    }

    #[test]
    fn frequency_uses_camel_case() {
        let value = serde_json::to_value(Frequency::EveryOtherWeek).expect("should serialize");
        assert_eq!(value, json!("everyOtherWeek"));
        assert_eq!(Frequency::Every4Weeks.as_str(), "every4Weeks");
    }

    #[test]
    fn transaction_tolerates_missing_optional_fields() {
        let json = r#"{"id": "t1", "date": "2025-01-02", "amount": -5000}"#;
        let tx: Transaction = serde_json::from_str(json).expect("should deserialize");
        assert_eq!(tx.amount, -5000);
        assert!(tx.subtransactions.is_empty());
        assert!(tx.transfer_account_id.is_none());
        assert!(!tx.deleted);
    }
}
