//! Parameter structs for MCP tool inputs.
//!
//! Each struct derives [`serde::Deserialize`] and [`schemars::JsonSchema`]
//! so that `rmcp` can auto-generate JSON schemas for tool parameters. Field
//! names are camelCase on the wire; `budget_id` is accepted as an alias of
//! `budgetId`. Amounts are in dollars.

use schemars::JsonSchema;
use serde::Deserialize;

use crate::money::to_milliunits;
use crate::ynab::models::{
    ClearedStatus, Frequency, SaveScheduledTransaction, SaveSubTransaction, SaveTransaction,
};

/// Parameters for tools that only need a budget.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BudgetParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`. Use `list_budgets` to discover budgets.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
}

/// Parameters for `budget_summary` and `get_month_detail`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MonthParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Budget month: `current` (default) or `YYYY-MM-DD` (first day of the month).
    pub(crate) month: Option<String>,
}

/// Parameters for `analyze_spending_by_category`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalyzeSpendingParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Number of months to look back (default 1).
    pub(crate) months_back: Option<u32>,
}

/// Parameters for `generate_spending_report`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SpendingReportParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Number of months to cover (default 6).
    pub(crate) months_back: Option<u32>,
}

/// Parameters for `analyze_transactions`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalyzeTransactionsParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Only transactions of this account.
    pub(crate) account_id: Option<String>,
    /// Only transactions of this category.
    pub(crate) category_id: Option<String>,
    /// Start date (inclusive), format `YYYY-MM-DD`.
    pub(crate) from_date: Option<String>,
    /// End date (inclusive), format `YYYY-MM-DD`.
    pub(crate) to_date: Option<String>,
    /// Maximum number of transactions to return (default 50).
    pub(crate) limit: Option<usize>,
}

/// Parameters for `get_single_payee`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PayeeParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Payee ID.
    pub(crate) payee_id: String,
}

/// Split line of a transaction.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubTransactionInput {
    /// Amount in dollars; negative for outflows.
    pub(crate) amount: f64,
    /// Category ID.
    pub(crate) category_id: Option<String>,
    /// Payee ID.
    pub(crate) payee_id: Option<String>,
    /// Payee name.
    pub(crate) payee_name: Option<String>,
    /// Memo.
    pub(crate) memo: Option<String>,
}

impl SubTransactionInput {
    /// Converts to the API representation.
    pub(crate) fn to_save(&self) -> SaveSubTransaction {
        SaveSubTransaction {
            amount: to_milliunits(self.amount),
            category_id: self.category_id.clone(),
            payee_id: non_empty(self.payee_id.as_ref()),
            payee_name: non_empty(self.payee_name.as_ref()),
            memo: non_empty(self.memo.as_ref()),
        }
    }
}

/// Returns a clone of `value` unless it is empty.
fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|text| !text.is_empty()).cloned()
}

/// A transaction to create.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewTransactionInput {
    /// Account ID.
    pub(crate) account_id: String,
    /// Date, format `YYYY-MM-DD`.
    pub(crate) date: String,
    /// Amount in dollars; negative for expenses, positive for income.
    pub(crate) amount: f64,
    /// Payee ID.
    pub(crate) payee_id: Option<String>,
    /// Payee name; a new payee is created if no payee matches.
    pub(crate) payee_name: Option<String>,
    /// Category ID.
    pub(crate) category_id: Option<String>,
    /// Memo.
    pub(crate) memo: Option<String>,
    /// Cleared status.
    pub(crate) cleared: Option<ClearedStatus>,
    /// Approval flag.
    pub(crate) approved: Option<bool>,
    /// Flag colour (`red`, `orange`, `yellow`, `green`, `blue`, `purple`).
    pub(crate) flag_color: Option<String>,
    /// Import ID used for duplicate detection.
    pub(crate) import_id: Option<String>,
    /// Split lines.
    pub(crate) subtransactions: Option<Vec<SubTransactionInput>>,
}

impl NewTransactionInput {
    /// Converts to the API representation.
    pub(crate) fn to_save(&self) -> SaveTransaction {
        let subtransactions = self
            .subtransactions
            .as_ref()
            .filter(|lines| !lines.is_empty())
            .map(|lines| lines.iter().map(SubTransactionInput::to_save).collect());
        SaveTransaction {
            account_id: Some(self.account_id.clone()),
            date: Some(self.date.clone()),
            amount: Some(to_milliunits(self.amount)),
            payee_id: non_empty(self.payee_id.as_ref()).map(Some),
            payee_name: non_empty(self.payee_name.as_ref()).map(Some),
            category_id: non_empty(self.category_id.as_ref()).map(Some),
            memo: non_empty(self.memo.as_ref()).map(Some),
            cleared: self.cleared,
            approved: self.approved,
            flag_color: non_empty(self.flag_color.as_ref()).map(Some),
            import_id: non_empty(self.import_id.as_ref()),
            subtransactions,
            ..SaveTransaction::default()
        }
    }
}

/// Parameters for `create_transaction`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTransactionParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Transaction to create.
    #[serde(flatten)]
    pub(crate) transaction: NewTransactionInput,
}

/// Parameters for `create_multiple_transactions`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateMultipleTransactionsParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Transactions to create; must not be empty.
    pub(crate) transactions: Vec<NewTransactionInput>,
}

/// Parameters for `create_split_transaction`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateSplitTransactionParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Existing transaction to split.
    pub(crate) transaction_id: String,
    /// Split lines; at least two.
    pub(crate) subtransactions: Vec<SubTransactionInput>,
    /// Total in dollars; must equal the sum of the split lines when given.
    pub(crate) amount: Option<f64>,
    /// New account ID.
    pub(crate) account_id: Option<String>,
    /// New date, format `YYYY-MM-DD`.
    pub(crate) date: Option<String>,
    /// New payee ID.
    pub(crate) payee_id: Option<String>,
    /// New payee name.
    pub(crate) payee_name: Option<String>,
    /// New memo.
    pub(crate) memo: Option<String>,
}

/// Parameters for `create_transfer`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTransferParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Account the money leaves.
    pub(crate) from_account_id: String,
    /// Account the money enters.
    pub(crate) to_account_id: String,
    /// Positive amount in dollars.
    pub(crate) amount: f64,
    /// Date, format `YYYY-MM-DD`.
    pub(crate) date: String,
    /// Memo.
    pub(crate) memo: Option<String>,
}

/// Parameters for `update_single_transaction`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateTransactionParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Transaction to update.
    pub(crate) transaction_id: String,
    /// New account ID.
    pub(crate) account_id: Option<String>,
    /// New date, format `YYYY-MM-DD`.
    pub(crate) date: Option<String>,
    /// New amount in dollars.
    pub(crate) amount: Option<f64>,
    /// New payee name.
    pub(crate) payee_name: Option<String>,
    /// New payee ID.
    pub(crate) payee_id: Option<String>,
    /// New category ID; an empty string leaves the category unchanged.
    pub(crate) category_id: Option<String>,
    /// New memo.
    pub(crate) memo: Option<String>,
    /// New cleared status.
    pub(crate) cleared: Option<ClearedStatus>,
    /// New approval flag.
    pub(crate) approved: Option<bool>,
    /// New flag colour.
    pub(crate) flag_color: Option<String>,
}

impl UpdateTransactionParams {
    /// Converts the requested changes; `None` when no field is set.
    pub(crate) fn to_save(&self) -> Option<SaveTransaction> {
        let body = SaveTransaction {
            account_id: non_empty(self.account_id.as_ref()),
            date: non_empty(self.date.as_ref()),
            amount: self.amount.map(to_milliunits),
            payee_name: self.payee_name.clone().map(Some),
            payee_id: self.payee_id.clone().map(Some),
            category_id: non_empty(self.category_id.as_ref()).map(Some),
            memo: self.memo.clone().map(Some),
            cleared: self.cleared,
            approved: self.approved,
            flag_color: self.flag_color.clone().map(Some),
            ..SaveTransaction::default()
        };
        (body != SaveTransaction::default()).then_some(body)
    }
}

/// One entry of `update_multiple_transactions`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionUpdateInput {
    /// Transaction ID; exactly one of `id` and `importId` must be set.
    pub(crate) id: Option<String>,
    /// Import ID; exactly one of `id` and `importId` must be set.
    pub(crate) import_id: Option<String>,
    /// New account ID.
    pub(crate) account_id: Option<String>,
    /// New date, format `YYYY-MM-DD`.
    pub(crate) date: Option<String>,
    /// New amount in dollars.
    pub(crate) amount: Option<f64>,
    /// New payee name.
    pub(crate) payee_name: Option<String>,
    /// New payee ID.
    pub(crate) payee_id: Option<String>,
    /// New category ID; an empty string leaves the category unchanged.
    pub(crate) category_id: Option<String>,
    /// New memo.
    pub(crate) memo: Option<String>,
    /// New cleared status.
    pub(crate) cleared: Option<ClearedStatus>,
    /// New approval flag.
    pub(crate) approved: Option<bool>,
    /// New flag colour.
    pub(crate) flag_color: Option<String>,
}

impl TransactionUpdateInput {
    /// Converts to the API representation, or describes why the entry is
    /// not addressable.
    pub(crate) fn to_save(&self) -> Result<SaveTransaction, &'static str> {
        let id = non_empty(self.id.as_ref());
        let import_id = non_empty(self.import_id.as_ref());
        if id.is_some() == import_id.is_some() {
            return Err("each transaction must have either 'id' or 'importId', but not both");
        }
        Ok(SaveTransaction {
            id,
            import_id,
            account_id: non_empty(self.account_id.as_ref()),
            date: non_empty(self.date.as_ref()),
            amount: self.amount.map(to_milliunits),
            payee_name: self.payee_name.clone().map(Some),
            payee_id: self.payee_id.clone().map(Some),
            category_id: non_empty(self.category_id.as_ref()).map(Some),
            memo: self.memo.clone().map(Some),
            cleared: self.cleared,
            approved: self.approved,
            flag_color: self.flag_color.clone().map(Some),
            subtransactions: None,
        })
    }
}

/// Parameters for `update_multiple_transactions`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateMultipleTransactionsParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Updates; must not be empty.
    pub(crate) transactions: Vec<TransactionUpdateInput>,
}

/// Parameters for tools addressing one transaction.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionRefParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Transaction ID.
    pub(crate) transaction_id: String,
}

/// Parameters for `approve_transaction`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApproveTransactionParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Transaction ID.
    pub(crate) transaction_id: String,
    /// Approval flag (default `true`).
    pub(crate) approved: Option<bool>,
}

/// Parameters for `clear_transaction`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClearTransactionParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Transaction ID.
    pub(crate) transaction_id: String,
    /// New cleared status.
    pub(crate) cleared: ClearedStatus,
}

/// Parameters for `delete_scheduled_transaction`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScheduledTransactionRefParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Scheduled transaction ID.
    pub(crate) scheduled_transaction_id: String,
}

/// Parameters for `create_scheduled_transaction`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateScheduledTransactionParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Account ID.
    pub(crate) account_id: String,
    /// First occurrence, format `YYYY-MM-DD`.
    pub(crate) date: String,
    /// Amount in dollars; negative for outflows.
    pub(crate) amount: f64,
    /// Recurrence.
    pub(crate) frequency: Frequency,
    /// Payee ID.
    pub(crate) payee_id: Option<String>,
    /// Payee name.
    pub(crate) payee_name: Option<String>,
    /// Category ID.
    pub(crate) category_id: Option<String>,
    /// Memo.
    pub(crate) memo: Option<String>,
}

impl CreateScheduledTransactionParams {
    /// Converts to the API representation.
    pub(crate) fn to_save(&self) -> SaveScheduledTransaction {
        SaveScheduledTransaction {
            account_id: self.account_id.clone(),
            date: self.date.clone(),
            amount: to_milliunits(self.amount),
            frequency: self.frequency,
            payee_id: non_empty(self.payee_id.as_ref()),
            payee_name: non_empty(self.payee_name.as_ref()),
            category_id: non_empty(self.category_id.as_ref()),
            memo: non_empty(self.memo.as_ref()),
        }
    }
}

/// Parameters for `update_category_budget`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateCategoryBudgetParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Budget month: `current` or `YYYY-MM-DD`.
    pub(crate) month: String,
    /// Category ID.
    pub(crate) category_id: String,
    /// New total assigned amount in dollars.
    pub(crate) budgeted: f64,
}

/// Parameters for `move_funds`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MoveFundsParams {
    /// Budget ID; defaults to `YNAB_BUDGET_ID`.
    #[serde(default, alias = "budget_id")]
    pub(crate) budget_id: Option<String>,
    /// Budget month: `current` or `YYYY-MM-DD`.
    pub(crate) month: String,
    /// Category losing assigned money.
    pub(crate) source_category_id: String,
    /// Category gaining assigned money.
    pub(crate) destination_category_id: String,
    /// Positive amount in dollars.
    pub(crate) amount: f64,
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect for readability"
)]
mod tests {
    use serde_json::json;

    use super::{
        AnalyzeTransactionsParams, BudgetParams, CreateTransactionParams, TransactionUpdateInput,
        UpdateTransactionParams,
    };
    use crate::ynab::models::ClearedStatus;

    #[test]
    fn budget_id_accepts_camel_case_and_alias() {
        let camel: BudgetParams =
            serde_json::from_value(json!({"budgetId": "b1"})).expect("camelCase");
        let snake: BudgetParams =
            serde_json::from_value(json!({"budget_id": "b2"})).expect("alias");
        let empty: BudgetParams = serde_json::from_value(json!({})).expect("empty");
        assert_eq!(camel.budget_id.as_deref(), Some("b1"));
        assert_eq!(snake.budget_id.as_deref(), Some("b2"));
        assert!(empty.budget_id.is_none());
    }

    #[test]
    fn analyze_transactions_defaults() {
        let params: AnalyzeTransactionsParams =
            serde_json::from_value(json!({"accountId": "a1", "toDate": "2025-01-31"}))
                .expect("deserialize");
        assert_eq!(params.account_id.as_deref(), Some("a1"));
        assert_eq!(params.to_date.as_deref(), Some("2025-01-31"));
        assert!(params.limit.is_none());
    }

    #[test]
    fn create_transaction_flattens_fields() {
        let params: CreateTransactionParams = serde_json::from_value(json!({
            "budgetId": "b1",
            "accountId": "a1",
            "date": "2025-01-15",
            "amount": -42.5,
            "payeeName": "Cafe",
            "categoryId": "",
            "cleared": "cleared"
        }))
        .expect("deserialize");
        let body = params.transaction.to_save();
        let value = serde_json::to_value(&body).expect("serialize");
        assert_eq!(
            value,
            json!({
                "account_id": "a1",
                "date": "2025-01-15",
                "amount": -42_500,
                "payee_name": "Cafe",
                "cleared": "cleared"
            })
        );
    }

    #[test]
    fn update_requires_at_least_one_field() {
        let nothing = UpdateTransactionParams {
            transaction_id: "t1".to_owned(),
            category_id: Some(String::new()),
            ..UpdateTransactionParams::default()
        };
        assert!(nothing.to_save().is_none());

        let cleared = UpdateTransactionParams {
            transaction_id: "t1".to_owned(),
            cleared: Some(ClearedStatus::Cleared),
            ..UpdateTransactionParams::default()
        };
        let body = cleared.to_save().expect("one field set");
        assert_eq!(body.cleared, Some(ClearedStatus::Cleared));
        assert!(body.category_id.is_none());
    }

    #[test]
    fn bulk_update_needs_exactly_one_identifier() {
        let neither = TransactionUpdateInput::default();
        let both = TransactionUpdateInput {
            id: Some("t1".to_owned()),
            import_id: Some("YNAB:-1000:2025-01-01:1".to_owned()),
            ..TransactionUpdateInput::default()
        };
        let by_import = TransactionUpdateInput {
            import_id: Some("YNAB:-1000:2025-01-01:1".to_owned()),
            approved: Some(true),
            ..TransactionUpdateInput::default()
        };
        assert!(neither.to_save().is_err());
        assert!(both.to_save().is_err());
        let body = by_import.to_save().expect("import id only");
        assert!(body.id.is_none());
        assert_eq!(body.approved, Some(true));
    }
}
