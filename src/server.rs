//! MCP server exposing YNAB operations as tools.
//!
//! Uses `rmcp` macros; every tool delegates to [`YnabTools`] and maps its
//! outcome onto the MCP wire format. Guidance prompts come from
//! [`crate::prompts`].

extern crate alloc;

use alloc::sync::Arc;

use rmcp::handler::server::router::prompt::PromptRouter;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, GetPromptRequestParams, GetPromptResult, ListPromptsResult,
    PaginatedRequestParams, PromptMessage, PromptMessageRole, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, prompt, prompt_handler, prompt_router, tool,
    tool_handler, tool_router,
};
use serde::Serialize;

use crate::error::ToolError;
use crate::params::{
    AnalyzeSpendingParams, AnalyzeTransactionsParams, ApproveTransactionParams, BudgetParams,
    ClearTransactionParams, CreateMultipleTransactionsParams, CreateScheduledTransactionParams,
    CreateSplitTransactionParams, CreateTransactionParams, CreateTransferParams, MonthParams,
    MoveFundsParams, PayeeParams, ScheduledTransactionRefParams, SpendingReportParams,
    TransactionRefParams, UpdateCategoryBudgetParams, UpdateMultipleTransactionsParams,
    UpdateTransactionParams,
};
use crate::prompts;
use crate::tools::YnabTools;

/// Usage notes sent to clients during initialization.
const INSTRUCTIONS: &str = "YNAB (You Need A Budget) MCP server. \
    Start with list_budgets to find a budget ID unless a default budget is configured; \
    every tool accepts an optional budgetId. Amounts are in dollars: negative for outflows, \
    positive for inflows. Months are 'current' or the first day of a month (YYYY-MM-DD). \
    For spending questions use analyze_spending_by_category or generate_spending_report; \
    to review new activity use get_unapproved_transactions, then approve_transaction. \
    Use move_funds to cover an overspent category from another one. \
    The prompts carry fuller workflow guidance.";

/// MCP server wrapping the YNAB API.
#[derive(Clone)]
pub(crate) struct YnabMcpServer {
    /// Tool implementations (shared via Arc).
    tools: Arc<YnabTools>,
    /// Tool router for dispatching MCP tool calls.
    tool_router: ToolRouter<Self>,
    /// Prompt router for the guidance prompts.
    prompt_router: PromptRouter<Self>,
}

impl core::fmt::Debug for YnabMcpServer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("YnabMcpServer")
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

/// Serializes a value to a pretty-printed JSON string for tool output.
fn to_json_text<T: Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value).map_err(|err| {
        McpError::internal_error(format!("failed to serialize response: {err}"), None)
    })
}

/// Creates a successful tool result containing JSON text.
fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = to_json_text(value)?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Wraps guidance text as a single user message.
fn guidance(text: &str) -> Vec<PromptMessage> {
    vec![PromptMessage::new_text(PromptMessageRole::User, text)]
}

/// Maps a tool outcome onto the wire: successes become JSON text, tool
/// failures become error results, serialization failures become protocol
/// errors.
fn respond<T: Serialize>(outcome: Result<T, ToolError>) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(value) => json_result(&value),
        Err(ToolError::Encode(err)) => Err(McpError::internal_error(
            format!("failed to serialize response: {err}"),
            None,
        )),
        Err(err) => Ok(err.into_call_result()),
    }
}

#[tool_router]
impl YnabMcpServer {
    /// Creates a new MCP server over the given tool set.
    pub(crate) fn new(tools: YnabTools) -> Self {
        Self {
            tools: Arc::new(tools),
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    // ── Read tools ──────────────────────────────────────────────────

    /// Lists budgets.
    #[tool(description = "List all budgets the access token can see (id and name)")]
    async fn list_budgets(&self) -> Result<CallToolResult, McpError> {
        respond(self.tools.list_budgets().await)
    }

    /// Lists accounts of a budget.
    #[tool(
        description = "List accounts of a budget with type, balance in dollars, on-budget and closed flags"
    )]
    async fn list_accounts(
        &self,
        params: Parameters<BudgetParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.list_accounts(&params.0).await)
    }

    /// Summarizes a budget month.
    #[tool(
        description = "Summarize a budget month: income, assigned, activity, ready to assign, open accounts and visible categories with overspent flags. month is 'current' (default) or YYYY-MM-DD"
    )]
    async fn budget_summary(
        &self,
        params: Parameters<MonthParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.budget_summary(&params.0).await)
    }

    /// Returns one budget month in detail.
    #[tool(
        description = "Get a budget month in detail, including age of money, the month note and every category. month is 'current' (default) or YYYY-MM-DD"
    )]
    async fn get_month_detail(
        &self,
        params: Parameters<MonthParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.get_month_detail(&params.0).await)
    }

    /// Groups recent spending by category.
    #[tool(
        description = "Analyze spending by category over the last monthsBack months (default 1). Excludes transfers and counts split transactions per line"
    )]
    async fn analyze_spending_by_category(
        &self,
        params: Parameters<AnalyzeSpendingParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.analyze_spending_by_category(&params.0).await)
    }

    /// Searches transactions.
    #[tool(
        description = "Search transactions by account, category and date range (YYYY-MM-DD), newest first, up to limit rows (default 50)"
    )]
    async fn analyze_transactions(
        &self,
        params: Parameters<AnalyzeTransactionsParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.analyze_transactions(&params.0).await)
    }

    /// Reports monthly income and expenses.
    #[tool(
        description = "Generate a month-by-month income, expense and net report for the last monthsBack months (default 6) with totals and averages"
    )]
    async fn generate_spending_report(
        &self,
        params: Parameters<SpendingReportParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.generate_spending_report(&params.0).await)
    }

    /// Lists unapproved transactions.
    #[tool(description = "List transactions that still need approval")]
    async fn get_unapproved_transactions(
        &self,
        params: Parameters<BudgetParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.get_unapproved_transactions(&params.0).await)
    }

    /// Lists scheduled transactions.
    #[tool(description = "List scheduled (recurring) transactions ordered by next occurrence")]
    async fn list_scheduled_transactions(
        &self,
        params: Parameters<BudgetParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.list_scheduled_transactions(&params.0).await)
    }

    /// Lists payees.
    #[tool(description = "List payees of a budget")]
    async fn get_payees(
        &self,
        params: Parameters<BudgetParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.get_payees(&params.0).await)
    }

    /// Fetches one payee.
    #[tool(description = "Get a single payee by ID")]
    async fn get_single_payee(
        &self,
        params: Parameters<PayeeParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.get_single_payee(&params.0).await)
    }

    /// Checks connectivity.
    #[tool(
        description = "Check connectivity to YNAB: API latency, authenticated user and whether the budget is reachable"
    )]
    async fn health_check(
        &self,
        params: Parameters<BudgetParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.health_check(&params.0).await)
    }

    // ── Write tools ─────────────────────────────────────────────────

    /// Creates a transaction.
    #[tool(
        description = "Create a transaction. amount is in dollars, negative for expenses; date is YYYY-MM-DD. Optional payee, category, memo, cleared, approved, flagColor, importId and subtransactions"
    )]
    async fn create_transaction(
        &self,
        params: Parameters<CreateTransactionParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.create_transaction(&params.0).await)
    }

    /// Creates several transactions.
    #[tool(
        description = "Create several transactions in one request; transactions whose importId already exists are reported as duplicates"
    )]
    async fn create_multiple_transactions(
        &self,
        params: Parameters<CreateMultipleTransactionsParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.create_multiple_transactions(&params.0).await)
    }

    /// Splits a transaction.
    #[tool(
        description = "Split an existing transaction across categories. Needs at least 2 subtransactions; amount, when given, must equal their sum"
    )]
    async fn create_split_transaction(
        &self,
        params: Parameters<CreateSplitTransactionParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.create_split_transaction(&params.0).await)
    }

    /// Transfers money between accounts.
    #[tool(
        description = "Transfer a positive dollar amount from one account to another on the given date (YYYY-MM-DD)"
    )]
    async fn create_transfer(
        &self,
        params: Parameters<CreateTransferParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.create_transfer(&params.0).await)
    }

    /// Updates one transaction.
    #[tool(
        description = "Update fields of one transaction; only the fields provided are changed and at least one is required"
    )]
    async fn update_single_transaction(
        &self,
        params: Parameters<UpdateTransactionParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.update_single_transaction(&params.0).await)
    }

    /// Updates several transactions.
    #[tool(
        description = "Update several transactions in one request; each entry needs exactly one of id or importId"
    )]
    async fn update_multiple_transactions(
        &self,
        params: Parameters<UpdateMultipleTransactionsParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.update_multiple_transactions(&params.0).await)
    }

    /// Approves a transaction.
    #[tool(description = "Approve a transaction, or unapprove it with approved=false")]
    async fn approve_transaction(
        &self,
        params: Parameters<ApproveTransactionParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.approve_transaction(&params.0).await)
    }

    /// Sets a cleared status.
    #[tool(description = "Set the cleared status of a transaction: cleared, uncleared or reconciled")]
    async fn clear_transaction(
        &self,
        params: Parameters<ClearTransactionParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.clear_transaction(&params.0).await)
    }

    /// Deletes a transaction.
    #[tool(description = "Delete a transaction by its ID")]
    async fn delete_transaction(
        &self,
        params: Parameters<TransactionRefParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.delete_transaction(&params.0).await)
    }

    /// Deletes a scheduled transaction.
    #[tool(description = "Delete a scheduled transaction by its ID")]
    async fn delete_scheduled_transaction(
        &self,
        params: Parameters<ScheduledTransactionRefParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.delete_scheduled_transaction(&params.0).await)
    }

    /// Creates a scheduled transaction.
    #[tool(
        description = "Create a scheduled transaction. frequency is one of never, daily, weekly, everyOtherWeek, twiceAMonth, every4Weeks, monthly, everyOtherMonth, every3Months, every4Months, twiceAYear, yearly, everyOtherYear"
    )]
    async fn create_scheduled_transaction(
        &self,
        params: Parameters<CreateScheduledTransactionParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.create_scheduled_transaction(&params.0).await)
    }

    /// Sets a category's assigned amount.
    #[tool(
        description = "Set the total amount assigned to a category for a month (dollars). month is 'current' or YYYY-MM-DD"
    )]
    async fn update_category_budget(
        &self,
        params: Parameters<UpdateCategoryBudgetParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.update_category_budget(&params.0).await)
    }

    /// Moves assigned money between categories.
    #[tool(
        description = "Move a positive dollar amount of assigned money from one category to another within a month"
    )]
    async fn move_funds(
        &self,
        params: Parameters<MoveFundsParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.move_funds(&params.0).await)
    }
}

#[prompt_router]
impl YnabMcpServer {
    /// Core rules for using the tools.
    #[prompt(
        name = "system_prompt",
        description = "Core rules for the YNAB tools: ID lookup, amount and date formats, confirmations"
    )]
    async fn system_prompt(&self) -> Vec<PromptMessage> {
        guidance(prompts::SYSTEM)
    }

    /// Tool sequences for common requests.
    #[prompt(
        name = "workflow_guidance",
        description = "Tool sequences and dependencies for common budgeting requests"
    )]
    async fn workflow_guidance(&self) -> Vec<PromptMessage> {
        guidance(prompts::WORKFLOW)
    }

    /// Choosing between the analysis tools.
    #[prompt(
        name = "analyze_spending_guidance",
        description = "Guidance on how to analyze spending and reports"
    )]
    async fn analyze_spending_guidance(&self) -> Vec<PromptMessage> {
        guidance(prompts::ANALYZE_SPENDING)
    }

    /// Practices for transaction upkeep.
    #[prompt(
        name = "transaction_maintenance_guidance",
        description = "Best practices for managing and maintaining transactions"
    )]
    async fn transaction_maintenance_guidance(&self) -> Vec<PromptMessage> {
        guidance(prompts::TRANSACTION_MAINTENANCE)
    }

    /// Moving money between categories.
    #[prompt(
        name = "resource_allocation_guidance",
        description = "Guidance on moving funds and allocating money across categories"
    )]
    async fn resource_allocation_guidance(&self) -> Vec<PromptMessage> {
        guidance(prompts::RESOURCE_ALLOCATION)
    }
}

#[tool_handler]
#[prompt_handler]
impl ServerHandler for YnabMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect and indexing for readability"
)]
mod tests {
    use rmcp::{ErrorData as McpError, ServerHandler};
    use serde_json::{Value, json};

    use super::{YnabMcpServer, respond};
    use crate::prompts;
    use crate::cache::TtlCache;
    use crate::error::ToolError;
    use crate::tools::YnabTools;
    use crate::ynab::{DEFAULT_BASE_URL, YnabClient};

    fn server() -> YnabMcpServer {
        let client =
            YnabClient::new("token-abc".to_owned(), DEFAULT_BASE_URL).expect("client should build");
        YnabMcpServer::new(YnabTools::new(client, TtlCache::default(), None))
    }

    #[test]
    fn registers_every_tool() {
        let tools = server().tool_router.list_all();
        let mut names: Vec<String> = tools.iter().map(|tool| tool.name.to_string()).collect();
        names.sort();
        assert_eq!(names.len(), 25);
        for expected in [
            "list_budgets",
            "budget_summary",
            "analyze_transactions",
            "create_transfer",
            "update_multiple_transactions",
            "move_funds",
            "health_check",
        ] {
            assert!(names.iter().any(|name| name == expected), "{expected}");
        }
    }

    #[test]
    fn registers_guidance_prompts() {
        let server = server();
        let mut names: Vec<String> = server
            .prompt_router
            .list_all()
            .iter()
            .map(|prompt| prompt.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            [
                "analyze_spending_guidance",
                "resource_allocation_guidance",
                "system_prompt",
                "transaction_maintenance_guidance",
                "workflow_guidance",
            ]
        );
        assert!(server.get_info().capabilities.prompts.is_some());
    }

    #[tokio::test]
    async fn prompt_is_one_user_message() {
        let messages = server().transaction_maintenance_guidance().await;
        let value = serde_json::to_value(&messages).expect("serialize");
        assert_eq!(value.as_array().map(Vec::len), Some(1));
        assert_eq!(value[0]["role"], "user");
        let text = value[0]["content"]["text"].as_str().expect("text");
        assert!(text.contains("delete_transaction"));
    }

    #[test]
    fn prompts_only_mention_registered_tools() {
        let tools: Vec<String> = server()
            .tool_router
            .list_all()
            .iter()
            .map(|tool| tool.name.to_string())
            .collect();
        let not_tools = [
            "missing_budget_id",
            "invalid_input",
            "not_found",
            "api_error",
            "to_be_budgeted",
        ];
        let text = [
            prompts::SYSTEM,
            prompts::WORKFLOW,
            prompts::ANALYZE_SPENDING,
            prompts::TRANSACTION_MAINTENANCE,
            prompts::RESOURCE_ALLOCATION,
        ]
        .concat();
        let words = text
            .split(|ch: char| !(ch.is_ascii_lowercase() || ch == '_'))
            .filter(|word| word.contains('_'));
        for word in words {
            assert!(
                tools.iter().any(|tool| tool == word) || not_tools.contains(&word),
                "{word} is not a registered tool"
            );
        }
    }

    #[test]
    fn tool_schemas_use_camel_case() {
        let tools = server().tool_router.list_all();
        let transfer = tools
            .iter()
            .find(|tool| tool.name == "create_transfer")
            .expect("create_transfer registered");
        let schema = serde_json::to_value(&*transfer.input_schema).expect("schema");
        let properties = &schema["properties"];
        assert!(properties.get("fromAccountId").is_some());
        assert!(properties.get("budgetId").is_some());
    }

    #[test]
    fn success_is_pretty_json_text() {
        let result = respond::<Value>(Ok(json!({"ok": true}))).expect("success");
        let value = serde_json::to_value(&result).expect("serialize");
        assert_ne!(value["isError"], Value::Bool(true));
        let text = value["content"][0]["text"].as_str().expect("text");
        assert_eq!(text, "{\n  \"ok\": true\n}");
    }

    #[test]
    fn tool_errors_become_error_results() {
        let result = respond::<Value>(Err(ToolError::MissingBudgetId)).expect("error result");
        let value = serde_json::to_value(&result).expect("serialize");
        assert_eq!(value["isError"], Value::Bool(true));
    }

    #[test]
    fn encode_errors_become_protocol_errors() {
        let encode = serde_json::from_str::<Value>("{").expect_err("truncated JSON");
        let outcome: Result<_, McpError> = respond::<Value>(Err(ToolError::Encode(encode)));
        assert!(outcome.is_err());
    }
}
