//! Tool-level error taxonomy and its MCP wire representation.

use rmcp::model::{CallToolResult, Content};
use serde_json::json;

use crate::ynab::YnabError;

/// Failure of a single tool call.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ToolError {
    /// No `budgetId` argument and no server default.
    #[error(
        "no budget ID provided; pass budgetId or set YNAB_BUDGET_ID (use list_budgets to find one)"
    )]
    MissingBudgetId,
    /// Arguments failed a semantic check.
    #[error("{0}")]
    InvalidInput(String),
    /// The YNAB API call failed.
    #[error(transparent)]
    Ynab(#[from] YnabError),
    /// A multi-step write failed after earlier steps were applied.
    #[error("{completed}; the next step failed: {source}")]
    Partial {
        /// What was already written before the failure.
        completed: String,
        /// The failure of the step that did not complete.
        source: YnabError,
    },
    /// The tool output could not be serialized.
    #[error("failed to serialize response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ToolError {
    /// Shorthand for [`ToolError::InvalidInput`].
    pub(crate) fn invalid<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Stable machine-readable kind.
    pub(crate) const fn kind(&self) -> &'static str {
        match self {
            Self::MissingBudgetId => "missing_budget_id",
            Self::InvalidInput(_) => "invalid_input",
            Self::Ynab(source) | Self::Partial { source, .. } => ynab_kind(source),
            Self::Encode(_) => "internal",
        }
    }

    /// Converts the error into a failed tool result carrying
    /// `{"success": false, "kind": ..., "error": ...}`.
    pub(crate) fn into_call_result(self) -> CallToolResult {
        let kind = self.kind();
        tracing::warn!(kind, error = %self, "tool call failed");
        let body = json!({
            "success": false,
            "kind": kind,
            "error": self.to_string(),
        });
        CallToolResult::error(vec![Content::text(body.to_string())])
    }
}

/// Kind of a YNAB client error.
const fn ynab_kind(err: &YnabError) -> &'static str {
    match *err {
        YnabError::Unauthorized { .. } => "unauthorized",
        YnabError::NotFound { .. } => "not_found",
        YnabError::Api { .. } => "api_error",
        YnabError::Transport(_) => "transport",
        YnabError::Decode(_) => "decode",
        YnabError::InvalidBaseUrl(_) => "config",
        YnabError::InvalidId(_) => "invalid_input",
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
    use serde_json::Value;

    use super::ToolError;
    use crate::ynab::YnabError;

    fn wire(err: ToolError) -> Value {
        let result = serde_json::to_value(err.into_call_result()).expect("serialize result");
        assert_eq!(result["isError"], Value::Bool(true));
        let text = result["content"][0]["text"].as_str().expect("text content");
        serde_json::from_str(text).expect("error body is JSON")
    }

    #[test]
    fn missing_budget_id_wire_format() {
        let body = wire(ToolError::MissingBudgetId);
        assert_eq!(body["success"], Value::Bool(false));
        assert_eq!(body["kind"], "missing_budget_id");
        assert!(
            body["error"]
                .as_str()
                .is_some_and(|msg| msg.contains("YNAB_BUDGET_ID"))
        );
    }

    #[test]
    fn unauthorized_keeps_refresh_hint() {
        let err = ToolError::from(YnabError::Unauthorized {
            detail: "Unauthorized".to_owned(),
        });
        let body = wire(err);
        assert_eq!(body["kind"], "unauthorized");
        assert!(
            body["error"]
                .as_str()
                .is_some_and(|msg| msg.contains("refresh the token"))
        );
    }

    #[test]
    fn partial_failure_reports_completed_step() {
        let err = ToolError::Partial {
            completed: "moved 50.00 out of 'Dining'".to_owned(),
            source: YnabError::Api {
                status: 500,
                name: "internal_server_error".to_owned(),
                detail: "boom".to_owned(),
            },
        };
        assert_eq!(err.kind(), "api_error");
        let body = wire(err);
        let message = body["error"].as_str().expect("message");
        assert!(message.starts_with("moved 50.00 out of 'Dining'"));
        assert!(message.contains("boom"));
    }

    #[test]
    fn invalid_input_kind() {
        assert_eq!(ToolError::invalid("bad").kind(), "invalid_input");
        assert_eq!(ToolError::invalid("bad").to_string(), "bad");
    }

    #[test]
    fn unusable_id_is_invalid_input() {
        let err = ToolError::from(YnabError::InvalidId("..".to_owned()));
        assert_eq!(err.kind(), "invalid_input");
    }
}
