//! Guidance prompts served over MCP `prompts/list` and `prompts/get`.
//!
//! Each prompt is a single user message steering an assistant toward the
//! right tool sequence. Tool and argument names must match the tool router.

/// Core rules for every session.
pub(crate) const SYSTEM: &str = "\
# Working with the YNAB tools

## Rules

1. Resolve IDs before acting. Without a budgetId (and no server default), \
call list_budgets first. Before creating a transaction, call list_accounts \
to get the accountId. Category IDs come from budget_summary or \
get_month_detail. Never pass a name where an ID is expected.
2. Amounts are dollars with decimals. Outflows are negative (-25.00 for $25 \
spent) and inflows are positive (3500.00 for a paycheck). Never send \
milliunits.
3. Dates are YYYY-MM-DD. Convert phrases like \"yesterday\" or \"01/02\" \
before calling a tool. Budget months are 'current' or the first day of a \
month, e.g. 2025-01-01.
4. delete_transaction and delete_scheduled_transaction cannot be undone. \
Ask the user to confirm explicitly before calling them.
5. Prefer batch tools: create_multiple_transactions over repeated \
create_transaction, update_multiple_transactions over repeated \
update_single_transaction. YNAB allows about 200 requests per hour per \
token.

## Errors

- kind missing_budget_id: call list_budgets and retry with budgetId.
- kind invalid_input: fix the argument named in the message and retry.
- kind not_found: the ID is stale; list the resource again.
- kind unauthorized: the access token is invalid or expired; the user must \
provide a new one.
- kind api_error with status 429: wait at least a minute before retrying.

## Style

Say what you are about to do, show the amounts, dates and names from the \
tool results, and summarize what changed afterwards.";

/// Step-by-step sequences for common requests.
pub(crate) const WORKFLOW: &str = "\
Common request sequences for the YNAB tools.

Add a transaction (\"I spent $15 at Starbucks from checking\"):
  1. list_budgets if no budgetId is known.
  2. list_accounts to find the checking accountId.
  3. create_transaction with accountId, date (YYYY-MM-DD), amount -15.00 \
and payeeName \"Starbucks\".
  4. Optionally approve_transaction with the returned transaction ID.

Import several transactions:
  1. Collect date, amount, payee and optional categoryId for each.
  2. create_multiple_transactions with the whole list. The result reports \
saved IDs and any duplicate import IDs that were skipped.

Approve pending transactions:
  1. get_unapproved_transactions and show the list to the user.
  2. After confirmation, update_multiple_transactions with \
{id, approved: true} for each entry, or approve_transaction one by one.

Check budget status:
  1. budget_summary for the month (default 'current').
  2. Report to_be_budgeted, the categories flagged overspent and open \
accounts with low balances.

Cover an overspent category:
  1. budget_summary to find both category IDs and their balances.
  2. Confirm the amount with the user.
  3. move_funds with sourceCategoryId, destinationCategoryId, amount and \
month.

Find or delete a specific transaction:
  1. analyze_transactions filtered by account, category or date range.
  2. Confirm with the user, then delete_transaction.";

/// Choosing between the analysis tools.
pub(crate) const ANALYZE_SPENDING: &str = "\
Picking the right tool for spending questions:

1. Where did the money go? Use analyze_spending_by_category. It groups \
outflows by category over monthsBack months, splits split transactions \
into their lines and leaves transfers out.
2. How is it trending? Use generate_spending_report for a month-by-month \
view of income, expenses and net, with averages.
3. Which transactions exactly? Use analyze_transactions with accountId, \
categoryId, fromDate and toDate filters for individual rows including memos.
4. Quick snapshot? Use budget_summary for account balances and category \
balances of a month.

Purchases spanning several categories skew the numbers unless they are \
split; suggest create_split_transaction for them.

Do not assume a budgeting method. Lead with the figures from the tools; \
offer observations (\"dining is up 20% over three months\") only when the \
user asks for advice.";

/// Practices for creating and maintaining transactions.
pub(crate) const TRANSACTION_MAINTENANCE: &str = "\
Keeping transactions accurate:

1. Creation: create_transaction for one entry, create_multiple_transactions \
for several. Reuse payeeId and categoryId from get_payees or budget_summary \
when you have them.
2. Splits: a receipt covering groceries and household goods belongs in \
create_split_transaction, with lines that add up to the total.
3. Recurring items: a regular bill or paycheck fits \
create_scheduled_transaction; list_scheduled_transactions shows what is \
already planned.
4. Approval: imported transactions often wait for review. Find them with \
get_unapproved_transactions and confirm them with approve_transaction. Use \
clear_transaction to mark them cleared or reconciled.
5. Deletion: delete_transaction and delete_scheduled_transaction are \
permanent. Always get explicit confirmation first.
6. Transfers: create_transfer links both sides of a move between accounts; \
do not create two separate transactions.
7. Memos: when you create a transaction with a memo, prefix it with \
'YY.MM.DD AI Created - '. When you update one, prefix the memo with \
'YY.MM.DD AI Updated - '.";

/// Moving money between categories.
pub(crate) const RESOURCE_ALLOCATION: &str = "\
Allocating money across categories:

1. Reallocation: to take money from one category and give it to another, \
use move_funds. It lowers the source and raises the destination by the same \
amount, so the total assigned stays the same.
2. Direct assignment: to set a category to an exact amount regardless of \
where the money comes from, use update_category_budget with the month and \
the new total in dollars.
3. Look first: before moving a large amount, check balances with \
get_month_detail or budget_summary so the source category does not go \
negative by accident.

For \"can I afford this?\" questions, combine analyze_spending_by_category \
with the balances from list_accounts and let the user decide.

The user owns the allocation strategy; carry out the changes they ask for.";
