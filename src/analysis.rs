//! Pure aggregations over YNAB transactions.
//!
//! All sums are accumulated in integer milliunits and converted to dollars
//! (rounded to cents) only when building the output rows.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::money::{from_milliunits, round_cents};
use crate::ynab::models::Transaction;

/// Category label used when a transaction has no category.
const UNCATEGORIZED: &str = "Uncategorized";

/// Spending of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct CategorySpending {
    /// Category name.
    pub(crate) category: String,
    /// Total outflow in dollars (positive).
    pub(crate) total: f64,
    /// Number of contributing transactions or split lines.
    pub(crate) transaction_count: usize,
    /// Category ID, if the category is known.
    pub(crate) category_id: Option<String>,
}

/// Result of [`spending_by_category`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SpendingBreakdown {
    /// Categories ordered by total, largest first.
    pub(crate) categories: Vec<CategorySpending>,
    /// Sum of all category totals in dollars.
    pub(crate) total_spending: f64,
    /// Number of outflow transactions considered.
    pub(crate) transaction_count: usize,
}

/// Running totals for one category.
#[derive(Debug, Default)]
struct CategoryAccumulator {
    /// Outflow in milliunits (positive).
    milliunits: i64,
    /// Contributing entries.
    count: usize,
    /// Most recently seen category ID.
    category_id: Option<String>,
}

impl CategoryAccumulator {
    /// Adds one outflow.
    fn add(&mut self, amount: i64, category_id: Option<&String>) {
        self.milliunits = self.milliunits.saturating_add(amount.saturating_abs());
        self.count = self.count.saturating_add(1);
        self.category_id = category_id.cloned();
    }
}

/// Returns `true` for a live outflow that is not a transfer between accounts.
fn is_spending(tx: &Transaction) -> bool {
    tx.amount < 0 && tx.transfer_account_id.is_none() && !tx.deleted
}

/// Groups outflows by category name.
///
/// Transfers and deleted transactions are skipped. Split transactions
/// contribute each non-deleted subtransaction to its own category.
pub(crate) fn spending_by_category(transactions: &[Transaction]) -> SpendingBreakdown {
    let mut by_name: HashMap<String, CategoryAccumulator> = HashMap::new();
    let mut transaction_count = 0_usize;

    for tx in transactions.iter().filter(|tx| is_spending(tx)) {
        transaction_count = transaction_count.saturating_add(1);
        if tx.subtransactions.is_empty() {
            let name = tx.category_name.as_deref().unwrap_or(UNCATEGORIZED);
            by_name
                .entry(name.to_owned())
                .or_default()
                .add(tx.amount, tx.category_id.as_ref());
            continue;
        }
        for sub in tx.subtransactions.iter().filter(|sub| !sub.deleted) {
            let name = sub.category_name.as_deref().unwrap_or(UNCATEGORIZED);
            by_name
                .entry(name.to_owned())
                .or_default()
                .add(sub.amount, sub.category_id.as_ref());
        }
    }

    let total_milliunits: i64 = by_name.values().map(|acc| acc.milliunits).sum();
    let mut categories: Vec<CategorySpending> = by_name
        .into_iter()
        .map(|(category, acc)| CategorySpending {
            category,
            total: round_cents(from_milliunits(acc.milliunits)),
            transaction_count: acc.count,
            category_id: acc.category_id,
        })
        .collect();
    categories.sort_by(|left, right| {
        right
            .total
            .total_cmp(&left.total)
            .then_with(|| left.category.cmp(&right.category))
    });

    SpendingBreakdown {
        categories,
        total_spending: round_cents(from_milliunits(total_milliunits)),
        transaction_count,
    }
}

/// Income and expenses of one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct MonthStats {
    /// Month as `YYYY-MM`.
    pub(crate) month: String,
    /// Inflows in dollars.
    pub(crate) income: f64,
    /// Outflows in dollars (positive).
    pub(crate) expenses: f64,
    /// `income - expenses`.
    pub(crate) net: f64,
}

/// Groups transactions by `YYYY-MM`, oldest month first.
///
/// Transfers and deleted transactions are skipped. Split transactions are
/// counted once at their parent amount.
pub(crate) fn monthly_report(transactions: &[Transaction]) -> Vec<MonthStats> {
    let mut by_month: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
    for tx in transactions
        .iter()
        .filter(|tx| !tx.deleted && tx.transfer_account_id.is_none())
    {
        let month = tx.date.get(..7).unwrap_or(&tx.date);
        let slot = by_month.entry(month).or_default();
        if tx.amount > 0 {
            slot.0 = slot.0.saturating_add(tx.amount);
        } else {
            slot.1 = slot.1.saturating_add(tx.amount.saturating_abs());
        }
    }
    by_month
        .into_iter()
        .map(|(month, (income, expenses))| MonthStats {
            month: month.to_owned(),
            income: round_cents(from_milliunits(income)),
            expenses: round_cents(from_milliunits(expenses)),
            net: round_cents(from_milliunits(income.saturating_sub(expenses))),
        })
        .collect()
}

/// Totals and per-month averages of a monthly report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ReportTotals {
    /// Total income in dollars.
    pub(crate) income: f64,
    /// Total expenses in dollars.
    pub(crate) expenses: f64,
    /// Total net in dollars.
    pub(crate) net: f64,
    /// Average monthly income in dollars.
    pub(crate) average_income: f64,
    /// Average monthly expenses in dollars.
    pub(crate) average_expenses: f64,
}

/// Sums a monthly report. Averages divide by the number of months with
/// activity (at least one).
pub(crate) fn report_totals(report: &[MonthStats]) -> ReportTotals {
    let income: f64 = report.iter().map(|row| row.income).sum();
    let expenses: f64 = report.iter().map(|row| row.expenses).sum();
    let months = f64::from(u32::try_from(report.len()).unwrap_or(u32::MAX).max(1));
    ReportTotals {
        income: round_cents(income),
        expenses: round_cents(expenses),
        net: round_cents(income - expenses),
        average_income: round_cents(income / months),
        average_expenses: round_cents(expenses / months),
    }
}

/// Drops deleted transactions, applies the optional category and end-date
/// filters, sorts newest first and truncates to `limit`.
///
/// Returns the number of matches before truncation and the kept rows.
pub(crate) fn select_transactions(
    transactions: Vec<Transaction>,
    category_id: Option<&str>,
    to_date: Option<&str>,
    limit: usize,
) -> (usize, Vec<Transaction>) {
    let mut selected: Vec<Transaction> = transactions
        .into_iter()
        .filter(|tx| !tx.deleted)
        .filter(|tx| category_id.is_none_or(|id| tx.category_id.as_deref() == Some(id)))
        .filter(|tx| to_date.is_none_or(|end| tx.date.as_str() <= end))
        .collect();
    selected.sort_by(|left, right| right.date.cmp(&left.date));
    let total = selected.len();
    selected.truncate(limit);
    (total, selected)
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::float_cmp,
    clippy::indexing_slicing,
    clippy::missing_docs_in_private_items,
    reason = "test code uses exact float literals and indexing for readability"
)]
mod tests {
    use super::{monthly_report, report_totals, select_transactions, spending_by_category};
    use crate::ynab::models::{SubTransaction, Transaction};

    fn tx(id: &str, date: &str, amount: i64, category: Option<&str>) -> Transaction {
        Transaction {
            id: id.to_owned(),
            date: date.to_owned(),
            amount,
            memo: None,
            cleared: "cleared".to_owned(),
            approved: true,
            account_id: "acc-1".to_owned(),
            account_name: Some("Checking".to_owned()),
            payee_name: None,
            category_id: category.map(|name| format!("id-{name}")),
            category_name: category.map(str::to_owned),
            transfer_account_id: None,
            transfer_transaction_id: None,
            import_id: None,
            deleted: false,
            subtransactions: Vec::new(),
        }
    }

    fn sub(amount: i64, category: &str, deleted: bool) -> SubTransaction {
        SubTransaction {
            amount,
            memo: None,
            category_id: Some(format!("id-{category}")),
            category_name: Some(category.to_owned()),
            deleted,
        }
    }

    #[test]
    fn spending_excludes_transfers_inflows_and_deleted() {
        let mut transfer = tx("t2", "2025-01-03", -100_000, None);
        transfer.transfer_account_id = Some("acc-2".to_owned());
        let mut deleted = tx("t3", "2025-01-04", -7_000, Some("Dining"));
        deleted.deleted = true;
        let transactions = vec![
            tx("t1", "2025-01-02", -25_500, Some("Groceries")),
            transfer,
            deleted,
            tx("t4", "2025-01-05", 500_000, Some("Inflow: Ready to Assign")),
        ];

        let breakdown = spending_by_category(&transactions);

        assert_eq!(breakdown.transaction_count, 1);
        assert_eq!(breakdown.categories.len(), 1);
        assert_eq!(breakdown.categories[0].category, "Groceries");
        assert_eq!(breakdown.categories[0].total, 25.5);
        assert_eq!(breakdown.total_spending, 25.5);
    }

    #[test]
    fn split_transactions_count_per_subtransaction() {
        let mut split = tx("t1", "2025-01-02", -60_000, None);
        split.subtransactions = vec![
            sub(-40_000, "Groceries", false),
            sub(-20_000, "Household", false),
            sub(-5_000, "Dining", true),
        ];
        let transactions = vec![split, tx("t2", "2025-01-03", -10_000, Some("Groceries"))];

        let breakdown = spending_by_category(&transactions);

        assert_eq!(breakdown.categories.len(), 2);
        assert_eq!(breakdown.categories[0].category, "Groceries");
        assert_eq!(breakdown.categories[0].total, 50.0);
        assert_eq!(breakdown.categories[0].transaction_count, 2);
        assert_eq!(breakdown.categories[1].category, "Household");
        assert_eq!(breakdown.total_spending, 70.0);
    }

    #[test]
    fn missing_category_is_uncategorized() {
        let breakdown = spending_by_category(&[tx("t1", "2025-01-02", -1_000, None)]);
        assert_eq!(breakdown.categories[0].category, "Uncategorized");
        assert!(breakdown.categories[0].category_id.is_none());
    }

    #[test]
    fn monthly_report_groups_and_orders_months() {
        let mut transfer = tx("t5", "2025-02-11", -300_000, None);
        transfer.transfer_account_id = Some("acc-2".to_owned());
        let transactions = vec![
            tx("t1", "2025-02-01", 3_000_000, None),
            tx("t2", "2025-01-15", -120_000, Some("Dining")),
            tx("t3", "2025-01-20", 2_500_000, None),
            tx("t4", "2025-02-10", -80_250, Some("Groceries")),
            transfer,
        ];

        let report = monthly_report(&transactions);

        assert_eq!(report.len(), 2);
        assert_eq!(report[0].month, "2025-01");
        assert_eq!(report[0].income, 2500.0);
        assert_eq!(report[0].expenses, 120.0);
        assert_eq!(report[0].net, 2380.0);
        assert_eq!(report[1].month, "2025-02");
        assert_eq!(report[1].expenses, 80.25);

        let totals = report_totals(&report);
        assert_eq!(totals.income, 5500.0);
        assert_eq!(totals.expenses, 200.25);
        assert_eq!(totals.net, 5299.75);
        assert_eq!(totals.average_income, 2750.0);
    }

    #[test]
    fn empty_report_totals_are_zero() {
        let totals = report_totals(&[]);
        assert_eq!(totals.income, 0.0);
        assert_eq!(totals.average_expenses, 0.0);
    }

    #[test]
    fn select_filters_sorts_and_limits() {
        let mut deleted = tx("t0", "2025-03-01", -1_000, Some("Dining"));
        deleted.deleted = true;
        let transactions = vec![
            tx("t1", "2025-01-05", -1_000, Some("Dining")),
            tx("t2", "2025-01-20", -2_000, Some("Dining")),
            tx("t3", "2025-01-10", -3_000, Some("Groceries")),
            tx("t4", "2025-02-15", -4_000, Some("Dining")),
            deleted,
        ];

        let (total, rows) =
            select_transactions(transactions, Some("id-Dining"), Some("2025-01-31"), 1);

        assert_eq!(total, 2);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "t2");
    }
}
