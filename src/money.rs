//! Currency and calendar helpers shared by the tools.
//!
//! YNAB stores every amount as integer milliunits (1/1000 of the currency
//! unit). Tools speak dollars, so conversions happen at the edge.

use chrono::{Datelike, Months, NaiveDate};

/// Number of milliunits in one currency unit.
const MILLIUNITS_PER_UNIT: f64 = 1000.0;

/// Converts a dollar amount to milliunits, rounding half away from zero.
#[allow(
    clippy::cast_possible_truncation,
    clippy::as_conversions,
    reason = "budget amounts are far below the i64 range"
)]
pub(crate) fn to_milliunits(dollars: f64) -> i64 {
    (dollars * MILLIUNITS_PER_UNIT).round() as i64
}

/// Converts milliunits to dollars.
#[allow(
    clippy::cast_precision_loss,
    clippy::as_conversions,
    reason = "budget amounts fit in the f64 mantissa"
)]
pub(crate) fn from_milliunits(milliunits: i64) -> f64 {
    milliunits as f64 / MILLIUNITS_PER_UNIT
}

/// Rounds a dollar amount to whole cents.
pub(crate) fn round_cents(dollars: f64) -> f64 {
    (dollars * 100.0).round() / 100.0
}

/// Formats a dollar amount with two decimals.
pub(crate) fn format_dollars(dollars: f64) -> String {
    format!("{dollars:.2}")
}

/// Returns `today` moved back by `months`, clamping the day to the target
/// month's length.
pub(crate) fn months_before(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

/// Returns the first day of the month `months` before `today`.
pub(crate) fn first_of_month_before(today: NaiveDate, months: u32) -> NaiveDate {
    let shifted = months_before(today, months);
    shifted.with_day(1).unwrap_or(shifted)
}

/// Parses a date in `YYYY-MM-DD` format.
pub(crate) fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Returns `true` if `value` is `current` or a `YYYY-MM-DD` date.
pub(crate) fn is_budget_month(value: &str) -> bool {
    value == "current" || parse_iso_date(value).is_some()
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::float_cmp,
    clippy::missing_docs_in_private_items,
    reason = "test code uses expect and exact float literals for readability"
)]
mod tests {
    use super::{
        first_of_month_before, format_dollars, from_milliunits, is_budget_month, months_before,
        round_cents, to_milliunits,
    };
    use chrono::NaiveDate;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date for test")
    }

    #[test]
    fn dollars_round_trip_through_milliunits() {
        assert_eq!(to_milliunits(10.99), 10_990);
        assert_eq!(to_milliunits(-10.99), -10_990);
        assert_eq!(from_milliunits(-10_990), -10.99);
    }

    #[test]
    fn milliunits_round_to_nearest() {
        assert_eq!(to_milliunits(0.000_4), 0);
        assert_eq!(to_milliunits(-0.5), -500);
        assert_eq!(to_milliunits(200.0), 200_000);
    }

    #[test]
    fn cents_rounding_and_formatting() {
        assert_eq!(round_cents(12.345_6), 12.35);
        assert_eq!(format_dollars(200.0), "200.00");
    }

    #[test]
    fn months_before_clamps_day() {
        assert_eq!(months_before(date(2025, 3, 31), 1), date(2025, 2, 28));
        assert_eq!(months_before(date(2025, 1, 15), 1), date(2024, 12, 15));
    }

    #[test]
    fn first_of_month_window() {
        assert_eq!(first_of_month_before(date(2025, 7, 20), 6), date(2025, 1, 1));
    }

    #[test]
    fn budget_month_accepts_current_and_iso() {
        assert!(is_budget_month("current"));
        assert!(is_budget_month("2025-01-01"));
        assert!(!is_budget_month("2025-01"));
        assert!(!is_budget_month("last month"));
    }
}
