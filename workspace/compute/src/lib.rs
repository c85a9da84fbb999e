//! Aggregations over the finance data: budget progress and monthly
//! summaries, savings summaries and the dashboard.

pub mod budgets;
pub mod dashboard;
pub mod error;
pub mod savings;

#[cfg(test)]
pub(crate) mod testing;

use chrono::NaiveDate;

pub use dashboard::DashboardCalculator;
pub use error::{ComputeError, Result};

/// Returns the dashboard calculator used by the API.
///
/// `today` anchors the current and previous month; it defaults to the
/// server's local date.
pub fn default_dashboard(today: Option<NaiveDate>) -> DashboardCalculator {
    let today = today.unwrap_or_else(common::today);
    DashboardCalculator::new_with_today(today)
        .with_recent_limit(dashboard::RECENT_TRANSACTIONS)
        .with_distribution_limit(dashboard::DISTRIBUTION_CATEGORIES)
}
