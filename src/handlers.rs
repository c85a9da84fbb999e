pub mod auth;
pub mod budgets;
pub mod categories;
pub mod expenses;
pub mod health;
pub mod incomes;
pub mod reports;
pub mod savings;

use axum::http::header;
use axum::response::{IntoResponse, Response};
use common::Page;
use sea_orm::{ConnectionTrait, Paginator, SelectorTrait};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::ApiError;

/// Rows per page on the expense and income lists.
pub const LIST_PAGE_SIZE: u64 = 20;
/// Rows per page on a saving's movement ledger.
pub const MOVEMENTS_PAGE_SIZE: u64 = 10;

/// List filters shared by expenses, incomes and budgets.
///
/// Values are taken as text so that a malformed filter is ignored instead
/// of failing the request.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 1-based page number
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<u64>,
    /// Month (1-12), only applied together with a year
    pub month: Option<String>,
    /// Year, e.g. 2025
    pub year: Option<String>,
    /// Category id
    pub category: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1)
    }

    pub fn month(&self) -> Option<u32> {
        self.month
            .as_deref()
            .and_then(|m| m.trim().parse::<u32>().ok())
            .filter(|m| (1..=12).contains(m))
    }

    pub fn year(&self) -> Option<i32> {
        self.year
            .as_deref()
            .and_then(|y| y.trim().parse::<i32>().ok())
            .filter(|y| (1900..=9999).contains(y))
    }

    pub fn category(&self) -> Option<i32> {
        self.category
            .as_deref()
            .and_then(|c| c.trim().parse::<i32>().ok())
            .filter(|c| *c > 0)
    }

    pub fn has_filters(&self) -> bool {
        self.month().is_some() || self.year().is_some() || self.category().is_some()
    }
}

/// Plain page selector for nested listings.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number
    #[validate(range(min = 1, max = 10000))]
    pub page: Option<u64>,
}

/// A single month; either part missing falls back to the current month.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct MonthQuery {
    #[validate(range(min = 1, max = 12))]
    pub month: Option<u32>,
    #[validate(range(min = 2020, max = 2100))]
    pub year: Option<i32>,
}

impl MonthQuery {
    pub fn resolve(&self) -> (u32, i32) {
        let (current_month, current_year) = common::current_month_year();
        (self.month.unwrap_or(current_month), self.year.unwrap_or(current_year))
    }
}

/// Fetches one 1-based page. Pages past the end come back empty.
pub async fn fetch_page<'db, C, S>(
    paginator: Paginator<'db, C, S>,
    page: u64,
    per_page: u64,
) -> Result<Page<S::Item>, ApiError>
where
    C: ConnectionTrait,
    S: SelectorTrait + 'db,
{
    let totals = paginator.num_items_and_pages().await?;
    let items = paginator.fetch_page(page.saturating_sub(1)).await?;
    Ok(Page {
        items,
        page,
        per_page,
        total_items: totals.number_of_items,
        total_pages: totals.number_of_pages,
    })
}

/// Serializes rows into a CSV attachment.
pub fn csv_attachment(filename: &str, headers: &[&str], rows: Vec<Vec<String>>) -> Result<Response, ApiError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(headers)
        .map_err(|e| ApiError::Internal(format!("Failed to write CSV header: {e}")))?;
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| ApiError::Internal(format!("Failed to write CSV row: {e}")))?;
    }
    let body = writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("Failed to finish CSV: {e}")))?;

    // Excel needs the BOM to pick UTF-8
    let mut bytes = "\u{feff}".as_bytes().to_vec();
    bytes.extend(body);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}.csv\"", filename)),
        ],
        bytes,
    )
        .into_response())
}
