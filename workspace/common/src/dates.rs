use chrono::{Datelike, Local, NaiveDate};

const MONTH_NAMES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

/// Today's date in the server's local time zone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Current `(month, year)`.
pub fn current_month_year() -> (u32, i32) {
    let today = today();
    (today.month(), today.year())
}

/// First and last day of a month, both inclusive.
///
/// Returns `None` when `month` is outside 1-12 or the year is out of range.
pub fn month_date_range(month: u32, year: i32) -> Option<(NaiveDate, NaiveDate)> {
    let (start, end) = month_date_range_exclusive(month, year)?;
    Some((start, end.pred_opt()?))
}

/// `[first day, first day of the next month)` for half-open range queries.
pub fn month_date_range_exclusive(month: u32, year: i32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (next_month, next_year) = if month == 12 { (1, year + 1) } else { (month + 1, year) };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    Some((start, end))
}

/// The month before, wrapping January back to December of the prior year.
pub fn previous_month(month: u32, year: i32) -> (u32, i32) {
    if month <= 1 { (12, year - 1) } else { (month - 1, year) }
}

/// Spanish month name; empty for values outside 1-12.
pub fn month_name(month: u32) -> &'static str {
    match month {
        1..=12 => MONTH_NAMES[(month - 1) as usize],
        _ => "",
    }
}
