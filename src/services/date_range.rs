use chrono::{Datelike, Duration, NaiveDate};

use crate::errors::AppError;
use crate::models::DateRange;

/// Default applied when a bound is missing or unparseable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultWindow {
    /// `days` back from today through today.
    Trailing(i64),
    /// First to last day of the month containing today.
    CurrentMonth,
}

/// Parses `DD/MM/YYYY` first, then `YYYY-MM-DD`. Anything else is `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

pub fn current_month_range(today: NaiveDate) -> DateRange {
    let start = today.with_day(1).unwrap_or(today);
    let next_month = if start.month() == 12 {
        NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
    };
    let end = next_month
        .and_then(|d| d.pred_opt())
        .unwrap_or(today);
    DateRange { start, end }
}

fn default_range(today: NaiveDate, window: DefaultWindow) -> DateRange {
    match window {
        DefaultWindow::Trailing(days) => DateRange {
            start: today - Duration::days(days),
            end: today,
        },
        DefaultWindow::CurrentMonth => current_month_range(today),
    }
}

/// Resolves optional raw bounds into a canonical range. Each bound falls back
/// independently; an inverted range after defaults is a validation error.
pub fn resolve(
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
    window: DefaultWindow,
) -> Result<DateRange, AppError> {
    let fallback = default_range(today, window);
    let start = start.and_then(parse_date).unwrap_or(fallback.start);
    let end = end.and_then(parse_date).unwrap_or(fallback.end);

    if start > end {
        return Err(AppError::Validation(format!(
            "fecha_inicio ({}) es posterior a fecha_fin ({})",
            start, end
        )));
    }

    Ok(DateRange { start, end })
}
