// src/services/returns.rs
use chrono::{Datelike, NaiveDate};
use log::{debug, info};

use crate::error::{FetchError, Result};
use crate::models::{MonthlyReturn, PriceRow};

/// Length of the heatmap window in months.
pub const WINDOW_MONTHS: i32 = 15 * 12;

/// Months since year 0, zero-based month. Consecutive months differ by one.
pub fn month_index(day: NaiveDate) -> i32 {
    day.year() * 12 + day.month0() as i32
}

pub fn month_key_from_index(idx: i32) -> String {
    format!("{:04}-{:02}", idx.div_euclid(12), idx.rem_euclid(12) + 1)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Keeps the latest row of each calendar month. Input must be sorted.
fn last_per_month(rows: &[PriceRow]) -> Vec<PriceRow> {
    let mut out: Vec<PriceRow> = Vec::with_capacity(rows.len());
    for row in rows {
        match out.last_mut() {
            Some(prev) if month_index(prev.timestamp) == month_index(row.timestamp) => *prev = *row,
            _ => out.push(*row),
        }
    }
    out
}

/// Month-over-month percentage returns for the 180 months ending at the last
/// fully completed month before `today`. The month containing `today` is
/// always excluded.
pub fn derive_monthly_returns(rows: &[PriceRow], today: NaiveDate) -> Result<Vec<MonthlyReturn>> {
    let mut sorted = rows.to_vec();
    sorted.sort_by_key(|r| r.timestamp);
    let monthly = last_per_month(&sorted);
    if monthly.len() < 2 {
        return Err(FetchError::InsufficientData {
            found: monthly.len(),
        });
    }
    if monthly.len() != sorted.len() {
        debug!(
            "Collapsed {} rows to {} month-end closes",
            sorted.len(),
            monthly.len()
        );
    }

    let last_complete = month_index(today) - 1;
    let start = last_complete - WINDOW_MONTHS + 1;

    let mut out = Vec::new();
    for pair in monthly.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        let idx = month_index(cur.timestamp);
        if idx > last_complete {
            break;
        }
        if idx < start {
            continue;
        }
        let ret = (cur.close / prev.close - 1.0) * 100.0;
        if !ret.is_finite() {
            debug!("Skipping non-finite return for {}", cur.timestamp);
            continue;
        }
        out.push(MonthlyReturn::new(month_key_from_index(idx), round2(ret)));
    }

    if out.is_empty() {
        return Err(FetchError::EmptyResult);
    }
    info!(
        "Derived {} monthly returns ({} to {})",
        out.len(),
        out[0].month,
        out[out.len() - 1].month
    );
    Ok(out)
}
