// src/services/format.rs
use crate::services::stats::{Direction, Streak};

pub fn format_pct(value: f64, digits: usize) -> String {
    format!("{:.*}%", digits, value)
}

/// Percent for an optional metric, "--" when missing.
pub fn format_optional_pct(value: Option<f64>, digits: usize) -> String {
    value
        .map(|v| format_pct(v, digits))
        .unwrap_or_else(|| "--".to_string())
}

/// `YYYY-MM` to `YYYY.MM`.
pub fn format_month(month_key: &str) -> String {
    match month_key.split_once('-') {
        Some((y, m)) => format!("{}.{}", y, m),
        None => month_key.to_string(),
    }
}

pub fn streak_label(streak: Option<Streak>) -> String {
    match streak {
        Some(Streak { direction: Direction::Up, count }) => format!("↑ {} mo", count),
        Some(Streak { direction: Direction::Down, count }) => format!("↓ {} mo", count),
        None => "--".to_string(),
    }
}

pub fn format_currency(value: f64) -> String {
    if value.is_finite() {
        format!("${:.2}", value)
    } else {
        "--".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats() {
        assert_eq!(format_pct(2.346, 2), "2.35%");
        assert_eq!(format_pct(54.0, 0), "54%");
        assert_eq!(format_optional_pct(None, 0), "--");
        assert_eq!(format_month("2024-03"), "2024.03");
        assert_eq!(format_currency(221.8), "$221.80");
        assert_eq!(format_currency(f64::NAN), "--");
        assert_eq!(
            streak_label(Some(Streak { direction: Direction::Down, count: 3 })),
            "↓ 3 mo"
        );
        assert_eq!(streak_label(None), "--");
    }
}
