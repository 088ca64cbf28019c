// src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One month of index performance, `month` formatted as `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReturn {
    pub month: String,
    pub return_pct: f64,
}

impl MonthlyReturn {
    pub fn new(month: impl Into<String>, return_pct: f64) -> Self {
        MonthlyReturn {
            month: month.into(),
            return_pct,
        }
    }

    /// Year and month parsed back out of the `YYYY-MM` key.
    pub fn year_month(&self) -> Option<(i32, u32)> {
        let (year, month) = self.month.split_once('-')?;
        let year = year.trim().parse::<i32>().ok()?;
        let month = month.trim().parse::<u32>().ok()?;
        if (1..=12).contains(&month) {
            Some((year, month))
        } else {
            None
        }
    }
}

/// A single close parsed out of a price feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRow {
    pub timestamp: NaiveDate,
    pub close: f64,
}

/// Latest known indicator values. Every field is optional; a missing value
/// renders as "--".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vix: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnn_fear_greed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypto_fear_greed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sp_participation_20: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sp_participation_50: Option<f64>,
}

/// A partial set of metrics produced by one data family.
pub type MetricsUpdate = MarketMetrics;

fn pick(current: Option<f64>, incoming: Option<f64>) -> Option<f64> {
    match incoming {
        Some(v) if v.is_finite() => Some(v),
        _ => current,
    }
}

impl MarketMetrics {
    /// Returns a new value with every finite field of `update` applied on top
    /// of `self`. Absent or non-finite fields leave the current value alone.
    pub fn merged(&self, update: &MetricsUpdate) -> MarketMetrics {
        MarketMetrics {
            vix: pick(self.vix, update.vix),
            cnn_fear_greed: pick(self.cnn_fear_greed, update.cnn_fear_greed),
            crypto_fear_greed: pick(self.crypto_fear_greed, update.crypto_fear_greed),
            sp_participation_20: pick(self.sp_participation_20, update.sp_participation_20),
            sp_participation_50: pick(self.sp_participation_50, update.sp_participation_50),
        }
    }
}

/// Envelope persisted by the same-day cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub date: String,
    pub values: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_only_applies_present_finite_fields() {
        let current = MarketMetrics {
            vix: Some(14.2),
            cnn_fear_greed: Some(54.0),
            ..Default::default()
        };
        let update = MetricsUpdate {
            vix: Some(f64::NAN),
            cnn_fear_greed: Some(61.0),
            crypto_fear_greed: Some(40.0),
            ..Default::default()
        };

        let next = current.merged(&update);
        assert_eq!(next.vix, Some(14.2));
        assert_eq!(next.cnn_fear_greed, Some(61.0));
        assert_eq!(next.crypto_fear_greed, Some(40.0));
        assert_eq!(next.sp_participation_20, None);
        // the original value is untouched
        assert_eq!(current.cnn_fear_greed, Some(54.0));
    }

    #[test]
    fn metrics_serialize_with_camel_case_and_skip_missing() {
        let m = MarketMetrics {
            cnn_fear_greed: Some(50.0),
            ..Default::default()
        };
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"cnnFearGreed":50.0}"#);
    }

    #[test]
    fn year_month_rejects_bad_keys() {
        assert_eq!(MonthlyReturn::new("2024-03", 1.0).year_month(), Some((2024, 3)));
        assert_eq!(MonthlyReturn::new("2024-13", 1.0).year_month(), None);
        assert_eq!(MonthlyReturn::new("garbage", 1.0).year_month(), None);
    }
}
