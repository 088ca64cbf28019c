// src/services/stats.rs
use serde::Serialize;

use crate::models::MonthlyReturn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn of(return_pct: f64) -> Direction {
        if return_pct >= 0.0 {
            Direction::Up
        } else {
            Direction::Down
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Streak {
    pub direction: Direction,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnStats {
    /// Annualized compound growth, as a fraction (0.1 = 10%).
    pub cagr: f64,
    pub best: Option<MonthlyReturn>,
    pub worst: Option<MonthlyReturn>,
    /// Fraction of strictly positive months.
    pub win_rate: f64,
    pub avg: f64,
    /// Population standard deviation of the monthly percentages.
    pub std: f64,
    pub streak: Option<Streak>,
    pub months: usize,
}

impl Default for ReturnStats {
    fn default() -> Self {
        ReturnStats {
            cagr: 0.0,
            best: None,
            worst: None,
            win_rate: 0.0,
            avg: 0.0,
            std: 0.0,
            streak: None,
            months: 0,
        }
    }
}

/// Sign run ending at the most recent entry. Zero counts as up.
pub fn current_streak(data: &[MonthlyReturn]) -> Option<Streak> {
    let latest = data.last()?;
    let direction = Direction::of(latest.return_pct);
    let count = data
        .iter()
        .rev()
        .take_while(|m| Direction::of(m.return_pct) == direction)
        .count();
    Some(Streak { direction, count })
}

pub fn calculate_return_stats(data: &[MonthlyReturn]) -> ReturnStats {
    if data.is_empty() {
        return ReturnStats::default();
    }

    let n = data.len() as f64;
    let growth: f64 = data.iter().map(|m| 1.0 + m.return_pct / 100.0).product();
    let cagr = growth.powf(12.0 / n) - 1.0;

    let mut best = &data[0];
    let mut worst = &data[0];
    let mut wins = 0usize;
    let mut sum = 0.0;
    for m in data {
        if m.return_pct > best.return_pct {
            best = m;
        }
        if m.return_pct < worst.return_pct {
            worst = m;
        }
        if m.return_pct > 0.0 {
            wins += 1;
        }
        sum += m.return_pct;
    }

    let avg = sum / n;
    let variance = data
        .iter()
        .map(|m| (m.return_pct - avg).powi(2))
        .sum::<f64>()
        / n;

    ReturnStats {
        cagr,
        best: Some(best.clone()),
        worst: Some(worst.clone()),
        win_rate: wins as f64 / n,
        avg,
        std: variance.sqrt(),
        streak: current_streak(data),
        months: data.len(),
    }
}
