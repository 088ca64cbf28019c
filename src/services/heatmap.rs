// src/services/heatmap.rs
use std::collections::BTreeMap;

use crate::models::MonthlyReturn;
use crate::services::returns::WINDOW_MONTHS;
use crate::services::stats::Direction;

/// Percent move at which a cell reaches full colour.
pub const COLOUR_SATURATION_PCT: f64 = 12.0;

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapRow {
    pub year: i32,
    pub values: [Option<f64>; 12],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColourBand {
    pub direction: Direction,
    /// 0.0 for flat, 1.0 at or beyond the saturation point.
    pub intensity: f64,
}

pub fn colour_band(value: f64) -> ColourBand {
    let clamped = value.clamp(-COLOUR_SATURATION_PCT, COLOUR_SATURATION_PCT);
    ColourBand {
        direction: if value >= 0.0 { Direction::Up } else { Direction::Down },
        intensity: clamped.abs() / COLOUR_SATURATION_PCT,
    }
}

/// Groups the last fifteen years (ending at the newest month present) into
/// one row per year, newest year first. Months without data stay `None`.
pub fn build_heatmap(data: &[MonthlyReturn]) -> Vec<HeatmapRow> {
    let keyed: Vec<(i32, u32, f64)> = data
        .iter()
        .filter_map(|m| m.year_month().map(|(y, mo)| (y, mo, m.return_pct)))
        .collect();

    let index = |y: i32, mo: u32| y * 12 + mo as i32 - 1;
    let newest = match keyed.iter().map(|(y, mo, _)| index(*y, *mo)).max() {
        Some(idx) => idx,
        None => return Vec::new(),
    };
    let start = newest - WINDOW_MONTHS + 1;

    let mut by_year: BTreeMap<i32, [Option<f64>; 12]> = BTreeMap::new();
    for (year, month, value) in keyed {
        if index(year, month) < start {
            continue;
        }
        by_year.entry(year).or_insert([None; 12])[(month - 1) as usize] = Some(value);
    }

    by_year
        .into_iter()
        .rev()
        .map(|(year, values)| HeatmapRow { year, values })
        .collect()
}
