// src/handlers/view.rs
use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_BORDERS_ONLY, Attribute, Cell, CellAlignment,
    Color, ContentArrangement, Table,
};

use crate::models::MonthlyReturn;
use crate::services::calculator::{PositionSize, PriceMove, SellPut};
use crate::services::format::{
    format_currency, format_month, format_optional_pct, format_pct, streak_label,
};
use crate::services::heatmap::{build_heatmap, colour_band};
use crate::services::stats::{Direction, ReturnStats};

use super::dashboard::DashboardState;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .into_iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}

fn label_value_table(rows: Vec<(&str, String)>) -> Table {
    let mut table = new_table(vec!["", ""]);
    for (label, value) in rows {
        table.add_row(vec![
            Cell::new(label).fg(Color::DarkGrey),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

fn month_and_pct(m: Option<&MonthlyReturn>) -> String {
    m.map(|m| format!("{} · {}", format_month(&m.month), format_pct(m.return_pct, 2)))
        .unwrap_or_else(|| "--".to_string())
}

pub fn render_metrics(state: &DashboardState) -> Table {
    let m = &state.metrics;
    let mut table = new_table(vec!["Indicator", "Value", ""]);
    let vix = m.vix.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "--".to_string());
    let rows = vec![
        ("VIX", vix, "implied S&P 500 volatility"),
        ("CNN Fear & Greed", format_optional_pct(m.cnn_fear_greed, 0), "0 fear · 100 greed"),
        ("Crypto Fear & Greed", format_optional_pct(m.crypto_fear_greed, 0), "0 fear · 100 greed"),
        (
            "S&P 20d participation",
            format_optional_pct(m.sp_participation_20, 0),
            "members above 20-day MA",
        ),
        (
            "S&P 50d participation",
            format_optional_pct(m.sp_participation_50, 0),
            "members above 50-day MA",
        ),
    ];
    for (title, value, hint) in rows {
        table.add_row(vec![
            Cell::new(title),
            Cell::new(value).add_attribute(Attribute::Bold).set_alignment(CellAlignment::Right),
            Cell::new(hint).fg(Color::DarkGrey),
        ]);
    }
    table
}

pub fn render_stats(stats: &ReturnStats, returns: &[MonthlyReturn]) -> Table {
    label_value_table(vec![
        ("CAGR", format_pct(stats.cagr * 100.0, 2)),
        ("Best month", month_and_pct(stats.best.as_ref())),
        ("Worst month", month_and_pct(stats.worst.as_ref())),
        ("Win rate", format_pct(stats.win_rate * 100.0, 1)),
        ("Latest month", month_and_pct(returns.last())),
        ("Average month", format_pct(stats.avg, 2)),
        ("Volatility (monthly)", format_pct(stats.std, 2)),
        ("Streak", streak_label(stats.streak)),
        ("Data points", format!("{} months", returns.len())),
    ])
}

fn heat_colour(value: f64) -> Color {
    let band = colour_band(value);
    let level = (120.0 + 135.0 * band.intensity) as u8;
    match band.direction {
        Direction::Up => Color::Rgb { r: 0, g: level, b: 60 },
        Direction::Down => Color::Rgb { r: level, g: 30, b: 30 },
    }
}

pub fn render_heatmap(returns: &[MonthlyReturn]) -> Table {
    let mut header = vec!["Year"];
    header.extend(MONTH_NAMES);
    let mut table = new_table(header);

    for row in build_heatmap(returns) {
        let mut cells = vec![Cell::new(row.year).add_attribute(Attribute::Bold)];
        for value in row.values {
            let cell = match value {
                Some(v) => Cell::new(format_pct(v, 1)).fg(heat_colour(v)),
                None => Cell::new("—").fg(Color::DarkGrey),
            };
            cells.push(cell.set_alignment(CellAlignment::Right));
        }
        table.add_row(cells);
    }
    table
}

pub fn render_dashboard(state: &DashboardState) -> String {
    let stats = state.stats();
    let mut out = String::new();
    out.push_str("US Equity & Macro Pulse\n");
    out.push_str(&format!("{}\n\n", render_metrics(state)));
    out.push_str("S&P 500 monthly returns, last 15 years\n");
    if state.returns.is_empty() {
        out.push_str("No monthly returns loaded.\n");
    } else {
        out.push_str(&format!("{}\n", render_stats(&stats, &state.returns)));
        out.push_str(&format!("{}\n", render_heatmap(&state.returns)));
    }
    out
}

pub fn render_price_move(m: &PriceMove) -> Table {
    label_value_table(vec![
        ("Buy price", format_currency(m.buy_price)),
        ("Up move", format_pct(m.up_pct, 1)),
        ("Up price", format_currency(m.up_price)),
        ("Down move", format_pct(m.down_pct, 1)),
        ("Down price", format_currency(m.down_price)),
    ])
}

pub fn render_sell_put(p: &SellPut) -> Table {
    label_value_table(vec![
        ("Strike", format_currency(p.strike)),
        ("Premium", format_currency(p.premium)),
        ("Contracts", format!("{} × 100 shares", p.contracts)),
        ("Net cost if assigned", format_currency(p.net_cost_per_share)),
        ("Premium received", format_currency(p.premium_total)),
        ("Cash needed if assigned", format_currency(p.assignment_cost)),
    ])
}

pub fn render_position_size(s: &PositionSize) -> Table {
    label_value_table(vec![
        ("Shares", s.shares.to_string()),
        ("Cost", format_currency(s.cost)),
        ("Leftover cash", format_currency(s.leftover)),
        ("Contracts covered", s.contracts_covered.to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MarketMetrics;

    #[test]
    fn dashboard_shows_placeholders_when_empty() {
        let text = render_dashboard(&DashboardState::default());
        assert!(text.contains("CNN Fear & Greed"));
        assert!(text.contains("--"));
        assert!(text.contains("No monthly returns loaded."));
    }

    #[test]
    fn dashboard_renders_values_and_heatmap() {
        let state = DashboardState {
            metrics: MarketMetrics {
                cnn_fear_greed: Some(54.0),
                vix: Some(14.25),
                ..Default::default()
            },
            returns: vec![
                MonthlyReturn::new("2024-03", 3.1),
                MonthlyReturn::new("2024-04", -4.16),
            ],
        };
        let text = render_dashboard(&state);
        assert!(text.contains("54%"));
        assert!(text.contains("14.25"));
        assert!(text.contains("2024"));
        assert!(text.contains("-4.2%"));
        assert!(text.contains("2024.04 · -4.16%"));
        assert!(text.contains("↓ 1 mo"));
    }
}
