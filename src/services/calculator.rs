// src/services/calculator.rs
//! Scenario arithmetic for a position: price targets from percentage moves
//! (and back), short-put cost basis, and share sizing for a cash budget.

use serde::Serialize;

pub const MAX_MOVE_PCT: f64 = 300.0;
pub const SHARES_PER_CONTRACT: f64 = 100.0;

pub fn clamp_pct(value: f64) -> f64 {
    value.clamp(0.0, MAX_MOVE_PCT)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceMove {
    pub buy_price: f64,
    pub up_pct: f64,
    pub down_pct: f64,
    pub up_price: f64,
    pub down_price: f64,
}

pub fn price_move(buy_price: f64, up_pct: f64, down_pct: f64) -> PriceMove {
    let up_pct = clamp_pct(up_pct);
    let down_pct = clamp_pct(down_pct);
    PriceMove {
        buy_price,
        up_pct,
        down_pct,
        up_price: buy_price * (1.0 + up_pct / 100.0),
        down_price: buy_price * (1.0 - down_pct / 100.0),
    }
}

/// Percentage rise needed to reach `target`. `None` without a positive buy price.
pub fn up_pct_for_target(buy_price: f64, target: f64) -> Option<f64> {
    if buy_price <= 0.0 || !target.is_finite() {
        return None;
    }
    Some(clamp_pct((target / buy_price - 1.0) * 100.0))
}

/// Percentage fall down to `target`. `None` without a positive buy price.
pub fn down_pct_for_target(buy_price: f64, target: f64) -> Option<f64> {
    if buy_price <= 0.0 || !target.is_finite() {
        return None;
    }
    Some(clamp_pct((buy_price - target) / buy_price * 100.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SellPut {
    pub strike: f64,
    pub premium: f64,
    pub contracts: u32,
    pub net_cost_per_share: f64,
    pub premium_total: f64,
    pub assignment_cost: f64,
}

/// Cost basis if a short put is assigned. Contract count is rounded and
/// never below one.
pub fn sell_put(strike: f64, premium: f64, contracts: f64) -> SellPut {
    let contracts = if contracts.is_finite() {
        contracts.round().max(1.0) as u32
    } else {
        1
    };
    let lots = contracts as f64 * SHARES_PER_CONTRACT;
    let net_cost_per_share = strike - premium;
    SellPut {
        strike,
        premium,
        contracts,
        net_cost_per_share,
        premium_total: premium * lots,
        assignment_cost: net_cost_per_share * lots,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionSize {
    pub shares: u64,
    pub cost: f64,
    pub leftover: f64,
    /// Whole option contracts the share count would cover.
    pub contracts_covered: u64,
}

pub fn position_size(budget: f64, share_price: f64) -> Option<PositionSize> {
    if share_price <= 0.0 || !share_price.is_finite() || !budget.is_finite() || budget < 0.0 {
        return None;
    }
    let shares = (budget / share_price).floor() as u64;
    let cost = shares as f64 * share_price;
    Some(PositionSize {
        shares,
        cost,
        leftover: budget - cost,
        contracts_covered: shares / SHARES_PER_CONTRACT as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn moves_from_buy_price() {
        let m = price_move(100.0, 8.0, 6.0);
        assert!(close(m.up_price, 108.0));
        assert!(close(m.down_price, 94.0));

        let clamped = price_move(50.0, 500.0, -5.0);
        assert_eq!(clamped.up_pct, 300.0);
        assert_eq!(clamped.down_pct, 0.0);
        assert!(close(clamped.up_price, 200.0));
    }

    #[test]
    fn targets_back_to_percentages() {
        assert!(close(up_pct_for_target(100.0, 125.0).unwrap(), 25.0));
        assert!(close(down_pct_for_target(100.0, 94.0).unwrap(), 6.0));
        assert_eq!(up_pct_for_target(100.0, 80.0), Some(0.0));
        assert_eq!(up_pct_for_target(0.0, 80.0), None);
        assert_eq!(down_pct_for_target(-1.0, 80.0), None);
    }

    #[test]
    fn short_put_cost_basis() {
        let p = sell_put(225.0, 3.2, 2.0);
        assert!(close(p.net_cost_per_share, 221.8));
        assert!(close(p.premium_total, 640.0));
        assert!(close(p.assignment_cost, 44_360.0));

        assert_eq!(sell_put(225.0, 3.2, 0.0).contracts, 1);
        assert_eq!(sell_put(225.0, 3.2, 2.6).contracts, 3);
    }

    #[test]
    fn sizing_floors_shares() {
        let s = position_size(10_000.0, 225.0).unwrap();
        assert_eq!(s.shares, 44);
        assert!(close(s.leftover, 100.0));
        assert_eq!(s.contracts_covered, 0);

        assert_eq!(position_size(50_000.0, 100.0).unwrap().contracts_covered, 5);
        assert!(position_size(1000.0, 0.0).is_none());
    }
}
