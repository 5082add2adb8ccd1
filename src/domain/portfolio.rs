//! Portfolio state value object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::position::Position;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub cash: f64,
    pub positions: BTreeMap<String, Position>,
    /// Always `cash` plus the sum of position values.
    pub total_value: f64,
}

impl PortfolioState {
    pub fn new(cash: f64) -> Self {
        PortfolioState {
            cash,
            positions: BTreeMap::new(),
            total_value: cash,
        }
    }

    pub fn get_position(&self, asset: &str) -> Option<&Position> {
        self.positions.get(asset)
    }

    pub fn has_position(&self, asset: &str) -> bool {
        self.positions.contains_key(asset)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn holdings_value(&self) -> f64 {
        self.positions.values().map(|p| p.usd_value).sum()
    }

    pub fn recompute_total(&mut self) {
        self.total_value = self.cash + self.holdings_value();
    }

    /// True when `total_value` agrees with cash plus holdings.
    pub fn is_consistent(&self) -> bool {
        let expected = self.cash + self.holdings_value();
        (self.total_value - expected).abs() <= 1e-9 * expected.abs().max(1.0)
    }

    /// Drops positions whose size has gone to zero.
    pub fn prune_flat(&mut self) {
        self.positions.retain(|_, p| !p.is_flat());
    }
}
