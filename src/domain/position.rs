//! Simulated spot holdings.

use serde::{Deserialize, Serialize};

/// A long holding in one asset, marked to the last price seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Units held.
    pub size: f64,
    /// Weighted-average cost per unit.
    pub entry_price: f64,
    pub last_price: f64,
    /// `size * last_price`.
    pub usd_value: f64,
}

impl Position {
    pub fn open(size: f64, price: f64) -> Self {
        Position {
            size,
            entry_price: price,
            last_price: price,
            usd_value: size * price,
        }
    }

    /// Position bought for exactly `usd` at `price`.
    pub fn with_cost(usd: f64, price: f64) -> Self {
        Position {
            size: usd / price,
            entry_price: price,
            last_price: price,
            usd_value: usd,
        }
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.size * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.size * (price - self.entry_price)
    }

    pub fn mark(&mut self, price: f64) {
        self.last_price = price;
        self.usd_value = self.market_value(price);
    }

    /// Adds `units` bought at `price`, averaging the entry price.
    pub fn add(&mut self, units: f64, price: f64) {
        let total = self.size + units;
        if total > 0.0 {
            self.entry_price = (self.size * self.entry_price + units * price) / total;
        }
        self.size = total;
        self.mark(price);
    }

    /// Removes up to `units` at `price` and returns `(units_sold, realized_pnl)`.
    pub fn reduce(&mut self, units: f64, price: f64) -> (f64, f64) {
        let sold = units.clamp(0.0, self.size);
        let realized = sold * (price - self.entry_price);
        self.size -= sold;
        self.mark(price);
        (sold, realized)
    }

    pub fn is_flat(&self) -> bool {
        self.size <= f64::EPSILON
    }
}
