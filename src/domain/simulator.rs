//! Portfolio simulation.
//!
//! `PortfolioSimulator` is the single owner of the simulated `PortfolioState`.
//! Every mutation goes through `allocate` or `execute`, which take `&mut self`,
//! so callers serialize trades by construction. Fills happen at the supplied
//! price with no fees or slippage, and positions are long-only.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::allocation::Allocation;
use super::decision::{Decision, DecisionRecord};
use super::error::AgentError;
use super::portfolio::PortfolioState;
use super::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    /// Units changed hands.
    Executed,
    /// A HOLD decision; holdings were only re-marked.
    Held,
    /// Nothing could be traded: bad price, no cash, or nothing to sell.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResult {
    pub asset: String,
    pub status: TradeStatus,
    pub executed_decision: Decision,
    pub initial_portfolio: f64,
    pub final_portfolio: f64,
    pub pnl: f64,
    pub pnl_percentage: f64,
    pub realized_pnl: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PortfolioSimulator {
    state: PortfolioState,
    starting_funds: f64,
    history: Vec<TradeResult>,
}

fn valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

impl PortfolioSimulator {
    pub fn new(starting_funds: f64) -> Self {
        PortfolioSimulator {
            state: PortfolioState::new(starting_funds),
            starting_funds,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> &PortfolioState {
        &self.state
    }

    pub fn starting_funds(&self) -> f64 {
        self.starting_funds
    }

    pub fn portfolio_value(&self) -> f64 {
        self.state.total_value
    }

    pub fn history(&self) -> &[TradeResult] {
        &self.history
    }

    /// Splits the current cash across assets by fraction.
    ///
    /// Every asset in the allocation needs a positive price in `prices`; the
    /// state is left untouched if any is missing.
    pub fn allocate(
        &mut self,
        allocation: &Allocation,
        prices: &HashMap<String, f64>,
    ) -> Result<(), AgentError> {
        if allocation.total() > 1.0 + 1e-9 {
            return Err(AgentError::Data {
                reason: format!("allocation sums to {:.6}, above 1.0", allocation.total()),
            });
        }

        let mut fills = Vec::with_capacity(allocation.len());
        for (asset, fraction) in allocation.iter() {
            if !(fraction.is_finite() && fraction >= 0.0) {
                return Err(AgentError::Data {
                    reason: format!("invalid allocation fraction {fraction} for {asset}"),
                });
            }
            let price = prices
                .get(asset)
                .copied()
                .filter(|p| valid_price(*p))
                .ok_or_else(|| AgentError::Data {
                    reason: format!("no usable price for {asset}"),
                })?;
            fills.push((asset.to_string(), fraction, price));
        }

        let base = self.state.cash;
        let mut spent = 0.0;
        for (asset, fraction, price) in fills {
            let usd = base * fraction;
            if usd <= 0.0 {
                continue;
            }
            spent += usd;
            match self.state.positions.get_mut(&asset) {
                Some(existing) => existing.add(usd / price, price),
                None => {
                    self.state.positions.insert(asset, Position::with_cost(usd, price));
                }
            }
        }
        self.state.cash = base - spent;
        if self.state.cash.abs() < 1e-9 * base.abs().max(1.0) {
            self.state.cash = 0.0;
        }
        self.state.recompute_total();

        info!(
            cash = self.state.cash,
            total = self.state.total_value,
            positions = self.state.position_count(),
            "initial allocation applied"
        );
        Ok(())
    }

    /// Re-marks held assets to the given prices and recomputes the total.
    pub fn mark_to_market(&mut self, prices: &HashMap<String, f64>) {
        for (asset, position) in self.state.positions.iter_mut() {
            match prices.get(asset) {
                Some(&price) if valid_price(price) => position.mark(price),
                _ => {}
            }
        }
        self.state.recompute_total();
    }

    pub fn execute(&mut self, asset: &str, record: &DecisionRecord, price: f64) -> TradeResult {
        self.execute_at(asset, record, price, Utc::now())
    }

    pub fn execute_at(
        &mut self,
        asset: &str,
        record: &DecisionRecord,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> TradeResult {
        let initial = self.state.total_value;

        let (status, realized_pnl) = if !valid_price(price) {
            warn!(asset, price, "trade skipped: invalid price");
            (TradeStatus::Skipped, 0.0)
        } else {
            let outcome = match record.decision {
                Decision::Buy => self.buy(asset, record.position_size, price),
                Decision::Sell => self.sell(asset, record.position_size, price),
                Decision::Hold => (TradeStatus::Held, 0.0),
            };
            if let Some(position) = self.state.positions.get_mut(asset) {
                position.mark(price);
            }
            self.state.prune_flat();
            self.state.recompute_total();
            outcome
        };

        let final_value = self.state.total_value;
        let pnl = final_value - initial;
        let pnl_percentage = if initial > 0.0 { pnl / initial * 100.0 } else { 0.0 };

        let result = TradeResult {
            asset: asset.to_string(),
            status,
            executed_decision: record.decision,
            initial_portfolio: initial,
            final_portfolio: final_value,
            pnl,
            pnl_percentage,
            realized_pnl,
            timestamp,
        };

        info!(
            asset,
            decision = %record.decision,
            status = ?status,
            price,
            cash = self.state.cash,
            total = final_value,
            "trade simulated"
        );
        self.history.push(result.clone());
        result
    }

    fn buy(&mut self, asset: &str, size: f64, price: f64) -> (TradeStatus, f64) {
        let spend = size.max(0.0).min(self.state.cash);
        if spend <= 0.0 {
            return (TradeStatus::Skipped, 0.0);
        }
        let units = spend / price;
        self.state.cash -= spend;
        match self.state.positions.get_mut(asset) {
            Some(position) => position.add(units, price),
            None => {
                self.state
                    .positions
                    .insert(asset.to_string(), Position::with_cost(spend, price));
            }
        }
        (TradeStatus::Executed, 0.0)
    }

    fn sell(&mut self, asset: &str, size: f64, price: f64) -> (TradeStatus, f64) {
        let Some(position) = self.state.positions.get_mut(asset) else {
            return (TradeStatus::Skipped, 0.0);
        };
        let value = size.max(0.0).min(position.market_value(price));
        if value <= 0.0 {
            return (TradeStatus::Skipped, 0.0);
        }
        let (sold, realized) = position.reduce(value / price, price);
        self.state.cash += sold * price;
        (TradeStatus::Executed, realized)
    }
}
