//! Trading loop orchestration.
//!
//! One cycle fetches a window per asset, analyses all windows in parallel,
//! then resolves, executes and journals each asset in turn through the single
//! simulator owner.

use std::sync::Arc;
use std::time::Duration;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use super::allocation::{self, Allocation};
use super::decision::{
    self, Analysis, DecisionContext, DecisionRecord, DecisionResolver, DecisionThresholds,
};
use super::error::AgentError;
use super::ohlcv::{Interval, PriceWindow};
use super::risk::RiskConfig;
use super::simulator::{PortfolioSimulator, TradeResult};
use crate::ports::data_port::DataPort;
use crate::ports::journal_port::{JournalEntry, TradeJournal};
use crate::ports::suggestion_port::SuggestionPort;

#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub assets: Vec<String>,
    pub interval: Interval,
    pub lookback: usize,
    pub starting_funds: f64,
    pub iterations: usize,
    pub cycle_delay: Duration,
    /// Split starting funds across assets before the first cycle.
    pub initial_allocation: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            assets: vec!["BTC".into(), "ETH".into()],
            interval: Interval::Hour1,
            lookback: 50,
            starting_funds: 1000.0,
            iterations: 100,
            cycle_delay: Duration::ZERO,
            initial_allocation: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: usize,
    pub decisions: Vec<DecisionRecord>,
    pub trades: Vec<TradeResult>,
    /// Assets with no usable window this cycle.
    pub skipped: Vec<String>,
    pub portfolio_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub cycles: usize,
    pub trades: usize,
    pub starting_funds: f64,
    pub final_value: f64,
}

pub struct Agent {
    config: AgentConfig,
    risk: RiskConfig,
    data: Box<dyn DataPort>,
    provider: Arc<dyn SuggestionPort>,
    resolver: DecisionResolver,
    simulator: PortfolioSimulator,
    journal: Box<dyn TradeJournal>,
}

impl Agent {
    pub fn new(
        config: AgentConfig,
        risk: RiskConfig,
        thresholds: &DecisionThresholds,
        data: Box<dyn DataPort>,
        provider: Arc<dyn SuggestionPort>,
        journal: Box<dyn TradeJournal>,
    ) -> Self {
        let resolver = DecisionResolver::new(Arc::clone(&provider), thresholds);
        let simulator = PortfolioSimulator::new(config.starting_funds);
        Agent {
            config,
            risk,
            data,
            provider,
            resolver,
            simulator,
            journal,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn simulator(&self) -> &PortfolioSimulator {
        &self.simulator
    }

    fn fetch_all(&self) -> Vec<(String, Result<PriceWindow, AgentError>)> {
        self.config
            .assets
            .iter()
            .map(|asset| {
                let fetched = self
                    .data
                    .fetch(asset, self.config.interval, self.config.lookback);
                (asset.clone(), fetched)
            })
            .collect()
    }

    /// Computes the initial split without touching the portfolio.
    pub fn plan_allocation(&self) -> Allocation {
        let outlooks = allocation::analyse_assets(
            self.fetch_all(),
            self.simulator.portfolio_value(),
            &self.risk,
        );
        allocation::make_initial_allocation(
            self.provider.as_ref(),
            &outlooks,
            self.simulator.portfolio_value(),
        )
    }

    /// Plans and applies the initial split. Assets without a price are left
    /// out and the remainder renormalised.
    pub fn allocate_initial(&mut self) -> Result<Allocation, AgentError> {
        let outlooks = allocation::analyse_assets(
            self.fetch_all(),
            self.simulator.portfolio_value(),
            &self.risk,
        );
        let planned = allocation::make_initial_allocation(
            self.provider.as_ref(),
            &outlooks,
            self.simulator.portfolio_value(),
        );
        let prices = allocation::outlook_prices(&outlooks);
        let applied = planned.restricted_to(&prices);
        if applied.is_empty() {
            return Err(AgentError::Data {
                reason: "no asset has a usable price for allocation".into(),
            });
        }
        self.simulator.allocate(&applied, &prices)?;
        Ok(applied)
    }

    /// Decision for one asset without executing it.
    pub fn decide(&self, asset: &str) -> Result<DecisionRecord, AgentError> {
        let window = self
            .data
            .fetch(asset, self.config.interval, self.config.lookback)?;
        let value = self.simulator.portfolio_value();
        let analysis = analyse_or_degrade(&window, value, &self.risk)?;
        let closes = window.closes();
        Ok(self.resolver.resolve(&DecisionContext {
            asset,
            portfolio_value: value,
            analysis: analysis.as_ref(),
            closes: &closes,
        }))
    }

    pub fn run_cycle(&mut self, cycle: usize) -> Result<CycleReport, AgentError> {
        let value = self.simulator.portfolio_value();
        let risk = &self.risk;

        let analysed: Vec<(String, Result<(PriceWindow, Option<Analysis>), AgentError>)> = self
            .fetch_all()
            .into_par_iter()
            .map(|(asset, fetched)| {
                let result = fetched.and_then(|window| {
                    let analysis = analyse_or_degrade(&window, value, risk)?;
                    Ok((window, analysis))
                });
                (asset, result)
            })
            .collect();

        let mut report = CycleReport {
            cycle,
            decisions: Vec::new(),
            trades: Vec::new(),
            skipped: Vec::new(),
            portfolio_value: value,
        };

        for (asset, result) in analysed {
            let (window, analysis) = match result {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(cycle, asset = %asset, error = %e, "asset skipped this cycle");
                    report.skipped.push(asset);
                    continue;
                }
            };

            let closes = window.closes();
            let record = self.resolver.resolve(&DecisionContext {
                asset: &asset,
                portfolio_value: self.simulator.portfolio_value(),
                analysis: analysis.as_ref(),
                closes: &closes,
            });

            let trade = self.simulator.execute(&asset, &record, window.last_close());
            self.journal.append(&JournalEntry {
                timestamp: trade.timestamp,
                asset: asset.clone(),
                decision: record.decision,
                strength: record.strength,
                source: record.source,
                result: trade.status,
                pnl: trade.pnl,
                portfolio_value: trade.final_portfolio,
            })?;

            report.decisions.push(record);
            report.trades.push(trade);
        }

        report.portfolio_value = self.simulator.portfolio_value();
        info!(
            cycle,
            trades = report.trades.len(),
            skipped = report.skipped.len(),
            value = report.portfolio_value,
            "cycle complete"
        );
        Ok(report)
    }

    pub fn run(&mut self) -> Result<RunSummary, AgentError> {
        if self.config.initial_allocation {
            match self.allocate_initial() {
                Ok(applied) => info!(?applied, "initial allocation"),
                Err(e) => warn!(error = %e, "initial allocation failed, starting in cash"),
            }
        }

        let mut trades = 0;
        for cycle in 1..=self.config.iterations {
            let report = self.run_cycle(cycle)?;
            trades += report.trades.len();
            if cycle < self.config.iterations && !self.config.cycle_delay.is_zero() {
                std::thread::sleep(self.config.cycle_delay);
            }
        }

        Ok(RunSummary {
            cycles: self.config.iterations,
            trades,
            starting_funds: self.simulator.starting_funds(),
            final_value: self.simulator.portfolio_value(),
        })
    }
}

/// Analysis for a fetched window. Too short a window is an error and the asset
/// is skipped; any other analysis failure yields `None` so the resolver falls
/// through to the RSI rule on the raw closes.
fn analyse_or_degrade(
    window: &PriceWindow,
    portfolio_value: f64,
    risk: &RiskConfig,
) -> Result<Option<Analysis>, AgentError> {
    match decision::analyze(window, portfolio_value, risk) {
        Ok(analysis) => Ok(Some(analysis)),
        Err(e @ AgentError::InsufficientData { .. }) => Err(e),
        Err(e) => {
            warn!(asset = %window.asset, error = %e, "analysis failed, deciding from raw closes");
            Ok(None)
        }
    }
}
