//! Seeded synthetic price generator.
//!
//! Each asset follows a random walk whose drift and noise change with a
//! market phase drawn every 15 bars. Paths are kept between calls and grow by
//! one bar per fetch, so successive cycles see the market move on.

use std::cell::RefCell;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::domain::error::AgentError;
use crate::domain::ohlcv::{Interval, OhlcvBar, PriceWindow};
use crate::ports::data_port::DataPort;

pub const PHASE_LENGTH: usize = 15;
pub const PRICE_FLOOR: f64 = 0.01;
pub const DEFAULT_BASE_PRICE: f64 = 100.0;
pub const DEFAULT_VOLATILITY: f64 = 0.05;

const BASE_PRICES: [(&str, f64); 17] = [
    ("BTC", 60000.0),
    ("ETH", 3000.0),
    ("SOL", 150.0),
    ("AVAX", 40.0),
    ("XRP", 0.5),
    ("ADA", 0.4),
    ("DOGE", 0.15),
    ("DOT", 7.0),
    ("LINK", 15.0),
    ("MATIC", 0.8),
    ("UNI", 10.0),
    ("LTC", 90.0),
    ("BCH", 600.0),
    ("ETC", 25.0),
    ("XLM", 0.15),
    ("TRX", 0.15),
    ("ATOM", 12.0),
];

const VOLATILITIES: [(&str, f64); 17] = [
    ("BTC", 0.03),
    ("ETH", 0.04),
    ("SOL", 0.08),
    ("AVAX", 0.06),
    ("XRP", 0.05),
    ("ADA", 0.06),
    ("DOGE", 0.07),
    ("DOT", 0.05),
    ("LINK", 0.04),
    ("MATIC", 0.06),
    ("UNI", 0.05),
    ("LTC", 0.04),
    ("BCH", 0.04),
    ("ETC", 0.05),
    ("XLM", 0.04),
    ("TRX", 0.05),
    ("ATOM", 0.04),
];

fn lookup(table: &[(&str, f64)], asset: &str, default: f64) -> f64 {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(asset))
        .map(|(_, v)| *v)
        .unwrap_or(default)
}

pub fn base_price(asset: &str) -> f64 {
    lookup(&BASE_PRICES, asset, DEFAULT_BASE_PRICE)
}

/// Typical per-bar return volatility.
pub fn asset_volatility(asset: &str) -> f64 {
    lookup(&VOLATILITIES, asset, DEFAULT_VOLATILITY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    TrendUp,
    TrendDown,
    Range,
    Volatile,
}

impl Phase {
    const ALL: [Phase; 4] = [Phase::TrendUp, Phase::TrendDown, Phase::Range, Phase::Volatile];

    /// (mean return, volatility multiplier)
    fn return_params(self) -> (f64, f64) {
        match self {
            Phase::TrendUp => (0.01, 0.8),
            Phase::TrendDown => (-0.008, 0.8),
            Phase::Range => (0.0, 0.5),
            Phase::Volatile => (0.0, 1.5),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RawBar {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

struct SyntheticPath {
    rng: StdRng,
    base: f64,
    volatility: f64,
    phase: Phase,
    bars: Vec<RawBar>,
}

impl SyntheticPath {
    fn new(asset: &str, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let phase = *Phase::ALL.choose(&mut rng).unwrap_or(&Phase::Range);
        SyntheticPath {
            rng,
            base: base_price(asset),
            volatility: asset_volatility(asset),
            phase,
            bars: Vec::new(),
        }
    }

    fn push_bar(&mut self) {
        let i = self.bars.len();
        let vol = self.volatility;

        let (open, close) = match self.bars.last() {
            None => {
                let close = self.base;
                (close * self.rng.gen_range(0.99..1.01), close)
            }
            Some(prev) => {
                if i % PHASE_LENGTH == 0 {
                    self.phase = *Phase::ALL.choose(&mut self.rng).unwrap_or(&Phase::Range);
                }
                let (mean, scale) = self.phase.return_params();
                let ret = draw_return(&mut self.rng, mean, vol * scale);
                (prev.close, (prev.close * (1.0 + ret)).max(PRICE_FLOOR))
            }
        };

        let range = (close - open).abs() + close * vol * 0.5;
        let high = open.max(close) + self.rng.r#gen::<f64>() * range;
        let low = (open.min(close) - self.rng.r#gen::<f64>() * range * 0.7).max(PRICE_FLOOR);
        let volume = self.rng.gen_range(1000.0..10000.0);

        self.bars.push(RawBar {
            open,
            high,
            low,
            close,
            volume,
        });
    }
}

/// Gaussian bar return. A degenerate spread yields the mean.
fn draw_return(rng: &mut StdRng, mean: f64, spread: f64) -> f64 {
    match Normal::new(mean, spread) {
        Ok(normal) => normal.sample(rng),
        Err(_) => mean,
    }
}

/// FNV-1a, stable across platforms and releases.
fn stable_hash(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

pub struct SyntheticDataAdapter {
    seed: u64,
    end_time: Option<DateTime<Utc>>,
    paths: RefCell<HashMap<String, SyntheticPath>>,
}

impl SyntheticDataAdapter {
    pub fn new(seed: u64) -> Self {
        SyntheticDataAdapter {
            seed,
            end_time: None,
            paths: RefCell::new(HashMap::new()),
        }
    }

    /// Pins the last bar's timestamp instead of using the wall clock.
    pub fn with_end_time(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }
}

impl DataPort for SyntheticDataAdapter {
    fn fetch(
        &self,
        asset: &str,
        interval: Interval,
        lookback: usize,
    ) -> Result<PriceWindow, AgentError> {
        if lookback == 0 {
            return Err(AgentError::InvalidWindow {
                reason: "lookback must be positive".into(),
            });
        }

        let key = format!("{}/{}", asset.to_uppercase(), interval);
        let seed = self.seed ^ stable_hash(&key);
        let mut paths = self.paths.borrow_mut();
        let seen = paths.contains_key(&key);
        let path = paths
            .entry(key)
            .or_insert_with(|| SyntheticPath::new(asset, seed));
        if seen {
            path.push_bar();
        }
        while path.bars.len() < lookback {
            path.push_bar();
        }

        let end = self.end_time.unwrap_or_else(Utc::now);
        let step = interval.duration();
        let recent = &path.bars[path.bars.len() - lookback..];
        let bars = recent
            .iter()
            .enumerate()
            .map(|(i, raw)| OhlcvBar {
                timestamp: end - step * (lookback - 1 - i) as i32,
                open: raw.open,
                high: raw.high,
                low: raw.low,
                close: raw.close,
                volume: raw.volume,
            })
            .collect();

        PriceWindow::new(asset, bars)
    }
}
