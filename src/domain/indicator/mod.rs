//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values
//!
//! The series functions are the primary computation tier. `closed_form`
//! holds the single-value fallbacks used when a series yields no valid
//! last point.

pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod closed_form;
pub mod ema;
pub mod hurst;
pub mod macd;
pub mod obv;
pub mod roc;
pub mod rsi;
pub mod stats;
pub mod stddev;
pub mod stochastic;

pub use ema::{calculate_ema, calculate_sma};

use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub valid: bool,
    pub value: IndicatorValue,
}

impl IndicatorPoint {
    /// A valid scalar point.
    pub fn scalar(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            valid: true,
            value: IndicatorValue::Simple(value),
        }
    }

    /// Placeholder for a bar still inside the warmup window.
    pub fn pending(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            valid: false,
            value: IndicatorValue::Simple(0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Stochastic {
        k: f64,
        d: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

impl IndicatorValue {
    fn is_finite(&self) -> bool {
        match *self {
            IndicatorValue::Simple(v) => v.is_finite(),
            IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } => line.is_finite() && signal.is_finite() && histogram.is_finite(),
            IndicatorValue::Stochastic { k, d } => k.is_finite() && d.is_finite(),
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } => upper.is_finite() && middle.is_finite() && lower.is_finite(),
        }
    }
}

/// Identity and parameters of a series, used as its log label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Roc(usize),
    Atr(usize),
    Cci(usize),
    Stddev(usize),
    Skewness(usize),
    Autocorrelation(usize),
    VolumeRatio(usize),
    Obv,
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// The final point's value, if that point is valid and finite.
    pub fn last_valid(&self) -> Option<&IndicatorValue> {
        self.values
            .last()
            .filter(|p| p.valid && p.value.is_finite())
            .map(|p| &p.value)
    }

    pub fn last_simple(&self) -> Option<f64> {
        match self.last_valid() {
            Some(IndicatorValue::Simple(v)) => Some(*v),
            _ => None,
        }
    }

    /// All valid, finite `Simple` values in order.
    pub fn valid_simple_values(&self) -> Vec<f64> {
        self.values
            .iter()
            .filter(|p| p.valid)
            .filter_map(|p| match p.value {
                IndicatorValue::Simple(v) if v.is_finite() => Some(v),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Roc(period) => write!(f, "ROC({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Cci(period) => write!(f, "CCI({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::Skewness(period) => write!(f, "SKEW({})", period),
            IndicatorType::Autocorrelation(period) => write!(f, "AUTOCORR({})", period),
            IndicatorType::VolumeRatio(period) => write!(f, "VOLRATIO({})", period),
            IndicatorType::Obv => write!(f, "OBV"),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Stochastic { k_period, d_period } => {
                write!(f, "STOCHASTIC({},{})", k_period, d_period)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}
