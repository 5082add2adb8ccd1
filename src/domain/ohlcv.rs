//! OHLCV bar and price window representation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::AgentError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Chronologically ascending bars for one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceWindow {
    pub asset: String,
    bars: Vec<OhlcvBar>,
}

impl PriceWindow {
    /// Build a window, rejecting empty input and non-increasing timestamps.
    pub fn new(asset: impl Into<String>, bars: Vec<OhlcvBar>) -> Result<Self, AgentError> {
        if bars.is_empty() {
            return Err(AgentError::InvalidWindow {
                reason: "window contains no bars".into(),
            });
        }
        if let Some(i) = bars
            .windows(2)
            .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(AgentError::InvalidWindow {
                reason: format!("timestamps not ascending at bar {}", i + 1),
            });
        }
        Ok(PriceWindow {
            asset: asset.into(),
            bars,
        })
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last_close(&self) -> f64 {
        self.bars.last().map(|b| b.close).unwrap_or(0.0)
    }

    /// Keep only the most recent `n` bars.
    pub fn tail(mut self, n: usize) -> Self {
        if self.bars.len() > n {
            self.bars.drain(..self.bars.len() - n);
        }
        self
    }
}

/// Bar spacing used by data sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Min1,
    Min5,
    Min15,
    Min30,
    Hour1,
    Hour4,
    Day1,
    Week1,
}

impl Interval {
    /// Unknown labels default to hourly bars.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "1m" => Interval::Min1,
            "5m" => Interval::Min5,
            "15m" => Interval::Min15,
            "30m" => Interval::Min30,
            "4h" => Interval::Hour4,
            "1d" => Interval::Day1,
            "1w" => Interval::Week1,
            _ => Interval::Hour1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Interval::Min1 => "1m",
            Interval::Min5 => "5m",
            Interval::Min15 => "15m",
            Interval::Min30 => "30m",
            Interval::Hour1 => "1h",
            Interval::Hour4 => "4h",
            Interval::Day1 => "1d",
            Interval::Week1 => "1w",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Interval::Min1 => Duration::minutes(1),
            Interval::Min5 => Duration::minutes(5),
            Interval::Min15 => Duration::minutes(15),
            Interval::Min30 => Duration::minutes(30),
            Interval::Hour1 => Duration::hours(1),
            Interval::Hour4 => Duration::hours(4),
            Interval::Day1 => Duration::days(1),
            Interval::Week1 => Duration::weeks(1),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
