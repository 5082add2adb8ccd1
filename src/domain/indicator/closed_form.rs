//! Single-value indicator formulas evaluated directly on the tail of a window.
//!
//! These are the fallback tier for the series indicators. Each returns a
//! `Computation` error when its input is too short or numerically degenerate
//! so the caller can substitute the indicator's neutral default.

use crate::domain::error::AgentError;
use crate::domain::indicator::hurst::rescaled_range;
use crate::domain::indicator::rsi::rsi_from_averages;
use crate::domain::indicator::stats::pearson;
use crate::domain::indicator_set::{BollingerBands, MacdValues, StochasticValues};
use crate::domain::ohlcv::OhlcvBar;

fn tail<T>(values: &[T], period: usize) -> &[T] {
    &values[values.len().saturating_sub(period)..]
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn require(name: &str, len: usize, needed: usize) -> Result<(), AgentError> {
    if len < needed {
        return Err(AgentError::computation(
            name,
            format!("need {} values, have {}", needed, len),
        ));
    }
    Ok(())
}

/// Simple-average RSI over the last `period` changes (all changes if fewer).
pub fn rsi(closes: &[f64], period: usize) -> Result<f64, AgentError> {
    require("rsi", closes.len(), 2)?;
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let recent = tail(&deltas, period);
    let avg_gain = mean(&recent.iter().map(|d| d.max(0.0)).collect::<Vec<_>>());
    let avg_loss = mean(&recent.iter().map(|d| (-d).max(0.0)).collect::<Vec<_>>());
    Ok(rsi_from_averages(avg_gain, avg_loss))
}

/// EMA seeded with the first price rather than an SMA.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = match values.first() {
        Some(first) => *first,
        None => return out,
    };
    for value in values {
        ema = (value - ema) * k + ema;
        out.push(ema);
    }
    out
}

pub fn ema(closes: &[f64], period: usize) -> Result<f64, AgentError> {
    ema_series(closes, period)
        .last()
        .copied()
        .ok_or_else(|| AgentError::computation("ema", "empty input"))
}

pub fn sma(closes: &[f64], period: usize) -> Result<f64, AgentError> {
    require("sma", closes.len(), 1)?;
    Ok(mean(tail(closes, period)))
}

pub fn macd(closes: &[f64]) -> Result<MacdValues, AgentError> {
    require("macd", closes.len(), 2)?;
    let fast = ema_series(closes, 12);
    let slow = ema_series(closes, 26);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema_series(&line, 9);
    let value = line.last().copied().unwrap_or(0.0);
    let signal = signal.last().copied().unwrap_or(0.0);
    Ok(MacdValues {
        value,
        signal,
        histogram: value - signal,
    })
}

/// Bands from the sample standard deviation of the last `period` closes.
pub fn bollinger(closes: &[f64], period: usize, mult: f64) -> Result<BollingerBands, AgentError> {
    require("bollinger", closes.len(), 2)?;
    let window = tail(closes, period);
    let middle = mean(window);
    let std = sample_std(window);
    Ok(BollingerBands {
        upper: middle + mult * std,
        middle,
        lower: middle - mult * std,
    })
}

/// Single %K over the last `k_period` bars; %D equals %K.
pub fn stochastic(bars: &[OhlcvBar], k_period: usize) -> Result<StochasticValues, AgentError> {
    let last = bars
        .last()
        .ok_or_else(|| AgentError::computation("stochastic", "empty input"))?;
    let window = tail(bars, k_period);
    let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let highest = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let k = if highest - lowest > 0.0 {
        ((last.close - lowest) / (highest - lowest) * 100.0).clamp(0.0, 100.0)
    } else {
        50.0
    };
    Ok(StochasticValues { k, d: k })
}

/// Plain mean of the last `period` true ranges.
pub fn atr(bars: &[OhlcvBar], period: usize) -> Result<f64, AgentError> {
    require("atr", bars.len(), 2)?;
    let ranges: Vec<f64> = bars
        .windows(2)
        .map(|w| w[1].true_range(w[0].close))
        .collect();
    Ok(mean(tail(&ranges, period)))
}

/// CCI scaled by the sample standard deviation of typical price.
pub fn cci(bars: &[OhlcvBar], period: usize) -> Result<f64, AgentError> {
    require("cci", bars.len(), 2)?;
    let typical: Vec<f64> = tail(bars, period).iter().map(OhlcvBar::typical_price).collect();
    let std = sample_std(&typical);
    if std == 0.0 {
        return Err(AgentError::computation("cci", "zero typical-price deviation"));
    }
    let last = typical.last().copied().unwrap_or(0.0);
    Ok((last - mean(&typical)) / (0.015 * std))
}

pub fn roc(closes: &[f64], period: usize) -> Result<f64, AgentError> {
    require("roc", closes.len(), period + 1)?;
    let prev = closes[closes.len() - 1 - period];
    if prev == 0.0 {
        return Err(AgentError::computation("roc", "zero base price"));
    }
    Ok((closes[closes.len() - 1] - prev) / prev * 100.0)
}

/// OBV starting from zero at the first bar.
pub fn obv(bars: &[OhlcvBar]) -> Result<f64, AgentError> {
    require("obv", bars.len(), 1)?;
    Ok(bars.windows(2).fold(0.0, |acc, w| {
        if w[1].close > w[0].close {
            acc + w[1].volume
        } else if w[1].close < w[0].close {
            acc - w[1].volume
        } else {
            acc
        }
    }))
}

pub fn volatility(closes: &[f64], period: usize) -> Result<f64, AgentError> {
    require("volatility", closes.len(), 2)?;
    Ok(sample_std(tail(closes, period)))
}

pub fn skewness(closes: &[f64], period: usize) -> Result<f64, AgentError> {
    require("skewness", closes.len(), 3)?;
    let window = tail(closes, period);
    let m = mean(window);
    let m2 = mean(&window.iter().map(|x| (x - m).powi(2)).collect::<Vec<_>>());
    if m2 == 0.0 {
        return Err(AgentError::computation("skewness", "zero variance"));
    }
    let m3 = mean(&window.iter().map(|x| (x - m).powi(3)).collect::<Vec<_>>());
    Ok(m3 / m2.powf(1.5))
}

pub fn autocorrelation(closes: &[f64], period: usize) -> Result<f64, AgentError> {
    require("correlation", closes.len(), 3)?;
    let pairs = period.min(closes.len() - 1);
    let n = closes.len();
    pearson(&closes[n - pairs..], &closes[n - pairs - 1..n - 1])
        .ok_or_else(|| AgentError::computation("correlation", "zero variance"))
}

pub fn volume_ratio(bars: &[OhlcvBar], period: usize) -> Result<f64, AgentError> {
    let last = bars
        .last()
        .ok_or_else(|| AgentError::computation("volume_ratio", "empty input"))?;
    let avg = mean(&tail(bars, period).iter().map(|b| b.volume).collect::<Vec<_>>());
    if avg <= 0.0 {
        return Err(AgentError::computation("volume_ratio", "zero average volume"));
    }
    Ok(last.volume / avg)
}

/// Single-window estimate H = ln(R/S) / ln(n) over the whole log-price series.
pub fn hurst(closes: &[f64]) -> Result<f64, AgentError> {
    require("hurst", closes.len(), 3)?;
    if closes.iter().any(|&c| c <= 0.0) {
        return Err(AgentError::computation("hurst", "non-positive price"));
    }
    let logs: Vec<f64> = closes.iter().map(|c| c.ln()).collect();
    let rs = rescaled_range(&logs)
        .filter(|rs| *rs > 0.0)
        .ok_or_else(|| AgentError::computation("hurst", "degenerate rescaled range"))?;
    Ok(rs.ln() / (closes.len() as f64).ln())
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
