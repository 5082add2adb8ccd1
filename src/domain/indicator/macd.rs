//! MACD: fast EMA minus slow EMA, with an EMA signal line over the difference
//! and the histogram as their gap. Points become valid once the signal line
//! has its seed, `slow + signal - 2` bars in.

use crate::domain::indicator::{
    IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, calculate_ema,
};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    bars: &[OhlcvBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if bars.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let line: Vec<f64> = ema_or_zero(bars, fast)
        .into_iter()
        .zip(ema_or_zero(bars, slow))
        .map(|(f, s)| f - s)
        .collect();

    // The signal EMA runs over the line once the slow EMA is warm.
    let first_signal = slow - 1 + signal_period - 1;
    let signal = smooth_from(&line, slow - 1, signal_period);

    let values = bars
        .iter()
        .zip(line.iter().zip(&signal))
        .enumerate()
        .map(|(i, (bar, (&line, &signal)))| IndicatorPoint {
            timestamp: bar.timestamp,
            valid: i >= first_signal,
            value: IndicatorValue::Macd {
                line,
                signal,
                histogram: line - signal,
            },
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

pub fn calculate_macd_default(bars: &[OhlcvBar]) -> IndicatorSeries {
    calculate_macd(bars, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}

/// EMA of `series[start..]`, seeded with the mean of its first `period`
/// entries. Positions before the seed are zero.
fn smooth_from(series: &[f64], start: usize, period: usize) -> Vec<f64> {
    let mut out = vec![0.0; series.len()];
    let seed_end = start + period;
    if seed_end > series.len() {
        return out;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut level = series[start..seed_end].iter().sum::<f64>() / period as f64;
    out[seed_end - 1] = level;
    for (slot, &value) in out[seed_end..].iter_mut().zip(&series[seed_end..]) {
        level += alpha * (value - level);
        *slot = level;
    }
    out
}

fn ema_or_zero(bars: &[OhlcvBar], period: usize) -> Vec<f64> {
    calculate_ema(bars, period)
        .values
        .into_iter()
        .map(|p| match p.value {
            IndicatorValue::Simple(v) if p.valid => v,
            _ => 0.0,
        })
        .collect()
}
