//! Rolling statistical indicators over closes and volume.
//!
//! - Skewness: biased (population) sample skewness of the last n closes.
//! - Autocorrelation: Pearson correlation of C[i] with C[i-1] over the last n pairs.
//! - Volume ratio: V[i] / SMA(V, n).
//!
//! Windows with zero variance (or zero mean volume) are invalid points.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const SKEW_PERIOD: usize = 20;
pub const AUTOCORR_PERIOD: usize = 10;
pub const VOLUME_PERIOD: usize = 20;

fn rolling<F>(bars: &[OhlcvBar], indicator_type: IndicatorType, f: F) -> IndicatorSeries
where
    F: Fn(usize) -> Option<f64>,
{
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let computed = f(i).filter(|v| v.is_finite());
            IndicatorPoint {
                timestamp: bar.timestamp,
                valid: computed.is_some(),
                value: IndicatorValue::Simple(computed.unwrap_or(0.0)),
            }
        })
        .collect();
    IndicatorSeries {
        indicator_type,
        values,
    }
}

pub fn calculate_skewness(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    rolling(bars, IndicatorType::Skewness(period), |i| {
        if period < 3 || i + 1 < period {
            return None;
        }
        let window: Vec<f64> = bars[i + 1 - period..=i].iter().map(|b| b.close).collect();
        let n = period as f64;
        let mean = window.iter().sum::<f64>() / n;
        let m2 = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let m3 = window.iter().map(|x| (x - mean).powi(3)).sum::<f64>() / n;
        if m2 <= 0.0 {
            return None;
        }
        Some(m3 / m2.powf(1.5))
    })
}

pub fn calculate_autocorrelation(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    rolling(bars, IndicatorType::Autocorrelation(period), |i| {
        if period < 2 || i < period {
            return None;
        }
        let current: Vec<f64> = bars[i + 1 - period..=i].iter().map(|b| b.close).collect();
        let lagged: Vec<f64> = bars[i - period..i].iter().map(|b| b.close).collect();
        pearson(&current, &lagged)
    })
}

pub fn calculate_volume_ratio(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    rolling(bars, IndicatorType::VolumeRatio(period), |i| {
        if period == 0 || i + 1 < period {
            return None;
        }
        let mean = bars[i + 1 - period..=i].iter().map(|b| b.volume).sum::<f64>() / period as f64;
        if mean <= 0.0 {
            return None;
        }
        Some(bars[i].volume / mean)
    })
}

pub(crate) fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}
