//! Rolling volatility (sample standard deviation of closes).
//!
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n) / (n - 1))
//! Warmup: first (n-1) bars are invalid. Periods below 2 yield no valid points.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 20;

pub fn calculate_stddev(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if period < 2 || i + 1 < period {
                return IndicatorPoint::pending(bar.timestamp);
            }
            let span = &closes[i + 1 - period..=i];
            let mean = span.iter().sum::<f64>() / period as f64;
            let squared: f64 = span.iter().map(|c| (c - mean) * (c - mean)).sum();
            IndicatorPoint::scalar(bar.timestamp, (squared / (period - 1) as f64).sqrt())
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Stddev(period),
        values,
    }
}
