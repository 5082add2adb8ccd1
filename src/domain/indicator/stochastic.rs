//! Stochastic oscillator.
//!
//! %K = (C - LL(k)) / (HH(k) - LL(k)) * 100, 50 when the range is zero.
//! %D = SMA(d) of %K.
//! Warmup: k - 1 + d - 1 bars.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_K: usize = 14;
pub const DEFAULT_D: usize = 3;

pub fn calculate_stochastic(bars: &[OhlcvBar], k_period: usize, d_period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Stochastic { k_period, d_period };
    if k_period == 0 || d_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let k_values: Vec<f64> = (0..bars.len())
        .map(|i| {
            if i + 1 < k_period {
                return 0.0;
            }
            let window = &bars[i + 1 - k_period..=i];
            let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
            let highest = window
                .iter()
                .map(|b| b.high)
                .fold(f64::NEG_INFINITY, f64::max);
            let range = highest - lowest;
            if range > 0.0 {
                ((bars[i].close - lowest) / range * 100.0).clamp(0.0, 100.0)
            } else {
                50.0
            }
        })
        .collect();

    let warmup = k_period - 1 + d_period - 1;
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let valid = i >= warmup;
            let (k, d) = if valid {
                let d = k_values[i + 1 - d_period..=i].iter().sum::<f64>() / d_period as f64;
                (k_values[i], d)
            } else {
                (0.0, 0.0)
            };
            IndicatorPoint {
                timestamp: bar.timestamp,
                valid,
                value: IndicatorValue::Stochastic { k, d },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}
