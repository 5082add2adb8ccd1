//! CCI (Commodity Channel Index).
//!
//! CCI = (TP - SMA(TP, n)) / (0.015 * MeanDeviation(TP, n)), TP = (H+L+C)/3.
//! Points with zero mean deviation are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 20;
pub(crate) const LAMBERT: f64 = 0.015;

pub fn calculate_cci(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let typical: Vec<f64> = bars.iter().map(OhlcvBar::typical_price).collect();

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let mut point = IndicatorPoint {
                timestamp: bar.timestamp,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            };
            if period == 0 || i + 1 < period {
                return point;
            }
            let window = &typical[i + 1 - period..=i];
            let mean = window.iter().sum::<f64>() / period as f64;
            let mean_dev = window.iter().map(|tp| (tp - mean).abs()).sum::<f64>() / period as f64;
            if mean_dev > 0.0 {
                point.valid = true;
                point.value = IndicatorValue::Simple((typical[i] - mean) / (LAMBERT * mean_dev));
            }
            point
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Cci(period),
        values,
    }
}
