//! Bollinger bands around the rolling mean close.
//!
//! Band width is the population deviation of the span scaled by
//! `stddev_mult_x100 / 100`.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULT_X100: u32 = 200;

pub fn calculate_bollinger(
    bars: &[OhlcvBar],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Bollinger {
        period,
        stddev_mult_x100,
    };
    let width = f64::from(stddev_mult_x100) / 100.0;
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let values = if period == 0 {
        Vec::new()
    } else {
        bars.iter()
            .enumerate()
            .map(|(i, bar)| {
                if i + 1 < period {
                    return IndicatorPoint {
                        timestamp: bar.timestamp,
                        valid: false,
                        value: IndicatorValue::Bollinger {
                            upper: 0.0,
                            middle: 0.0,
                            lower: 0.0,
                        },
                    };
                }
                let span = &closes[i + 1 - period..=i];
                let mean = span.iter().sum::<f64>() / period as f64;
                let spread = (span.iter().map(|c| (c - mean) * (c - mean)).sum::<f64>()
                    / period as f64)
                    .sqrt();
                IndicatorPoint {
                    timestamp: bar.timestamp,
                    valid: true,
                    value: IndicatorValue::Bollinger {
                        upper: mean + width * spread,
                        middle: mean,
                        lower: mean - width * spread,
                    },
                }
            })
            .collect()
    };

    IndicatorSeries {
        indicator_type,
        values,
    }
}
