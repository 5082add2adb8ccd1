//! Exponential and simple moving averages.
//!
//! The EMA is seeded with the simple mean of its first `period` closes and then
//! moves toward each new close by `2 / (period + 1)` of the gap. Both series
//! leave the first `period - 1` points invalid; a zero period yields nothing.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_ema(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    if period > 0 {
        let alpha = 2.0 / (period as f64 + 1.0);
        let mut seed = 0.0;
        let mut smoothed: Option<f64> = None;
        for (i, bar) in bars.iter().enumerate() {
            let point = match smoothed {
                Some(prev) => {
                    let next = prev + alpha * (bar.close - prev);
                    smoothed = Some(next);
                    IndicatorPoint::scalar(bar.timestamp, next)
                }
                None if i + 1 == period => {
                    let first = (seed + bar.close) / period as f64;
                    smoothed = Some(first);
                    IndicatorPoint::scalar(bar.timestamp, first)
                }
                None => {
                    seed += bar.close;
                    IndicatorPoint::pending(bar.timestamp)
                }
            };
            values.push(point);
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    if period > 0 {
        let mut running = 0.0;
        for (i, bar) in bars.iter().enumerate() {
            running += bar.close;
            if let Some(dropped) = i.checked_sub(period) {
                running -= bars[dropped].close;
            }
            values.push(if i + 1 < period {
                IndicatorPoint::pending(bar.timestamp)
            } else {
                IndicatorPoint::scalar(bar.timestamp, running / period as f64)
            });
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::IndicatorValue;
    use crate::domain::indicator::test_bars::from_closes;

    #[test]
    fn ema_warmup() {
        let bars = from_closes(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_ema(&bars, 3);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[3].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn ema_seed_is_sma() {
        let bars = from_closes(&[10.0, 20.0, 30.0]);
        let series = calculate_ema(&bars, 3);

        if let IndicatorValue::Simple(v) = series.values[2].value {
            let expected_sma = (10.0 + 20.0 + 30.0) / 3.0;
            assert!((v - expected_sma).abs() < f64::EPSILON);
        } else {
            panic!("Expected Simple value");
        }
    }

    #[test]
    fn ema_recursive_calculation() {
        let bars = from_closes(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_ema(&bars, 3);

        let k = 2.0 / 4.0;
        let sma = 20.0;
        let ema_3 = 40.0 * k + sma * (1.0 - k);
        let ema_4 = 50.0 * k + ema_3 * (1.0 - k);

        assert_eq!(series.last_simple(), Some(ema_4));
    }

    #[test]
    fn ema_equal_prices() {
        let bars = from_closes(&[100.0; 5]);
        let series = calculate_ema(&bars, 3);

        for point in &series.values[2..] {
            if let IndicatorValue::Simple(v) = point.value {
                assert!((v - 100.0).abs() < f64::EPSILON);
            }
        }
    }

    #[test]
    fn ema_empty_and_zero_period() {
        assert!(calculate_ema(&[], 3).values.is_empty());
        let bars = from_closes(&[10.0, 20.0]);
        assert!(calculate_ema(&bars, 0).values.is_empty());
    }

    #[test]
    fn sma_rolling_mean() {
        let bars = from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let series = calculate_sma(&bars, 3);

        assert!(!series.values[1].valid);
        assert_eq!(series.indicator_type, IndicatorType::Sma(3));
        let valid = series.valid_simple_values();
        assert_eq!(valid, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn sma_shorter_than_period_has_no_valid_tail() {
        let bars = from_closes(&[1.0, 2.0]);
        assert!(calculate_sma(&bars, 20).last_simple().is_none());
    }
}
