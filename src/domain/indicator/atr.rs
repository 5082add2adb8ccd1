//! ATR (Average True Range) with Wilder smoothing.
//!
//! TR[0] = high - low, TR[i] = max(H-L, |H-Cprev|, |L-Cprev|).
//! Seed with the mean of the first n TRs, then ATR = (prev*(n-1) + TR)/n.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_atr(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if bars.len() < period || period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Atr(period),
            values: vec![],
        };
    }

    let tr_values: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect();

    let mut results: Vec<IndicatorPoint> = Vec::with_capacity(bars.len());
    let mut atr = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        let valid = i + 1 >= period;
        if i + 1 == period {
            atr = tr_values[..period].iter().sum::<f64>() / period as f64;
        } else if valid {
            atr = (atr * (period - 1) as f64 + tr_values[i]) / period as f64;
        }
        results.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid,
            value: IndicatorValue::Simple(if valid { atr } else { 0.0 }),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values: results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::at;

    fn bar(i: usize, high: f64, low: f64, close: f64) -> OhlcvBar {
        at(i, close, high, low, close, 1000.0)
    }

    #[test]
    fn atr_warmup() {
        let bars: Vec<OhlcvBar> = (0..5).map(|i| bar(i, 110.0, 90.0, 100.0)).collect();
        let series = calculate_atr(&bars, 3);
        assert_eq!(series.values.len(), 5);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert_eq!(series.last_simple(), Some(20.0));
    }

    #[test]
    fn atr_wilder_smoothing() {
        let bars = vec![
            bar(0, 110.0, 100.0, 105.0),
            bar(1, 115.0, 105.0, 110.0),
            bar(2, 120.0, 110.0, 115.0),
            bar(3, 125.0, 115.0, 120.0),
        ];
        let series = calculate_atr(&bars, 3);

        let seed = 10.0;
        let expected = (seed * 2.0 + 10.0) / 3.0;
        assert!((series.last_simple().unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn atr_insufficient_bars() {
        let bars: Vec<OhlcvBar> = (0..2).map(|i| bar(i, 110.0, 90.0, 100.0)).collect();
        assert!(calculate_atr(&bars, 5).values.is_empty());
    }

    #[test]
    fn atr_handles_gaps() {
        let bars = vec![
            bar(0, 110.0, 100.0, 105.0),
            bar(1, 130.0, 120.0, 125.0),
            bar(2, 120.0, 110.0, 115.0),
        ];
        let series = calculate_atr(&bars, 2);
        // TR: 10, 25 (gap up), 15 (close-to-low)
        let expected_seed = (10.0 + 25.0) / 2.0;
        let expected = (expected_seed + 15.0) / 2.0;
        assert!(!series.values[0].valid);
        assert!((series.last_simple().unwrap() - expected).abs() < 1e-9);
    }
}
