//! Relative strength index with Wilder smoothing.
//!
//! The first `period` close-to-close moves seed the average gain and loss;
//! each later move pulls them `1 / period` of the way toward itself. No losses
//! reads 100, and a series with neither gains nor losses reads 50. The first
//! `period` points are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 14;

pub(crate) fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let mut values: Vec<IndicatorPoint> = bars
        .iter()
        .map(|b| IndicatorPoint::pending(b.timestamp))
        .collect();

    if period > 0 && bars.len() > period {
        let moves: Vec<(f64, f64)> = bars
            .windows(2)
            .map(|pair| {
                let delta = pair[1].close - pair[0].close;
                (delta.max(0.0), (-delta).max(0.0))
            })
            .collect();

        let n = period as f64;
        let (mut up, mut down) = moves[..period]
            .iter()
            .fold((0.0, 0.0), |(u, d), &(g, l)| (u + g / n, d + l / n));
        values[period] = IndicatorPoint::scalar(bars[period].timestamp, rsi_from_averages(up, down));

        for (offset, &(gain, loss)) in moves.iter().enumerate().skip(period) {
            up += (gain - up) / n;
            down += (loss - down) / n;
            let bar = &bars[offset + 1];
            values[offset + 1] = IndicatorPoint::scalar(bar.timestamp, rsi_from_averages(up, down));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::from_closes;

    #[test]
    fn rsi_empty_bars() {
        let series = calculate_rsi(&[], 14);
        assert_eq!(series.values.len(), 0);
    }

    #[test]
    fn rsi_single_bar() {
        let bars = from_closes(&[100.0]);
        let series = calculate_rsi(&bars, 14);
        assert_eq!(series.values.len(), 1);
        assert!(!series.values[0].valid);
    }

    #[test]
    fn rsi_warmup_period() {
        let prices: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let series = calculate_rsi(&from_closes(&prices), 14);

        assert_eq!(series.values.len(), 15);
        for i in 0..14 {
            assert!(!series.values[i].valid, "Bar {} should be invalid", i);
        }
        assert!(series.values[14].valid, "Bar 14 should be valid");
    }

    #[test]
    fn rsi_all_gains_no_losses() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&from_closes(&prices), 14);
        assert_eq!(series.last_simple(), Some(100.0));
    }

    #[test]
    fn rsi_all_losses_no_gains() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&from_closes(&prices), 14);
        assert_eq!(series.last_simple(), Some(0.0));
    }

    #[test]
    fn rsi_flat_prices_is_neutral() {
        let series = calculate_rsi(&from_closes(&[100.0; 30]), 14);
        assert_eq!(series.last_simple(), Some(50.0));
    }

    #[test]
    fn rsi_in_range() {
        let prices: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let series = calculate_rsi(&from_closes(&prices), 14);

        for rsi in series.valid_simple_values() {
            assert!((0.0..=100.0).contains(&rsi), "RSI {} out of range", rsi);
        }
    }

    #[test]
    fn rsi_zero_period() {
        let bars = from_closes(&[100.0, 101.0]);
        let series = calculate_rsi(&bars, 0);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn rsi_known_calculation() {
        let bars = from_closes(&[
            44.0, 44.25, 44.50, 43.75, 44.50, 44.25, 44.75, 45.25, 45.50, 45.25, 45.50, 46.0,
            46.25, 46.0, 46.50,
        ]);
        let series = calculate_rsi(&bars, 14);

        let rsi = series.last_simple().expect("valid RSI at bar 14");
        assert!(rsi > 50.0 && rsi < 100.0, "RSI should be in bullish territory");
    }
}
