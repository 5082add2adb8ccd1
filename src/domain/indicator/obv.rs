//! On-balance volume.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

/// Running volume balance: each bar adds its volume on an up close, subtracts
/// it on a down close and carries the balance on an unchanged close. The first
/// bar seeds the balance with its own volume. Every point is valid.
pub fn calculate_obv(bars: &[OhlcvBar]) -> IndicatorSeries {
    let mut balance = 0.0;
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            balance = match i.checked_sub(1).map(|prev| bars[prev].close) {
                None => bar.volume,
                Some(prev) if bar.close > prev => balance + bar.volume,
                Some(prev) if bar.close < prev => balance - bar.volume,
                Some(_) => balance,
            };
            IndicatorPoint::scalar(bar.timestamp, balance)
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Obv,
        values,
    }
}
