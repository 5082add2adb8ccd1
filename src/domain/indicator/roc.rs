//! Rate of change: percent move of the close over `period` bars.
//!
//! A zero base close leaves the point invalid, as do the first `period` bars.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 10;

pub fn calculate_roc(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let base = (period > 0)
                .then(|| i.checked_sub(period))
                .flatten()
                .map(|j| bars[j].close)
                .filter(|&base| base != 0.0);
            match base {
                Some(base) => IndicatorPoint::scalar(bar.timestamp, (bar.close / base - 1.0) * 100.0),
                None => IndicatorPoint::pending(bar.timestamp),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Roc(period),
        values,
    }
}
