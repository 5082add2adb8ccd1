//! Indicator engine: reduces a price window to one fully-populated
//! `IndicatorSet`.
//!
//! Every field is resolved through up to three tiers: the series
//! computation's last valid point, the closed-form formula on the raw
//! window, then a named neutral default.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::error::AgentError;
use crate::domain::indicator::{
    IndicatorSeries, IndicatorValue, atr, bollinger, calculate_ema, calculate_sma, cci,
    closed_form, hurst, macd, obv, roc, rsi, stats, stddev, stochastic,
};
use crate::domain::ohlcv::PriceWindow;

/// Bars required before any analysis is attempted.
pub const MIN_BARS: usize = 30;
pub const MA_PERIOD: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValues {
    pub value: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticValues {
    pub k: f64,
    pub d: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub rsi: f64,
    pub macd: MacdValues,
    pub ema: f64,
    pub sma: f64,
    pub bollinger_bands: BollingerBands,
    pub atr: f64,
    pub cci: f64,
    pub roc: f64,
    pub obv: f64,
    pub volatility: f64,
    /// Mean of the rolling volatility series over the window.
    pub volatility_avg: f64,
    pub skewness: f64,
    pub correlation: f64,
    pub stochastic: StochasticValues,
    pub hurst_exponent: f64,
    pub bb_position: f64,
    pub volume_ratio: f64,
    pub current_price: f64,
}

impl IndicatorSet {
    /// Every field at its neutral default for the given price.
    pub fn neutral(current_price: f64) -> Self {
        IndicatorSet {
            rsi: 50.0,
            macd: MacdValues {
                value: 0.0,
                signal: 0.0,
                histogram: 0.0,
            },
            ema: current_price,
            sma: current_price,
            bollinger_bands: default_bands(current_price),
            atr: 0.0,
            cci: 0.0,
            roc: 0.0,
            obv: 0.0,
            volatility: 0.0,
            volatility_avg: 0.0,
            skewness: 0.0,
            correlation: 0.0,
            stochastic: StochasticValues { k: 50.0, d: 50.0 },
            hurst_exponent: hurst::RANDOM_WALK,
            bb_position: 0.5,
            volume_ratio: 1.0,
            current_price,
        }
    }
}

fn default_bands(price: f64) -> BollingerBands {
    BollingerBands {
        upper: price * 1.02,
        middle: price,
        lower: price * 0.98,
    }
}

trait Finite {
    fn all_finite(&self) -> bool;
}

impl Finite for f64 {
    fn all_finite(&self) -> bool {
        self.is_finite()
    }
}

impl Finite for MacdValues {
    fn all_finite(&self) -> bool {
        self.value.is_finite() && self.signal.is_finite() && self.histogram.is_finite()
    }
}

impl Finite for BollingerBands {
    fn all_finite(&self) -> bool {
        self.upper.is_finite() && self.middle.is_finite() && self.lower.is_finite()
    }
}

impl Finite for StochasticValues {
    fn all_finite(&self) -> bool {
        self.k.is_finite() && self.d.is_finite()
    }
}

/// `label` names the indicator in logs, normally the series' `IndicatorType`.
fn resolve<T, F>(label: &dyn fmt::Display, primary: Option<T>, fallback: F, default: T) -> T
where
    T: Finite,
    F: FnOnce() -> Result<T, AgentError>,
{
    if let Some(value) = primary.filter(Finite::all_finite) {
        return value;
    }
    debug!(indicator = %label, "series value unavailable, using closed form");
    match fallback() {
        Ok(value) if value.all_finite() => value,
        Ok(_) => {
            warn!(indicator = %label, "closed form produced a non-finite value, using default");
            default
        }
        Err(e) => {
            warn!(indicator = %label, error = %e, "using default");
            default
        }
    }
}

fn last_macd(series: &IndicatorSeries) -> Option<MacdValues> {
    match series.last_valid() {
        Some(IndicatorValue::Macd {
            line,
            signal,
            histogram,
        }) => Some(MacdValues {
            value: *line,
            signal: *signal,
            histogram: *histogram,
        }),
        _ => None,
    }
}

fn last_bands(series: &IndicatorSeries) -> Option<BollingerBands> {
    match series.last_valid() {
        Some(IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        }) => Some(BollingerBands {
            upper: *upper,
            middle: *middle,
            lower: *lower,
        }),
        _ => None,
    }
}

fn last_stochastic(series: &IndicatorSeries) -> Option<StochasticValues> {
    match series.last_valid() {
        Some(IndicatorValue::Stochastic { k, d }) => Some(StochasticValues { k: *k, d: *d }),
        _ => None,
    }
}

/// Price's fractional position between the bands, 0.5 when they coincide.
pub fn band_position(price: f64, bands: &BollingerBands) -> f64 {
    let width = bands.upper - bands.lower;
    if width > 0.0 {
        ((price - bands.lower) / width).clamp(0.0, 1.0)
    } else {
        0.5
    }
}

pub fn compute(window: &PriceWindow) -> Result<IndicatorSet, AgentError> {
    let bars = window.bars();
    if bars.len() < MIN_BARS {
        return Err(AgentError::InsufficientData {
            asset: window.asset.clone(),
            bars: bars.len(),
            minimum: MIN_BARS,
        });
    }

    let closes = window.closes();
    let price = window.last_close();
    if !(price.is_finite() && price > 0.0) {
        return Err(AgentError::Data {
            reason: format!("{} has non-positive last close {}", window.asset, price),
        });
    }

    let rsi_series = rsi::calculate_rsi(bars, rsi::DEFAULT_PERIOD);
    let rsi = resolve(
        &rsi_series.indicator_type,
        rsi_series.last_simple(),
        || closed_form::rsi(&closes, rsi::DEFAULT_PERIOD),
        50.0,
    )
    .clamp(0.0, 100.0);

    let macd_series = macd::calculate_macd_default(bars);
    let macd = resolve(
        &macd_series.indicator_type,
        last_macd(&macd_series),
        || closed_form::macd(&closes),
        MacdValues {
            value: 0.0,
            signal: 0.0,
            histogram: 0.0,
        },
    );

    let ema_series = calculate_ema(bars, MA_PERIOD);
    let ema = resolve(
        &ema_series.indicator_type,
        ema_series.last_simple(),
        || closed_form::ema(&closes, MA_PERIOD),
        price,
    );
    let sma_series = calculate_sma(bars, MA_PERIOD);
    let sma = resolve(
        &sma_series.indicator_type,
        sma_series.last_simple(),
        || closed_form::sma(&closes, MA_PERIOD),
        price,
    );

    let band_series = bollinger::calculate_bollinger(
        bars,
        bollinger::DEFAULT_PERIOD,
        bollinger::DEFAULT_MULT_X100,
    );
    let bollinger_bands = resolve(
        &band_series.indicator_type,
        last_bands(&band_series),
        || {
            closed_form::bollinger(
                &closes,
                bollinger::DEFAULT_PERIOD,
                bollinger::DEFAULT_MULT_X100 as f64 / 100.0,
            )
        },
        default_bands(price),
    );

    let atr_series = atr::calculate_atr(bars, atr::DEFAULT_PERIOD);
    let atr = resolve(
        &atr_series.indicator_type,
        atr_series.last_simple(),
        || closed_form::atr(bars, atr::DEFAULT_PERIOD),
        0.0,
    );
    let cci_series = cci::calculate_cci(bars, cci::DEFAULT_PERIOD);
    let cci = resolve(
        &cci_series.indicator_type,
        cci_series.last_simple(),
        || closed_form::cci(bars, cci::DEFAULT_PERIOD),
        0.0,
    );
    let roc_series = roc::calculate_roc(bars, roc::DEFAULT_PERIOD);
    let roc = resolve(
        &roc_series.indicator_type,
        roc_series.last_simple(),
        || closed_form::roc(&closes, roc::DEFAULT_PERIOD),
        0.0,
    );
    let obv_series = obv::calculate_obv(bars);
    let obv = resolve(
        &obv_series.indicator_type,
        obv_series.last_simple(),
        || closed_form::obv(bars),
        0.0,
    );

    let volatility_series = stddev::calculate_stddev(bars, stddev::DEFAULT_PERIOD);
    let volatility = resolve(
        &volatility_series.indicator_type,
        volatility_series.last_simple(),
        || closed_form::volatility(&closes, stddev::DEFAULT_PERIOD),
        0.0,
    );
    let history = volatility_series.valid_simple_values();
    let volatility_avg = if history.is_empty() {
        volatility
    } else {
        history.iter().sum::<f64>() / history.len() as f64
    };

    let skew_series = stats::calculate_skewness(bars, stats::SKEW_PERIOD);
    let skewness = resolve(
        &skew_series.indicator_type,
        skew_series.last_simple(),
        || closed_form::skewness(&closes, stats::SKEW_PERIOD),
        0.0,
    );
    let autocorr_series = stats::calculate_autocorrelation(bars, stats::AUTOCORR_PERIOD);
    let correlation = resolve(
        &autocorr_series.indicator_type,
        autocorr_series.last_simple(),
        || closed_form::autocorrelation(&closes, stats::AUTOCORR_PERIOD),
        0.0,
    );
    let volume_series = stats::calculate_volume_ratio(bars, stats::VOLUME_PERIOD);
    let volume_ratio = resolve(
        &volume_series.indicator_type,
        volume_series.last_simple(),
        || closed_form::volume_ratio(bars, stats::VOLUME_PERIOD),
        1.0,
    );

    let stochastic_series =
        stochastic::calculate_stochastic(bars, stochastic::DEFAULT_K, stochastic::DEFAULT_D);
    let raw_stochastic = resolve(
        &stochastic_series.indicator_type,
        last_stochastic(&stochastic_series),
        || closed_form::stochastic(bars, stochastic::DEFAULT_K),
        StochasticValues { k: 50.0, d: 50.0 },
    );
    let stochastic = StochasticValues {
        k: raw_stochastic.k.clamp(0.0, 100.0),
        d: raw_stochastic.d.clamp(0.0, 100.0),
    };

    let hurst_exponent = resolve(
        &"HURST",
        hurst::hurst_exponent(&closes),
        || closed_form::hurst(&closes),
        hurst::RANDOM_WALK,
    );

    let bb_position = band_position(price, &bollinger_bands);

    Ok(IndicatorSet {
        rsi,
        macd,
        ema,
        sma,
        bollinger_bands,
        atr,
        cci,
        roc,
        obv,
        volatility,
        volatility_avg,
        skewness,
        correlation,
        stochastic,
        hurst_exponent,
        bb_position,
        volume_ratio,
        current_price: price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::{at, from_closes, with_spread};
    use crate::domain::ohlcv::OhlcvBar;

    fn window(bars: Vec<OhlcvBar>) -> PriceWindow {
        PriceWindow::new("TEST", bars).unwrap()
    }

    fn linear(n: usize, from: f64, to: f64) -> Vec<f64> {
        (0..n)
            .map(|i| from + (to - from) * i as f64 / (n - 1) as f64)
            .collect()
    }

    fn assert_well_formed(set: &IndicatorSet) {
        let b = set.bollinger_bands;
        assert!(b.upper >= b.middle && b.middle >= b.lower);
        assert!((0.0..=100.0).contains(&set.rsi));
        assert!((0.0..=100.0).contains(&set.stochastic.k));
        assert!((0.0..=100.0).contains(&set.stochastic.d));
        assert!((0.0..=1.0).contains(&set.bb_position));
        assert!(set.current_price > 0.0);
        for v in [
            set.ema,
            set.sma,
            set.atr,
            set.cci,
            set.roc,
            set.obv,
            set.volatility,
            set.volatility_avg,
            set.skewness,
            set.correlation,
            set.hurst_exponent,
            set.volume_ratio,
            set.macd.value,
            set.macd.signal,
            set.macd.histogram,
        ] {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn rejects_short_window() {
        let err = compute(&window(from_closes(&linear(29, 100.0, 110.0)))).unwrap_err();
        match err {
            AgentError::InsufficientData { bars, minimum, .. } => {
                assert_eq!(bars, 29);
                assert_eq!(minimum, MIN_BARS);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn rejects_non_positive_price() {
        let mut prices = linear(40, 100.0, 110.0);
        prices[39] = 0.0;
        assert!(matches!(
            compute(&window(from_closes(&prices))),
            Err(AgentError::Data { .. })
        ));
    }

    #[test]
    fn rising_window_is_bullish() {
        let set = compute(&window(with_spread(&linear(50, 100.0, 150.0), 0.5))).unwrap();
        assert_well_formed(&set);
        assert!(set.rsi > 50.0);
        assert!(set.macd.value > 0.0);
        assert!(set.roc > 0.0);
        assert!(set.ema < set.current_price);
        assert!(set.hurst_exponent > 0.5);
        assert_eq!(set.current_price, 150.0);
    }

    #[test]
    fn flat_window_is_neutral() {
        let set = compute(&window(from_closes(&[100.0; 50]))).unwrap();
        assert_well_formed(&set);
        assert_eq!(set.rsi, 50.0);
        assert_eq!(set.bb_position, 0.5);
        assert_eq!(set.cci, 0.0);
        assert_eq!(set.skewness, 0.0);
        assert_eq!(set.correlation, 0.0);
        assert_eq!(set.hurst_exponent, 0.5);
        assert_eq!(set.volatility, 0.0);
        assert_eq!(set.stochastic, StochasticValues { k: 50.0, d: 50.0 });
    }

    #[test]
    fn thirty_bars_fall_back_for_macd() {
        // series MACD needs 34 bars; the closed form still yields a value
        let set = compute(&window(from_closes(&linear(30, 100.0, 130.0)))).unwrap();
        assert!(set.macd.value > 0.0);
        assert_well_formed(&set);
    }

    #[test]
    fn choppy_window_well_formed() {
        let bars: Vec<OhlcvBar> = (0..60)
            .map(|i| {
                let close = 100.0 + (i as f64 * 1.3).sin() * 6.0 + (i % 3) as f64;
                at(i, close - 0.5, close + 2.0, close - 2.0, close, 500.0 + (i * 37 % 400) as f64)
            })
            .collect();
        assert_well_formed(&compute(&window(bars)).unwrap());
    }

    #[test]
    fn band_position_clamped() {
        let bands = BollingerBands {
            upper: 110.0,
            middle: 100.0,
            lower: 90.0,
        };
        assert_eq!(band_position(120.0, &bands), 1.0);
        assert_eq!(band_position(80.0, &bands), 0.0);
        assert_eq!(band_position(100.0, &bands), 0.5);
        let flat = BollingerBands {
            upper: 100.0,
            middle: 100.0,
            lower: 100.0,
        };
        assert_eq!(band_position(100.0, &flat), 0.5);
    }

    #[test]
    fn neutral_set_defaults() {
        let set = IndicatorSet::neutral(200.0);
        assert_eq!(set.bollinger_bands.upper, 204.0);
        assert_eq!(set.bollinger_bands.lower, 196.0);
        assert_eq!(set.hurst_exponent, 0.5);
        assert_well_formed(&set);
    }

    #[test]
    fn series_labels_carry_engine_parameters() {
        let bars = from_closes(&linear(40, 100.0, 120.0));
        let labels = [
            rsi::calculate_rsi(&bars, rsi::DEFAULT_PERIOD).indicator_type.to_string(),
            macd::calculate_macd_default(&bars).indicator_type.to_string(),
            calculate_sma(&bars, MA_PERIOD).indicator_type.to_string(),
            bollinger::calculate_bollinger(
                &bars,
                bollinger::DEFAULT_PERIOD,
                bollinger::DEFAULT_MULT_X100,
            )
            .indicator_type
            .to_string(),
        ];
        assert_eq!(labels, ["RSI(14)", "MACD(12,26,9)", "SMA(20)", "BOLLINGER(20,2)"]);
    }

    /// Series and closed-form tiers on the same trending data.
    #[test]
    fn tiers_agree_on_trending_data() {
        let closes = linear(60, 100.0, 160.0);
        let bars = with_spread(&closes, 0.8);

        let rsi_a = rsi::calculate_rsi(&bars, 14).last_simple().unwrap();
        let rsi_b = closed_form::rsi(&closes, 14).unwrap();
        assert!(rsi_a > 50.0 && rsi_b > 50.0);

        let macd_a = last_macd(&macd::calculate_macd_default(&bars)).unwrap();
        let macd_b = closed_form::macd(&closes).unwrap();
        assert!(macd_a.value > 0.0 && macd_b.value > 0.0);
        assert!(macd_b.value / macd_a.value > 0.5 && macd_b.value / macd_a.value < 2.0);

        let ema_a = calculate_ema(&bars, 20).last_simple().unwrap();
        let ema_b = closed_form::ema(&closes, 20).unwrap();
        assert!((ema_a - ema_b).abs() / ema_a < 0.05);

        let bands_a = last_bands(&bollinger::calculate_bollinger(&bars, 20, 200)).unwrap();
        let bands_b = closed_form::bollinger(&closes, 20, 2.0).unwrap();
        assert!((bands_a.middle - bands_b.middle).abs() < 1e-9);
        assert!(bands_b.upper > bands_a.middle && bands_a.upper > bands_b.middle);

        let atr_a = atr::calculate_atr(&bars, 14).last_simple().unwrap();
        let atr_b = closed_form::atr(&bars, 14).unwrap();
        assert!(atr_a > 0.0 && atr_b > 0.0);
        assert!(atr_b / atr_a > 0.5 && atr_b / atr_a < 2.0);

        let cci_a = cci::calculate_cci(&bars, 20).last_simple().unwrap();
        let cci_b = closed_form::cci(&bars, 20).unwrap();
        assert!(cci_a > 0.0 && cci_b > 0.0);

        let roc_a = roc::calculate_roc(&bars, 10).last_simple().unwrap();
        let roc_b = closed_form::roc(&closes, 10).unwrap();
        assert!((roc_a - roc_b).abs() < 1e-9);

        let vol_a = stddev::calculate_stddev(&bars, 20).last_simple().unwrap();
        let vol_b = closed_form::volatility(&closes, 20).unwrap();
        assert!((vol_a - vol_b).abs() < 1e-9);

        let h_a = hurst::hurst_exponent(&closes).unwrap();
        let h_b = closed_form::hurst(&closes).unwrap();
        assert!(h_a > 0.5 && h_b > 0.5);

        let st_a = last_stochastic(&stochastic::calculate_stochastic(&bars, 14, 3)).unwrap();
        let st_b = closed_form::stochastic(&bars, 14).unwrap();
        assert!(st_a.k > 50.0 && st_b.k > 50.0);
    }
}
