//! Composite signal generation.
//!
//! Four independent signals are derived from an `IndicatorSet` and blended
//! with weights chosen by the detected regime. Positive values lean long,
//! negative values lean short.

use serde::{Deserialize, Serialize};

use crate::domain::indicator_set::IndicatorSet;
use crate::domain::regime::Regime;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalBundle {
    pub trend: f64,
    pub mean_reversion: f64,
    pub momentum: f64,
    pub volatility: f64,
    /// Regime-reweighted blend of the four signals.
    pub regime_adjusted: f64,
    pub combined: f64,
    pub confidence: f64,
}

pub fn generate(indicators: &IndicatorSet, regime: Regime) -> SignalBundle {
    let trend = trend_signal(indicators);
    let mean_reversion = mean_reversion_signal(indicators);
    let momentum = momentum_signal(indicators);
    let volatility = volatility_signal(indicators);
    let regime_adjusted = regime_term(trend, mean_reversion, momentum, volatility, regime);

    let combined = match regime {
        Regime::Trending => {
            0.35 * trend + 0.25 * momentum + 0.20 * regime_adjusted + 0.20 * volatility
        }
        Regime::Volatile => {
            0.30 * mean_reversion + 0.25 * volatility + 0.25 * regime_adjusted + 0.20 * momentum
        }
        Regime::Ranging => 0.25 * (trend + mean_reversion + momentum + volatility),
    };

    SignalBundle {
        trend,
        mean_reversion,
        momentum,
        volatility,
        regime_adjusted,
        combined,
        confidence: combined.abs(),
    }
}

pub fn trend_signal(ind: &IndicatorSet) -> f64 {
    let price = ind.current_price;
    let mut signal = 0.0;

    if price > ind.ema && ind.ema > ind.sma {
        signal += 0.5;
    } else if price < ind.ema && ind.ema < ind.sma {
        signal -= 0.5;
    }

    if ind.macd.value > ind.macd.signal {
        signal += 0.3;
    } else if ind.macd.value < ind.macd.signal {
        signal -= 0.3;
    }

    // a trend far into RSI extremes is less likely to continue
    if ind.rsi > 30.0 && ind.rsi < 70.0 {
        signal * 1.2
    } else if ind.rsi > 70.0 || ind.rsi < 30.0 {
        signal * 0.8
    } else {
        signal
    }
}

pub fn mean_reversion_signal(ind: &IndicatorSet) -> f64 {
    let mut signal = 0.0;

    if ind.rsi < 30.0 {
        signal += 0.8;
    } else if ind.rsi < 40.0 {
        signal += 0.5;
    } else if ind.rsi > 70.0 {
        signal -= 0.8;
    } else if ind.rsi > 60.0 {
        signal -= 0.5;
    }

    let pos = ind.bb_position;
    if pos < 0.2 {
        signal += 0.6;
    } else if pos < 0.3 {
        signal += 0.4;
    } else if pos > 0.8 {
        signal -= 0.6;
    } else if pos > 0.7 {
        signal -= 0.4;
    }

    signal
}

pub fn momentum_signal(ind: &IndicatorSet) -> f64 {
    let mut signal = 0.0;

    if ind.roc > 0.0 {
        signal += 0.4 * (ind.roc * 10.0).min(1.0);
    } else if ind.roc < 0.0 {
        signal -= 0.4 * (ind.roc.abs() * 10.0).min(1.0);
    }

    if ind.macd.histogram > 0.0 {
        signal += 0.3;
    } else if ind.macd.histogram < 0.0 {
        signal -= 0.3;
    }

    if ind.cci > 100.0 {
        signal += 0.3;
    } else if ind.cci < -100.0 {
        signal -= 0.3;
    } else if ind.cci > 0.0 {
        signal += 0.1;
    } else if ind.cci < 0.0 {
        signal -= 0.1;
    }

    if ind.volume_ratio > 1.2 {
        signal * 1.2
    } else if ind.volume_ratio < 0.8 {
        signal * 0.8
    } else {
        signal
    }
}

pub fn volatility_signal(ind: &IndicatorSet) -> f64 {
    let mut signal = 0.0;

    if ind.hurst_exponent > 0.6 {
        signal += 0.2;
    } else if ind.hurst_exponent < 0.4 {
        signal -= 0.2;
    }

    let avg = ind.volatility_avg;
    if avg > 0.0 && ind.volatility > 1.5 * avg {
        signal += 0.1 * (ind.volatility / avg);
    }

    if ind.skewness > 0.5 {
        signal += 0.1;
    } else if ind.skewness < -0.5 {
        signal -= 0.1;
    }

    signal
}

fn regime_term(trend: f64, mean_rev: f64, momentum: f64, volatility: f64, regime: Regime) -> f64 {
    let (trend_weight, mean_rev_weight) = match regime {
        Regime::Trending => (1.2, 0.8),
        Regime::Volatile => (0.8, 0.6),
        Regime::Ranging => (0.8, 1.2),
    };
    (trend * trend_weight + mean_rev * mean_rev_weight + momentum + volatility) / 4.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator_set::MacdValues;
    use approx::assert_relative_eq;

    fn bullish() -> IndicatorSet {
        IndicatorSet {
            rsi: 55.0,
            ema: 101.0,
            sma: 99.0,
            macd: MacdValues {
                value: 1.0,
                signal: 0.5,
                histogram: 0.5,
            },
            ..IndicatorSet::neutral(102.0)
        }
    }

    #[test]
    fn neutral_set_produces_zero_signals() {
        let bundle = generate(&IndicatorSet::neutral(100.0), Regime::Ranging);
        assert_eq!(bundle.trend, 0.0);
        assert_eq!(bundle.mean_reversion, 0.0);
        assert_eq!(bundle.momentum, 0.0);
        assert_eq!(bundle.volatility, 0.0);
        assert_eq!(bundle.combined, 0.0);
        assert_eq!(bundle.confidence, 0.0);
    }

    #[test]
    fn trend_bullish_in_neutral_rsi_zone() {
        // (0.5 + 0.3) * 1.2
        assert_relative_eq!(trend_signal(&bullish()), 0.96, epsilon = 1e-12);
    }

    #[test]
    fn trend_damped_in_extreme_rsi() {
        let ind = IndicatorSet {
            rsi: 80.0,
            ..bullish()
        };
        assert_relative_eq!(trend_signal(&ind), 0.64, epsilon = 1e-12);
    }

    #[test]
    fn mean_reversion_oversold_below_band() {
        let ind = IndicatorSet {
            rsi: 25.0,
            bb_position: 0.1,
            ..IndicatorSet::neutral(100.0)
        };
        assert_relative_eq!(mean_reversion_signal(&ind), 1.4, epsilon = 1e-12);
    }

    #[test]
    fn mean_reversion_mild_overbought() {
        let ind = IndicatorSet {
            rsi: 65.0,
            bb_position: 0.75,
            ..IndicatorSet::neutral(100.0)
        };
        assert_relative_eq!(mean_reversion_signal(&ind), -0.9, epsilon = 1e-12);
    }

    #[test]
    fn momentum_caps_roc_and_scales_by_volume() {
        let ind = IndicatorSet {
            roc: 5.0,
            cci: 150.0,
            volume_ratio: 1.5,
            macd: MacdValues {
                value: 0.0,
                signal: 0.0,
                histogram: 0.2,
            },
            ..IndicatorSet::neutral(100.0)
        };
        // (0.4 + 0.3 + 0.3) * 1.2
        assert_relative_eq!(momentum_signal(&ind), 1.2, epsilon = 1e-12);
    }

    #[test]
    fn momentum_weak_negative_cci_low_volume() {
        let ind = IndicatorSet {
            roc: -0.05,
            cci: -20.0,
            volume_ratio: 0.5,
            ..IndicatorSet::neutral(100.0)
        };
        // (-0.4 * 0.5 - 0.1) * 0.8
        assert_relative_eq!(momentum_signal(&ind), -0.24, epsilon = 1e-12);
    }

    #[test]
    fn volatility_breakout_and_skew() {
        let ind = IndicatorSet {
            hurst_exponent: 0.7,
            volatility: 4.0,
            volatility_avg: 2.0,
            skewness: 0.8,
            ..IndicatorSet::neutral(100.0)
        };
        // 0.2 + 0.1 * 2 + 0.1
        assert_relative_eq!(volatility_signal(&ind), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn volatility_breakout_ignored_without_history() {
        let ind = IndicatorSet {
            volatility: 4.0,
            volatility_avg: 0.0,
            hurst_exponent: 0.3,
            skewness: -0.6,
            ..IndicatorSet::neutral(100.0)
        };
        assert_relative_eq!(volatility_signal(&ind), -0.3, epsilon = 1e-12);
    }

    #[test]
    fn trending_weights() {
        let bundle = generate(&bullish(), Regime::Trending);
        let t = bundle.trend;
        let mr = bundle.mean_reversion;
        let m = bundle.momentum;
        let v = bundle.volatility;
        let regime = (t * 1.2 + mr * 0.8 + m + v) / 4.0;
        assert_relative_eq!(bundle.regime_adjusted, regime, epsilon = 1e-12);
        assert_relative_eq!(
            bundle.combined,
            0.35 * t + 0.25 * m + 0.20 * regime + 0.20 * v,
            epsilon = 1e-12
        );
        assert_relative_eq!(bundle.confidence, bundle.combined.abs(), epsilon = 1e-12);
    }

    #[test]
    fn volatile_weights() {
        let ind = IndicatorSet {
            rsi: 75.0,
            bb_position: 0.9,
            ..bullish()
        };
        let bundle = generate(&ind, Regime::Volatile);
        let regime = (bundle.trend * 0.8 + bundle.mean_reversion * 0.6 + bundle.momentum
            + bundle.volatility)
            / 4.0;
        assert_relative_eq!(bundle.regime_adjusted, regime, epsilon = 1e-12);
        assert_relative_eq!(
            bundle.combined,
            0.30 * bundle.mean_reversion
                + 0.25 * bundle.volatility
                + 0.25 * regime
                + 0.20 * bundle.momentum,
            epsilon = 1e-12
        );
        assert!(bundle.combined < 0.0);
    }

    #[test]
    fn ranging_weights_are_equal() {
        let bundle = generate(&bullish(), Regime::Ranging);
        assert_relative_eq!(
            bundle.combined,
            0.25 * (bundle.trend + bundle.mean_reversion + bundle.momentum + bundle.volatility),
            epsilon = 1e-12
        );
    }
}
