//! Market regime classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::indicator_set::IndicatorSet;

pub const VOLATILE_PRICE_FRACTION: f64 = 0.05;
pub const TRENDING_HURST: f64 = 0.6;
pub const RANGING_HURST: f64 = 0.4;
pub const TRENDING_ATR_FRACTION: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Trending,
    Ranging,
    Volatile,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Regime::Trending => "trending",
            Regime::Ranging => "ranging",
            Regime::Volatile => "volatile",
        };
        f.write_str(label)
    }
}

/// First matching rule wins; the volatility check precedes every trend check.
pub fn detect(indicators: &IndicatorSet) -> Regime {
    let price = indicators.current_price;
    if indicators.volatility > VOLATILE_PRICE_FRACTION * price {
        Regime::Volatile
    } else if indicators.hurst_exponent > TRENDING_HURST {
        Regime::Trending
    } else if indicators.hurst_exponent < RANGING_HURST {
        Regime::Ranging
    } else if indicators.atr > TRENDING_ATR_FRACTION * price {
        Regime::Trending
    } else {
        Regime::Ranging
    }
}
