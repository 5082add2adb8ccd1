//! Fractional-Kelly position sizing.

use crate::domain::indicator_set::IndicatorSet;
use crate::domain::regime::Regime;

pub const BASE_WIN_RATE: f64 = 0.55;
pub const MIN_WIN_RATE: f64 = 0.45;
pub const MAX_WIN_RATE: f64 = 0.65;

#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    /// Largest fraction of the portfolio a single position may take.
    pub max_position_size: f64,
    /// Absolute dollar ceiling as a fraction of the portfolio.
    pub max_total_risk: f64,
    pub kelly_fraction: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            max_position_size: 0.10,
            max_total_risk: 0.25,
            kelly_fraction: 0.25,
            avg_win: 0.02,
            avg_loss: 0.015,
        }
    }
}

/// Heuristic win probability in [0.45, 0.65].
pub fn estimate_win_rate(indicators: &IndicatorSet, regime: Regime) -> f64 {
    let mut rate = BASE_WIN_RATE;

    if (30.0..=70.0).contains(&indicators.rsi) {
        rate -= 0.05;
    } else {
        rate += 0.05;
    }

    if indicators.roc.abs() > 0.03 {
        rate += 0.03;
    }

    if indicators.volatility > 0.05 {
        rate -= 0.05;
    }

    match regime {
        Regime::Volatile => rate -= 0.05,
        Regime::Trending => rate += 0.02,
        Regime::Ranging => {}
    }

    rate.clamp(MIN_WIN_RATE, MAX_WIN_RATE)
}

/// Kelly fraction of the portfolio for a given win rate, before the
/// dollar ceiling.
pub fn kelly_position_fraction(win_rate: f64, regime: Regime, config: &RiskConfig) -> f64 {
    let mut kelly = if config.avg_loss > 0.0 {
        let b = config.avg_win / config.avg_loss;
        ((b * win_rate - (1.0 - win_rate)) / b).clamp(0.0, config.max_position_size)
    } else {
        0.02
    };

    match regime {
        Regime::Volatile => kelly *= 0.7,
        Regime::Trending => kelly *= 1.2,
        Regime::Ranging => {}
    }

    (kelly * config.kelly_fraction).min(config.max_position_size)
}

/// Dollar amount to commit, within `[0, portfolio_value * max_total_risk]`.
pub fn position_size(
    indicators: &IndicatorSet,
    regime: Regime,
    portfolio_value: f64,
    config: &RiskConfig,
) -> f64 {
    let win_rate = estimate_win_rate(indicators, regime);
    let fraction = kelly_position_fraction(win_rate, regime, config);
    let dollars = portfolio_value.max(0.0) * fraction;
    dollars.min(portfolio_value.max(0.0) * config.max_total_risk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn indicators(rsi: f64, roc: f64, volatility: f64) -> IndicatorSet {
        IndicatorSet {
            rsi,
            roc,
            volatility,
            ..IndicatorSet::neutral(100.0)
        }
    }

    #[test]
    fn neutral_rsi_ranging() {
        let rate = estimate_win_rate(&indicators(50.0, 0.0, 0.0), Regime::Ranging);
        assert_relative_eq!(rate, 0.50, epsilon = 1e-12);
    }

    #[test]
    fn extreme_rsi_momentum_trending() {
        // 0.55 + 0.05 + 0.03 + 0.02, clamped
        let rate = estimate_win_rate(&indicators(20.0, -1.0, 0.0), Regime::Trending);
        assert_relative_eq!(rate, 0.65, epsilon = 1e-12);
    }

    #[test]
    fn high_volatility_volatile_regime_clamped_low() {
        // 0.55 - 0.05 - 0.05 - 0.05
        let rate = estimate_win_rate(&indicators(50.0, 0.0, 3.0), Regime::Volatile);
        assert_relative_eq!(rate, 0.45, epsilon = 1e-12);
    }

    #[test]
    fn kelly_below_breakeven_is_zero() {
        // b = 4/3: (b * 0.40 - 0.60) / b < 0
        let config = RiskConfig::default();
        assert_eq!(kelly_position_fraction(0.40, Regime::Ranging, &config), 0.0);
    }

    #[test]
    fn kelly_known_value() {
        let config = RiskConfig::default();
        let b: f64 = 0.02 / 0.015;
        let raw: f64 = ((b * 0.55 - 0.45) / b).min(0.10);
        let expected = raw * 1.2 * 0.25;
        assert_relative_eq!(
            kelly_position_fraction(0.55, Regime::Trending, &config),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn position_size_dollars() {
        let config = RiskConfig::default();
        let ind = indicators(50.0, 0.0, 0.0);
        let size = position_size(&ind, Regime::Ranging, 10_000.0, &config);
        let fraction = kelly_position_fraction(0.50, Regime::Ranging, &config);
        assert_relative_eq!(size, 10_000.0 * fraction, epsilon = 1e-9);
        assert!(size <= 10_000.0 * 0.10);
    }

    #[test]
    fn position_size_zero_portfolio() {
        let config = RiskConfig::default();
        let ind = indicators(20.0, 1.0, 0.0);
        assert_eq!(position_size(&ind, Regime::Trending, 0.0, &config), 0.0);
    }

    #[test]
    fn total_risk_cap_applies_when_tighter() {
        let config = RiskConfig {
            max_total_risk: 0.001,
            ..RiskConfig::default()
        };
        let ind = indicators(20.0, 1.0, 0.0);
        let size = position_size(&ind, Regime::Trending, 1000.0, &config);
        assert_relative_eq!(size, 1.0, epsilon = 1e-12);
    }
}
