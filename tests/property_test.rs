//! Property tests for indicator bounds, threshold monotonicity, sizing caps
//! and portfolio bookkeeping.

mod common;

use common::*;
use proptest::prelude::*;
use tradeagent::domain::decision::{
    DecisionRecord, DecisionSource, DecisionThresholds, IndicatorsUsed, SignalThresholdTier,
    Strength, Decision,
};
use tradeagent::domain::indicator_set::{self, IndicatorSet};
use tradeagent::domain::regime::{self, Regime};
use tradeagent::domain::risk::{self, RiskConfig, MAX_WIN_RATE, MIN_WIN_RATE};
use tradeagent::domain::simulator::PortfolioSimulator;

/// Signed rank: SELL/STRONG lowest, BUY/STRONG highest.
fn rank(decision: Decision, strength: Strength) -> i32 {
    match (decision, strength) {
        (Decision::Sell, Strength::Strong) => -2,
        (Decision::Sell, _) => -1,
        (Decision::Hold, _) => 0,
        (Decision::Buy, Strength::Strong) => 2,
        (Decision::Buy, _) => 1,
    }
}

fn regime_strategy() -> impl Strategy<Value = Regime> {
    prop_oneof![
        Just(Regime::Trending),
        Just(Regime::Ranging),
        Just(Regime::Volatile)
    ]
}

fn record(decision: Decision, position_size: f64) -> DecisionRecord {
    DecisionRecord {
        asset: "BTC".into(),
        decision,
        strength: Strength::Weak,
        source: DecisionSource::Signal,
        combined_signal: 0.0,
        confidence: 0.0,
        regime: None,
        position_size,
        detailed_signals: None,
        indicators_used: IndicatorsUsed {
            rsi: 50.0,
            macd: 0.0,
            volatility: 0.0,
            hurst_exponent: 0.5,
        },
    }
}

proptest! {
    #[test]
    fn indicator_bounds_hold(
        closes in prop::collection::vec(1.0f64..1000.0, 30..120),
        spread in 0.0f64..0.05,
    ) {
        let bars: Vec<_> = bars_from_closes(&closes)
            .into_iter()
            .map(|mut bar| {
                bar.high = bar.close * (1.0 + spread);
                bar.low = bar.close * (1.0 - spread);
                bar
            })
            .collect();
        let set = indicator_set::compute(&window("X", bars)).unwrap();

        prop_assert!(set.bollinger_bands.upper >= set.bollinger_bands.middle);
        prop_assert!(set.bollinger_bands.middle >= set.bollinger_bands.lower);
        prop_assert!((0.0..=100.0).contains(&set.rsi));
        prop_assert!((0.0..=100.0).contains(&set.stochastic.k));
        prop_assert!((0.0..=100.0).contains(&set.stochastic.d));
        prop_assert!((0.0..=1.0).contains(&set.bb_position));
    }

    #[test]
    fn high_volatility_is_always_volatile(
        price in 1.0f64..100_000.0,
        excess in 0.001f64..1.0,
        hurst in 0.0f64..1.0,
        atr_fraction in 0.0f64..0.5,
    ) {
        let set = IndicatorSet {
            volatility: price * (0.05 + excess),
            hurst_exponent: hurst,
            atr: price * atr_fraction,
            ..IndicatorSet::neutral(price)
        };
        prop_assert_eq!(regime::detect(&set), Regime::Volatile);
    }

    #[test]
    fn thresholds_are_monotonic(a in -1.0f64..1.0, b in -1.0f64..1.0) {
        let tier = SignalThresholdTier::new(&DecisionThresholds::default());
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let (d_lo, s_lo) = tier.classify(lo);
        let (d_hi, s_hi) = tier.classify(hi);
        prop_assert!(rank(d_lo, s_lo) <= rank(d_hi, s_hi));
        prop_assert_eq!(rank(tier.classify(-lo).0, tier.classify(-lo).1), -rank(d_lo, s_lo));
    }

    #[test]
    fn kelly_fraction_respects_caps(
        win_rate in MIN_WIN_RATE..=MAX_WIN_RATE,
        regime in regime_strategy(),
    ) {
        let config = RiskConfig::default();
        let fraction = risk::kelly_position_fraction(win_rate, regime, &config);
        prop_assert!(fraction >= 0.0);
        prop_assert!(fraction <= config.max_position_size);
    }

    #[test]
    fn position_size_within_total_risk(
        rsi in 0.0f64..100.0,
        roc in -50.0f64..50.0,
        volatility in 0.0f64..20.0,
        portfolio_value in 0.0f64..1_000_000.0,
        regime in regime_strategy(),
    ) {
        let config = RiskConfig::default();
        let set = IndicatorSet {
            rsi,
            roc,
            volatility,
            ..IndicatorSet::neutral(100.0)
        };
        let size = risk::position_size(&set, regime, portfolio_value, &config);
        prop_assert!(size >= 0.0);
        prop_assert!(size <= portfolio_value * config.max_total_risk + 1e-9);
        prop_assert!(size <= portfolio_value * config.max_position_size + 1e-9);
    }

    #[test]
    fn books_stay_consistent(
        steps in prop::collection::vec((0u8..3, 1.0f64..500.0, 10.0f64..200.0), 1..40),
    ) {
        let mut sim = PortfolioSimulator::new(1000.0);
        for (kind, size, price) in steps {
            let decision = match kind {
                0 => Decision::Buy,
                1 => Decision::Sell,
                _ => Decision::Hold,
            };
            sim.execute("BTC", &record(decision, size), price);
            let state = sim.state();
            prop_assert!(state.cash >= -1e-9);
            prop_assert!(state.is_consistent());
        }
    }
}
