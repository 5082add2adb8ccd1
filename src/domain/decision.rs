//! Decision resolution.
//!
//! A `DecisionResolver` walks an ordered chain of `DecisionTier`s. Each tier
//! either produces a `DecisionRecord` or reports a `TierFailure`, and the
//! resolver advances to the next tier on failure. The last tier (RSI rule)
//! cannot fail, so `resolve` always yields a well-formed record.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::error::AgentError;
use crate::domain::indicator::closed_form;
use crate::domain::indicator::rsi::DEFAULT_PERIOD as RSI_PERIOD;
use crate::domain::indicator_set::{self, IndicatorSet};
use crate::domain::ohlcv::PriceWindow;
use crate::domain::regime::{self, Regime};
use crate::domain::risk::{self, RiskConfig};
use crate::domain::signal::{self, SignalBundle};
use crate::ports::suggestion_port::{SuggestionPort, SuggestionRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Decision::Buy => "BUY",
            Decision::Sell => "SELL",
            Decision::Hold => "HOLD",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Strength {
    Strong,
    Weak,
    Neutral,
    Fallback,
}

/// Which tier produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Suggestion,
    Signal,
    RsiRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorsUsed {
    pub rsi: f64,
    pub macd: f64,
    pub volatility: f64,
    pub hurst_exponent: f64,
}

impl From<&IndicatorSet> for IndicatorsUsed {
    fn from(ind: &IndicatorSet) -> Self {
        IndicatorsUsed {
            rsi: ind.rsi,
            macd: ind.macd.value,
            volatility: ind.volatility,
            hurst_exponent: ind.hurst_exponent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub asset: String,
    pub decision: Decision,
    pub strength: Strength,
    pub source: DecisionSource,
    pub combined_signal: f64,
    pub confidence: f64,
    /// `None` when no regime could be determined.
    pub regime: Option<Regime>,
    /// Dollar amount to commit.
    pub position_size: f64,
    pub detailed_signals: Option<SignalBundle>,
    pub indicators_used: IndicatorsUsed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionThresholds {
    pub strong: f64,
    pub weak: f64,
    pub fallback_confidence: f64,
    pub fallback_position_pct: f64,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        DecisionThresholds {
            strong: 0.3,
            weak: 0.1,
            fallback_confidence: 0.3,
            fallback_position_pct: 0.01,
        }
    }
}

/// Output of the pure analysis stage for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub asset: String,
    pub indicators: IndicatorSet,
    pub regime: Regime,
    pub signals: SignalBundle,
    pub position_size: f64,
}

/// Indicators, regime, signals and position size for one window.
pub fn analyze(
    window: &PriceWindow,
    portfolio_value: f64,
    risk_config: &RiskConfig,
) -> Result<Analysis, AgentError> {
    let indicators = indicator_set::compute(window)?;
    let regime = regime::detect(&indicators);
    let signals = signal::generate(&indicators, regime);
    let position_size = risk::position_size(&indicators, regime, portfolio_value, risk_config);
    Ok(Analysis {
        asset: window.asset.clone(),
        indicators,
        regime,
        signals,
        position_size,
    })
}

pub struct DecisionContext<'a> {
    pub asset: &'a str,
    pub portfolio_value: f64,
    /// Absent when analysis failed for this window.
    pub analysis: Option<&'a Analysis>,
    /// Raw closes for the last-resort RSI rule.
    pub closes: &'a [f64],
}

#[derive(Debug, Clone, PartialEq)]
pub struct TierFailure {
    pub tier: &'static str,
    pub reason: String,
}

impl fmt::Display for TierFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tier failed: {}", self.tier, self.reason)
    }
}

pub trait DecisionTier: Send + Sync {
    fn name(&self) -> &'static str;
    fn decide(&self, ctx: &DecisionContext<'_>) -> Result<DecisionRecord, TierFailure>;
}

fn require_analysis<'a>(
    tier: &'static str,
    ctx: &DecisionContext<'a>,
) -> Result<&'a Analysis, TierFailure> {
    ctx.analysis.ok_or_else(|| TierFailure {
        tier,
        reason: "no analysis available".into(),
    })
}

fn record_from_analysis(
    analysis: &Analysis,
    decision: Decision,
    strength: Strength,
    source: DecisionSource,
) -> DecisionRecord {
    DecisionRecord {
        asset: analysis.asset.clone(),
        decision,
        strength,
        source,
        combined_signal: analysis.signals.combined,
        confidence: analysis.signals.confidence,
        regime: Some(analysis.regime),
        position_size: analysis.position_size,
        detailed_signals: Some(analysis.signals),
        indicators_used: IndicatorsUsed::from(&analysis.indicators),
    }
}

/// Normalise a provider reply. `None` means the reply was not a
/// recognised token.
pub fn parse_suggestion(reply: &str) -> Option<Decision> {
    match reply.trim().to_uppercase().as_str() {
        "BUY" | "LONG" => Some(Decision::Buy),
        "SELL" | "SHORT" => Some(Decision::Sell),
        "HOLD" => Some(Decision::Hold),
        _ => None,
    }
}

pub fn build_decision_prompt(analysis: &Analysis, portfolio_value: f64, now: DateTime<Utc>) -> String {
    let ind = &analysis.indicators;
    let bands = &ind.bollinger_bands;
    format!(
        "You are an expert trading bot. Based on the following market data, make a trading decision.\n\
         \n\
         Current asset: {asset}\n\
         Portfolio value: ${pv:.2}\n\
         Current indicators:\n\
         - RSI: {rsi:.2}\n\
         - MACD value: {macd:.4}\n\
         - MACD signal: {macd_signal:.4}\n\
         - EMA: {ema:.4}\n\
         - SMA: {sma:.4}\n\
         - Bollinger Bands: Upper {upper:.4}, Middle {middle:.4}, Lower {lower:.4}\n\
         - Market regime: {regime}\n\
         - Combined signal: {combined:.4}\n\
         \n\
         Current time: {now}\n\
         \n\
         Respond with ONLY ONE of these words:\n\
         1. \"BUY\" - if the indicators suggest going long\n\
         2. \"SELL\" - if the indicators suggest going short\n\
         3. \"HOLD\" - if the indicators suggest staying neutral\n",
        asset = analysis.asset,
        pv = portfolio_value,
        rsi = ind.rsi,
        macd = ind.macd.value,
        macd_signal = ind.macd.signal,
        ema = ind.ema,
        sma = ind.sma,
        upper = bands.upper,
        middle = bands.middle,
        lower = bands.lower,
        regime = analysis.regime,
        combined = analysis.signals.combined,
        now = now.to_rfc3339(),
    )
}

/// Primary tier: ask the external provider for a categorical token.
pub struct SuggestionTier {
    provider: Arc<dyn SuggestionPort>,
    strong_threshold: f64,
}

impl SuggestionTier {
    pub const MAX_TOKENS: u32 = 10;
    pub const TEMPERATURE: f64 = 0.1;

    pub fn new(provider: Arc<dyn SuggestionPort>, thresholds: &DecisionThresholds) -> Self {
        SuggestionTier {
            provider,
            strong_threshold: thresholds.strong,
        }
    }
}

impl DecisionTier for SuggestionTier {
    fn name(&self) -> &'static str {
        "suggestion"
    }

    fn decide(&self, ctx: &DecisionContext<'_>) -> Result<DecisionRecord, TierFailure> {
        let analysis = require_analysis(self.name(), ctx)?;
        let request = SuggestionRequest {
            prompt: build_decision_prompt(analysis, ctx.portfolio_value, Utc::now()),
            max_tokens: Self::MAX_TOKENS,
            temperature: Self::TEMPERATURE,
        };
        let reply = self.provider.suggest(&request).map_err(|e| TierFailure {
            tier: self.name(),
            reason: e.to_string(),
        })?;

        let decision = parse_suggestion(&reply).unwrap_or_else(|| {
            warn!(asset = ctx.asset, reply = %reply.trim(), "unrecognised suggestion, holding");
            Decision::Hold
        });
        let strength = match decision {
            Decision::Hold => Strength::Neutral,
            _ if analysis.signals.confidence > self.strong_threshold => Strength::Strong,
            _ => Strength::Weak,
        };
        Ok(record_from_analysis(
            analysis,
            decision,
            strength,
            DecisionSource::Suggestion,
        ))
    }
}

/// Secondary tier: threshold the combined signal.
pub struct SignalThresholdTier {
    strong: f64,
    weak: f64,
}

impl SignalThresholdTier {
    pub fn new(thresholds: &DecisionThresholds) -> Self {
        SignalThresholdTier {
            strong: thresholds.strong,
            weak: thresholds.weak,
        }
    }

    pub fn classify(&self, combined: f64) -> (Decision, Strength) {
        if combined > self.strong {
            (Decision::Buy, Strength::Strong)
        } else if combined > self.weak {
            (Decision::Buy, Strength::Weak)
        } else if combined < -self.strong {
            (Decision::Sell, Strength::Strong)
        } else if combined < -self.weak {
            (Decision::Sell, Strength::Weak)
        } else {
            (Decision::Hold, Strength::Neutral)
        }
    }
}

impl DecisionTier for SignalThresholdTier {
    fn name(&self) -> &'static str {
        "signal"
    }

    fn decide(&self, ctx: &DecisionContext<'_>) -> Result<DecisionRecord, TierFailure> {
        let analysis = require_analysis(self.name(), ctx)?;
        let (decision, strength) = self.classify(analysis.signals.combined);
        Ok(record_from_analysis(
            analysis,
            decision,
            strength,
            DecisionSource::Signal,
        ))
    }
}

/// Last resort: RSI-only rule on the raw closes.
pub struct RsiRuleTier {
    confidence: f64,
    position_pct: f64,
}

impl RsiRuleTier {
    pub fn new(thresholds: &DecisionThresholds) -> Self {
        RsiRuleTier {
            confidence: thresholds.fallback_confidence,
            position_pct: thresholds.fallback_position_pct,
        }
    }

    pub fn rule(&self, ctx: &DecisionContext<'_>) -> DecisionRecord {
        let rsi = closed_form::rsi(ctx.closes, RSI_PERIOD).unwrap_or(50.0);
        let decision = if rsi < 30.0 {
            Decision::Buy
        } else if rsi > 70.0 {
            Decision::Sell
        } else {
            Decision::Hold
        };
        DecisionRecord {
            asset: ctx.asset.to_string(),
            decision,
            strength: Strength::Fallback,
            source: DecisionSource::RsiRule,
            combined_signal: 0.0,
            confidence: self.confidence,
            regime: None,
            position_size: ctx.portfolio_value.max(0.0) * self.position_pct,
            detailed_signals: None,
            indicators_used: IndicatorsUsed {
                rsi,
                macd: 0.0,
                volatility: 0.0,
                hurst_exponent: 0.5,
            },
        }
    }
}

pub struct DecisionResolver {
    tiers: Vec<Box<dyn DecisionTier>>,
    last_resort: RsiRuleTier,
}

impl DecisionResolver {
    /// Suggestion, then signal thresholds. The RSI rule runs only once both
    /// have failed.
    pub fn new(provider: Arc<dyn SuggestionPort>, thresholds: &DecisionThresholds) -> Self {
        DecisionResolver {
            tiers: vec![
                Box::new(SuggestionTier::new(provider, thresholds)),
                Box::new(SignalThresholdTier::new(thresholds)),
            ],
            last_resort: RsiRuleTier::new(thresholds),
        }
    }

    pub fn with_tiers(tiers: Vec<Box<dyn DecisionTier>>, thresholds: &DecisionThresholds) -> Self {
        DecisionResolver {
            tiers,
            last_resort: RsiRuleTier::new(thresholds),
        }
    }

    pub fn resolve(&self, ctx: &DecisionContext<'_>) -> DecisionRecord {
        for tier in &self.tiers {
            match tier.decide(ctx) {
                Ok(record) => {
                    info!(
                        asset = ctx.asset,
                        decision = %record.decision,
                        strength = ?record.strength,
                        source = tier.name(),
                        combined = record.combined_signal,
                        "decision resolved"
                    );
                    return record;
                }
                Err(failure) => warn!(asset = ctx.asset, "{}", failure),
            }
        }
        let record = self.last_resort.rule(ctx);
        info!(
            asset = ctx.asset,
            decision = %record.decision,
            rsi = record.indicators_used.rsi,
            "fell back to rsi rule"
        );
        record
    }
}
