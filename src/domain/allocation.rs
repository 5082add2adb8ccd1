//! Initial multi-asset allocation.
//!
//! Each asset is analysed independently (in parallel), then the provider is
//! asked for a split. A reply that is missing, unparseable or far from summing
//! to one falls back to a deterministic risk-weighted split.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::decision::{self, Analysis};
use super::error::AgentError;
use super::indicator_set::IndicatorSet;
use super::ohlcv::PriceWindow;
use super::regime::Regime;
use super::risk::RiskConfig;
use crate::ports::suggestion_port::{SuggestionPort, SuggestionRequest};

pub const MAX_TOKENS: u32 = 300;
pub const TEMPERATURE: f64 = 0.4;
pub const PLACEHOLDER_CONFIDENCE: f64 = 0.3;
/// Accepted range for the raw sum of a provider split.
pub const SUM_TOLERANCE: (f64, f64) = (0.8, 1.2);

/// Asset to fraction of capital. Fractions are non-negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allocation(BTreeMap<String, f64>);

impl Allocation {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Allocation(pairs.into_iter().map(|(a, f)| (a.into(), f)).collect())
    }

    pub fn equal(assets: &[String]) -> Self {
        if assets.is_empty() {
            return Allocation::default();
        }
        let share = 1.0 / assets.len() as f64;
        Allocation::from_pairs(assets.iter().map(|a| (a.clone(), share)))
    }

    pub fn get(&self, asset: &str) -> Option<f64> {
        self.0.get(asset).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(a, f)| (a.as_str(), *f))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    /// Drops assets without a price and renormalises the rest.
    pub fn restricted_to(&self, prices: &HashMap<String, f64>) -> Allocation {
        let kept: BTreeMap<String, f64> = self
            .0
            .iter()
            .filter(|(asset, _)| prices.contains_key(*asset))
            .map(|(a, f)| (a.clone(), *f))
            .collect();
        if kept.len() == self.0.len() {
            return self.clone();
        }
        normalize_allocation(&kept)
    }
}

/// Scales fractions so they sum to exactly one.
///
/// Negative or non-finite weights count as zero; if nothing positive remains
/// the split is equal across the given assets.
pub fn normalize_allocation(raw: &BTreeMap<String, f64>) -> Allocation {
    let cleaned: BTreeMap<String, f64> = raw
        .iter()
        .map(|(a, w)| (a.clone(), if w.is_finite() && *w > 0.0 { *w } else { 0.0 }))
        .collect();
    let sum: f64 = cleaned.values().sum();
    if sum <= 0.0 {
        let assets: Vec<String> = cleaned.into_keys().collect();
        return Allocation::equal(&assets);
    }
    let mut scaled: BTreeMap<String, f64> =
        cleaned.into_iter().map(|(a, w)| (a, w / sum)).collect();

    // push rounding residue onto the largest weight
    let residue = 1.0 - scaled.values().sum::<f64>();
    if residue != 0.0 {
        let largest = scaled
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(a, _)| a.clone());
        if let Some(asset) = largest {
            if let Some(w) = scaled.get_mut(&asset) {
                *w += residue;
            }
        }
    }
    Allocation(scaled)
}

/// Per-asset inputs to the allocation decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetOutlook {
    pub asset: String,
    /// `None` when analysis failed.
    pub regime: Option<Regime>,
    pub confidence: f64,
    pub combined_signal: f64,
    pub indicators: IndicatorSet,
}

impl AssetOutlook {
    pub fn from_analysis(analysis: &Analysis) -> Self {
        AssetOutlook {
            asset: analysis.asset.clone(),
            regime: Some(analysis.regime),
            confidence: analysis.signals.confidence,
            combined_signal: analysis.signals.combined,
            indicators: analysis.indicators.clone(),
        }
    }

    pub fn placeholder(asset: &str, price: f64) -> Self {
        AssetOutlook {
            asset: asset.to_string(),
            regime: None,
            confidence: PLACEHOLDER_CONFIDENCE,
            combined_signal: 0.0,
            indicators: IndicatorSet::neutral(price),
        }
    }
}

/// Analyses every fetched window in parallel. Fetch or analysis failures
/// become neutral placeholders, priced at the last close when one is known.
pub fn analyse_assets(
    windows: Vec<(String, Result<PriceWindow, AgentError>)>,
    portfolio_value: f64,
    risk_config: &RiskConfig,
) -> Vec<AssetOutlook> {
    windows
        .into_par_iter()
        .map(|(asset, fetched)| {
            let window = match fetched {
                Ok(window) => window,
                Err(e) => {
                    warn!(asset = %asset, error = %e, "allocation fetch failed, using placeholder");
                    return AssetOutlook::placeholder(&asset, 0.0);
                }
            };
            match decision::analyze(&window, portfolio_value, risk_config) {
                Ok(analysis) => AssetOutlook::from_analysis(&analysis),
                Err(e) => {
                    warn!(asset = %asset, error = %e, "allocation analysis failed, using placeholder");
                    AssetOutlook::placeholder(&asset, window.last_close())
                }
            }
        })
        .collect()
}

/// Last known price per asset, skipping assets with none.
pub fn outlook_prices(outlooks: &[AssetOutlook]) -> HashMap<String, f64> {
    outlooks
        .iter()
        .filter(|o| o.indicators.current_price > 0.0)
        .map(|o| (o.asset.clone(), o.indicators.current_price))
        .collect()
}

fn trend_score(hurst: f64) -> f64 {
    if hurst > 0.6 {
        0.3
    } else if hurst < 0.4 {
        0.2
    } else {
        0.1
    }
}

/// Composite attractiveness score; higher gets more capital.
pub fn asset_score(outlook: &AssetOutlook) -> f64 {
    let ind = &outlook.indicators;
    let signal_strength = outlook.combined_signal.abs() * outlook.confidence;
    let momentum = ind.roc.abs() * 10.0;
    let trend = trend_score(ind.hurst_exponent);
    let vol = (1.0 - ind.volatility / 0.1).max(0.1);
    let rsi = 1.0 - (ind.rsi - 50.0).abs() / 50.0;

    0.3 * signal_strength + 0.2 * momentum + 0.2 * trend + 0.15 * vol + 0.15 * rsi
}

pub fn risk_weighted_allocation(outlooks: &[AssetOutlook]) -> Allocation {
    let scores: Vec<(String, f64)> = outlooks
        .iter()
        .map(|o| (o.asset.clone(), asset_score(o)))
        .collect();
    let total: f64 = scores.iter().map(|(_, s)| s).sum();

    if total > 0.0 && total.is_finite() {
        Allocation::from_pairs(scores.into_iter().map(|(a, s)| (a, s / total)))
    } else {
        let assets: Vec<String> = scores.into_iter().map(|(a, _)| a).collect();
        Allocation::equal(&assets)
    }
}

pub fn build_allocation_prompt(
    outlooks: &[AssetOutlook],
    portfolio_value: f64,
    now: DateTime<Utc>,
) -> String {
    let mut assets_data = String::new();
    for o in outlooks {
        let regime = o
            .regime
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".into());
        let ind = &o.indicators;
        assets_data.push_str(&format!(
            "\n{asset}:\n\
             \x20 - Market Regime: {regime}\n\
             \x20 - Signal Confidence: {conf:.2}\n\
             \x20 - Combined Signal: {combined:.2}\n\
             \x20 - RSI: {rsi:.2} (0-100, 30=oversold, 70=overbought)\n\
             \x20 - Volatility: {vol:.4}\n\
             \x20 - Hurst Exponent: {hurst:.2} (0.5=random, >0.5=trending, <0.5=mean-reverting)\n\
             \x20 - Current Price: ${price:.2}\n",
            asset = o.asset,
            conf = o.confidence,
            combined = o.combined_signal,
            rsi = ind.rsi,
            vol = ind.volatility,
            hurst = ind.hurst_exponent,
            price = ind.current_price,
        ));
    }

    let example = outlooks
        .iter()
        .map(|o| format!("\"{}\": 0.5", o.asset))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are an expert portfolio allocation bot with advanced quantitative finance knowledge.\n\
         Based on the following market analysis for {n} assets, create an initial allocation \
         for a portfolio starting with ${pv:.2}.\n\
         \n\
         Market analysis for each asset:\n{assets_data}\n\
         Weigh market regime, signal confidence, combined signal strength, \
         volatility-adjusted returns and diversification across regimes.\n\
         \n\
         Current time: {now}\n\
         \n\
         The allocation fractions must sum to 1.0.\n\
         Return a JSON object with asset names as keys and fractions as values, \
         for example {{{example}}}.\n\
         Only respond with the JSON object and nothing else.\n",
        n = outlooks.len(),
        pv = portfolio_value,
        now = now.to_rfc3339(),
    )
}

/// Extracts the outermost `{...}` span of a reply and validates it as a split
/// over `assets`.
pub fn parse_allocation_response(reply: &str, assets: &[String]) -> Result<Allocation, AgentError> {
    let malformed = |reason: String| AgentError::external("allocation", reason);

    let start = reply.find('{').ok_or_else(|| malformed("no JSON object in reply".into()))?;
    let end = reply.rfind('}').ok_or_else(|| malformed("no JSON object in reply".into()))?;
    if end < start {
        return Err(malformed("no JSON object in reply".into()));
    }

    let parsed: BTreeMap<String, serde_json::Value> = serde_json::from_str(&reply[start..=end])
        .map_err(|e| malformed(format!("invalid JSON: {e}")))?;

    let mut raw = BTreeMap::new();
    for (asset, value) in &parsed {
        let fraction = value
            .as_f64()
            .ok_or_else(|| malformed(format!("non-numeric fraction for {asset}")))?;
        raw.insert(asset.clone(), fraction);
    }

    let sum: f64 = raw.values().sum();
    let (low, high) = SUM_TOLERANCE;
    if !(low..=high).contains(&sum) {
        return Err(malformed(format!("fractions sum to {sum:.4}")));
    }

    let requested: BTreeMap<String, f64> = assets
        .iter()
        .map(|a| (a.clone(), raw.get(a).copied().unwrap_or(0.0)))
        .collect();
    if requested.values().all(|w| *w <= 0.0) {
        return Err(malformed("no requested asset received capital".into()));
    }
    Ok(normalize_allocation(&requested))
}

/// Provider split, or the risk-weighted split when the provider fails.
pub fn make_initial_allocation(
    provider: &dyn SuggestionPort,
    outlooks: &[AssetOutlook],
    portfolio_value: f64,
) -> Allocation {
    let assets: Vec<String> = outlooks.iter().map(|o| o.asset.clone()).collect();
    let request = SuggestionRequest {
        prompt: build_allocation_prompt(outlooks, portfolio_value, Utc::now()),
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
    };

    let suggested = provider
        .suggest(&request)
        .and_then(|reply| parse_allocation_response(&reply, &assets));

    match suggested {
        Ok(allocation) => {
            debug!(?allocation, "using suggested allocation");
            allocation
        }
        Err(e) => {
            warn!(error = %e, "allocation suggestion unusable, using risk-weighted split");
            risk_weighted_allocation(outlooks)
        }
    }
}
