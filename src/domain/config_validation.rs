//! Configuration validation.
//!
//! Validates every section before the agent is built. Absent keys fall back
//! to their defaults and are not errors.

use std::collections::HashSet;

use crate::domain::error::AgentError;
use crate::domain::indicator_set::MIN_BARS;
use crate::ports::config_port::ConfigPort;

pub const DATA_SOURCES: [&str; 2] = ["synthetic", "csv"];
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_agent_config(config: &dyn ConfigPort) -> Result<(), AgentError> {
    validate_assets(config)?;
    validate_starting_funds(config)?;
    validate_lookback(config)?;
    validate_iterations(config)?;
    validate_data_source(config)?;
    validate_risk(config)?;
    validate_decision(config)?;
    validate_llm(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> AgentError {
    AgentError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_assets(config: &dyn ConfigPort) -> Result<(), AgentError> {
    let Some(assets) = config.get_list("agent", "assets") else {
        return Ok(());
    };
    if assets.is_empty() {
        return Err(AgentError::ConfigMissing {
            section: "agent".to_string(),
            key: "assets".to_string(),
        });
    }
    let mut seen = HashSet::new();
    for asset in &assets {
        if !seen.insert(asset.to_uppercase()) {
            return Err(invalid("agent", "assets", format!("duplicate asset {asset}")));
        }
    }
    Ok(())
}

fn validate_starting_funds(config: &dyn ConfigPort) -> Result<(), AgentError> {
    let value = config.get_double("agent", "starting_funds", 1000.0);
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid("agent", "starting_funds", "starting_funds must be positive"));
    }
    Ok(())
}

fn validate_lookback(config: &dyn ConfigPort) -> Result<(), AgentError> {
    let value = config.get_int("agent", "lookback", 50);
    if value < MIN_BARS as i64 {
        return Err(invalid(
            "agent",
            "lookback",
            format!("lookback must be at least {MIN_BARS}"),
        ));
    }
    Ok(())
}

fn validate_iterations(config: &dyn ConfigPort) -> Result<(), AgentError> {
    if config.get_int("agent", "iterations", 100) < 1 {
        return Err(invalid("agent", "iterations", "iterations must be at least 1"));
    }
    if config.get_int("agent", "cycle_delay_ms", 0) < 0 {
        return Err(invalid("agent", "cycle_delay_ms", "cycle_delay_ms must be non-negative"));
    }
    Ok(())
}

fn validate_data_source(config: &dyn ConfigPort) -> Result<(), AgentError> {
    let source = config
        .get_string("agent", "data_source")
        .unwrap_or_else(|| "synthetic".to_string());
    if !DATA_SOURCES.contains(&source.as_str()) {
        return Err(invalid(
            "agent",
            "data_source",
            format!("unknown data source '{source}', expected synthetic or csv"),
        ));
    }
    if source == "csv" {
        match config.get_string("agent", "data_dir") {
            Some(dir) if !dir.trim().is_empty() => {}
            _ => {
                return Err(AgentError::ConfigMissing {
                    section: "agent".to_string(),
                    key: "data_dir".to_string(),
                })
            }
        }
    }
    Ok(())
}

fn unit_fraction(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<(), AgentError> {
    let value = config.get_double(section, key, default);
    if !(value > 0.0 && value <= 1.0) {
        return Err(invalid(section, key, format!("{key} must be in (0, 1]")));
    }
    Ok(())
}

fn validate_risk(config: &dyn ConfigPort) -> Result<(), AgentError> {
    unit_fraction(config, "risk", "max_position_size", 0.10)?;
    unit_fraction(config, "risk", "max_total_risk", 0.25)?;
    unit_fraction(config, "risk", "kelly_fraction", 0.25)?;
    for (key, default) in [("avg_win", 0.02), ("avg_loss", 0.015)] {
        let value = config.get_double("risk", key, default);
        if !(value.is_finite() && value > 0.0) {
            return Err(invalid("risk", key, format!("{key} must be positive")));
        }
    }
    Ok(())
}

fn validate_decision(config: &dyn ConfigPort) -> Result<(), AgentError> {
    let weak = config.get_double("decision", "weak_threshold", 0.1);
    let strong = config.get_double("decision", "strong_threshold", 0.3);
    if !(weak > 0.0) {
        return Err(invalid("decision", "weak_threshold", "weak_threshold must be positive"));
    }
    if strong <= weak {
        return Err(invalid(
            "decision",
            "strong_threshold",
            "strong_threshold must exceed weak_threshold",
        ));
    }
    let confidence = config.get_double("decision", "fallback_confidence", 0.3);
    if !(0.0..=1.0).contains(&confidence) {
        return Err(invalid(
            "decision",
            "fallback_confidence",
            "fallback_confidence must be between 0 and 1",
        ));
    }
    unit_fraction(config, "decision", "fallback_position_pct", 0.01)
}

fn validate_llm(config: &dyn ConfigPort) -> Result<(), AgentError> {
    if !config.get_bool("llm", "enabled", false) {
        return Ok(());
    }
    if config.get_int("llm", "timeout_ms", 5000) <= 0 {
        return Err(invalid("llm", "timeout_ms", "timeout_ms must be positive"));
    }
    if let Some(url) = config.get_string("llm", "base_url") {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid("llm", "base_url", "base_url must be an http(s) URL"));
        }
    }
    Ok(())
}

fn validate_logging(config: &dyn ConfigPort) -> Result<(), AgentError> {
    if let Some(level) = config.get_string("logging", "level") {
        if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            return Err(invalid(
                "logging",
                "level",
                format!("unknown level '{level}'"),
            ));
        }
    }
    Ok(())
}
