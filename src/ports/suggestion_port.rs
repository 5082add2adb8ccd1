//! Categorical suggestion provider port.
//!
//! A provider turns a text prompt into a short free-form reply. Callers
//! parse the reply themselves; any transport or protocol failure is an
//! `ExternalService` error.

use crate::domain::error::AgentError;

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

pub trait SuggestionPort: Send + Sync {
    fn suggest(&self, request: &SuggestionRequest) -> Result<String, AgentError>;
}

/// Provider used when no external service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSuggestions;

impl SuggestionPort for DisabledSuggestions {
    fn suggest(&self, _request: &SuggestionRequest) -> Result<String, AgentError> {
        Err(AgentError::external("suggestions", "provider disabled"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_always_fails() {
        let request = SuggestionRequest {
            prompt: "anything".into(),
            max_tokens: 10,
            temperature: 0.1,
        };
        let err = DisabledSuggestions.suggest(&request).unwrap_err();
        assert!(err.is_recoverable());
    }
}
