//! Domain error types.

/// Top-level error type for tradeagent.
///
/// `InsufficientData` is surfaced to the caller (the asset is skipped for the
/// cycle). `ExternalService` and `Computation` are caught inside the decision
/// pipeline and resolved by the next fallback tier or a documented default.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("insufficient data for {asset}: have {bars} bars, need {minimum}")]
    InsufficientData {
        asset: String,
        bars: usize,
        minimum: usize,
    },

    #[error("invalid price window: {reason}")]
    InvalidWindow { reason: String },

    #[error("{service} unavailable: {reason}")]
    ExternalService { service: String, reason: String },

    #[error("{indicator} computation failed: {reason}")]
    Computation { indicator: String, reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("trade journal error: {reason}")]
    Journal { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AgentError {
    pub fn external(service: &str, reason: impl Into<String>) -> Self {
        AgentError::ExternalService {
            service: service.to_string(),
            reason: reason.into(),
        }
    }

    pub fn computation(indicator: &str, reason: impl Into<String>) -> Self {
        AgentError::Computation {
            indicator: indicator.to_string(),
            reason: reason.into(),
        }
    }

    /// True for failures the decision pipeline recovers from locally.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AgentError::ExternalService { .. } | AgentError::Computation { .. }
        )
    }
}

impl From<&AgentError> for std::process::ExitCode {
    fn from(err: &AgentError) -> Self {
        let code: u8 = match err {
            AgentError::Io(_) | AgentError::Journal { .. } => 1,
            AgentError::ConfigParse { .. }
            | AgentError::ConfigMissing { .. }
            | AgentError::ConfigInvalid { .. } => 2,
            AgentError::Data { .. }
            | AgentError::ExternalService { .. }
            | AgentError::Computation { .. }
            | AgentError::InvalidWindow { .. } => 3,
            AgentError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
