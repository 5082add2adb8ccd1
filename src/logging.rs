use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Filter used when `RUST_LOG` is unset: our crate at the configured level,
/// dependencies at warn.
pub fn default_directive(settings: &LoggingSettings) -> String {
    format!("tradeagent={},warn", settings.level.to_lowercase())
}

/// Initialise the global tracing subscriber on stderr.
///
/// Returns false if a subscriber was already installed (tests, embedding).
pub fn init_tracing(settings: &LoggingSettings) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(settings)));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if settings.json {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .json(),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .compact(),
            )
            .try_init()
    };
    installed.is_ok()
}
