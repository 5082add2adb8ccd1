//! Agent settings read from an INI file through `configparser`.
//!
//! Malformed numeric or boolean values fall back to the caller's default with
//! a warning, so a typo never silently changes the meaning of another key.

use std::path::Path;

use configparser::ini::Ini;
use tracing::warn;

use crate::domain::error::AgentError;
use crate::ports::config_port::ConfigPort;

#[derive(Debug)]
pub struct FileConfigAdapter {
    ini: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AgentError> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load(path)
            .map_err(|reason| parse_error(&path.display().to_string(), reason))?;
        Ok(Self { ini })
    }

    pub fn from_string(content: &str) -> Result<Self, AgentError> {
        let mut ini = Ini::new();
        ini.read(content.to_owned())
            .map_err(|reason| parse_error("<string>", reason))?;
        Ok(Self { ini })
    }

    fn typed<T>(
        &self,
        section: &str,
        key: &str,
        default: T,
        parse: impl Fn(&str) -> Option<T>,
    ) -> T {
        let Some(raw) = self.ini.get(section, key) else {
            return default;
        };
        parse(raw.trim()).unwrap_or_else(|| {
            warn!(section, key, value = %raw, "ignoring malformed config value");
            default
        })
    }
}

fn parse_error(file: &str, reason: String) -> AgentError {
    AgentError::ConfigParse {
        file: file.to_owned(),
        reason,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.ini.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.typed(section, key, default, |v| v.parse().ok())
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.typed(section, key, default, |v| v.parse().ok())
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.typed(section, key, default, parse_flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[agent]
assets = BTC, ETH
interval = 4h

[llm]
model = openai/gpt-3.5-turbo
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(adapter.get_string("agent", "interval"), Some("4h".to_string()));
        assert_eq!(
            adapter.get_string("llm", "model"),
            Some("openai/gpt-3.5-turbo".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[agent]\nlookback = 50\n").unwrap();
        assert_eq!(adapter.get_string("agent", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_list_splits_and_trims() {
        let adapter =
            FileConfigAdapter::from_string("[agent]\nassets = BTC , ETH,, SOL\n").unwrap();
        assert_eq!(
            adapter.get_list("agent", "assets"),
            Some(vec!["BTC".to_string(), "ETH".to_string(), "SOL".to_string()])
        );
        assert_eq!(adapter.get_list("agent", "missing"), None);
    }

    #[test]
    fn get_int_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[agent]\nlookback = 60\niterations = abc\n").unwrap();
        assert_eq!(adapter.get_int("agent", "lookback", 0), 60);
        assert_eq!(adapter.get_int("agent", "iterations", 42), 42);
        assert_eq!(adapter.get_int("agent", "missing", 7), 7);
    }

    #[test]
    fn get_double_returns_value_or_default() {
        let adapter = FileConfigAdapter::from_string(
            "[risk]\nkelly_fraction = 0.5\navg_win = not_a_number\n",
        )
        .unwrap();
        assert_eq!(adapter.get_double("risk", "kelly_fraction", 0.0), 0.5);
        assert_eq!(adapter.get_double("risk", "avg_win", 0.02), 0.02);
        assert_eq!(adapter.get_double("risk", "missing", 99.9), 99.9);
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[llm]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\ng = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("llm", "a", false));
        assert!(adapter.get_bool("llm", "b", false));
        assert!(adapter.get_bool("llm", "c", false));
        assert!(!adapter.get_bool("llm", "d", true));
        assert!(!adapter.get_bool("llm", "e", true));
        assert!(!adapter.get_bool("llm", "f", true));
        assert!(adapter.get_bool("llm", "g", true));
        assert!(!adapter.get_bool("llm", "missing", false));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[agent]\njournal_path = /var/log/trades.jsonl\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("agent", "journal_path"),
            Some("/var/log/trades.jsonl".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").unwrap_err();
        assert!(matches!(err, AgentError::ConfigParse { file, .. } if file.contains("config.ini")));
    }
}
