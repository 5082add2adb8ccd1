//! CSV file data adapter.
//!
//! Reads `<data_dir>/<ASSET>_<interval>.csv` with a
//! `timestamp,open,high,low,close,volume` header. Timestamps are RFC 3339 or
//! plain `YYYY-MM-DD` dates (taken as midnight UTC).

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::error::AgentError;
use crate::domain::ohlcv::{Interval, OhlcvBar, PriceWindow};
use crate::ports::data_port::DataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, asset: &str, interval: Interval) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", asset, interval))
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, AgentError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AgentError::Data {
            reason: format!("invalid timestamp '{raw}'"),
        })
}

fn parse_field(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, AgentError> {
    record
        .get(index)
        .ok_or_else(|| AgentError::Data {
            reason: format!("missing {name} column"),
        })?
        .trim()
        .parse()
        .map_err(|e| AgentError::Data {
            reason: format!("invalid {name} value: {e}"),
        })
}

impl DataPort for CsvAdapter {
    fn fetch(
        &self,
        asset: &str,
        interval: Interval,
        lookback: usize,
    ) -> Result<PriceWindow, AgentError> {
        let path = self.csv_path(asset, interval);
        let content = fs::read_to_string(&path).map_err(|e| AgentError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| AgentError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let ts_str = record.get(0).ok_or_else(|| AgentError::Data {
                reason: "missing timestamp column".into(),
            })?;

            bars.push(OhlcvBar {
                timestamp: parse_timestamp(ts_str)?,
                open: parse_field(&record, 1, "open")?,
                high: parse_field(&record, 2, "high")?,
                low: parse_field(&record, 3, "low")?,
                close: parse_field(&record, 4, "close")?,
                volume: parse_field(&record, 5, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(PriceWindow::new(asset, bars)?.tail(lookback))
    }
}
