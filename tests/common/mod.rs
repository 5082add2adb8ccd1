#![allow(dead_code)]

use chrono::{Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
pub use tradeagent::domain::ohlcv::{Interval, OhlcvBar, PriceWindow};
use tradeagent::domain::error::AgentError;
use tradeagent::ports::data_port::DataPort;
use tradeagent::ports::journal_port::{JournalEntry, TradeJournal};
use tradeagent::ports::suggestion_port::{SuggestionPort, SuggestionRequest};
use std::sync::Arc;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, asset: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(asset.to_string(), bars);
        self
    }

    pub fn with_error(mut self, asset: &str, reason: &str) -> Self {
        self.errors.insert(asset.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch(
        &self,
        asset: &str,
        _interval: Interval,
        lookback: usize,
    ) -> Result<PriceWindow, AgentError> {
        if let Some(reason) = self.errors.get(asset) {
            return Err(AgentError::Data {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(asset).cloned().unwrap_or_default();
        Ok(PriceWindow::new(asset, bars)?.tail(lookback))
    }
}

/// Replays canned replies in order, repeating the last one. Counts calls.
pub struct ScriptedSuggestions {
    replies: Vec<Result<String, String>>,
    calls: Mutex<usize>,
}

impl ScriptedSuggestions {
    pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
        Self {
            replies: replies
                .into_iter()
                .map(|r| r.map(str::to_string).map_err(str::to_string))
                .collect(),
            calls: Mutex::new(0),
        }
    }

    pub fn always(reply: &str) -> Self {
        Self::new(vec![Ok(reply)])
    }

    pub fn failing() -> Self {
        Self::new(vec![Err("offline")])
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl SuggestionPort for ScriptedSuggestions {
    fn suggest(&self, _request: &SuggestionRequest) -> Result<String, AgentError> {
        let mut calls = self.calls.lock().unwrap();
        let index = (*calls).min(self.replies.len().saturating_sub(1));
        *calls += 1;
        match self.replies.get(index) {
            Some(Ok(reply)) => Ok(reply.clone()),
            Some(Err(reason)) => Err(AgentError::external("scripted", reason.clone())),
            None => Err(AgentError::external("scripted", "no replies")),
        }
    }
}

#[derive(Clone, Default)]
pub struct SharedJournal(pub Arc<Mutex<Vec<JournalEntry>>>);

impl SharedJournal {
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.0.lock().unwrap().clone()
    }
}

impl TradeJournal for SharedJournal {
    fn append(&mut self, entry: &JournalEntry) -> Result<(), AgentError> {
        self.0.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

pub struct FailingJournal;

impl TradeJournal for FailingJournal {
    fn append(&mut self, _entry: &JournalEntry) -> Result<(), AgentError> {
        Err(AgentError::Journal {
            reason: "disk full".into(),
        })
    }
}

/// Hourly bars with open = high = low = close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<OhlcvBar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            timestamp: start + Duration::hours(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Linear path from `start` to `end` inclusive, with a small high/low spread.
pub fn linear_bars(count: usize, start: f64, end: f64) -> Vec<OhlcvBar> {
    let step = if count > 1 {
        (end - start) / (count - 1) as f64
    } else {
        0.0
    };
    let closes: Vec<f64> = (0..count).map(|i| start + step * i as f64).collect();
    bars_from_closes(&closes)
        .into_iter()
        .map(|mut bar| {
            bar.high = bar.close * 1.002;
            bar.low = bar.close * 0.998;
            bar
        })
        .collect()
}

pub fn flat_bars(count: usize, price: f64) -> Vec<OhlcvBar> {
    bars_from_closes(&vec![price; count])
}

/// Alternating jumps of +/- `swing` around `base`.
pub fn choppy_bars(count: usize, base: f64, swing: f64) -> Vec<OhlcvBar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| if i % 2 == 0 { base * (1.0 + swing) } else { base * (1.0 - swing) })
        .collect();
    bars_from_closes(&closes)
}

pub fn window(asset: &str, bars: Vec<OhlcvBar>) -> PriceWindow {
    PriceWindow::new(asset, bars).unwrap()
}
