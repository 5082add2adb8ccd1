//! Trade journal port trait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::decision::{Decision, DecisionSource, Strength};
use crate::domain::error::AgentError;
use crate::domain::simulator::TradeStatus;

/// One journal line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub asset: String,
    pub decision: Decision,
    pub strength: Strength,
    pub source: DecisionSource,
    pub result: TradeStatus,
    pub pnl: f64,
    pub portfolio_value: f64,
}

pub trait TradeJournal {
    fn append(&mut self, entry: &JournalEntry) -> Result<(), AgentError>;
}

/// Journal that drops every entry; used by read-only commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardJournal;

impl TradeJournal for DiscardJournal {
    fn append(&mut self, _entry: &JournalEntry) -> Result<(), AgentError> {
        Ok(())
    }
}
