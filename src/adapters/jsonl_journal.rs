//! Append-only JSON Lines trade journal.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::domain::error::AgentError;
use crate::ports::journal_port::{JournalEntry, TradeJournal};

pub struct JsonlJournal {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlJournal {
    /// Opens `path` for appending, creating it and its parent directory if
    /// needed. Existing lines are never truncated.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AgentError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| AgentError::Journal {
                    reason: format!("cannot create {}: {e}", parent.display()),
                })?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AgentError::Journal {
                reason: format!("cannot open {}: {e}", path.display()),
            })?;
        Ok(JsonlJournal {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TradeJournal for JsonlJournal {
    fn append(&mut self, entry: &JournalEntry) -> Result<(), AgentError> {
        let line = serde_json::to_string(entry).map_err(|e| AgentError::Journal {
            reason: format!("cannot encode entry: {e}"),
        })?;
        writeln!(self.writer, "{line}")
            .and_then(|_| self.writer.flush())
            .map_err(|e| AgentError::Journal {
                reason: format!("cannot write {}: {e}", self.path.display()),
            })
    }
}
