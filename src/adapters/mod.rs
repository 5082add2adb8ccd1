//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod jsonl_journal;
pub mod llm_adapter;
pub mod synthetic_adapter;
