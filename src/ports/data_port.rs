//! Price data access port trait.

use crate::domain::error::AgentError;
use crate::domain::ohlcv::{Interval, PriceWindow};

pub trait DataPort {
    /// The most recent `lookback` bars for `asset`, oldest first.
    fn fetch(
        &self,
        asset: &str,
        interval: Interval,
        lookback: usize,
    ) -> Result<PriceWindow, AgentError>;
}
