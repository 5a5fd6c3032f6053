//! Market data access port.

use crate::domain::error::VoltraderError;
use crate::domain::market::Market;
use crate::domain::ohlcv::OhlcvBar;

/// Bars for one instrument, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentData {
    pub instrument: String,
    /// Market recorded alongside the bars, if the source carries one.
    pub market: Option<Market>,
    pub bars: Vec<OhlcvBar>,
}

pub trait DataPort {
    fn list_instruments(&self) -> Result<Vec<String>, VoltraderError>;

    fn load(&self, instrument: &str) -> Result<InstrumentData, VoltraderError>;
}
