//! OHLCV bar representation and series integrity checks.

use chrono::NaiveDate;

use super::error::VoltraderError;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// close < open
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// close > open
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

/// Check that a bar series is usable by the engine.
///
/// Dates must be strictly increasing (no duplicates), prices finite and
/// non-negative, volumes non-negative. The first offending bar is reported.
pub fn validate_bars(instrument: &str, bars: &[OhlcvBar]) -> Result<(), VoltraderError> {
    let mut prev: Option<NaiveDate> = None;

    for bar in bars {
        if let Some(p) = prev {
            if bar.date <= p {
                let reason = if bar.date == p {
                    "duplicate date".to_string()
                } else {
                    format!("date not after previous bar {p}")
                };
                return Err(VoltraderError::integrity(instrument, Some(bar.date), reason));
            }
        }
        prev = Some(bar.date);

        for (name, value) in [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("close", bar.close),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(VoltraderError::integrity(
                    instrument,
                    Some(bar.date),
                    format!("invalid {name} price {value}"),
                ));
            }
        }

        if !bar.volume.is_finite() || bar.volume < 0.0 {
            return Err(VoltraderError::integrity(
                instrument,
                Some(bar.date),
                format!("invalid volume {}", bar.volume),
            ));
        }
    }

    Ok(())
}
