//! CSV file data adapter.
//!
//! One file per instrument, `<base>/<instrument>.csv`, with a header row.
//! Columns are found by name (case-insensitive, any order):
//! `date,open,high,low,close,volume` are required, `market` is optional and
//! read from the first row that has it. Extra columns are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::domain::error::VoltraderError;
use crate::domain::market::Market;
use crate::domain::ohlcv::{validate_bars, OhlcvBar};
use crate::ports::data_port::{DataPort, InstrumentData};

const REQUIRED: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    market: Option<usize>,
}

impl Columns {
    fn from_headers(instrument: &str, headers: &StringRecord) -> Result<Self, VoltraderError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let mut idx = [0usize; 6];
        for (slot, name) in idx.iter_mut().zip(REQUIRED) {
            *slot = find(name).ok_or_else(|| {
                VoltraderError::integrity(instrument, None, format!("missing column '{name}'"))
            })?;
        }
        Ok(Columns {
            date: idx[0],
            open: idx[1],
            high: idx[2],
            low: idx[3],
            close: idx[4],
            volume: idx[5],
            market: find("market"),
        })
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Adapter over the file's directory plus the instrument name (file stem).
    pub fn for_file(path: &Path) -> Result<(Self, String), VoltraderError> {
        let instrument = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                VoltraderError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("not a data file: {}", path.display()),
                ))
            })?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok((Self::new(dir), instrument))
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        self.base_path.join(format!("{instrument}.csv"))
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y/%m/%d"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .ok()
}

fn parse_field(
    instrument: &str,
    record: &StringRecord,
    index: usize,
    name: &str,
    date: NaiveDate,
) -> Result<f64, VoltraderError> {
    let raw = record.get(index).unwrap_or("").trim();
    raw.parse::<f64>().map_err(|_| {
        VoltraderError::integrity(instrument, Some(date), format!("invalid {name} value '{raw}'"))
    })
}

impl DataPort for CsvAdapter {
    fn list_instruments(&self) -> Result<Vec<String>, VoltraderError> {
        let mut instruments = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !path.is_file() || !is_csv {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                instruments.push(stem.to_string_lossy().into_owned());
            }
        }
        instruments.sort();
        Ok(instruments)
    }

    fn load(&self, instrument: &str) -> Result<InstrumentData, VoltraderError> {
        let path = self.csv_path(instrument);
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)?;
        let columns = Columns::from_headers(instrument, rdr.headers()?)?;

        let mut bars = Vec::new();
        let mut market: Option<Market> = None;

        for (i, result) in rdr.records().enumerate() {
            let record = result?;
            let line = i + 2;

            let raw_date = record.get(columns.date).unwrap_or("");
            let date = parse_date(raw_date).ok_or_else(|| {
                VoltraderError::integrity(
                    instrument,
                    None,
                    format!("row {line}: invalid date '{raw_date}'"),
                )
            })?;

            if market.is_none() {
                if let Some(raw) = columns.market.and_then(|m| record.get(m)) {
                    if !raw.trim().is_empty() {
                        let parsed = raw.parse::<Market>().map_err(|_| {
                            VoltraderError::integrity(
                                instrument,
                                Some(date),
                                format!("row {line}: unknown market '{raw}'"),
                            )
                        })?;
                        market = Some(parsed);
                    }
                }
            }

            bars.push(OhlcvBar {
                date,
                open: parse_field(instrument, &record, columns.open, "open", date)?,
                high: parse_field(instrument, &record, columns.high, "high", date)?,
                low: parse_field(instrument, &record, columns.low, "low", date)?,
                close: parse_field(instrument, &record, columns.close, "close", date)?,
                volume: parse_field(instrument, &record, columns.volume, "volume", date)?,
            });
        }

        if bars.is_empty() {
            return Err(VoltraderError::NoData {
                instrument: instrument.to_string(),
            });
        }
        validate_bars(instrument, &bars)?;

        Ok(InstrumentData {
            instrument: instrument.to_string(),
            market,
            bars,
        })
    }
}
