//! CSV report adapter implementing ReportPort.
//!
//! Each run lands in `<output_dir>/<instrument>/<strategy>/<run_label>/`:
//! `signals.csv`, `trades.csv`, `equity.csv`, `round_trips.csv`, `summary.csv`.
//! The run label defaults to the local wall-clock time, `YYYYmmdd_HHMMSS_mmm`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::VoltraderError;
use crate::domain::metrics::Metrics;
use crate::domain::records::Tabular;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Clone, Default)]
pub struct CsvReportAdapter {
    run_label: Option<String>,
}

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed run directory name instead of a timestamp.
    pub fn with_run_label(label: impl Into<String>) -> Self {
        Self {
            run_label: Some(label.into()),
        }
    }

    fn label(&self) -> String {
        self.run_label
            .clone()
            .unwrap_or_else(|| Local::now().format("%Y%m%d_%H%M%S_%3f").to_string())
    }

    fn run_dir(&self, result: &BacktestResult, output_dir: &Path) -> PathBuf {
        let base = output_dir
            .join(sanitize(&result.instrument))
            .join(sanitize(&result.strategy));
        let label = self.label();
        let mut dir = base.join(&label);
        let mut n = 1;
        while dir.exists() {
            dir = base.join(format!("{label}_{n}"));
            n += 1;
        }
        dir
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

fn write_table<T: Tabular>(path: &Path, rows: &[T]) -> Result<(), VoltraderError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(T::headers())?;
    for row in rows {
        wtr.write_record(row.row())?;
    }
    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        output_dir: &Path,
    ) -> Result<PathBuf, VoltraderError> {
        let dir = self.run_dir(result, output_dir);
        fs::create_dir_all(&dir)?;

        write_table(&dir.join("signals.csv"), &result.signals)?;
        write_table(&dir.join("trades.csv"), &result.trades)?;
        write_table(&dir.join("equity.csv"), &result.equity_curve)?;
        write_table(&dir.join("round_trips.csv"), &result.closed_trades)?;
        write_table(&dir.join("summary.csv"), std::slice::from_ref(metrics))?;

        info!(
            instrument = %result.instrument,
            path = %dir.display(),
            "report written"
        );
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::EquityPoint;
    use crate::domain::backtest::RunCounters;
    use crate::domain::market::Market;
    use crate::domain::position::Position;
    use crate::domain::signal::{Signal, SignalKind};
    use crate::domain::trade::{Trade, TradeAction, TradeStatus};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_result() -> BacktestResult {
        let d1 = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        BacktestResult {
            instrument: "HK.00700".into(),
            strategy: "enhanced_volume".into(),
            market: Market::Hk,
            initial_cash: 100_000.0,
            final_cash: 79_949.46,
            final_position: Position {
                size: 2000,
                average_cost: 10.0,
            },
            bars: 2,
            signals: vec![Signal::new(d1, SignalKind::StrongBuy, 10.0)],
            trades: vec![Trade {
                trade_id: 1,
                date: d1,
                action: TradeAction::Buy,
                price: 10.0,
                size: 2000,
                total_amount: 20_000.0,
                commission: 50.54,
                status: TradeStatus::Completed,
            }],
            closed_trades: Vec::new(),
            equity_curve: vec![
                EquityPoint {
                    date: d1,
                    equity: 99_949.46,
                },
                EquityPoint {
                    date: d2,
                    equity: 101_949.46,
                },
            ],
            counters: RunCounters::default(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn writes_all_tables() {
        let tmp = TempDir::new().unwrap();
        let result = sample_result();
        let metrics = Metrics::compute(&result, 0.0);
        let dir = CsvReportAdapter::with_run_label("run1")
            .write(&result, &metrics, tmp.path())
            .unwrap();

        assert_eq!(dir, tmp.path().join("HK.00700/enhanced_volume/run1"));
        for name in [
            "signals.csv",
            "trades.csv",
            "equity.csv",
            "round_trips.csv",
            "summary.csv",
        ] {
            assert!(dir.join(name).is_file(), "{name} missing");
        }

        let signals = fs::read_to_string(dir.join("signals.csv")).unwrap();
        assert_eq!(
            signals,
            "date,signal_type,description,price\n2024-06-03,strong_buy,strong long,10.0000\n"
        );

        let trades = fs::read_to_string(dir.join("trades.csv")).unwrap();
        assert!(trades.starts_with("trade_id,date,action,price,size,total_amount,commission,status\n"));
        assert!(trades.contains("1,2024-06-03,B,10.0000,2000,20000.00,50.54,Completed"));

        let equity = fs::read_to_string(dir.join("equity.csv")).unwrap();
        assert_eq!(equity.lines().count(), 3);

        let round_trips = fs::read_to_string(dir.join("round_trips.csv")).unwrap();
        assert_eq!(round_trips.lines().count(), 1);

        let summary = fs::read_to_string(dir.join("summary.csv")).unwrap();
        assert_eq!(summary.lines().count(), 2);
    }

    #[test]
    fn repeated_label_gets_suffix() {
        let tmp = TempDir::new().unwrap();
        let result = sample_result();
        let metrics = Metrics::compute(&result, 0.0);
        let adapter = CsvReportAdapter::with_run_label("same");
        let first = adapter.write(&result, &metrics, tmp.path()).unwrap();
        let second = adapter.write(&result, &metrics, tmp.path()).unwrap();
        assert_ne!(first, second);
        assert!(second.ends_with("same_1"));
    }

    #[test]
    fn timestamp_label_shape() {
        let label = CsvReportAdapter::new().label();
        // YYYYmmdd_HHMMSS_mmm
        assert_eq!(label.len(), 19);
        assert_eq!(label.as_bytes()[8], b'_');
        assert_eq!(label.as_bytes()[15], b'_');
    }

    #[test]
    fn sanitize_path_characters() {
        assert_eq!(sanitize("a/b:c"), "a_b_c");
        assert_eq!(sanitize("HK.00700"), "HK.00700");
    }
}
