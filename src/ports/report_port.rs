//! Report output port.

use std::path::{Path, PathBuf};

use crate::domain::backtest::BacktestResult;
use crate::domain::error::VoltraderError;
use crate::domain::metrics::Metrics;

pub trait ReportPort {
    /// Write one run's output under `output_dir`; returns the run directory.
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        output_dir: &Path,
    ) -> Result<PathBuf, VoltraderError>;
}
