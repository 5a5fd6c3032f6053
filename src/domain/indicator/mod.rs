//! Technical indicators, computed incrementally one bar at a time.
//!
//! - `rolling`: fixed-length window with SMA, population std-dev, min, max
//! - `rsi`: RSI over simple averages of up/down moves
//! - `bollinger`: Bollinger Bands on close
//! - `kdj`: KDJ stochastic with the short-range RSV denominator
//! - `volume_signal`: the composite engine producing per-bar markers

pub mod bollinger;
pub mod kdj;
pub mod rolling;
pub mod rsi;
pub mod volume_signal;

pub use volume_signal::{
    evaluate_series, BarEvaluation, IndicatorConfig, IndicatorSnapshot, SignalMarkers,
    VolumeSignalEngine, WARMUP_BARS,
};
