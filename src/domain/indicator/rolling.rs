//! Fixed-length rolling window over a stream of values.
//!
//! Statistics are only reported once the window is full, which matches the
//! warm-up semantics of the batch indicators: SMA(n) and STDDEV(n) have no
//! value for the first (n-1) inputs.
//!
//! STDDEV is the population standard deviation (divides by N, not N-1).

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RollingWindow {
    period: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        RollingWindow {
            period,
            values: VecDeque::with_capacity(period),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.period {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.period
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn sma(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.period as f64)
    }

    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.sma()?;
        let variance = self
            .values
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / self.period as f64;
        Some(variance.sqrt())
    }

    pub fn min(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        self.values.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        self.values.iter().copied().reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn filled(period: usize, values: &[f64]) -> RollingWindow {
        let mut w = RollingWindow::new(period);
        for &v in values {
            w.push(v);
        }
        w
    }

    #[test]
    fn empty_until_full() {
        let w = filled(3, &[1.0, 2.0]);
        assert!(!w.is_full());
        assert_eq!(w.sma(), None);
        assert_eq!(w.std_dev(), None);
        assert_eq!(w.min(), None);
        assert_eq!(w.max(), None);
    }

    #[test]
    fn sma_over_last_values() {
        let w = filled(3, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(w.len(), 3);
        assert_relative_eq!(w.sma().unwrap(), 4.0);
    }

    #[test]
    fn population_stddev() {
        // 2, 4, 4, 4, 5, 5, 7, 9 has population stddev 2.0
        let w = filled(8, &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_relative_eq!(w.std_dev().unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn constant_series_has_zero_stddev() {
        let w = filled(5, &[10.0; 5]);
        assert_relative_eq!(w.std_dev().unwrap(), 0.0);
    }

    #[test]
    fn min_and_max_track_window() {
        let w = filled(3, &[100.0, 1.0, 5.0, 3.0, 4.0]);
        assert_relative_eq!(w.min().unwrap(), 3.0);
        assert_relative_eq!(w.max().unwrap(), 5.0);
    }

    #[test]
    fn zero_period_behaves_as_one() {
        let w = filled(0, &[7.0, 8.0]);
        assert_eq!(w.period(), 1);
        assert_relative_eq!(w.sma().unwrap(), 8.0);
    }
}
