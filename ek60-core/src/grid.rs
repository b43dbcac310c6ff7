//! [`CalibratedGrid`], the typed result of a transform call (spec §3.1).
#[cfg(any(feature = "to_json", feature = "serde"))]
use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::time::Instant;

/// A 2-D array (n_pings × n_samples_out) in the requested quantity, plus
/// the range vector, ping times, and the parameter values actually used
/// (for provenance).
#[derive(Debug, Clone)]
#[cfg_attr(
    any(feature = "to_json", feature = "serde"),
    derive(Serialize, Deserialize)
)]
pub struct CalibratedGrid {
    n_pings: usize,
    n_samples: usize,
    /// Row-major (n_pings, n_samples).
    values: Vec<f64>,
    /// Meters, length n_samples.
    range: Vec<f64>,
    ping_time: Vec<Instant>,
    parameters_used: Calibration,
}

impl CalibratedGrid {
    pub fn new(
        n_pings: usize,
        n_samples: usize,
        values: Vec<f64>,
        range: Vec<f64>,
        ping_time: Vec<Instant>,
        parameters_used: Calibration,
    ) -> Self {
        debug_assert_eq!(values.len(), n_pings * n_samples);
        debug_assert_eq!(range.len(), n_samples);
        debug_assert_eq!(ping_time.len(), n_pings);
        CalibratedGrid {
            n_pings,
            n_samples,
            values,
            range,
            ping_time,
            parameters_used,
        }
    }

    pub fn n_pings(&self) -> usize {
        self.n_pings
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.n_samples..(i + 1) * self.n_samples]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn range(&self) -> &[f64] {
        &self.range
    }

    pub fn ping_time(&self) -> &[Instant] {
        &self.ping_time
    }

    pub fn parameters_used(&self) -> &Calibration {
        &self.parameters_used
    }
}
