//! Engine error types.
//!
//! All validation happens once, before optimization starts; the annealing
//! loop itself has no failure paths.

use thiserror::Error;

/// Errors raised when validating inputs or configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MixError {
    #[error("a mix needs at least two tracks (got {0})")]
    TooFewTracks(usize),

    #[error("bpm and key lists have different lengths ({bpm} vs {keys})")]
    TrackLengthMismatch { bpm: usize, keys: usize },

    #[error("track {index} has BPM 0; every track needs a positive tempo")]
    NonPositiveBpm { index: usize },

    #[error("{table} table must have {expected} entries (got {got})")]
    BadTableSize {
        table: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("shift table entry {index} is {value}, outside the key range 0..24")]
    BadShiftTableEntry { index: usize, value: u8 },

    #[error("{name} must be finite and positive (got {value})")]
    BadTemperature { name: &'static str, value: f64 },

    #[error("total_iterations must be at least 1")]
    NoIterations,

    #[error("reporting_rate must be at least 1")]
    NoReportingRate,

    #[error("multi_swap_factor must be at least 1 (got {0})")]
    BadMultiSwapFactor(f64),

    #[error("time limit must be positive")]
    NonPositiveTimeLimit,
}
