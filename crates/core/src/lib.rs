//! Setflow mix optimization engine.
//!
//! Given a pool of tracks labeled with a tempo (BPM) and a Camelot-wheel
//! key, the engine searches for an ordering of all tracks plus a per-track
//! semitone shift in `{-1, 0, +1}` that minimizes an aggregate mix
//! dissonance cost: harmonic clashes between adjacent effective keys,
//! tempo jumps, and pitch-shift usage.
//!
//! The search is simulated annealing over `(order, shifts)` states with
//! delta-cost updates and local shift re-optimization; all key lookups are
//! flattened into small precomputed tables so one iteration is a handful
//! of integer-indexed array reads. Independent attempts repeat until a
//! wall-clock budget is spent, optionally fanning out across worker
//! threads.
//!
//! The engine is a pure computation unit: no filesystem, no network, no
//! audio-library access. Ingestion and reporting live in the sibling
//! crates.

pub mod anneal;
pub mod camelot;
pub mod cost;
pub mod error;
pub mod evaluator;
pub mod tables;

pub use anneal::{
    optimize_mix, AnnealParams, Annealer, LogSink, MixResult, NullSink, ProgressSink,
    ProgressUpdate, RunOptions, TrackStats,
};
pub use camelot::{CamelotKey, KeyParseError, Mode, NUM_KEYS};
pub use cost::{CostBreakdown, CostParams};
pub use error::MixError;
pub use evaluator::{affected_edges, AffectedEdges, MixEvaluator};
pub use tables::TransitionTables;
