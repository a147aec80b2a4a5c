//! Mix cost model.
//!
//! A mix is scored on three components: harmonic clashes between adjacent
//! effective keys, tempo jumps between adjacent BPMs, and how many tracks
//! carry a non-zero pitch shift. The overall cost is
//! `H + tempo_cost_weight * T + shift_weight * S`.

use serde::{Deserialize, Serialize};

use crate::camelot::CamelotKey;

/// Tunable constants for the cost model.
///
/// The five harmonic constants define the pairwise key-clash table; the
/// tempo knobs define the jump penalty and the hard "set break" point; the
/// shift knobs price each pitch-shifted track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostParams {
    /// Cost when both wheel number and ring match.
    pub exact_match_cost: f64,
    /// Cost when the number matches but the ring differs (relative keys).
    pub same_key_scale_change_cost: f64,
    /// Cost for adjacent wheel numbers on the same ring.
    pub key_diff_one_cost: f64,
    /// Cost for adjacent wheel numbers across rings.
    pub key_diff_one_scale_change_cost: f64,
    /// Cost for any larger wheel distance.
    pub non_harmonic_cost: f64,

    /// BPM difference up to which a transition is free of tempo cost.
    pub tempo_threshold: f64,
    /// Tempo cost for a jump beyond the threshold.
    pub tempo_penalty: f64,
    /// Multiple of the threshold beyond which the pair is a hard set break:
    /// harmonic cost is suppressed and a fixed breakage penalty applies.
    pub tempo_break_factor: f64,
    /// Weight of the tempo component in the overall cost.
    pub tempo_cost_weight: f64,

    /// Price per track with a non-zero shift.
    pub shift_penalty: f64,
    /// Weight of the shift component in the overall cost.
    pub shift_weight: f64,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            exact_match_cost: 0.0,
            same_key_scale_change_cost: 0.5,
            key_diff_one_cost: 0.5,
            key_diff_one_scale_change_cost: 5.0,
            non_harmonic_cost: 5.0,
            tempo_threshold: 4.5,
            tempo_penalty: 5.0,
            tempo_break_factor: 2.0,
            tempo_cost_weight: 3.0,
            shift_penalty: 1.0,
            shift_weight: 1.0,
        }
    }
}

impl CostParams {
    /// Harmonic cost between two effective keys.
    ///
    /// Same number scores by ring match; otherwise the circular wheel
    /// distance decides: 1 is near-harmonic (cheap on the same ring,
    /// expensive across rings), 2 or more is non-harmonic.
    pub fn harmonic_cost(&self, k1: CamelotKey, k2: CamelotKey) -> f64 {
        if k1.number() == k2.number() {
            return if k1.mode() == k2.mode() {
                self.exact_match_cost
            } else {
                self.same_key_scale_change_cost
            };
        }
        let diff = k1.number().abs_diff(k2.number());
        let diff = diff.min(12 - diff);
        if diff == 1 {
            if k1.mode() == k2.mode() {
                self.key_diff_one_cost
            } else {
                self.key_diff_one_scale_change_cost
            }
        } else {
            self.non_harmonic_cost
        }
    }

    /// Unweighted tempo cost for a BPM pair below the break point.
    pub fn tempo_cost(&self, bpm1: u32, bpm2: u32) -> f64 {
        if bpm1.abs_diff(bpm2) as f64 > self.tempo_threshold {
            self.tempo_penalty
        } else {
            0.0
        }
    }

    /// BPM difference beyond which a transition is a hard set break.
    pub fn tempo_break_threshold(&self) -> f64 {
        self.tempo_break_factor * self.tempo_threshold
    }
}

/// A state cost split into its components.
///
/// `overall = harmonic + tempo_cost_weight * tempo + shift_weight * shift`;
/// the components themselves are stored unweighted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub overall: f64,
    pub harmonic: f64,
    pub tempo: f64,
    pub shift: f64,
}
