//! Delta-cost primitives for the annealing hot loop.
//!
//! Everything here is a handful of flat-array lookups per call: no strings,
//! no hashing, no allocation. The evaluator borrows the immutable track
//! arrays and precomputed tables and copies the few cost scalars it needs.

use crate::camelot::CamelotKey;
use crate::cost::{CostBreakdown, CostParams};
use crate::error::MixError;
use crate::tables::TransitionTables;

/// Edge start-positions whose cost can change when two order positions are
/// swapped. At most 4 entries (3 when the positions are adjacent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffectedEdges {
    edges: [usize; 4],
    len: usize,
}

impl AffectedEdges {
    fn push(&mut self, edge: usize) {
        if !self.edges[..self.len].contains(&edge) {
            self.edges[self.len] = edge;
            self.len += 1;
        }
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.edges[..self.len]
    }
}

/// Edge start-positions affected by swapping order positions `a` and `b`
/// in a mix of `n` tracks. An edge at position `j` connects
/// `order[j] -> order[j + 1]`, so each swapped position touches the edge
/// before it and the edge starting at it, clamped to `[0, n - 2]`.
pub fn affected_edges(a: usize, b: usize, n: usize) -> AffectedEdges {
    let mut out = AffectedEdges {
        edges: [0; 4],
        len: 0,
    };
    for p in [a, b] {
        if p > 0 {
            out.push(p - 1);
        }
        if p < n - 1 {
            out.push(p);
        }
    }
    out
}

/// Fast edge- and state-cost evaluation over immutable track arrays.
pub struct MixEvaluator<'a> {
    bpm: &'a [u32],
    key_ids: Vec<u8>,
    tables: &'a TransitionTables,

    // Scalar copies of the cost knobs, so the hot loop never chases the
    // full params struct.
    tempo_threshold: f64,
    tempo_break_threshold: f64,
    tempo_penalty: f64,
    tempo_break_cost: f64,
    tempo_cost_weight: f64,
    non_harmonic_cost: f64,
    shift_penalty: f64,
    shift_weight: f64,
}

impl<'a> MixEvaluator<'a> {
    /// Validate the track arrays and build an evaluator.
    pub fn new(
        bpm: &'a [u32],
        keys: &[CamelotKey],
        tables: &'a TransitionTables,
        cost: &CostParams,
    ) -> Result<Self, MixError> {
        if bpm.len() != keys.len() {
            return Err(MixError::TrackLengthMismatch {
                bpm: bpm.len(),
                keys: keys.len(),
            });
        }
        if bpm.len() < 2 {
            return Err(MixError::TooFewTracks(bpm.len()));
        }
        if let Some(index) = bpm.iter().position(|&b| b == 0) {
            return Err(MixError::NonPositiveBpm { index });
        }

        Ok(Self {
            bpm,
            key_ids: keys.iter().map(|k| k.id() as u8).collect(),
            tables,
            tempo_threshold: cost.tempo_threshold,
            tempo_break_threshold: cost.tempo_break_threshold(),
            tempo_penalty: cost.tempo_penalty,
            tempo_break_cost: cost.tempo_penalty * cost.tempo_break_factor,
            tempo_cost_weight: cost.tempo_cost_weight,
            non_harmonic_cost: cost.non_harmonic_cost,
            shift_penalty: cost.shift_penalty,
            shift_weight: cost.shift_weight,
        })
    }

    /// Number of tracks.
    pub fn len(&self) -> usize {
        self.bpm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bpm.is_empty()
    }

    /// Combined price of one shifted track in the overall cost.
    #[inline]
    pub fn shift_cost(&self) -> f64 {
        self.shift_penalty * self.shift_weight
    }

    /// Weight of the tempo component in the overall cost.
    pub fn tempo_cost_weight(&self) -> f64 {
        self.tempo_cost_weight
    }

    /// Unweighted (harmonic, tempo) components of the transition from track
    /// `i1` to track `i2` under shifts `s1`, `s2`.
    ///
    /// Past the break threshold the pair is structurally disconnected:
    /// harmonic cost is zero and the tempo component is the fixed breakage
    /// penalty.
    pub fn edge_components(&self, i1: usize, i2: usize, s1: i8, s2: i8) -> (f64, f64) {
        let diff = self.bpm[i1].abs_diff(self.bpm[i2]) as f64;
        if diff > self.tempo_break_threshold {
            return (0.0, self.tempo_break_cost);
        }
        let ek1 = self.tables.effective_key_id(self.key_ids[i1] as usize, s1);
        let ek2 = self.tables.effective_key_id(self.key_ids[i2] as usize, s2);
        let direct = self.tables.direct_cost(ek1, ek2);
        let mut harmonic = direct;
        // No usable one-track bridge either: surcharge the clash.
        if direct == self.non_harmonic_cost
            && self.tables.indirect_cost(ek1, ek2) >= self.non_harmonic_cost
        {
            harmonic += 2.0 * self.non_harmonic_cost;
        }
        let tempo = if diff > self.tempo_threshold {
            self.tempo_penalty
        } else {
            0.0
        };
        (harmonic, tempo)
    }

    /// Weighted cost of one edge: `h + tempo_cost_weight * t`.
    #[inline]
    pub fn edge_cost(&self, i1: usize, i2: usize, s1: i8, s2: i8) -> f64 {
        let diff = self.bpm[i1].abs_diff(self.bpm[i2]) as f64;
        if diff > self.tempo_break_threshold {
            return self.tempo_cost_weight * self.tempo_break_cost;
        }
        let ek1 = self.tables.effective_key_id(self.key_ids[i1] as usize, s1);
        let ek2 = self.tables.effective_key_id(self.key_ids[i2] as usize, s2);
        let direct = self.tables.direct_cost(ek1, ek2);
        let mut harmonic = direct;
        if direct == self.non_harmonic_cost
            && self.tables.indirect_cost(ek1, ek2) >= self.non_harmonic_cost
        {
            harmonic += 2.0 * self.non_harmonic_cost;
        }
        let tempo = if diff > self.tempo_threshold {
            self.tempo_penalty
        } else {
            0.0
        };
        harmonic + self.tempo_cost_weight * tempo
    }

    /// Sum of the weighted edge costs at the given edge positions.
    pub fn sum_edge_costs(&self, edges: &AffectedEdges, order: &[usize], shifts: &[i8]) -> f64 {
        let mut total = 0.0;
        for &j in edges.as_slice() {
            let (i1, i2) = (order[j], order[j + 1]);
            total += self.edge_cost(i1, i2, shifts[i1], shifts[i2]);
        }
        total
    }

    /// Re-optimize the shift of the track at order position `pos`: try each
    /// candidate in `{-1, 0, +1}` against the (up to two) incident edges and
    /// keep the strict minimizer. Ties keep the current shift. Only
    /// `shifts[order[pos]]` is written.
    pub fn optimize_shift_at(&self, order: &[usize], shifts: &mut [i8], pos: usize) {
        let i = order[pos];
        let n = order.len();
        let prev = (pos > 0).then(|| order[pos - 1]);
        let next = (pos < n - 1).then(|| order[pos + 1]);

        let local = |s: i8| -> f64 {
            let mut cost = 0.0;
            if let Some(p) = prev {
                cost += self.edge_cost(p, i, shifts[p], s);
            }
            if let Some(nx) = next {
                cost += self.edge_cost(i, nx, s, shifts[nx]);
            }
            cost
        };

        let mut best_cost = local(shifts[i]);
        let mut best_shift = shifts[i];
        for s in [-1i8, 0, 1] {
            let cost = local(s);
            if cost < best_cost {
                best_cost = cost;
                best_shift = s;
            }
        }
        shifts[i] = best_shift;
    }

    /// Full state cost with its (harmonic, tempo, shift) components. The
    /// slow path: used at attempt start, on improvement, and as the oracle
    /// in tests.
    pub fn total_cost(&self, order: &[usize], shifts: &[i8]) -> CostBreakdown {
        let mut harmonic = 0.0;
        let mut tempo = 0.0;
        for j in 0..order.len() - 1 {
            let (i1, i2) = (order[j], order[j + 1]);
            let (h, t) = self.edge_components(i1, i2, shifts[i1], shifts[i2]);
            harmonic += h;
            tempo += t;
        }
        let shifted = shifts.iter().filter(|&&s| s != 0).count() as f64;
        let shift = self.shift_penalty * shifted;
        CostBreakdown {
            overall: harmonic + self.tempo_cost_weight * tempo + self.shift_weight * shift,
            harmonic,
            tempo,
            shift,
        }
    }
}
