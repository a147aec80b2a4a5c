//! Precomputed key-shift and transition-cost tables.
//!
//! The annealing inner loop must not touch strings or hash maps, so every
//! key lookup is flattened into dense integer-indexed arrays built once per
//! run: a 72-entry `(key, shift) -> effective key` table and two 576-entry
//! `(key, key) -> cost` tables (direct, and best via one intermediate key).

use crate::camelot::{CamelotKey, NUM_KEYS};
use crate::cost::CostParams;
use crate::error::MixError;

/// Entries in the shift table: 24 keys x 3 shifts.
pub const SHIFT_TABLE_LEN: usize = NUM_KEYS * 3;

/// Entries in each cost table: 24 x 24 key pairs.
pub const COST_TABLE_LEN: usize = NUM_KEYS * NUM_KEYS;

/// Read-only lookup tables shared by all annealing attempts.
#[derive(Debug, Clone)]
pub struct TransitionTables {
    /// `shift[key_id * 3 + (shift + 1)]` = effective key id.
    shift: [u8; SHIFT_TABLE_LEN],
    /// `direct[ek1 * 24 + ek2]` = harmonic cost of the direct transition.
    direct: [f64; COST_TABLE_LEN],
    /// `indirect[ek1 * 24 + ek2]` = cheapest cost via one intermediate key.
    indirect: [f64; COST_TABLE_LEN],
}

impl TransitionTables {
    /// Build the tables from the harmonic constants. A given set of
    /// constants always yields identical tables.
    pub fn build(cost: &CostParams) -> Self {
        let mut shift = [0u8; SHIFT_TABLE_LEN];
        for key in CamelotKey::all() {
            for s in -1i8..=1 {
                shift[key.id() * 3 + (s + 1) as usize] = key.shift(s).id() as u8;
            }
        }

        let mut direct = [0.0f64; COST_TABLE_LEN];
        for k1 in CamelotKey::all() {
            for k2 in CamelotKey::all() {
                direct[k1.id() * NUM_KEYS + k2.id()] = cost.harmonic_cost(k1, k2);
            }
        }

        let mut indirect = [0.0f64; COST_TABLE_LEN];
        for k1 in 0..NUM_KEYS {
            for k2 in 0..NUM_KEYS {
                let mut best = f64::INFINITY;
                for k3 in 0..NUM_KEYS {
                    let via = direct[k1 * NUM_KEYS + k3] + direct[k3 * NUM_KEYS + k2];
                    if via < best {
                        best = via;
                    }
                }
                indirect[k1 * NUM_KEYS + k2] = best;
            }
        }

        Self {
            shift,
            direct,
            indirect,
        }
    }

    /// Build tables from caller-supplied flat arrays, validating sizes and
    /// shift-table entry ranges.
    pub fn from_raw(shift: &[u8], direct: &[f64], indirect: &[f64]) -> Result<Self, MixError> {
        if shift.len() != SHIFT_TABLE_LEN {
            return Err(MixError::BadTableSize {
                table: "shift",
                expected: SHIFT_TABLE_LEN,
                got: shift.len(),
            });
        }
        if direct.len() != COST_TABLE_LEN {
            return Err(MixError::BadTableSize {
                table: "direct cost",
                expected: COST_TABLE_LEN,
                got: direct.len(),
            });
        }
        if indirect.len() != COST_TABLE_LEN {
            return Err(MixError::BadTableSize {
                table: "indirect cost",
                expected: COST_TABLE_LEN,
                got: indirect.len(),
            });
        }
        for (index, &value) in shift.iter().enumerate() {
            if value as usize >= NUM_KEYS {
                return Err(MixError::BadShiftTableEntry { index, value });
            }
        }

        let mut tables = Self {
            shift: [0; SHIFT_TABLE_LEN],
            direct: [0.0; COST_TABLE_LEN],
            indirect: [0.0; COST_TABLE_LEN],
        };
        tables.shift.copy_from_slice(shift);
        tables.direct.copy_from_slice(direct);
        tables.indirect.copy_from_slice(indirect);
        Ok(tables)
    }

    /// Effective key id after applying `shift` in `{-1, 0, +1}`.
    #[inline]
    pub fn effective_key_id(&self, key_id: usize, shift: i8) -> usize {
        self.shift[key_id * 3 + (shift + 1) as usize] as usize
    }

    /// Direct harmonic cost between two effective key ids.
    #[inline]
    pub fn direct_cost(&self, ek1: usize, ek2: usize) -> f64 {
        self.direct[ek1 * NUM_KEYS + ek2]
    }

    /// Cheapest harmonic cost via one intermediate key.
    #[inline]
    pub fn indirect_cost(&self, ek1: usize, ek2: usize) -> f64 {
        self.indirect[ek1 * NUM_KEYS + ek2]
    }
}
