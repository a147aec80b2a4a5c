//! Camelot wheel key algebra.
//!
//! The Camelot wheel labels the 24 musical keys as 1A..12A (minor ring) and
//! 1B..12B (major ring). Adjacent numbers and same-number cross-ring pairs
//! mix well, which is what the cost model scores. Each wheel position maps
//! bijectively to a `(pitch class, mode)` pair, so shifting a track by a
//! semitone at playback is a rotation in pitch-class space that lands on
//! another wheel position.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of keys on the wheel (12 minor + 12 major).
pub const NUM_KEYS: usize = 24;

/// Scale of a Camelot key: the "A" (minor) or "B" (major) ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// The "A" ring (minor keys).
    Minor,
    /// The "B" ring (major keys).
    Major,
}

impl Mode {
    /// Ring letter as used in the textual form ("A" or "B").
    pub fn letter(self) -> char {
        match self {
            Mode::Minor => 'A',
            Mode::Major => 'B',
        }
    }
}

/// Pitch class of each minor-ring key, indexed by wheel number - 1.
/// 1A = Ab minor = pitch class 8, and each step on the wheel is a fifth.
const MINOR_PITCH: [u8; 12] = [8, 3, 10, 5, 0, 7, 2, 9, 4, 11, 6, 1];

/// Pitch class of each major-ring key, indexed by wheel number - 1.
const MAJOR_PITCH: [u8; 12] = [11, 6, 1, 8, 3, 10, 5, 0, 7, 2, 9, 4];

/// Wheel number for each pitch class on the minor ring.
const MINOR_NUMBER: [u8; 12] = [5, 12, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10];

/// Wheel number for each pitch class on the major ring.
const MAJOR_NUMBER: [u8; 12] = [8, 3, 10, 5, 12, 7, 2, 9, 4, 11, 6, 1];

/// Conventional key names, indexed by key id (1A, 1B, 2A, 2B, ...).
const REAL_NAMES: [&str; NUM_KEYS] = [
    "Ab minor", "B major", "Eb minor", "F# major", "Bb minor", "Db major", "F minor", "Ab major",
    "C minor", "Eb major", "G minor", "Bb major", "D minor", "F major", "A minor", "C major",
    "E minor", "G major", "B minor", "D major", "F# minor", "A major", "C# minor", "E major",
];

/// Errors produced when parsing a Camelot key string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyParseError {
    #[error("empty key string")]
    Empty,

    #[error("key must end in 'A' or 'B' (got {0:?})")]
    BadRing(String),

    #[error("key number must be 1-12 (got {0:?})")]
    BadNumber(String),
}

/// A position on the Camelot wheel, e.g. `7A` or `11B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CamelotKey {
    number: u8, // 1..=12
    mode: Mode,
}

impl CamelotKey {
    /// Create a key from a wheel number (1-12) and ring.
    pub fn new(number: u8, mode: Mode) -> Option<Self> {
        if (1..=12).contains(&number) {
            Some(Self { number, mode })
        } else {
            None
        }
    }

    /// Dense id in `0..24`: 1A=0, 1B=1, 2A=2, ... 12B=23.
    #[inline]
    pub fn id(self) -> usize {
        (self.number as usize - 1) * 2 + self.mode as usize
    }

    /// Inverse of [`CamelotKey::id`].
    pub fn from_id(id: usize) -> Option<Self> {
        if id >= NUM_KEYS {
            return None;
        }
        let mode = if id % 2 == 0 { Mode::Minor } else { Mode::Major };
        Self::new((id / 2) as u8 + 1, mode)
    }

    /// Wheel number (1-12).
    #[inline]
    pub fn number(self) -> u8 {
        self.number
    }

    /// Ring of the key.
    #[inline]
    pub fn mode(self) -> Mode {
        self.mode
    }

    /// Pitch class (0=C .. 11=B) of the key's tonic.
    pub fn pitch_class(self) -> u8 {
        let idx = self.number as usize - 1;
        match self.mode {
            Mode::Minor => MINOR_PITCH[idx],
            Mode::Major => MAJOR_PITCH[idx],
        }
    }

    /// Key with the given tonic pitch class on the given ring.
    pub fn from_pitch_class(pitch_class: u8, mode: Mode) -> Self {
        let idx = (pitch_class % 12) as usize;
        let number = match mode {
            Mode::Minor => MINOR_NUMBER[idx],
            Mode::Major => MAJOR_NUMBER[idx],
        };
        Self { number, mode }
    }

    /// The key heard after transposing by `semitones`. Mode is preserved;
    /// the tonic moves on the pitch-class circle.
    pub fn shift(self, semitones: i8) -> Self {
        let pitch = (self.pitch_class() as i16 + semitones as i16).rem_euclid(12) as u8;
        Self::from_pitch_class(pitch, self.mode)
    }

    /// Conventional name of the key (e.g. `8A` -> "A minor").
    pub fn real_name(self) -> &'static str {
        REAL_NAMES[self.id()]
    }

    /// All 24 keys in wheel order (1A, 1B, 2A, ...).
    pub fn all() -> impl Iterator<Item = CamelotKey> {
        (0..NUM_KEYS).map(|id| Self::from_id(id).expect("id in range"))
    }
}

impl fmt::Display for CamelotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.mode.letter())
    }
}

impl FromStr for CamelotKey {
    type Err = KeyParseError;

    /// Parse "NA"/"NB". Leading zeros are accepted ("05A" -> 5A) because
    /// some taggers zero-pad the wheel number for lexical sorting.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(KeyParseError::Empty);
        }
        if !s.is_ascii() {
            return Err(KeyParseError::BadRing(s.to_string()));
        }
        let (digits, ring) = s.split_at(s.len() - 1);
        let mode = match ring {
            "A" => Mode::Minor,
            "B" => Mode::Major,
            _ => return Err(KeyParseError::BadRing(s.to_string())),
        };
        let number: u8 = digits
            .parse()
            .map_err(|_| KeyParseError::BadNumber(s.to_string()))?;
        Self::new(number, mode).ok_or_else(|| KeyParseError::BadNumber(s.to_string()))
    }
}
