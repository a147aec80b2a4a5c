//! Track types for playlist ingestion.

use serde::{Deserialize, Serialize};

use setflow_core::CamelotKey;

/// One row of a playlist export, as written by the library tooling.
///
/// Only `title` is required; everything else is best-effort tag data.
/// Taggers that store the key in the free-text comment (first token,
/// possibly zero-padded) are supported via `comment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub bpm: Option<u32>,
    /// Explicit Camelot key (e.g. "8A"), when tagged directly.
    #[serde(default)]
    pub key: Option<String>,
    /// Free-text comment; its first token may carry the key (e.g. "05A ...").
    #[serde(default)]
    pub comment: Option<String>,
    /// Star rating (0-5), carried through to candidate reports.
    #[serde(default)]
    pub rating: Option<u8>,
}

/// A track the optimizer can work with: positive BPM and a resolved key.
#[derive(Debug, Clone)]
pub struct MixTrack {
    pub title: String,
    pub artist: Option<String>,
    pub bpm: u32,
    pub key: CamelotKey,
    pub rating: Option<u8>,
}

impl MixTrack {
    /// Display label for report tables ("Title - Artist").
    pub fn display_name(&self) -> String {
        match &self.artist {
            Some(artist) => format!("{} - {}", self.title, artist),
            None => self.title.clone(),
        }
    }
}
