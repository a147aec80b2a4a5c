//! Playlist loading and track filtering.

use std::fs;
use std::path::Path;

use thiserror::Error;

use setflow_core::CamelotKey;

use crate::types::{MixTrack, PlaylistEntry};

/// Errors raised while loading a playlist export.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("failed to read playlist: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse playlist JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load a playlist export (a JSON array of entries) from disk.
pub fn load_playlist<P: AsRef<Path>>(path: P) -> Result<Vec<PlaylistEntry>, LibraryError> {
    let path = path.as_ref();
    log::info!("Loading playlist: {:?}", path);
    let content = fs::read_to_string(path)?;
    let entries: Vec<PlaylistEntry> = serde_json::from_str(&content)?;
    log::info!("Found {} tracks in playlist", entries.len());
    Ok(entries)
}

/// Extract a Camelot key from the first token of a free-text comment.
/// Zero-padded tokens ("05A some comment") parse as their unpadded key.
pub fn camelot_from_comment(comment: &str) -> Option<CamelotKey> {
    comment.split_whitespace().next()?.parse().ok()
}

/// Resolve an entry's key: an explicit `key` field wins, otherwise the
/// first token of the comment is tried.
fn resolve_key(entry: &PlaylistEntry) -> Option<CamelotKey> {
    entry
        .key
        .as_deref()
        .and_then(|k| k.parse().ok())
        .or_else(|| entry.comment.as_deref().and_then(camelot_from_comment))
}

/// Filter playlist entries down to tracks the optimizer accepts. Entries
/// without a positive BPM or a resolvable Camelot key are dropped with a
/// warning, mirroring what the ingestion contract requires of callers.
pub fn select_mix_tracks(entries: &[PlaylistEntry]) -> Vec<MixTrack> {
    let mut tracks = Vec::with_capacity(entries.len());
    for entry in entries {
        let label = match &entry.artist {
            Some(artist) => format!("{} - {}", entry.title, artist),
            None => entry.title.clone(),
        };
        let bpm = match entry.bpm {
            Some(bpm) if bpm > 0 => bpm,
            _ => {
                log::warn!("No BPM for track: {}", label);
                continue;
            }
        };
        let key = match resolve_key(entry) {
            Some(key) => key,
            None => {
                log::warn!("No valid key for track: {}", label);
                continue;
            }
        };
        tracks.push(MixTrack {
            title: entry.title.clone(),
            artist: entry.artist.clone(),
            bpm,
            key,
            rating: entry.rating,
        });
    }
    log::info!(
        "{} of {} tracks have a valid BPM and Camelot key",
        tracks.len(),
        entries.len()
    );
    tracks
}
