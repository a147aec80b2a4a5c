//! Playlist ingestion for the Setflow optimizer.
//!
//! Loads a playlist export (JSON), resolves each entry's Camelot key, and
//! filters the pool down to tracks the engine can use. The engine itself
//! never touches files; everything here happens before optimization.

mod types;

pub mod playlist;

pub use playlist::{camelot_from_comment, load_playlist, select_mix_tracks, LibraryError};
pub use types::{MixTrack, PlaylistEntry};
