//! Library module: playlists, tracks and their persistence.
//!
//! Tracks are classified once into a `TrackSource`, which is what the
//! transport uses to pick a playback backend.

mod entry;
mod links;
mod model;
mod motif;
mod scan;
mod seed;
mod store;

pub use entry::{TrackEntry, build_track};
pub use links::{extract_video_id, is_ephemeral_source, is_remote_source, normalize_audio_url};
pub use model::*;
pub use motif::{MOTIFS, Motif, Waveform, motif_for};
pub use scan::{import_dir, probe_duration};
pub use seed::seeded_library;
pub use store::{LibraryStore, LoadedState, sanitize_state};
