//! Error types shared by the library, playback and persistence layers.
//!
//! None of these are fatal once the UI is running: playback errors become a
//! status line and a stopped transport, store errors are logged and ignored.

use thiserror::Error;

/// Failures raised while starting or running a playback backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// The backend refused to start (no output device, unreadable source).
    #[error("{0}")]
    StartFailure(String),

    /// The source was reachable but could not be decoded.
    #[error("{0}")]
    DecodeFailure(String),

    /// The embedded video player could not be initialised or rejected the id.
    #[error("{0}")]
    VideoUnavailable(String),

    /// The backend does not exist on this platform.
    #[error("{0}")]
    Unsupported(String),
}

impl PlaybackError {
    pub fn start(msg: impl Into<String>) -> Self {
        Self::StartFailure(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeFailure(msg.into())
    }

    pub fn video(msg: impl Into<String>) -> Self {
        Self::VideoUnavailable(msg.into())
    }
}

/// Validation failures for user-driven library edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    #[error("Playlist name is required.")]
    EmptyPlaylistName,

    #[error("Playlist already exists.")]
    DuplicatePlaylist,

    #[error("Choose a valid playlist first.")]
    UnknownPlaylist,

    #[error("Song title and artist are required.")]
    MissingTitleOrArtist,

    #[error("Duration must be between 10 and 900 seconds.")]
    InvalidDuration,

    #[error("Could not read audio length. Enter duration manually.")]
    UnknownAudioLength,

    #[error("Expected: title | artist | duration | url-or-path | lyrics")]
    MalformedEntry,
}

/// Persistence failures. Saving ignores these after logging them; loading
/// falls back to the seeded library.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt library state: {0}")]
    Corrupt(String),
}
