//! Shared playback types: backend kinds, sessions, adapter events and the
//! `SourceAdapter` trait every backend implements.

use std::sync::mpsc::Sender;
use std::time::Instant;

use crate::error::PlaybackError;
use crate::library::{Track, TrackSource};

/// Which backend plays a track.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Synth,
    NativeAudio,
    EmbeddedVideo,
}

impl SourceKind {
    pub fn of(source: &TrackSource) -> Self {
        match source {
            TrackSource::Synth => Self::Synth,
            TrackSource::Audio(_) => Self::NativeAudio,
            TrackSource::Video(_) => Self::EmbeddedVideo,
        }
    }

    /// Whether the backend reports its own position. The transport tick only
    /// advances elapsed time for backends that don't.
    pub fn reports_elapsed(self) -> bool {
        !matches!(self, Self::Synth)
    }
}

/// Identifies one `start` call. Bumped by the transport on every transition.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Session(pub u64);

impl Session {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Progress reported by an adapter back to the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    /// Whole seconds played so far.
    Elapsed { session: Session, secs: u64 },
    /// The backend discovered the real length of the track.
    Duration { session: Session, secs: u32 },
    /// Playback reached the end of the media.
    Ended { session: Session },
    /// Playback stopped because of an error the user should see.
    Failed {
        session: Session,
        error: PlaybackError,
    },
}

impl AdapterEvent {
    pub fn session(&self) -> Session {
        match self {
            Self::Elapsed { session, .. }
            | Self::Duration { session, .. }
            | Self::Ended { session }
            | Self::Failed { session, .. } => *session,
        }
    }
}

pub type EventSender = Sender<AdapterEvent>;

/// Arguments for `SourceAdapter::start`.
#[derive(Debug, Clone, Copy)]
pub struct StartRequest<'a> {
    pub session: Session,
    pub track: &'a Track,
    pub elapsed_secs: u64,
    pub now: Instant,
}

/// A playback backend.
///
/// `start` is idempotent while the same track is already playing, and `stop`
/// is safe to call on an adapter that never started.
pub trait SourceAdapter {
    fn kind(&self) -> SourceKind;

    /// Begin playing `request.track` at `request.elapsed_secs`. Work that
    /// finishes later reports through the event channel.
    fn start(&mut self, request: &StartRequest<'_>) -> Result<(), PlaybackError>;

    fn stop(&mut self);

    /// Drive timers and collect results from worker threads.
    fn poll(&mut self, now: Instant);

    /// Earliest instant at which `poll` has scheduled work to do.
    fn next_deadline(&self) -> Option<Instant>;
}
