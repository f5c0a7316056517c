//! Embedded video playback (audio only) through an external player.
//!
//! The player is created lazily on a worker thread the first time a video
//! track starts, and kept for the rest of the session. Until it is ready the
//! adapter just remembers what was asked for; `stop` before readiness means
//! nothing gets loaded when it finally arrives.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::VideoSettings;
use crate::error::PlaybackError;

use super::schedule::Interval;
use super::types::{AdapterEvent, EventSender, Session, SourceAdapter, SourceKind, StartRequest};

const INIT_FAILURE: &str = "Embedded player failed to initialize.";
const PLAY_FAILURE: &str = "YouTube link could not be played.";

/// What the embedded player reports when polled.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerStatus {
    /// Seconds into the current video, if one is playing.
    pub position: Option<f64>,
    /// Length of the current video, once known.
    pub duration: Option<f64>,
    /// Nothing is loaded (playback finished or never began).
    pub idle: bool,
    /// The player gave up on the current video.
    pub failed: bool,
}

/// A remote-controlled video player.
pub trait EmbeddedPlayer {
    /// Load and play `video_id` from `start_secs` in.
    fn load(&mut self, video_id: &str, start_secs: u64) -> Result<(), PlaybackError>;

    fn pause(&mut self);

    fn status(&mut self) -> Result<PlayerStatus, PlaybackError>;
}

pub type Connector<P> = Arc<dyn Fn() -> Result<P, PlaybackError> + Send + Sync>;

enum PlayerInit<P> {
    Idle,
    Pending(Receiver<Result<P, PlaybackError>>),
    Ready(P),
}

struct VideoRun {
    session: Session,
    video_id: String,
    start_secs: u64,
    loaded: bool,
    loaded_at: Instant,
    seen_playback: bool,
    finished: bool,
    last_elapsed: Option<u64>,
    last_duration: Option<u32>,
    clock: Interval,
}

pub struct VideoAdapter<P> {
    events: EventSender,
    connect: Connector<P>,
    init: PlayerInit<P>,
    poll_every: Duration,
    load_timeout: Duration,
    run: Option<VideoRun>,
}

impl<P: EmbeddedPlayer + Send + 'static> VideoAdapter<P> {
    pub fn new(events: EventSender, settings: &VideoSettings, connect: Connector<P>) -> Self {
        Self {
            events,
            connect,
            init: PlayerInit::Idle,
            poll_every: Duration::from_millis(settings.poll_ms),
            load_timeout: Duration::from_millis(settings.load_timeout_ms),
            run: None,
        }
    }

    /// True once the player has been created.
    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        matches!(self.init, PlayerInit::Ready(_))
    }

    fn emit(&self, event: AdapterEvent) {
        let _ = self.events.send(event);
    }

    fn fail(&mut self, message: &str) {
        if let Some(run) = self.run.take() {
            self.emit(AdapterEvent::Failed {
                session: run.session,
                error: PlaybackError::video(message),
            });
        }
    }

    fn spawn_player(&mut self) {
        let (tx, rx) = mpsc::channel();
        let connect = Arc::clone(&self.connect);
        thread::spawn(move || {
            let _ = tx.send(connect());
        });
        self.init = PlayerInit::Pending(rx);
    }

    fn collect_player(&mut self) {
        let PlayerInit::Pending(rx) = &self.init else {
            return;
        };
        match rx.try_recv() {
            Ok(Ok(player)) => {
                info!("embedded player ready");
                self.init = PlayerInit::Ready(player);
            }
            Ok(Err(e)) => {
                warn!(error = %e, "embedded player init failed");
                // Next video start tries again.
                self.init = PlayerInit::Idle;
                self.fail(INIT_FAILURE);
            }
            Err(TryRecvError::Disconnected) => {
                self.init = PlayerInit::Idle;
                self.fail(INIT_FAILURE);
            }
            Err(TryRecvError::Empty) => {}
        }
    }

    /// Load the wanted video if the player is up and it isn't loaded yet.
    fn load_pending(&mut self, now: Instant) {
        let PlayerInit::Ready(player) = &mut self.init else {
            return;
        };
        let Some(run) = self.run.as_mut() else {
            return;
        };
        if run.loaded {
            return;
        }
        debug!(video_id = %run.video_id, start = run.start_secs, "loading video");
        match player.load(&run.video_id, run.start_secs) {
            Ok(()) => {
                run.loaded = true;
                run.loaded_at = now;
                run.clock = Interval::starting_after(now, self.poll_every);
            }
            Err(e) => {
                warn!(error = %e, "video load failed");
                // The player is gone; the next start makes a new one.
                self.init = PlayerInit::Idle;
                self.fail(PLAY_FAILURE);
            }
        }
    }

    fn poll_status(&mut self, now: Instant) {
        let PlayerInit::Ready(player) = &mut self.init else {
            return;
        };
        let Some(run) = self.run.as_mut() else {
            return;
        };
        if !run.loaded || run.finished || !run.clock.poll(now) {
            return;
        }

        let status = match player.status() {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "embedded player stopped responding");
                self.init = PlayerInit::Idle;
                self.fail(PLAY_FAILURE);
                return;
            }
        };

        // mpv drops straight back to idle when it can't open a video.
        let never_started = status.idle
            && !run.seen_playback
            && now.saturating_duration_since(run.loaded_at) >= self.load_timeout;
        if status.failed || never_started {
            warn!(video_id = %run.video_id, failed = status.failed, "video did not play");
            self.fail(PLAY_FAILURE);
            return;
        }

        let session = run.session;
        let mut out = Vec::new();
        if let Some(pos) = status.position {
            run.seen_playback = true;
            let secs = pos.max(0.0).floor() as u64;
            if run.last_elapsed != Some(secs) {
                run.last_elapsed = Some(secs);
                out.push(AdapterEvent::Elapsed { session, secs });
            }
        }
        if let Some(total) = status.duration.filter(|d| *d > 0.0) {
            let secs = total.round() as u32;
            if run.last_duration != Some(secs) {
                run.last_duration = Some(secs);
                out.push(AdapterEvent::Duration { session, secs });
            }
        }
        if status.idle && run.seen_playback {
            run.finished = true;
            out.push(AdapterEvent::Ended { session });
        }
        for event in out {
            self.emit(event);
        }
    }
}

impl<P: EmbeddedPlayer + Send + 'static> SourceAdapter for VideoAdapter<P> {
    fn kind(&self) -> SourceKind {
        SourceKind::EmbeddedVideo
    }

    fn start(&mut self, request: &StartRequest<'_>) -> Result<(), PlaybackError> {
        let Some(video_id) = request.track.source.video_id() else {
            return Err(PlaybackError::video(PLAY_FAILURE));
        };

        if let Some(run) = self.run.as_mut() {
            if run.video_id == video_id && !run.finished {
                run.session = request.session;
                return Ok(());
            }
        }

        self.run = Some(VideoRun {
            session: request.session,
            video_id: video_id.to_string(),
            start_secs: request.elapsed_secs,
            loaded: false,
            loaded_at: request.now,
            seen_playback: false,
            finished: false,
            last_elapsed: None,
            last_duration: None,
            clock: Interval::starting_after(request.now, self.poll_every),
        });

        if matches!(self.init, PlayerInit::Idle) {
            self.spawn_player();
        }
        self.load_pending(request.now);
        Ok(())
    }

    fn stop(&mut self) {
        let was_loaded = self.run.take().is_some_and(|run| run.loaded);
        if was_loaded {
            if let PlayerInit::Ready(player) = &mut self.init {
                player.pause();
            }
        }
    }

    fn poll(&mut self, now: Instant) {
        self.collect_player();
        self.load_pending(now);
        self.poll_status(now);
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.run
            .as_ref()
            .filter(|run| run.loaded && !run.finished)
            .map(|run| run.clock.next_due())
    }
}
