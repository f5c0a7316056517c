//! The transport controller: play/pause/next/prev over whichever backend the
//! current track needs.
//!
//! Adapters never touch this state directly. They report through the event
//! channel, and every event is checked against the current `Session` before
//! it is applied, so a stop or track change makes anything still in flight
//! harmless.

use std::path::Path;
use std::sync::mpsc::Receiver;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{LibraryError, PlaybackError};
use crate::library::{
    Library, LibraryStore, Track, TrackEntry, build_track, is_remote_source, probe_duration,
};
use crate::playback::{AdapterEvent, Session, SourceAdapter, SourceKind, StartRequest};

use super::state::TransportState;

const NO_TRACK: &str = "Add a song before pressing play.";

/// The three backends, one of each.
pub struct Adapters {
    synth: Box<dyn SourceAdapter>,
    audio: Box<dyn SourceAdapter>,
    video: Box<dyn SourceAdapter>,
}

impl Adapters {
    pub fn new(
        synth: Box<dyn SourceAdapter>,
        audio: Box<dyn SourceAdapter>,
        video: Box<dyn SourceAdapter>,
    ) -> Self {
        Self {
            synth,
            audio,
            video,
        }
    }

    fn get_mut(&mut self, kind: SourceKind) -> &mut dyn SourceAdapter {
        match kind {
            SourceKind::Synth => self.synth.as_mut(),
            SourceKind::NativeAudio => self.audio.as_mut(),
            SourceKind::EmbeddedVideo => self.video.as_mut(),
        }
    }

    fn stop_all(&mut self) {
        self.synth.stop();
        self.audio.stop();
        self.video.stop();
    }

    fn poll_all(&mut self, now: Instant) {
        self.synth.poll(now);
        self.audio.poll(now);
        self.video.poll(now);
    }

    fn next_deadline(&self) -> Option<Instant> {
        [&self.synth, &self.audio, &self.video]
            .into_iter()
            .filter_map(|a| a.next_deadline())
            .min()
    }
}

/// A one-line message under the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub is_error: bool,
}

/// What the screen shows. Built fresh for every frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub playlist: String,
    pub title: String,
    pub artist: String,
    /// 1-based; 0 when the playlist is empty.
    pub track_position: usize,
    pub total_tracks: usize,
    pub playing: bool,
    pub elapsed_secs: u64,
    pub duration_secs: u32,
    pub lyrics: Option<String>,
    pub source: Option<SourceKind>,
}

impl NowPlaying {
    pub fn has_track(&self) -> bool {
        self.total_tracks > 0
    }
}

pub struct Transport {
    library: Library,
    state: TransportState,
    adapters: Adapters,
    events: Receiver<AdapterEvent>,
    store: Option<LibraryStore>,
    session: Session,
    status: Option<StatusLine>,
}

impl Transport {
    /// `state` is checked against `library`; an unknown playlist falls back to
    /// the first one. Always starts Stopped.
    pub fn new(
        library: Library,
        mut state: TransportState,
        adapters: Adapters,
        events: Receiver<AdapterEvent>,
        store: Option<LibraryStore>,
    ) -> Self {
        if !library.contains(&state.active_playlist) {
            let first = library.first_name().unwrap_or_default().to_string();
            state.switch_playlist(first);
        }
        let len = library
            .get_playlist(&state.active_playlist)
            .map_or(0, <[Track]>::len);
        state.clamp(len);
        state.playing = false;

        Self {
            library,
            state,
            adapters,
            events,
            store,
            session: Session::default(),
            status: None,
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn state(&self) -> &TransportState {
        &self.state
    }

    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(StatusLine {
            text: text.into(),
            is_error: false,
        });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        let text = text.into();
        debug!(%text, "status error");
        self.status = Some(StatusLine {
            text,
            is_error: true,
        });
    }

    fn playlist_len(&self) -> usize {
        self.library
            .get_playlist(&self.state.active_playlist)
            .map_or(0, <[Track]>::len)
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.library
            .get_playlist(&self.state.active_playlist)?
            .get(self.state.active_track)
    }

    /// Stop every backend and invalidate anything they still have in flight.
    fn halt(&mut self) {
        self.session = self.session.next();
        self.adapters.stop_all();
    }

    /// Start the current track on its backend, from the current elapsed time.
    fn start_current(&mut self, now: Instant) {
        self.halt();
        let Some(track) = self
            .library
            .get_playlist(&self.state.active_playlist)
            .and_then(|tracks| tracks.get(self.state.active_track))
        else {
            self.state.playing = false;
            return;
        };

        let kind = SourceKind::of(&track.source);
        let request = StartRequest {
            session: self.session,
            track,
            elapsed_secs: self.state.elapsed_secs,
            now,
        };
        info!(title = %track.title, ?kind, elapsed = self.state.elapsed_secs, "start");
        let result = self.adapters.get_mut(kind).start(&request);
        if let Err(e) = result {
            self.fail(e);
        }
    }

    /// Roll back to Stopped and show why.
    fn fail(&mut self, error: PlaybackError) {
        warn!(error = %error, "playback failed");
        self.state.playing = false;
        self.halt();
        self.set_error(error.to_string());
    }

    pub fn save(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) =
            store.save(&self.library, &self.state.active_playlist, self.state.active_track)
        {
            warn!(error = %e, path = %store.path().display(), "library save failed");
        }
    }

    /// The center button.
    pub fn toggle_play(&mut self, now: Instant) {
        if self.state.playing {
            self.state.playing = false;
            self.halt();
            return;
        }
        if self.current_track().is_none() {
            self.set_error(NO_TRACK);
            return;
        }
        self.state.playing = true;
        self.start_current(now);
    }

    pub fn next(&mut self, now: Instant) {
        let len = self.playlist_len();
        if len == 0 {
            return;
        }
        self.halt();
        self.state.advance(len);
        if self.state.playing {
            self.start_current(now);
        }
        self.save();
    }

    pub fn prev(&mut self, now: Instant) {
        let len = self.playlist_len();
        if len == 0 {
            return;
        }
        self.halt();
        self.state.retreat(len);
        if self.state.playing {
            self.start_current(now);
        }
        self.save();
    }

    /// Switch playlists. Unknown names are ignored.
    pub fn set_playlist(&mut self, name: &str, now: Instant) {
        if !self.library.contains(name) {
            return;
        }
        self.halt();
        self.state.switch_playlist(name);
        if self.state.playing {
            if self.current_track().is_some() {
                self.start_current(now);
            } else {
                self.state.playing = false;
            }
        }
        self.save();
    }

    /// The MENU button: the playlist after the active one, wrapping.
    pub fn cycle_playlist(&mut self, now: Instant) {
        let Some(next) = self
            .library
            .next_name(&self.state.active_playlist)
            .map(str::to_string)
        else {
            return;
        };
        self.set_playlist(&next, now);
    }

    /// The once-a-second elapsed tick. Only synth tracks count themselves;
    /// the other backends report their own position.
    pub fn tick(&mut self, now: Instant) {
        if !self.state.playing {
            return;
        }
        let Some(track) = self.current_track() else {
            return;
        };
        if SourceKind::of(&track.source).reports_elapsed() {
            return;
        }
        let duration = u64::from(track.duration_secs);
        self.state.elapsed_secs += 1;
        if self.state.elapsed_secs >= duration {
            self.next(now);
        }
    }

    /// Drive adapter timers and apply whatever they reported.
    pub fn pump(&mut self, now: Instant) {
        self.adapters.poll_all(now);
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event, now);
        }
        if self.state.playing && self.current_track().is_none() {
            self.state.playing = false;
            self.halt();
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.adapters.next_deadline()
    }

    pub fn handle_event(&mut self, event: AdapterEvent, now: Instant) {
        if event.session() != self.session || !self.state.playing {
            debug!(?event, current = self.session.0, "stale adapter event");
            return;
        }
        match event {
            AdapterEvent::Elapsed { secs, .. } => {
                self.state.elapsed_secs = secs;
            }
            AdapterEvent::Duration { secs, .. } => {
                let (name, index) = (self.state.active_playlist.clone(), self.state.active_track);
                let changed = self
                    .library
                    .track_mut(&name, index)
                    .is_some_and(|track| track.set_duration(secs));
                if changed {
                    self.save();
                }
            }
            AdapterEvent::Ended { .. } => self.next(now),
            AdapterEvent::Failed { error, .. } => self.fail(error),
        }
    }

    pub fn add_playlist(&mut self, name: &str, now: Instant) -> Result<(), LibraryError> {
        let name = match self.library.add_playlist(name) {
            Ok(name) => name,
            Err(e) => {
                self.set_error(e.to_string());
                return Err(e);
            }
        };
        info!(playlist = %name, "playlist added");
        self.set_playlist(&name, now);
        self.set_status(format!("Added playlist: {name}"));
        Ok(())
    }

    /// Validate `entry` and append it to `playlist`.
    pub fn add_track(&mut self, playlist: &str, entry: &TrackEntry) -> Result<(), LibraryError> {
        let result = build_track(entry, probe_local).and_then(|track| {
            let title = track.title.clone();
            let kind = SourceKind::of(&track.source);
            self.library
                .add_track(playlist, track)
                .map(|len| (title, kind, len))
        });
        let (title, kind, len) = match result {
            Ok(added) => added,
            Err(e) => {
                self.set_error(e.to_string());
                return Err(e);
            }
        };

        if playlist == self.state.active_playlist && len == 1 {
            self.state.active_track = 0;
            self.state.elapsed_secs = 0;
        }
        let sound = match kind {
            SourceKind::Synth => "synth sound",
            SourceKind::NativeAudio => "real audio",
            SourceKind::EmbeddedVideo => "YouTube audio",
        };
        info!(%title, %playlist, sound, "track added");
        self.set_status(format!("Added \"{title}\" to {playlist} with {sound}"));
        self.save();
        Ok(())
    }

    pub fn snapshot(&self) -> NowPlaying {
        let total_tracks = self.playlist_len();
        match self.current_track() {
            Some(track) => NowPlaying {
                playlist: self.state.active_playlist.clone(),
                title: track.title.clone(),
                artist: track.artist.clone(),
                track_position: self.state.active_track + 1,
                total_tracks,
                playing: self.state.playing,
                elapsed_secs: self.state.elapsed_secs,
                duration_secs: track.duration_secs,
                lyrics: track.lyrics.clone(),
                source: Some(SourceKind::of(&track.source)),
            },
            None => NowPlaying {
                playlist: self.state.active_playlist.clone(),
                title: "No Songs".to_string(),
                artist: "Add one below".to_string(),
                track_position: 0,
                total_tracks: 0,
                playing: false,
                elapsed_secs: 0,
                duration_secs: 0,
                lyrics: None,
                source: None,
            },
        }
    }

    /// Stop everything before exit.
    pub fn shutdown(&mut self) {
        self.state.playing = false;
        self.halt();
        self.save();
    }
}

/// Durations can only be read from local files before playback.
fn probe_local(src: &str) -> Option<u32> {
    if is_remote_source(src) {
        return None;
    }
    probe_duration(Path::new(src))
}
