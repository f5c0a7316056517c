//! Native audio playback for local files and direct `http(s)` audio URLs.
//!
//! One `MediaElement` is created up front and reused for every track. Local
//! paths are decoded synchronously; remote URLs are fetched on a worker thread
//! and handed back through a channel tagged with the session that asked.

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::{debug, warn};

use crate::config::AudioSettings;
use crate::error::PlaybackError;
use crate::library::{is_remote_source, probe_duration};

use super::types::{AdapterEvent, EventSender, Session, SourceAdapter, SourceKind, StartRequest};

const UNSUPPORTED_SOURCE: &str =
    "Audio failed to start. Use a direct audio file/URL (.mp3, .wav, .ogg).";
const NETWORK_FAILURE: &str = "Network error while loading audio URL.";
const DECODE_FAILURE: &str = "Audio file could not be decoded.";
const TOO_LARGE: &str = "Audio URL is too large to load.";
/// Remote bodies larger than this are refused rather than decoded.
const MAX_REMOTE_BYTES: u64 = 64 * 1024 * 1024;

/// Media that has been located and can be handed to a decoder.
#[derive(Debug, Clone)]
pub enum MediaData {
    File(PathBuf),
    Bytes(Arc<[u8]>),
}

/// The reusable output a native track is played through.
pub trait MediaElement {
    /// Length of `media`, if it can be determined without playing it.
    fn probe(&self, media: &MediaData) -> Option<Duration>;

    /// Replace whatever is loaded with `media`, positioned `start_at` in and
    /// paused.
    fn load(&mut self, media: &MediaData, start_at: Duration) -> Result<(), PlaybackError>;

    fn play(&mut self);

    fn pause(&mut self);

    /// Position in the loaded media.
    fn position(&self) -> Duration;

    /// True once everything loaded has been played out.
    fn finished(&self) -> bool;
}

/// `MediaElement` backed by a lazily opened output stream and a `rodio` sink.
#[derive(Default)]
pub struct RodioElement {
    stream: Option<OutputStream>,
    sink: Option<Sink>,
    offset: Duration,
    started_at: Option<Instant>,
    accumulated: Duration,
}

impl RodioElement {
    pub fn new() -> Self {
        Self::default()
    }

    fn stream(&mut self) -> Result<&OutputStream, PlaybackError> {
        if self.stream.is_none() {
            let mut stream = OutputStreamBuilder::open_default_stream().map_err(|e| {
                warn!(error = %e, "no audio output device");
                PlaybackError::start("Audio output is unavailable.")
            })?;
            stream.log_on_drop(false);
            self.stream = Some(stream);
        }
        self.stream
            .as_ref()
            .ok_or_else(|| PlaybackError::start("Audio output is unavailable."))
    }

    fn queue<S>(&mut self, source: S, start_at: Duration) -> Result<(), PlaybackError>
    where
        S: Source + Send + 'static,
    {
        let sink = Sink::connect_new(self.stream()?.mixer());
        // `skip_duration` is the seek; zero is fine.
        sink.append(source.skip_duration(start_at));
        sink.pause();
        if let Some(old) = self.sink.replace(sink) {
            old.stop();
        }
        self.offset = start_at;
        self.started_at = None;
        self.accumulated = Duration::ZERO;
        Ok(())
    }
}

fn open_file(path: &Path) -> Result<Decoder<BufReader<File>>, PlaybackError> {
    let file = File::open(path).map_err(|e| {
        debug!(path = %path.display(), error = %e, "cannot open audio file");
        PlaybackError::start(UNSUPPORTED_SOURCE)
    })?;
    Decoder::new(BufReader::new(file)).map_err(|_| PlaybackError::decode(DECODE_FAILURE))
}

fn open_bytes(bytes: &Arc<[u8]>) -> Result<Decoder<Cursor<Arc<[u8]>>>, PlaybackError> {
    Decoder::new(Cursor::new(Arc::clone(bytes))).map_err(|_| PlaybackError::decode(DECODE_FAILURE))
}

impl MediaElement for RodioElement {
    fn probe(&self, media: &MediaData) -> Option<Duration> {
        match media {
            MediaData::File(path) => probe_duration(path)
                .map(|secs| Duration::from_secs(u64::from(secs)))
                .or_else(|| open_file(path).ok()?.total_duration()),
            MediaData::Bytes(bytes) => open_bytes(bytes).ok()?.total_duration(),
        }
    }

    fn load(&mut self, media: &MediaData, start_at: Duration) -> Result<(), PlaybackError> {
        match media {
            MediaData::File(path) => {
                let source = open_file(path)?;
                self.queue(source, start_at)
            }
            MediaData::Bytes(bytes) => {
                let source = open_bytes(bytes)?;
                self.queue(source, start_at)
            }
        }
    }

    fn play(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
            if self.started_at.is_none() {
                self.started_at = Some(Instant::now());
            }
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
        if let Some(t0) = self.started_at.take() {
            self.accumulated += t0.elapsed();
        }
    }

    fn position(&self) -> Duration {
        let running = self.started_at.map(|t0| t0.elapsed()).unwrap_or_default();
        self.offset + self.accumulated + running
    }

    fn finished(&self) -> bool {
        self.sink.as_ref().is_none_or(Sink::empty)
    }
}

struct Loaded {
    src: String,
    media: MediaData,
    duration: Option<Duration>,
}

struct AudioRun {
    session: Session,
    src: String,
    /// Seek waiting for a remote fetch to land; `None` once playing.
    pending_seek: Option<u64>,
    last_elapsed: Option<u64>,
    ended: bool,
}

impl AudioRun {
    fn playing(&self) -> bool {
        self.pending_seek.is_none()
    }
}

struct Fetched {
    session: Session,
    src: String,
    result: Result<Arc<[u8]>, PlaybackError>,
}

pub struct AudioAdapter<E: MediaElement> {
    element: E,
    events: EventSender,
    seek_guard: Duration,
    fetch_tx: Sender<Fetched>,
    fetch_rx: Receiver<Fetched>,
    loaded: Option<Loaded>,
    run: Option<AudioRun>,
}

impl<E: MediaElement> AudioAdapter<E> {
    pub fn new(element: E, events: EventSender, settings: &AudioSettings) -> Self {
        let (fetch_tx, fetch_rx) = mpsc::channel();
        Self {
            element,
            events,
            seek_guard: Duration::from_millis(settings.seek_guard_ms),
            fetch_tx,
            fetch_rx,
            loaded: None,
            run: None,
        }
    }

    #[cfg(test)]
    pub fn element(&self) -> &E {
        &self.element
    }

    #[cfg(test)]
    pub fn element_mut(&mut self) -> &mut E {
        &mut self.element
    }

    /// Where to start, given the requested offset and the known length.
    fn clamp_seek(&self, elapsed_secs: u64, duration: Option<Duration>) -> Duration {
        let wanted = Duration::from_secs(elapsed_secs);
        match duration {
            Some(total) => wanted.min(total.saturating_sub(self.seek_guard)),
            None => wanted,
        }
    }

    fn emit(&self, event: AdapterEvent) {
        // The receiver only goes away at shutdown.
        let _ = self.events.send(event);
    }

    /// Position the loaded media and start it.
    fn begin(&mut self, session: Session, elapsed_secs: u64) -> Result<(), PlaybackError> {
        let Some(loaded) = self.loaded.as_ref() else {
            return Err(PlaybackError::start(UNSUPPORTED_SOURCE));
        };
        let start_at = self.clamp_seek(elapsed_secs, loaded.duration);
        let src = loaded.src.clone();
        let media = loaded.media.clone();
        self.element.load(&media, start_at)?;
        self.element.play();
        self.run = Some(AudioRun {
            session,
            src,
            pending_seek: None,
            last_elapsed: None,
            ended: false,
        });
        Ok(())
    }

    /// Record newly located media and announce its length.
    fn adopt(&mut self, session: Session, src: String, media: MediaData) {
        let duration = self.element.probe(&media);
        if let Some(d) = duration {
            self.emit(AdapterEvent::Duration {
                session,
                secs: d.as_secs_f64().round() as u32,
            });
        }
        self.loaded = Some(Loaded {
            src,
            media,
            duration,
        });
    }

    fn spawn_fetch(&self, session: Session, src: String) {
        let tx = self.fetch_tx.clone();
        thread::spawn(move || {
            let result = fetch(&src);
            let _ = tx.send(Fetched {
                session,
                src,
                result,
            });
        });
    }

    fn collect_fetches(&mut self) {
        while let Ok(fetched) = self.fetch_rx.try_recv() {
            let Some(run) = self.run.as_ref() else {
                continue;
            };
            // Any fetch of the wanted source will do, even one started by an
            // earlier session.
            if run.playing() || run.src != fetched.src {
                debug!(src = %fetched.src, session = fetched.session.0, "dropping stale fetch");
                continue;
            }
            let (session, seek) = (run.session, run.pending_seek.unwrap_or(0));
            match fetched.result {
                Ok(bytes) => {
                    self.adopt(session, fetched.src, MediaData::Bytes(bytes));
                    if let Err(error) = self.begin(session, seek) {
                        self.run = None;
                        self.emit(AdapterEvent::Failed { session, error });
                    }
                }
                Err(error) => {
                    self.run = None;
                    self.emit(AdapterEvent::Failed { session, error });
                }
            }
        }
    }

    fn report_progress(&mut self) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        if !run.playing() || run.ended {
            return;
        }
        let secs = self.element.position().as_secs();
        let mut out = Vec::new();
        if run.last_elapsed != Some(secs) {
            run.last_elapsed = Some(secs);
            out.push(AdapterEvent::Elapsed {
                session: run.session,
                secs,
            });
        }
        if self.element.finished() {
            run.ended = true;
            out.push(AdapterEvent::Ended {
                session: run.session,
            });
        }
        for event in out {
            self.emit(event);
        }
    }
}

impl<E: MediaElement> SourceAdapter for AudioAdapter<E> {
    fn kind(&self) -> SourceKind {
        SourceKind::NativeAudio
    }

    fn start(&mut self, request: &StartRequest<'_>) -> Result<(), PlaybackError> {
        let Some(src) = request.track.source.audio_src() else {
            return Err(PlaybackError::start(UNSUPPORTED_SOURCE));
        };

        if let Some(run) = self.run.as_mut() {
            if run.src == src && !run.ended {
                run.session = request.session;
                return Ok(());
            }
        }
        self.run = None;

        let cached = self.loaded.as_ref().is_some_and(|l| l.src == src);
        if cached {
            return self.begin(request.session, request.elapsed_secs);
        }

        if is_remote_source(src) {
            debug!(src, "fetching remote audio");
            self.spawn_fetch(request.session, src.to_string());
            self.run = Some(AudioRun {
                session: request.session,
                src: src.to_string(),
                pending_seek: Some(request.elapsed_secs),
                last_elapsed: None,
                ended: false,
            });
            return Ok(());
        }

        let path = PathBuf::from(src);
        if !path.is_file() {
            return Err(PlaybackError::start(UNSUPPORTED_SOURCE));
        }
        self.adopt(request.session, src.to_string(), MediaData::File(path));
        self.begin(request.session, request.elapsed_secs)
    }

    fn stop(&mut self) {
        self.element.pause();
        self.run = None;
    }

    fn poll(&mut self, _now: Instant) {
        self.collect_fetches();
        self.report_progress();
    }

    fn next_deadline(&self) -> Option<Instant> {
        None
    }
}

fn fetch(src: &str) -> Result<Arc<[u8]>, PlaybackError> {
    let response = ureq::get(src).call().map_err(|e| {
        warn!(src, error = %e, "remote audio fetch failed");
        PlaybackError::start(NETWORK_FAILURE)
    })?;
    let body = read_capped(response.into_reader(), MAX_REMOTE_BYTES).inspect_err(|e| {
        warn!(src, error = %e, "remote audio body unusable");
    })?;
    Ok(Arc::from(body))
}

/// Read all of `reader`, refusing bodies over `limit` bytes.
pub(super) fn read_capped(reader: impl Read, limit: u64) -> Result<Vec<u8>, PlaybackError> {
    let mut body = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut body)
        .map_err(|_| PlaybackError::start(NETWORK_FAILURE))?;
    if body.len() as u64 > limit {
        return Err(PlaybackError::start(TOO_LARGE));
    }
    Ok(body)
}
