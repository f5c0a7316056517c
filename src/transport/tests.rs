use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{self, Sender};
use std::time::Instant;

use proptest::prelude::*;
use tempfile::{NamedTempFile, tempdir};

use super::*;
use crate::error::{LibraryError, PlaybackError};
use crate::library::{Library, LibraryStore, Playlist, Track, TrackEntry, TrackSource};
use crate::playback::{AdapterEvent, Session, SourceAdapter, SourceKind, StartRequest};

#[derive(Default)]
struct Shared {
    starts: Vec<String>,
    running: Vec<SourceKind>,
    fail: bool,
    session: Session,
}

/// Records what the transport asks of it; never makes a sound.
struct FakeAdapter {
    kind: SourceKind,
    shared: Rc<RefCell<Shared>>,
}

impl SourceAdapter for FakeAdapter {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn start(&mut self, request: &StartRequest<'_>) -> Result<(), PlaybackError> {
        let mut shared = self.shared.borrow_mut();
        shared.session = request.session;
        if shared.fail {
            return Err(PlaybackError::start("Audio failed to start."));
        }
        shared
            .starts
            .push(format!("{}@{}", request.track.title, request.elapsed_secs));
        shared.running.push(self.kind);
        Ok(())
    }

    fn stop(&mut self) {
        let kind = self.kind;
        self.shared.borrow_mut().running.retain(|k| *k != kind);
    }

    fn poll(&mut self, _now: Instant) {}

    fn next_deadline(&self) -> Option<Instant> {
        None
    }
}

struct Rig {
    transport: Transport,
    tx: Sender<AdapterEvent>,
    shared: Rc<RefCell<Shared>>,
}

impl Rig {
    fn new(library: Library) -> Self {
        let first = library.first_name().unwrap_or_default().to_string();
        Self::with_state(library, TransportState::new(first), None)
    }

    fn with_state(library: Library, state: TransportState, store: Option<LibraryStore>) -> Self {
        let shared = Rc::new(RefCell::new(Shared::default()));
        let (tx, rx) = mpsc::channel();
        let fake = |kind| {
            Box::new(FakeAdapter {
                kind,
                shared: Rc::clone(&shared),
            }) as Box<dyn SourceAdapter>
        };
        let adapters = Adapters::new(
            fake(SourceKind::Synth),
            fake(SourceKind::NativeAudio),
            fake(SourceKind::EmbeddedVideo),
        );
        Self {
            transport: Transport::new(library, state, adapters, rx, store),
            tx,
            shared,
        }
    }

    /// Session of the most recent start.
    fn session(&self) -> Session {
        self.shared.borrow().session
    }

    fn starts(&self) -> Vec<String> {
        self.shared.borrow().starts.clone()
    }

    fn running(&self) -> Vec<SourceKind> {
        self.shared.borrow().running.clone()
    }

    fn deliver(&mut self, event: AdapterEvent) {
        self.tx.send(event).unwrap();
        self.transport.pump(Instant::now());
    }

    fn index(&self) -> usize {
        self.transport.state().active_track
    }

    fn elapsed(&self) -> u64 {
        self.transport.state().elapsed_secs
    }
}

fn playlist(name: &str, tracks: Vec<Track>) -> Playlist {
    Playlist {
        name: name.to_string(),
        tracks,
    }
}

fn synth_pair() -> Library {
    Library::new(vec![playlist(
        "Mix",
        vec![Track::synth("A", "X", 180), Track::synth("B", "Y", 200)],
    )])
}

fn mixed_sources() -> Library {
    Library::new(vec![playlist(
        "Mixed",
        vec![
            Track::synth("Tone", "Gen", 120),
            Track::new("Real", "Band", 240, TrackSource::Audio("/tmp/real.mp3".into())),
            Track::new("Clip", "Chan", 180, TrackSource::Video("dQw4w9WgXcQ".into())),
        ],
    )])
}

fn numbered(name: &str, n: usize) -> Playlist {
    let tracks = (0..n)
        .map(|i| Track::synth(format!("T{i}"), "Artist", 60))
        .collect();
    playlist(name, tracks)
}

#[test]
fn synth_track_advances_after_its_duration_in_ticks() {
    let mut rig = Rig::new(synth_pair());
    let now = Instant::now();
    rig.transport.toggle_play(now);
    for _ in 0..179 {
        rig.transport.tick(now);
    }
    assert_eq!((rig.index(), rig.elapsed()), (0, 179));
    rig.transport.tick(now);
    assert_eq!((rig.index(), rig.elapsed()), (1, 0));
    assert!(rig.transport.is_playing());
    assert_eq!(rig.starts(), vec!["A@0", "B@0"]);
}

#[test]
fn ticks_do_nothing_while_stopped() {
    let mut rig = Rig::new(synth_pair());
    for _ in 0..500 {
        rig.transport.tick(Instant::now());
    }
    assert_eq!((rig.index(), rig.elapsed()), (0, 0));
}

#[test]
fn pause_keeps_elapsed_and_resume_starts_from_it() {
    let mut rig = Rig::new(synth_pair());
    let now = Instant::now();
    rig.transport.toggle_play(now);
    for _ in 0..42 {
        rig.transport.tick(now);
    }
    rig.transport.toggle_play(now);
    assert!(!rig.transport.is_playing());
    assert!(rig.running().is_empty());
    assert_eq!(rig.elapsed(), 42);
    rig.transport.toggle_play(now);
    assert_eq!(rig.starts(), vec!["A@0", "A@42"]);
}

#[test]
fn failing_backend_leaves_transport_stopped_with_elapsed_intact() {
    let mut state = TransportState::new("Mix");
    state.elapsed_secs = 17;
    let mut rig = Rig::with_state(synth_pair(), state, None);
    rig.shared.borrow_mut().fail = true;
    let now = Instant::now();

    rig.transport.toggle_play(now);
    assert!(!rig.transport.is_playing());
    rig.transport.toggle_play(now);
    assert!(!rig.transport.is_playing());
    assert_eq!(rig.elapsed(), 17);

    let status = rig.transport.status().unwrap();
    assert!(status.is_error);
    assert_eq!(status.text, "Audio failed to start.");
}

#[test]
fn play_without_tracks_asks_for_a_song() {
    let lib = Library::new(vec![playlist("Empty", vec![])]);
    let mut rig = Rig::new(lib);
    rig.transport.toggle_play(Instant::now());
    assert!(!rig.transport.is_playing());
    assert_eq!(
        rig.transport.status().map(|s| s.text.as_str()),
        Some("Add a song before pressing play.")
    );
    assert!(rig.starts().is_empty());
}

#[test]
fn empty_playlist_snapshot_shows_placeholder() {
    let lib = Library::new(vec![playlist("Empty", vec![])]);
    let rig = Rig::new(lib);
    let now = rig.transport.snapshot();
    assert_eq!(now.title, "No Songs");
    assert_eq!(now.artist, "Add one below");
    assert_eq!((now.track_position, now.total_tracks), (0, 0));
    assert_eq!((now.elapsed_secs, now.duration_secs), (0, 0));
    assert!(!now.playing);
    assert!(!now.has_track());
}

#[test]
fn snapshot_reflects_current_track() {
    let mut rig = Rig::new(mixed_sources());
    rig.transport.next(Instant::now());
    let now = rig.transport.snapshot();
    assert_eq!(now.playlist, "Mixed");
    assert_eq!((now.title.as_str(), now.artist.as_str()), ("Real", "Band"));
    assert_eq!((now.track_position, now.total_tracks), (2, 3));
    assert_eq!(now.duration_secs, 240);
    assert_eq!(now.source, Some(SourceKind::NativeAudio));
}

#[test]
fn next_and_prev_wrap_and_reset_elapsed() {
    let mut rig = Rig::new(synth_pair());
    let now = Instant::now();
    rig.transport.toggle_play(now);
    rig.transport.tick(now);
    rig.transport.prev(now);
    assert_eq!((rig.index(), rig.elapsed()), (1, 0));
    rig.transport.next(now);
    assert_eq!(rig.index(), 0);
    assert_eq!(rig.starts(), vec!["A@0", "B@0", "A@0"]);
}

#[test]
fn navigation_while_stopped_does_not_start_anything() {
    let mut rig = Rig::new(synth_pair());
    rig.transport.next(Instant::now());
    assert_eq!(rig.index(), 1);
    assert!(rig.starts().is_empty());
}

#[test]
fn only_one_backend_runs_at_a_time() {
    let mut rig = Rig::new(mixed_sources());
    let now = Instant::now();
    rig.transport.toggle_play(now);
    assert_eq!(rig.running(), vec![SourceKind::Synth]);
    rig.transport.next(now);
    assert_eq!(rig.running(), vec![SourceKind::NativeAudio]);
    rig.transport.next(now);
    assert_eq!(rig.running(), vec![SourceKind::EmbeddedVideo]);
    rig.transport.toggle_play(now);
    assert!(rig.running().is_empty());
}

#[test]
fn switching_playlists_resets_position() {
    let lib = Library::new(vec![numbered("One", 4), numbered("Two", 2)]);
    let mut rig = Rig::new(lib);
    let now = Instant::now();
    rig.transport.toggle_play(now);
    rig.transport.next(now);
    rig.transport.next(now);
    rig.transport.tick(now);
    rig.transport.set_playlist("Two", now);
    assert_eq!(rig.transport.state().active_playlist, "Two");
    assert_eq!((rig.index(), rig.elapsed()), (0, 0));
    assert!(rig.transport.is_playing());

    rig.transport.set_playlist("Nope", now);
    assert_eq!(rig.transport.state().active_playlist, "Two");
}

#[test]
fn menu_cycles_playlists_and_stops_on_an_empty_one() {
    let lib = Library::new(vec![
        numbered("One", 1),
        playlist("Empty", vec![]),
        numbered("Three", 1),
    ]);
    let mut rig = Rig::new(lib);
    let now = Instant::now();
    rig.transport.toggle_play(now);
    rig.transport.cycle_playlist(now);
    assert_eq!(rig.transport.state().active_playlist, "Empty");
    assert!(!rig.transport.is_playing());
    rig.transport.cycle_playlist(now);
    rig.transport.cycle_playlist(now);
    assert_eq!(rig.transport.state().active_playlist, "One");
}

#[test]
fn reported_elapsed_drives_non_synth_tracks() {
    let lib = Library::new(vec![playlist(
        "Real",
        vec![Track::new("R", "B", 240, TrackSource::Audio("/a.mp3".into()))],
    )]);
    let mut rig = Rig::new(lib);
    let now = Instant::now();
    rig.transport.toggle_play(now);
    for _ in 0..5 {
        rig.transport.tick(now);
    }
    assert_eq!(rig.elapsed(), 0);

    let session = rig.session();
    rig.deliver(AdapterEvent::Elapsed { session, secs: 42 });
    assert_eq!(rig.elapsed(), 42);
}

#[test]
fn stale_events_are_ignored() {
    let mut rig = Rig::new(mixed_sources());
    let now = Instant::now();
    rig.transport.next(now);
    rig.transport.toggle_play(now);
    let old = rig.session();
    rig.transport.next(now);

    rig.deliver(AdapterEvent::Elapsed {
        session: old,
        secs: 99,
    });
    rig.deliver(AdapterEvent::Ended { session: old });
    rig.deliver(AdapterEvent::Failed {
        session: old,
        error: PlaybackError::video("late"),
    });
    assert_eq!((rig.index(), rig.elapsed()), (2, 0));
    assert!(rig.transport.is_playing());

    // After a stop even the last session's events are dead.
    let last = rig.session();
    rig.transport.toggle_play(now);
    rig.deliver(AdapterEvent::Ended { session: last });
    assert_eq!(rig.index(), 2);
}

#[test]
fn ended_event_moves_to_next_track() {
    let mut rig = Rig::new(mixed_sources());
    let now = Instant::now();
    rig.transport.next(now);
    rig.transport.toggle_play(now);
    let session = rig.session();
    rig.deliver(AdapterEvent::Ended { session });
    assert_eq!((rig.index(), rig.elapsed()), (2, 0));
    assert!(rig.transport.is_playing());
}

#[test]
fn failed_event_stops_and_reports() {
    let mut rig = Rig::new(mixed_sources());
    let now = Instant::now();
    rig.transport.prev(now);
    rig.transport.toggle_play(now);
    let session = rig.session();
    rig.deliver(AdapterEvent::Failed {
        session,
        error: PlaybackError::video("Embedded player failed to initialize."),
    });
    assert!(!rig.transport.is_playing());
    assert!(rig.running().is_empty());
    let status = rig.transport.status().unwrap();
    assert_eq!(status.text, "Embedded player failed to initialize.");
    assert!(status.is_error);
}

#[test]
fn discovered_duration_updates_track_and_is_saved() {
    let dir = tempdir().unwrap();
    let store = LibraryStore::new(dir.path().join("library.json"));
    let lib = Library::new(vec![playlist(
        "Real",
        vec![Track::new("R", "B", 180, TrackSource::Audio("/a.mp3".into()))],
    )]);
    let mut rig = Rig::with_state(lib, TransportState::new("Real"), Some(store.clone()));
    rig.transport.toggle_play(Instant::now());
    let session = rig.session();
    rig.deliver(AdapterEvent::Duration { session, secs: 213 });

    assert_eq!(rig.transport.snapshot().duration_secs, 213);
    assert!(rig.transport.is_playing());
    let loaded = store.load().unwrap().unwrap();
    let tracks = loaded.library.get_playlist("Real").unwrap();
    assert_eq!(tracks[0].duration_secs, 213);
}

#[test]
fn navigation_persists_position() {
    let dir = tempdir().unwrap();
    let store = LibraryStore::new(dir.path().join("library.json"));
    let mut rig = Rig::with_state(synth_pair(), TransportState::new("Mix"), Some(store.clone()));
    rig.transport.next(Instant::now());
    let loaded = store.load().unwrap().unwrap();
    assert_eq!(loaded.active_playlist, "Mix");
    assert_eq!(loaded.active_track, 1);
}

#[test]
fn new_falls_back_to_first_playlist_and_clamps() {
    let mut state = TransportState::new("Gone");
    state.active_track = 9;
    state.playing = true;
    let rig = Rig::with_state(synth_pair(), state, None);
    assert_eq!(rig.transport.state().active_playlist, "Mix");
    assert_eq!(rig.index(), 0);
    assert!(!rig.transport.is_playing());

    let mut state = TransportState::new("Mix");
    state.active_track = 9;
    let rig = Rig::with_state(synth_pair(), state, None);
    assert_eq!(rig.index(), 1);
}

#[test]
fn add_playlist_selects_it() {
    let mut rig = Rig::new(synth_pair());
    let now = Instant::now();
    rig.transport.add_playlist("  Chill ", now).unwrap();
    assert_eq!(rig.transport.state().active_playlist, "Chill");
    assert_eq!(
        rig.transport.status().map(|s| s.text.as_str()),
        Some("Added playlist: Chill")
    );

    let err = rig.transport.add_playlist("mix", now).unwrap_err();
    assert_eq!(err, LibraryError::DuplicatePlaylist);
    assert_eq!(
        rig.transport.status().map(|s| s.text.as_str()),
        Some("Playlist already exists.")
    );
}

#[test]
fn first_track_in_active_playlist_becomes_current() {
    let lib = Library::new(vec![playlist("Empty", vec![])]);
    let mut rig = Rig::new(lib);
    let entry = TrackEntry::parse("Song | Singer | 120").unwrap();
    rig.transport.add_track("Empty", &entry).unwrap();
    assert_eq!((rig.index(), rig.elapsed()), (0, 0));
    assert_eq!(
        rig.transport.status().map(|s| s.text.as_str()),
        Some("Added \"Song\" to Empty with synth sound")
    );
    let now = rig.transport.snapshot();
    assert_eq!((now.track_position, now.total_tracks), (1, 1));
}

#[test]
fn video_link_entry_plays_through_video_backend() {
    let mut rig = Rig::new(synth_pair());
    let entry = TrackEntry::parse("Clip | Chan | | https://youtu.be/dQw4w9WgXcQ").unwrap();
    rig.transport.add_track("Mix", &entry).unwrap();
    let track = &rig.transport.library().get_playlist("Mix").unwrap()[2];
    assert_eq!(track.source, TrackSource::Video("dQw4w9WgXcQ".into()));
    assert_eq!(track.duration_secs, 180);
    assert!(
        rig.transport
            .status()
            .unwrap()
            .text
            .ends_with("with YouTube audio")
    );
}

#[test]
fn file_entry_plays_through_audio_backend() {
    let file = NamedTempFile::new().unwrap();
    let path = file.path().to_string_lossy().into_owned();
    let mut rig = Rig::new(synth_pair());
    let entry = TrackEntry::parse(&format!("Local | Disk | 200 | {path}")).unwrap();
    rig.transport.add_track("Mix", &entry).unwrap();
    let track = &rig.transport.library().get_playlist("Mix").unwrap()[2];
    assert_eq!(track.source, TrackSource::Audio(path));
    assert_eq!(track.duration_secs, 200);
}

#[test]
fn invalid_entry_sets_error_status() {
    let mut rig = Rig::new(synth_pair());
    let entry = TrackEntry::parse("Short | Thing | 5").unwrap();
    assert_eq!(
        rig.transport.add_track("Mix", &entry),
        Err(LibraryError::InvalidDuration)
    );
    let status = rig.transport.status().unwrap();
    assert!(status.is_error);
    assert_eq!(status.text, "Duration must be between 10 and 900 seconds.");
    assert_eq!(rig.transport.library().get_playlist("Mix").unwrap().len(), 2);
}

#[test]
fn state_transitions_are_noops_on_empty_playlists() {
    let mut state = TransportState::new("X");
    state.elapsed_secs = 5;
    assert!(!state.advance(0));
    assert!(!state.retreat(0));
    assert_eq!(state.elapsed_secs, 5);
}

proptest! {
    #[test]
    fn next_then_prev_is_identity(len in 1usize..10, start in 0usize..10, playing in any::<bool>()) {
        let start = start % len;
        let mut state = TransportState::new("P");
        state.active_track = start;
        let mut rig = Rig::with_state(Library::new(vec![numbered("P", len)]), state, None);
        let now = Instant::now();
        if playing {
            rig.transport.toggle_play(now);
        }
        rig.transport.next(now);
        rig.transport.prev(now);
        prop_assert_eq!(rig.index(), start);
        prop_assert_eq!(rig.elapsed(), 0);
        prop_assert_eq!(rig.transport.is_playing(), playing);
    }

    #[test]
    fn retreat_undoes_advance(len in 1usize..50, start in 0usize..50) {
        let mut state = TransportState::new("P");
        state.active_track = start % len;
        state.advance(len);
        prop_assert!(state.active_track < len);
        state.retreat(len);
        prop_assert_eq!(state.active_track, start % len);
    }
}
