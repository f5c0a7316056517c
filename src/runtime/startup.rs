use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::Sender;

use tracing::{info, warn};

use crate::config::{self, Settings};
use crate::library::{Library, LibraryStore, LoadedState, import_dir, seeded_library};
use crate::playback::{
    AdapterEvent, AudioAdapter, RodioElement, RodioTones, SynthAdapter, VideoAdapter,
};
use crate::transport::{Adapters, TransportState};

#[cfg(unix)]
use crate::playback::MpvPlayer;

/// The saved library, or the seeded one when nothing usable was saved.
pub fn load_library(store: Option<&LibraryStore>) -> (Library, TransportState) {
    let loaded = match store.map(LibraryStore::load) {
        Some(Ok(Some(state))) => Some(state),
        Some(Ok(None)) | None => None,
        Some(Err(e)) => {
            warn!(error = %e, "saved library unusable, starting from defaults");
            None
        }
    };

    match loaded {
        Some(LoadedState {
            library,
            active_playlist,
            active_track,
        }) => {
            info!(playlists = library.playlists().len(), "library loaded");
            let mut state = TransportState::new(active_playlist);
            state.active_track = active_track;
            (library, state)
        }
        None => {
            let library = seeded_library();
            let first = library.first_name().unwrap_or_default().to_string();
            (library, TransportState::new(first))
        }
    }
}

/// Add the audio files under `dir` as a playlist named after it, and make it
/// the active one. Importing into an existing playlist only adds files it
/// doesn't already have.
pub fn import_into(
    library: &mut Library,
    state: &mut TransportState,
    dir: &Path,
    settings: &Settings,
) {
    let Some(playlist) = import_dir(dir, &settings.library) else {
        return;
    };
    info!(playlist = %playlist.name, tracks = playlist.tracks.len(), "directory imported");
    let name = library.merge_playlist(playlist);
    state.switch_playlist(name);
}

pub fn store_for(settings: &Settings) -> Option<LibraryStore> {
    config::resolve_state_path(&settings.library).map(LibraryStore::new)
}

/// One adapter per backend, all reporting on `events`.
pub fn build_adapters(settings: &Settings, events: Sender<AdapterEvent>) -> Adapters {
    let synth = SynthAdapter::new(RodioTones::new(settings.audio.master_gain), &settings.audio);
    let audio = AudioAdapter::new(RodioElement::new(), events.clone(), &settings.audio);

    #[cfg(unix)]
    let video = {
        let video_settings = settings.video.clone();
        VideoAdapter::<MpvPlayer>::new(
            events,
            &settings.video,
            Arc::new(move || MpvPlayer::spawn(&video_settings)),
        )
    };
    #[cfg(not(unix))]
    let video = VideoAdapter::<unsupported::NoPlayer>::new(
        events,
        &settings.video,
        Arc::new(|| {
            Err(crate::error::PlaybackError::Unsupported(
                "No embedded player on this platform.".to_string(),
            ))
        }),
    );

    Adapters::new(Box::new(synth), Box::new(audio), Box::new(video))
}

#[cfg(not(unix))]
mod unsupported {
    use crate::error::PlaybackError;
    use crate::playback::{EmbeddedPlayer, PlayerStatus};

    /// Stands in for `mpv` where its IPC socket isn't available. Never built.
    pub struct NoPlayer;

    impl EmbeddedPlayer for NoPlayer {
        fn load(&mut self, _video_id: &str, _start_secs: u64) -> Result<(), PlaybackError> {
            Err(PlaybackError::Unsupported("No embedded player on this platform.".into()))
        }

        fn pause(&mut self) {}

        fn status(&mut self) -> Result<PlayerStatus, PlaybackError> {
            Ok(PlayerStatus {
                idle: true,
                ..PlayerStatus::default()
            })
        }
    }
}
