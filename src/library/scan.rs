use std::path::Path;

use lofty::prelude::*;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::model::{Playlist, Track, TrackSource};

const UNKNOWN_ARTIST: &str = "Unknown Artist";

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

/// Read a local file's length from its tags/stream properties, in whole seconds.
pub fn probe_duration(path: &Path) -> Option<u32> {
    let tagged = lofty::read_from_path(path).ok()?;
    let secs = tagged.properties().duration().as_secs_f64().round();
    (secs >= 1.0).then_some(secs as u32)
}

fn read_track(path: &Path) -> Track {
    let mut title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string();
    let mut artist = UNKNOWN_ARTIST.to_string();
    let mut duration = 0;

    match lofty::read_from_path(path) {
        Ok(tagged) => {
            duration = tagged.properties().duration().as_secs_f64().round() as u32;

            if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
                if let Some(v) = tag.title() {
                    if !v.trim().is_empty() {
                        title = v.trim().to_string();
                    }
                }
                if let Some(v) = tag.artist() {
                    if !v.trim().is_empty() {
                        artist = v.trim().to_string();
                    }
                }
            }
        }
        Err(e) => debug!(path = %path.display(), error = %e, "no readable tags"),
    }

    Track::new(
        title,
        artist,
        duration,
        TrackSource::Audio(path.display().to_string()),
    )
}

/// Build a playlist from the audio files under `dir`, named after the directory.
///
/// Tracks are ordered by "artist - title", case-insensitively.
pub fn import_dir(dir: &Path, settings: &LibrarySettings) -> Option<Playlist> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "import path is not a directory");
        return None;
    }

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    let mut tracks: Vec<Track> = walker
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file() && is_audio_file(entry.path(), settings))
        .map(|entry| read_track(entry.path()))
        .collect();

    tracks.sort_by_key(|t| format!("{} - {}", t.artist, t.title).to_lowercase());

    let name = dir
        .canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(dir)
        .file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "Imported".to_string());

    debug!(playlist = %name, count = tracks.len(), "directory imported");
    Some(Playlist { name, tracks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn is_audio_file_matches_configured_extensions_case_insensitive() {
        let settings = LibrarySettings {
            extensions: vec![".MP3".into(), "ogg".into()],
            ..LibrarySettings::default()
        };
        assert!(is_audio_file(Path::new("/tmp/a.mp3"), &settings));
        assert!(is_audio_file(Path::new("/tmp/a.Ogg"), &settings));
        assert!(!is_audio_file(Path::new("/tmp/a.flac"), &settings));
        assert!(!is_audio_file(Path::new("/tmp/a"), &settings));
    }

    #[test]
    fn import_dir_filters_non_audio_and_names_playlist_after_dir() {
        let root = tempdir().unwrap();
        let dir = root.path().join("Mixtape");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("b.MP3"), b"not a real mp3").unwrap();
        fs::write(dir.join("A.ogg"), b"not a real ogg").unwrap();
        fs::write(dir.join("c.txt"), b"ignore me").unwrap();

        let playlist = import_dir(&dir, &LibrarySettings::default()).unwrap();
        assert_eq!(playlist.name, "Mixtape");
        assert_eq!(playlist.tracks.len(), 2);
        assert_eq!(playlist.tracks[0].title, "A");
        assert_eq!(playlist.tracks[1].title, "b");
        for t in &playlist.tracks {
            assert_eq!(t.artist, UNKNOWN_ARTIST);
            assert_eq!(t.duration_secs, 180);
            assert!(matches!(t.source, TrackSource::Audio(_)));
        }
    }

    #[test]
    fn import_dir_rejects_files() {
        let root = tempdir().unwrap();
        let file = root.path().join("song.mp3");
        fs::write(&file, b"x").unwrap();
        assert!(import_dir(&file, &LibrarySettings::default()).is_none());
    }

    #[test]
    fn probe_duration_is_none_for_garbage() {
        let root = tempdir().unwrap();
        let file = root.path().join("song.mp3");
        fs::write(&file, b"definitely not audio").unwrap();
        assert_eq!(probe_duration(&file), None);
    }
}
