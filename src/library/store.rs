//! Persistence of the library and the last active position to a JSON file.
//!
//! Loading is tolerant: malformed tracks and playlists are dropped, and only a
//! file with no usable playlist at all is treated as corrupt.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::StoreError;

use super::links::is_ephemeral_source;
use super::model::{DEFAULT_DURATION_SECS, Library, Playlist, Track, TrackSource};

/// What a successful load hands back to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedState {
    pub library: Library,
    pub active_playlist: String,
    pub active_track: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedTrack<'a> {
    title: &'a str,
    artist: &'a str,
    duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    youtube_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_src: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lyrics: Option<&'a str>,
}

impl<'a> From<&'a Track> for PersistedTrack<'a> {
    fn from(track: &'a Track) -> Self {
        Self {
            title: &track.title,
            artist: &track.artist,
            duration: track.duration_secs,
            youtube_id: track.source.video_id().map(str::trim).filter(|s| !s.is_empty()),
            audio_src: track
                .source
                .audio_src()
                .map(str::trim)
                .filter(|s| !s.is_empty() && !is_ephemeral_source(s)),
            lyrics: track.lyrics.as_deref().filter(|l| !l.trim().is_empty()),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState<'a> {
    playlists: Map<String, Value>,
    active_playlist: &'a str,
    active_track: usize,
}

/// Library state file on disk.
#[derive(Debug, Clone)]
pub struct LibraryStore {
    path: PathBuf,
}

impl LibraryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and sanitize the saved state. `Ok(None)` when nothing was saved yet.
    pub fn load(&self) -> Result<Option<LoadedState>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let value: Value = serde_json::from_str(&raw)?;
        sanitize_state(&value).map(Some)
    }

    /// Write the whole library plus the active position.
    ///
    /// The file is written next to its final location and renamed into place.
    pub fn save(
        &self,
        library: &Library,
        active_playlist: &str,
        active_track: usize,
    ) -> Result<(), StoreError> {
        let mut playlists = Map::new();
        for playlist in library.playlists() {
            let tracks: Vec<PersistedTrack<'_>> =
                playlist.tracks.iter().map(PersistedTrack::from).collect();
            playlists.insert(playlist.name.clone(), serde_json::to_value(tracks)?);
        }
        let state = PersistedState {
            playlists,
            active_playlist,
            active_track,
        };
        let json = serde_json::to_string_pretty(&state)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "library saved");
        Ok(())
    }
}

/// Leading-integer parse: `"181.7"` and `"181s"` give 181, like a lenient form field.
fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim_start();
            let (sign, digits) = match s.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, s.strip_prefix('+').unwrap_or(s)),
            };
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            digits[..end].parse::<i64>().ok().map(|n| sign * n)
        }
        _ => None,
    }
}

fn trimmed_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn sanitize_track(value: &Value) -> Option<Track> {
    let obj = value.as_object()?;
    let title = trimmed_string(obj.get("title"))?;
    let artist = trimmed_string(obj.get("artist"))?;

    let duration = obj
        .get("duration")
        .and_then(parse_int)
        .filter(|d| *d > 0)
        .and_then(|d| u32::try_from(d).ok())
        .unwrap_or(DEFAULT_DURATION_SECS);

    let video_id = trimmed_string(obj.get("youtubeId"));
    let audio_src = trimmed_string(obj.get("audioSrc")).filter(|s| !is_ephemeral_source(s));
    let source = match (video_id, audio_src) {
        (Some(id), _) => TrackSource::Video(id),
        (None, Some(src)) => TrackSource::Audio(src),
        (None, None) => TrackSource::Synth,
    };

    Some(Track::new(title, artist, duration, source).with_lyrics(trimmed_string(obj.get("lyrics"))))
}

/// Turn a parsed state document into a library, dropping anything malformed.
pub fn sanitize_state(value: &Value) -> Result<LoadedState, StoreError> {
    let root = value
        .as_object()
        .ok_or_else(|| StoreError::Corrupt("state is not an object".into()))?;
    let raw_playlists = root
        .get("playlists")
        .and_then(Value::as_object)
        .ok_or_else(|| StoreError::Corrupt("missing playlists".into()))?;

    let mut library = Library::default();
    for (raw_name, raw_tracks) in raw_playlists {
        let name = raw_name.trim();
        if name.is_empty() {
            continue;
        }
        let tracks = raw_tracks
            .as_array()
            .map(|items| items.iter().filter_map(sanitize_track).collect())
            .unwrap_or_default();
        library.upsert_playlist(Playlist {
            name: name.to_string(),
            tracks,
        });
    }

    let Some(first) = library.first_name().map(str::to_string) else {
        return Err(StoreError::Corrupt("no playlists".into()));
    };

    let active_playlist = root
        .get("activePlaylist")
        .and_then(Value::as_str)
        .filter(|name| library.contains(name))
        .map(str::to_string)
        .unwrap_or(first);

    let len = library
        .get_playlist(&active_playlist)
        .map_or(0, |tracks| tracks.len());
    let active_track = match root.get("activeTrack").and_then(parse_int) {
        Some(i) if i >= 0 && len > 0 => (i as usize).min(len - 1),
        _ => 0,
    };

    Ok(LoadedState {
        library,
        active_playlist,
        active_track,
    })
}
