use crate::error::LibraryError;

use super::motif::{Motif, motif_for};

/// Fallback length for tracks whose duration is unknown or invalid.
pub const DEFAULT_DURATION_SECS: u32 = 180;

/// Where a track's sound comes from. Chosen once when the track is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackSource {
    /// No real audio; the track plays its generated motif.
    Synth,
    /// A local path or a direct `http(s)` audio URL.
    Audio(String),
    /// An id on the embedded video platform.
    Video(String),
}

impl TrackSource {
    pub fn audio_src(&self) -> Option<&str> {
        match self {
            Self::Audio(src) => Some(src),
            _ => None,
        }
    }

    pub fn video_id(&self) -> Option<&str> {
        match self {
            Self::Video(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub title: String,
    pub artist: String,
    pub duration_secs: u32,
    pub source: TrackSource,
    pub lyrics: Option<String>,
    pub motif: &'static Motif,
}

impl Track {
    /// Build a track, assigning its motif from title/artist/duration.
    /// A zero duration becomes [`DEFAULT_DURATION_SECS`].
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        duration_secs: u32,
        source: TrackSource,
    ) -> Self {
        let title = title.into();
        let artist = artist.into();
        let duration_secs = if duration_secs == 0 {
            DEFAULT_DURATION_SECS
        } else {
            duration_secs
        };
        let motif = motif_for(&title, &artist, duration_secs);
        Self {
            title,
            artist,
            duration_secs,
            source,
            lyrics: None,
            motif,
        }
    }

    pub fn synth(title: impl Into<String>, artist: impl Into<String>, duration_secs: u32) -> Self {
        Self::new(title, artist, duration_secs, TrackSource::Synth)
    }

    pub fn with_lyrics(mut self, lyrics: Option<String>) -> Self {
        self.lyrics = lyrics.filter(|l| !l.trim().is_empty());
        self
    }

    /// Record a duration reported by a backend. Returns true if it changed.
    pub fn set_duration(&mut self, secs: u32) -> bool {
        if secs == 0 || secs == self.duration_secs {
            return false;
        }
        self.duration_secs = secs;
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub name: String,
    pub tracks: Vec<Track>,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: Vec::new(),
        }
    }
}

/// Ordered collection of named playlists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Library {
    playlists: Vec<Playlist>,
}

impl Library {
    pub fn new(playlists: Vec<Playlist>) -> Self {
        Self { playlists }
    }

    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.playlists.iter().map(|p| p.name.as_str())
    }

    pub fn first_name(&self) -> Option<&str> {
        self.playlists.first().map(|p| p.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.playlists.iter().position(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Tracks of the named playlist, in order.
    pub fn get_playlist(&self, name: &str) -> Option<&[Track]> {
        self.playlists
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.tracks.as_slice())
    }

    pub fn track_mut(&mut self, name: &str, index: usize) -> Option<&mut Track> {
        self.playlists
            .iter_mut()
            .find(|p| p.name == name)
            .and_then(|p| p.tracks.get_mut(index))
    }

    /// Name of the playlist after `name`, wrapping around.
    pub fn next_name(&self, name: &str) -> Option<&str> {
        if self.playlists.is_empty() {
            return None;
        }
        let next = match self.position(name) {
            Some(i) => (i + 1) % self.playlists.len(),
            None => 0,
        };
        Some(self.playlists[next].name.as_str())
    }

    /// Create an empty playlist. Names are trimmed and must be unique,
    /// compared case-insensitively. Returns the stored name.
    pub fn add_playlist(&mut self, name: &str) -> Result<String, LibraryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::EmptyPlaylistName);
        }
        let lower = name.to_lowercase();
        if self.names().any(|n| n.to_lowercase() == lower) {
            return Err(LibraryError::DuplicatePlaylist);
        }
        self.playlists.push(Playlist::new(name));
        Ok(name.to_string())
    }

    /// Append `track` to the named playlist, returning its new length.
    pub fn add_track(&mut self, playlist: &str, track: Track) -> Result<usize, LibraryError> {
        let Some(p) = self.playlists.iter_mut().find(|p| p.name == playlist) else {
            return Err(LibraryError::UnknownPlaylist);
        };
        p.tracks.push(track);
        Ok(p.tracks.len())
    }

    /// Add an imported playlist. A playlist whose name matches case-insensitively
    /// keeps its name and tracks and gains only the tracks whose source it
    /// doesn't have yet. Returns the name the tracks ended up under.
    pub fn merge_playlist(&mut self, playlist: Playlist) -> String {
        let lower = playlist.name.to_lowercase();
        let Some(existing) = self
            .playlists
            .iter_mut()
            .find(|p| p.name.to_lowercase() == lower)
        else {
            let name = playlist.name.clone();
            self.playlists.push(playlist);
            return name;
        };
        for track in playlist.tracks {
            if !existing.tracks.iter().any(|t| t.source == track.source) {
                existing.tracks.push(track);
            }
        }
        existing.name.clone()
    }

    /// Insert or replace a whole playlist, keeping its position if it exists.
    pub fn upsert_playlist(&mut self, playlist: Playlist) {
        match self.playlists.iter_mut().find(|p| p.name == playlist.name) {
            Some(existing) => *existing = playlist,
            None => self.playlists.push(playlist),
        }
    }
}
