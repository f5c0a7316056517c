//! The add-song form: parsing the prompt line and turning it into a `Track`.

use crate::error::LibraryError;

use super::links::{extract_video_id, is_remote_source, normalize_audio_url};
use super::model::{DEFAULT_DURATION_SECS, Track, TrackSource};

const MIN_TYPED_SECS: i64 = 10;
const MAX_TYPED_SECS: i64 = 900;

/// Raw fields of a song the user wants to add.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackEntry {
    pub title: String,
    pub artist: String,
    /// Whatever was typed in the duration field, if it parsed as an integer.
    pub duration: Option<i64>,
    /// A shareable video link, a direct audio URL or a local file path.
    pub link: Option<String>,
    pub lyrics: Option<String>,
}

impl TrackEntry {
    /// Parse `title | artist | duration | url-or-path | lyrics`.
    ///
    /// Trailing fields may be omitted. A literal `\n` in the lyrics field
    /// becomes a line break.
    pub fn parse(line: &str) -> Result<Self, LibraryError> {
        let mut fields = line.splitn(5, '|').map(str::trim);
        let title = fields.next().unwrap_or_default().to_string();
        let Some(artist) = fields.next() else {
            return Err(LibraryError::MalformedEntry);
        };
        let duration = fields.next().and_then(|d| d.parse::<i64>().ok());
        let link = fields
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let lyrics = fields
            .next()
            .filter(|s| !s.is_empty())
            .map(|s| s.replace("\\n", "\n"));

        Ok(Self {
            title,
            artist: artist.to_string(),
            duration,
            link,
            lyrics,
        })
    }

    fn typed_duration(&self) -> Option<u32> {
        self.duration
            .filter(|d| (MIN_TYPED_SECS..=MAX_TYPED_SECS).contains(d))
            .map(|d| d as u32)
    }
}

/// Validate an entry and classify its source.
///
/// Video links keep the typed duration or fall back to the default; direct
/// audio asks `probe` for the real length first. Plain entries become synth
/// tracks and must carry a valid typed duration.
pub fn build_track(
    entry: &TrackEntry,
    probe: impl FnOnce(&str) -> Option<u32>,
) -> Result<Track, LibraryError> {
    let title = entry.title.trim();
    let artist = entry.artist.trim();
    if title.is_empty() || artist.is_empty() {
        return Err(LibraryError::MissingTitleOrArtist);
    }

    let link = entry.link.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let typed = entry.typed_duration();

    let (source, duration) = match link {
        None => (TrackSource::Synth, typed.ok_or(LibraryError::InvalidDuration)?),
        Some(link) => match extract_video_id(link) {
            Some(id) => (
                TrackSource::Video(id),
                typed.unwrap_or(DEFAULT_DURATION_SECS),
            ),
            None => {
                let src = if is_remote_source(link) {
                    normalize_audio_url(link)
                } else {
                    link.to_string()
                };
                let duration = probe(&src)
                    .filter(|d| *d > 0)
                    .or(typed)
                    .ok_or(LibraryError::UnknownAudioLength)?;
                (TrackSource::Audio(src), duration)
            }
        },
    };

    Ok(Track::new(title, artist, duration, source).with_lyrics(entry.lyrics.clone()))
}
