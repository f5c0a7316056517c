use std::path::PathBuf;

use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/clickwheel/config.toml` or `~/.config/clickwheel/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `CLICKWHEEL__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub transport: TransportSettings,
    pub video: VideoSettings,
    pub library: LibrarySettings,
    pub ui: UiSettings,
    pub mpris: MprisSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Gain applied to every synthesized note, on top of the note envelope.
    pub master_gain: f32,
    /// Fraction of a beat a synthesized note rings for.
    pub note_length_ratio: f32,
    /// Seeks into native audio stop this many milliseconds short of the end.
    pub seek_guard_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            master_gain: 0.08,
            note_length_ratio: 0.85,
            seek_guard_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Period of the elapsed-time tick (milliseconds).
    pub tick_ms: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self { tick_ms: 1000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    /// Executable used as the embedded player.
    pub mpv_path: String,
    /// How often the embedded player is asked for its position (milliseconds).
    pub poll_ms: u64,
    /// How long to wait for the player's IPC socket to appear (milliseconds).
    pub connect_timeout_ms: u64,
    /// A loaded video that is still idle after this long failed to play (milliseconds).
    pub load_timeout_ms: u64,
    /// IPC socket location; a per-process path under the temp dir when unset.
    pub socket_path: Option<PathBuf>,
    /// Prefix the video id is appended to when loading.
    pub watch_url_base: String,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            mpv_path: "mpv".to_string(),
            poll_ms: 500,
            connect_timeout_ms: 6000,
            load_timeout_ms: 15000,
            socket_path: None,
            watch_url_base: "https://www.youtube.com/watch?v=".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Where the library JSON lives; XDG data dir when unset.
    pub state_path: Option<PathBuf>,
    /// File extensions imported from a directory (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during directory import.
    pub follow_links: bool,
    /// Whether to recurse into subdirectories during import.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            state_path: None,
            extensions: vec!["mp3".into(), "flac".into(), "wav".into(), "ogg".into()],
            follow_links: true,
            recursive: true,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Text shown in the device's top bar.
    pub header_text: String,
    /// Whether the lyrics panel starts visible.
    pub show_lyrics: bool,
    /// Which time fields the screen shows, and in what order.
    ///
    /// Example: ["elapsed", "total", "remaining"]
    pub time_fields: Vec<TimeField>,
    /// Separator used to join `time_fields`.
    pub time_separator: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " clickwheel ".to_string(),
            show_lyrics: true,
            time_fields: vec![TimeField::Elapsed, TimeField::Total],
            time_separator: " / ".to_string(),
        }
    }
}

#[derive(Debug, Copy, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeField {
    Elapsed,
    Total,
    Remaining,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MprisSettings {
    /// Register on the session bus so media keys can drive the player.
    pub enabled: bool,
}

impl Default for MprisSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}
