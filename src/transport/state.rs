/// Position of the transport within the library.
///
/// `active_track` is always a valid index into the active playlist, or 0 when
/// that playlist is empty. Transitions here are pure; the controller pairs
/// them with adapter side effects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportState {
    pub active_playlist: String,
    pub active_track: usize,
    pub elapsed_secs: u64,
    pub playing: bool,
}

impl TransportState {
    pub fn new(active_playlist: impl Into<String>) -> Self {
        Self {
            active_playlist: active_playlist.into(),
            ..Self::default()
        }
    }

    /// Move to the following track, wrapping. No-op on an empty playlist.
    pub fn advance(&mut self, len: usize) -> bool {
        if len == 0 {
            return false;
        }
        self.active_track = (self.active_track + 1) % len;
        self.elapsed_secs = 0;
        true
    }

    /// Move to the previous track, wrapping. No-op on an empty playlist.
    pub fn retreat(&mut self, len: usize) -> bool {
        if len == 0 {
            return false;
        }
        self.active_track = (self.active_track + len - 1) % len;
        self.elapsed_secs = 0;
        true
    }

    pub fn switch_playlist(&mut self, name: impl Into<String>) {
        self.active_playlist = name.into();
        self.active_track = 0;
        self.elapsed_secs = 0;
    }

    /// Pull `active_track` back inside a playlist of `len` tracks.
    pub fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.active_track = 0;
        } else if self.active_track >= len {
            self.active_track = len - 1;
        }
    }
}
