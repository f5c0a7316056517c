//! Application model types: `App` and `Prompt`.

use std::time::Instant;

use crate::library::TrackEntry;
use crate::lyrics::{self, LyricsView};
use crate::transport::{NowPlaying, Transport};

/// The one-line form open under the screen, if any.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Prompt {
    #[default]
    Closed,
    AddPlaylist,
    AddSong,
}

impl Prompt {
    pub fn label(self) -> &'static str {
        match self {
            Self::Closed => "",
            Self::AddPlaylist => "New playlist",
            Self::AddSong => "Add song (title | artist | duration | url-or-path | lyrics)",
        }
    }
}

/// The main application model.
pub struct App {
    pub transport: Transport,
    pub prompt: Prompt,
    pub input: String,
    pub show_lyrics: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(transport: Transport, show_lyrics: bool) -> Self {
        Self {
            transport,
            prompt: Prompt::Closed,
            input: String::new(),
            show_lyrics,
            should_quit: false,
        }
    }

    pub fn prompt_open(&self) -> bool {
        self.prompt != Prompt::Closed
    }

    /// Open `prompt` with an empty input line.
    pub fn open_prompt(&mut self, prompt: Prompt) {
        self.prompt = prompt;
        self.input.clear();
    }

    pub fn cancel_prompt(&mut self) {
        self.prompt = Prompt::Closed;
        self.input.clear();
    }

    pub fn push_input_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn pop_input_char(&mut self) {
        self.input.pop();
    }

    /// Submit the open prompt. It closes on success; on a validation error it
    /// stays open with the input kept so it can be fixed.
    pub fn submit_prompt(&mut self, now: Instant) {
        let ok = match self.prompt {
            Prompt::Closed => return,
            Prompt::AddPlaylist => self.transport.add_playlist(&self.input, now).is_ok(),
            Prompt::AddSong => match TrackEntry::parse(&self.input) {
                Ok(entry) => {
                    let playlist = self.transport.state().active_playlist.clone();
                    self.transport.add_track(&playlist, &entry).is_ok()
                }
                Err(e) => {
                    self.transport.set_error(e.to_string());
                    false
                }
            },
        };
        if ok {
            self.cancel_prompt();
        }
    }

    pub fn toggle_lyrics(&mut self) {
        self.show_lyrics = !self.show_lyrics;
    }

    pub fn now_playing(&self) -> NowPlaying {
        self.transport.snapshot()
    }

    /// Lyrics panel contents for `now`.
    pub fn lyrics_view(now: &NowPlaying) -> LyricsView {
        lyrics::view(now.lyrics.as_deref(), now.has_track(), now.elapsed_secs)
    }
}
