//! Procedural playback: each track's motif is played as a stream of short
//! oscillator notes on a fixed beat.

use std::time::{Duration, Instant};

use rodio::{OutputStream, OutputStreamBuilder};
use tracing::{debug, warn};

use crate::config::AudioSettings;
use crate::error::PlaybackError;
use crate::library::{Motif, Waveform};

use super::oscillator::Tone;
use super::schedule::Interval;
use super::types::{SourceAdapter, SourceKind, StartRequest};

const MIN_NOTE: Duration = Duration::from_millis(80);

/// Where synthesized notes go.
pub trait ToneOutput {
    /// Acquire the output device. Called on every start; must be cheap once open.
    fn open(&mut self) -> Result<(), PlaybackError>;

    fn play_note(&mut self, freq: f32, waveform: Waveform, length: Duration);
}

/// Plays notes through the default output device, opened on first use.
pub struct RodioTones {
    stream: Option<OutputStream>,
    gain: f32,
}

impl RodioTones {
    pub fn new(gain: f32) -> Self {
        Self { stream: None, gain }
    }
}

impl ToneOutput for RodioTones {
    fn open(&mut self) -> Result<(), PlaybackError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let mut stream = OutputStreamBuilder::open_default_stream().map_err(|e| {
            warn!(error = %e, "no audio output for synth");
            PlaybackError::start("Audio output is unavailable.")
        })?;
        // rodio logs to stderr on drop, which would scribble over the TUI.
        stream.log_on_drop(false);
        self.stream = Some(stream);
        Ok(())
    }

    fn play_note(&mut self, freq: f32, waveform: Waveform, length: Duration) {
        if let Some(stream) = &self.stream {
            stream
                .mixer()
                .add(Tone::new(freq, waveform, length, self.gain));
        }
    }
}

struct SynthRun {
    motif: &'static Motif,
    identity: (String, String),
    step: usize,
    beat: Interval,
}

pub struct SynthAdapter<T: ToneOutput> {
    output: T,
    note_ratio: f32,
    run: Option<SynthRun>,
}

impl<T: ToneOutput> SynthAdapter<T> {
    pub fn new(output: T, settings: &AudioSettings) -> Self {
        Self {
            output,
            note_ratio: settings.note_length_ratio,
            run: None,
        }
    }

    #[cfg(test)]
    pub fn output(&self) -> &T {
        &self.output
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    fn note_length(&self, motif: &Motif) -> Duration {
        let beat = motif.beat_ms() as f32 / 1000.0;
        Duration::from_secs_f32(beat * self.note_ratio).max(MIN_NOTE)
    }

    /// Sound the current step, rests included, and move to the next one.
    fn play_step(&mut self) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        let motif = run.motif;
        if motif.notes.is_empty() {
            return;
        }
        let note = motif.notes[run.step % motif.notes.len()];
        run.step = (run.step + 1) % motif.notes.len();
        if let Some(freq) = note {
            let length = self.note_length(motif);
            self.output.play_note(freq, motif.waveform, length);
        }
    }
}

impl<T: ToneOutput> SourceAdapter for SynthAdapter<T> {
    fn kind(&self) -> SourceKind {
        SourceKind::Synth
    }

    fn start(&mut self, request: &StartRequest<'_>) -> Result<(), PlaybackError> {
        let track = request.track;
        let identity = (track.title.clone(), track.artist.clone());
        let already_playing = self
            .run
            .as_ref()
            .is_some_and(|run| run.identity == identity && std::ptr::eq(run.motif, track.motif));
        if already_playing {
            return Ok(());
        }

        self.output.open()?;

        let motif = track.motif;
        let beat = Duration::from_millis(motif.beat_ms());
        debug!(title = %track.title, bpm = motif.bpm, "synth start");
        self.run = Some(SynthRun {
            motif,
            identity,
            step: motif.note_index_at(request.elapsed_secs),
            beat: Interval::starting_after(request.now, beat),
        });
        self.play_step();
        Ok(())
    }

    fn stop(&mut self) {
        self.run = None;
    }

    fn poll(&mut self, now: Instant) {
        let due = match self.run.as_mut() {
            Some(run) => run.beat.poll(now),
            None => false,
        };
        if due {
            self.play_step();
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.run.as_ref().map(|run| run.beat.next_due())
    }
}
