//! Generated tunes for tracks that have no real audio.
//!
//! A motif is picked from a small fixed table by hashing the track identity,
//! so a given title/artist/duration always plays the same tune.

/// Oscillator shape used for every note of a motif.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

#[derive(Debug, PartialEq)]
pub struct Motif {
    pub waveform: Waveform,
    pub bpm: u32,
    /// Note frequencies in Hz; `None` is a rest.
    pub notes: &'static [Option<f32>],
}

impl Motif {
    /// Beat length in whole milliseconds, as used for the note schedule.
    pub fn beat_ms(&self) -> u64 {
        (60_000.0 / self.bpm.max(1) as f64).round() as u64
    }

    /// Index of the note that should sound `elapsed_secs` into the track.
    pub fn note_index_at(&self, elapsed_secs: u64) -> usize {
        if self.notes.is_empty() {
            return 0;
        }
        let beat_secs = self.beat_ms() as f64 / 1000.0;
        let beats = (elapsed_secs as f64 / beat_secs).floor() as usize;
        beats % self.notes.len()
    }
}

pub static MOTIFS: [Motif; 4] = [
    Motif {
        waveform: Waveform::Square,
        bpm: 110,
        notes: &[
            Some(261.63),
            None,
            Some(329.63),
            Some(392.0),
            Some(329.63),
            Some(293.66),
            Some(261.63),
            None,
        ],
    },
    Motif {
        waveform: Waveform::Triangle,
        bpm: 96,
        notes: &[
            Some(220.0),
            Some(246.94),
            Some(261.63),
            Some(293.66),
            Some(261.63),
            Some(246.94),
            Some(220.0),
            None,
        ],
    },
    Motif {
        waveform: Waveform::Sawtooth,
        bpm: 124,
        notes: &[
            Some(329.63),
            Some(349.23),
            Some(392.0),
            None,
            Some(392.0),
            Some(349.23),
            Some(329.63),
            Some(293.66),
        ],
    },
    Motif {
        waveform: Waveform::Square,
        bpm: 132,
        notes: &[
            Some(392.0),
            None,
            Some(392.0),
            Some(440.0),
            Some(392.0),
            Some(329.63),
            Some(293.66),
            None,
        ],
    },
];

/// 32-bit `h * 31 + unit` string hash over UTF-16 code units.
fn identity_hash(key: &str) -> u32 {
    key.encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as u32))
}

/// Pick the motif for a track identity.
pub fn motif_for(title: &str, artist: &str, duration_secs: u32) -> &'static Motif {
    let key = format!("{title}|{artist}|{duration_secs}");
    &MOTIFS[identity_hash(&key) as usize % MOTIFS.len()]
}
