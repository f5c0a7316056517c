//! A single enveloped note as a `rodio` source.

use std::f32::consts::TAU;
use std::time::Duration;

use rodio::Source;

use crate::library::Waveform;

const SAMPLE_RATE: u32 = 44_100;
const ATTACK: Duration = Duration::from_millis(20);
const PEAK: f32 = 0.2;
const FLOOR: f32 = 0.0001;

/// One note: a 20 ms linear attack to the peak, then an exponential decay
/// to near silence by the end of `length`.
#[derive(Debug, Clone)]
pub struct Tone {
    freq: f32,
    waveform: Waveform,
    gain: f32,
    total: usize,
    attack: usize,
    index: usize,
}

impl Tone {
    pub fn new(freq: f32, waveform: Waveform, length: Duration, gain: f32) -> Self {
        let total = samples_in(length).max(1);
        let attack = samples_in(ATTACK).min(total);
        Self {
            freq,
            waveform,
            gain,
            total,
            attack,
            index: 0,
        }
    }

    /// Envelope level at sample `n`.
    fn envelope(&self, n: usize) -> f32 {
        if n < self.attack {
            let t = n as f32 / self.attack as f32;
            return FLOOR + (PEAK - FLOOR) * t;
        }
        let decay = (self.total - self.attack).max(1) as f32;
        let t = (n - self.attack) as f32 / decay;
        PEAK * (FLOOR / PEAK).powf(t)
    }
}

fn samples_in(d: Duration) -> usize {
    (d.as_secs_f64() * f64::from(SAMPLE_RATE)).round() as usize
}

/// One period of `waveform`, `phase` in [0, 1).
pub(crate) fn wave(waveform: Waveform, phase: f32) -> f32 {
    match waveform {
        Waveform::Sine => (phase * TAU).sin(),
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        Waveform::Sawtooth => 2.0 * phase - 1.0,
    }
}

impl Iterator for Tone {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.index >= self.total {
            return None;
        }
        let n = self.index;
        self.index += 1;
        let t = n as f32 / SAMPLE_RATE as f32;
        let phase = (self.freq * t).fract();
        Some(wave(self.waveform, phase) * self.envelope(n) * self.gain)
    }
}

impl Source for Tone {
    fn current_span_len(&self) -> Option<usize> {
        Some(self.total - self.index)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f64(
            self.total as f64 / f64::from(SAMPLE_RATE),
        ))
    }
}
