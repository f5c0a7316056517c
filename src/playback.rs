//! Playback backends behind one start/stop/poll contract.
//!
//! Each adapter reports progress through an `AdapterEvent` channel instead
//! of touching transport state. Events carry the `Session` of the start that
//! produced them so the transport can discard late arrivals.

mod native;
mod oscillator;
mod schedule;
mod synth;
mod types;
mod video;

#[cfg(unix)]
mod mpv;

pub use native::{AudioAdapter, MediaData, MediaElement, RodioElement};
pub use oscillator::Tone;
pub use schedule::Interval;
pub use synth::{RodioTones, SynthAdapter, ToneOutput};
pub use types::*;
pub use video::{Connector, EmbeddedPlayer, PlayerStatus, VideoAdapter};

#[cfg(unix)]
pub use mpv::MpvPlayer;
