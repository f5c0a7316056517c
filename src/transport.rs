//! Transport: the one "now playing" state shared by every backend.

mod controller;
mod state;

pub use controller::{Adapters, NowPlaying, StatusLine, Transport};
pub use state::TransportState;

#[cfg(test)]
mod tests;
