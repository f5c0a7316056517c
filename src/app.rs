//! Application module: the model the TUI and runtime share.
//!
//! `App` wraps the transport with what only the screen cares about: the
//! open prompt, its input buffer and the lyrics panel toggle.

mod model;

pub use model::*;
