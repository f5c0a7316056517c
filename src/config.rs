//! Configuration loader and schema types.
//!
//! Settings are layered: struct defaults, then an optional TOML file, then
//! `CLICKWHEEL__` environment variables.

mod load;
mod schema;

pub use load::{default_state_path, resolve_state_path};
pub use schema::*;

#[cfg(test)]
mod tests;
