use std::{env, path::PathBuf};

use super::schema::{LibrarySettings, Settings};

/// Configuration loading helpers.
///
/// `Settings::load` reads an optional config file, then environment variables
/// (prefix `CLICKWHEEL__`), and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("CLICKWHEEL")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.transport.tick_ms == 0 {
            return Err("transport.tick_ms must be >= 1".to_string());
        }
        if self.video.poll_ms == 0 {
            return Err("video.poll_ms must be >= 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.audio.master_gain) {
            return Err("audio.master_gain must be within 0.0..=1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.audio.note_length_ratio) || self.audio.note_length_ratio == 0.0
        {
            return Err("audio.note_length_ratio must be within (0.0, 1.0]".to_string());
        }
        Ok(())
    }
}

/// Resolve the config path from `CLICKWHEEL_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("CLICKWHEEL_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/clickwheel/config.toml`
/// or `~/.config/clickwheel/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("clickwheel").join("config.toml"))
}

/// Library state file: the configured path, or the XDG default.
pub fn resolve_state_path(settings: &LibrarySettings) -> Option<PathBuf> {
    settings.state_path.clone().or_else(default_state_path)
}

/// `$XDG_DATA_HOME/clickwheel/library.json`, or `~/.local/share/clickwheel/library.json`.
pub fn default_state_path() -> Option<PathBuf> {
    let data_home = if let Some(xdg) = env::var_os("XDG_DATA_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("share"))
    };

    data_home.map(|d| d.join("clickwheel").join("library.json"))
}
