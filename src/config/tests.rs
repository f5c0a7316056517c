use super::load::{default_config_path, resolve_config_path};
use super::schema::*;
use super::{default_state_path, resolve_state_path};
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_explicit_override() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("CLICKWHEEL_CONFIG_PATH", "/tmp/clickwheel-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/clickwheel-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/xdg-config-home")
            .join("clickwheel")
            .join("config.toml")
    );
}

#[test]
fn default_state_path_falls_back_to_home_local_share() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_DATA_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    assert_eq!(
        default_state_path().unwrap(),
        std::path::PathBuf::from("/tmp/home-dir/.local/share/clickwheel/library.json")
    );
}

#[test]
fn configured_state_path_wins_over_xdg() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_DATA_HOME", "/tmp/xdg-data");
    let settings = LibrarySettings {
        state_path: Some("/srv/clickwheel.json".into()),
        ..LibrarySettings::default()
    };
    assert_eq!(
        resolve_state_path(&settings).unwrap(),
        std::path::PathBuf::from("/srv/clickwheel.json")
    );
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[audio]
master_gain = 0.2
note_length_ratio = 0.5

[transport]
tick_ms = 250

[video]
mpv_path = "/opt/mpv/bin/mpv"
poll_ms = 750

[library]
extensions = ["ogg"]
recursive = false

[ui]
header_text = "hello"
show_lyrics = false
time_fields = ["elapsed", "remaining"]
time_separator = " | "

[mpris]
enabled = false
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("CLICKWHEEL_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("CLICKWHEEL__TRANSPORT__TICK_MS");

    let s = Settings::load().unwrap();
    assert_eq!(s.audio.master_gain, 0.2);
    assert_eq!(s.audio.note_length_ratio, 0.5);
    assert_eq!(s.audio.seek_guard_ms, 250);
    assert_eq!(s.transport.tick_ms, 250);
    assert_eq!(s.video.mpv_path, "/opt/mpv/bin/mpv");
    assert_eq!(s.video.poll_ms, 750);
    assert_eq!(s.library.extensions, vec!["ogg".to_string()]);
    assert!(!s.library.recursive);
    assert_eq!(s.ui.header_text, "hello");
    assert!(!s.ui.show_lyrics);
    assert!(matches!(s.ui.time_fields[1], TimeField::Remaining));
    assert_eq!(s.ui.time_separator, " | ");
    assert!(!s.mpris.enabled);
    assert!(s.validate().is_ok());
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[transport]
tick_ms = 1000
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("CLICKWHEEL_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("CLICKWHEEL__TRANSPORT__TICK_MS", "40");

    let s = Settings::load().unwrap();
    assert_eq!(s.transport.tick_ms, 40);
}

#[test]
fn validate_rejects_zero_intervals_and_loud_gain() {
    let mut s = Settings::default();
    assert!(s.validate().is_ok());

    s.transport.tick_ms = 0;
    assert!(s.validate().is_err());

    s = Settings::default();
    s.video.poll_ms = 0;
    assert!(s.validate().is_err());

    s = Settings::default();
    s.audio.master_gain = 1.5;
    assert!(s.validate().is_err());
}
