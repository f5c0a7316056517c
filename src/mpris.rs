//! MPRIS bridge so desktop media keys can drive the player.
//!
//! The D-Bus service runs on its own thread. Method calls become
//! `ControlCmd`s for the event loop; properties are answered from the last
//! `NowPlaying` pushed through `MprisHandle::update`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc::Sender};
use std::time::Duration;

use async_io::{Timer, block_on};
use tracing::{info, warn};
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedValue, Value};

use crate::transport::NowPlaying;

const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const BUS_NAME: &str = "org.mpris.MediaPlayer2.clickwheel";

const MICROS: i64 = 1_000_000;

/// What the bus asks the event loop to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Prev,
}

/// Last snapshot seen; `None` while the active playlist is empty.
type Shared = Arc<Mutex<Option<NowPlaying>>>;

pub struct MprisHandle {
    current: Shared,
}

impl MprisHandle {
    pub fn update(&self, now: &NowPlaying) {
        if let Ok(mut current) = self.current.lock() {
            *current = now.has_track().then(|| now.clone());
        }
    }
}

fn status_of(current: Option<&NowPlaying>) -> &'static str {
    match current {
        None => "Stopped",
        Some(now) if now.playing => "Playing",
        Some(_) => "Paused",
    }
}

fn owned(value: Value<'_>) -> Option<OwnedValue> {
    OwnedValue::try_from(value).ok()
}

/// `xesam`/`mpris` metadata for a track. The playlist doubles as the album.
fn metadata_for(now: &NowPlaying) -> HashMap<String, OwnedValue> {
    let track_id = ObjectPath::try_from(format!("{OBJECT_PATH}/track/{}", now.track_position))
        .ok()
        .and_then(|p| owned(Value::from(p)));
    let entries = [
        ("mpris:trackid", track_id),
        ("xesam:title", owned(Value::from(now.title.as_str()))),
        ("xesam:artist", owned(Value::from(vec![now.artist.as_str()]))),
        ("xesam:album", owned(Value::from(now.playlist.as_str()))),
        (
            "mpris:length",
            owned(Value::from(i64::from(now.duration_secs) * MICROS)),
        ),
    ];
    entries
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k.to_string(), v)))
        .collect()
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {}

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "clickwheel"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".into(), "https".into()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    current: Shared,
}

impl PlayerIface {
    fn send(&self, cmd: ControlCmd) {
        let _ = self.tx.send(cmd);
    }

    fn with_current<R>(&self, f: impl FnOnce(Option<&NowPlaying>) -> R) -> R {
        match self.current.lock() {
            Ok(current) => f(current.as_ref()),
            Err(_) => f(None),
        }
    }

    fn has_track(&self) -> bool {
        self.with_current(|c| c.is_some())
    }
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        self.send(ControlCmd::Next);
    }

    fn previous(&self) {
        self.send(ControlCmd::Prev);
    }

    fn play(&self) {
        self.send(ControlCmd::Play);
    }

    fn pause(&self) {
        self.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        self.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        self.send(ControlCmd::Stop);
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        self.with_current(status_of)
    }

    #[zbus(property)]
    fn position(&self) -> i64 {
        self.with_current(|c| c.map_or(0, |now| now.elapsed_secs as i64 * MICROS))
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        self.has_track()
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        self.has_track()
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        self.has_track()
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        self.has_track()
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        self.with_current(|c| c.map(metadata_for).unwrap_or_default())
    }
}

async fn serve(tx: Sender<ControlCmd>, current: Shared) -> zbus::Result<Connection> {
    let connection = Connection::session().await?;
    connection.request_name(BUS_NAME).await?;
    let server = connection.object_server();
    server.at(OBJECT_PATH, RootIface { tx: tx.clone() }).await?;
    server.at(OBJECT_PATH, PlayerIface { tx, current }).await?;
    Ok(connection)
}

/// Start the D-Bus service on a background thread. Failures are logged and
/// leave the player running without media-key support.
pub fn spawn_mpris(tx: Sender<ControlCmd>) -> MprisHandle {
    let current: Shared = Arc::new(Mutex::new(None));

    let for_thread = Arc::clone(&current);
    std::thread::spawn(move || {
        block_on(async move {
            let _connection = match serve(tx, for_thread).await {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "MPRIS unavailable");
                    return;
                }
            };
            info!(name = BUS_NAME, "MPRIS service registered");

            // The connection serves requests for as long as it is alive.
            loop {
                Timer::after(Duration::from_secs(3600)).await;
            }
        });
    });

    MprisHandle { current }
}
