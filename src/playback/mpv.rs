//! `mpv` driven over its JSON IPC socket, used as the embedded video player.
//!
//! The socket belongs to a worker thread. `MpvPlayer` only sends it commands
//! and drains the status snapshots it publishes, so nothing here blocks the
//! caller once the player is up.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::VideoSettings;
use crate::error::PlaybackError;

use super::schedule::Interval;
use super::video::{EmbeddedPlayer, PlayerStatus};

const IO_TIMEOUT: Duration = Duration::from_secs(2);
const CONNECT_RETRY: Duration = Duration::from_millis(100);

/// Why an IPC request didn't return data.
#[derive(Debug, Error)]
enum IpcError {
    /// The socket failed or closed; the link is unusable.
    #[error("mpv IPC: {0}")]
    Link(String),
    /// mpv answered, but refused the command.
    #[error("mpv rejected command: {0}")]
    Rejected(String),
}

impl From<std::io::Error> for IpcError {
    fn from(e: std::io::Error) -> Self {
        Self::Link(e.to_string())
    }
}

impl From<IpcError> for PlaybackError {
    fn from(e: IpcError) -> Self {
        PlaybackError::video(e.to_string())
    }
}

enum MpvCmd {
    Load { url: String, start_secs: u64 },
    Pause,
    Quit,
}

enum MpvReport {
    /// `generation` counts the loads the worker has issued so far.
    Status { generation: u64, status: PlayerStatus },
    /// The IPC link is gone; the worker has exited.
    Broken(PlaybackError),
}

/// Handle to the `mpv` worker thread.
pub struct MpvPlayer {
    commands: Sender<MpvCmd>,
    reports: Receiver<MpvReport>,
    worker: Option<JoinHandle<()>>,
    watch_url_base: String,
    generation: u64,
    latest: PlayerStatus,
}

impl MpvPlayer {
    /// Launch an idle, audio-only `mpv`, connect to its IPC socket and hand
    /// the connection to a worker thread.
    pub fn spawn(settings: &VideoSettings) -> Result<Self, PlaybackError> {
        let link = Link::open(settings)?;
        Self::attach(
            link,
            Duration::from_millis(settings.poll_ms),
            settings.watch_url_base.clone(),
        )
    }

    fn attach(
        link: Link,
        poll_every: Duration,
        watch_url_base: String,
    ) -> Result<Self, PlaybackError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (report_tx, report_rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("mpv-ipc".into())
            .spawn(move || run_worker(link, cmd_rx, report_tx, poll_every))
            .map_err(|e| PlaybackError::video(format!("mpv worker: {e}")))?;

        Ok(Self {
            commands: cmd_tx,
            reports: report_rx,
            worker: Some(worker),
            watch_url_base,
            generation: 0,
            latest: PlayerStatus::default(),
        })
    }

    fn send(&self, cmd: MpvCmd) -> Result<(), PlaybackError> {
        self.commands
            .send(cmd)
            .map_err(|_| PlaybackError::video("mpv worker exited"))
    }
}

impl EmbeddedPlayer for MpvPlayer {
    fn load(&mut self, video_id: &str, start_secs: u64) -> Result<(), PlaybackError> {
        let url = format!("{}{}", self.watch_url_base, video_id);
        debug!(%url, start_secs, "mpv loadfile");
        self.send(MpvCmd::Load { url, start_secs })?;
        // Snapshots of whatever was loaded before are stale from here on.
        self.generation += 1;
        self.latest = PlayerStatus::default();
        Ok(())
    }

    fn pause(&mut self) {
        if self.send(MpvCmd::Pause).is_err() {
            debug!("mpv pause after worker exit");
        }
    }

    fn status(&mut self) -> Result<PlayerStatus, PlaybackError> {
        loop {
            match self.reports.try_recv() {
                Ok(MpvReport::Status { generation, status }) => {
                    if generation == self.generation {
                        self.latest = status;
                    }
                }
                Ok(MpvReport::Broken(e)) => return Err(e),
                Err(TryRecvError::Empty) => return Ok(self.latest),
                Err(TryRecvError::Disconnected) => {
                    return Err(PlaybackError::video("mpv worker exited"));
                }
            }
        }
    }
}

impl Drop for MpvPlayer {
    fn drop(&mut self) {
        let _ = self.commands.send(MpvCmd::Quit);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker(
    mut link: Link,
    commands: Receiver<MpvCmd>,
    reports: Sender<MpvReport>,
    poll_every: Duration,
) {
    let mut generation = 0u64;
    let mut clock = Interval::starting_after(Instant::now(), poll_every);
    loop {
        let wait = clock.next_due().saturating_duration_since(Instant::now());
        let result = match commands.recv_timeout(wait) {
            Ok(MpvCmd::Load { url, start_secs }) => {
                generation += 1;
                link.load(&url, start_secs)
            }
            Ok(MpvCmd::Pause) => link.pause(),
            Ok(MpvCmd::Quit) | Err(RecvTimeoutError::Disconnected) => {
                link.quit();
                return;
            }
            Err(RecvTimeoutError::Timeout) => Ok(()),
        };
        let result = result.and_then(|()| {
            if generation == 0 || !clock.poll(Instant::now()) {
                return Ok(());
            }
            let status = link.status()?;
            let _ = reports.send(MpvReport::Status { generation, status });
            Ok(())
        });

        if let Err(e) = result {
            warn!(error = %e, "mpv IPC failed");
            link.abandon();
            let _ = reports.send(MpvReport::Broken(e));
            return;
        }
    }
}

/// The `mpv` process and its IPC connection. Owned by the worker.
struct Link {
    child: Child,
    reader: BufReader<UnixStream>,
    writer: UnixStream,
    socket: PathBuf,
    next_id: i64,
    /// mpv gave up on the file most recently loaded.
    load_failed: bool,
}

impl Link {
    fn open(settings: &VideoSettings) -> Result<Self, PlaybackError> {
        let socket = settings.socket_path.clone().unwrap_or_else(|| {
            std::env::temp_dir().join(format!("clickwheel-mpv-{}.sock", std::process::id()))
        });
        let _ = std::fs::remove_file(&socket);

        info!(mpv = %settings.mpv_path, socket = %socket.display(), "launching embedded player");
        let mut child = Command::new(&settings.mpv_path)
            .arg("--idle=yes")
            .arg("--no-video")
            .arg("--no-terminal")
            .arg("--ytdl=yes")
            .arg(format!("--input-ipc-server={}", socket.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    PlaybackError::Unsupported(format!("{} is not installed", settings.mpv_path))
                }
                _ => PlaybackError::video(format!("failed to launch {}: {e}", settings.mpv_path)),
            })?;

        let deadline = Instant::now() + Duration::from_millis(settings.connect_timeout_ms);
        let stream = loop {
            thread::sleep(CONNECT_RETRY);
            match UnixStream::connect(&socket) {
                Ok(stream) => break stream,
                Err(e) => {
                    if let Ok(Some(status)) = child.try_wait() {
                        return Err(PlaybackError::video(format!(
                            "mpv exited before IPC connected ({status})"
                        )));
                    }
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(PlaybackError::video(format!(
                            "timed out connecting to mpv IPC: {e}"
                        )));
                    }
                }
            }
        };

        Self::connected(child, stream, socket, IO_TIMEOUT)
    }

    fn connected(
        child: Child,
        stream: UnixStream,
        socket: PathBuf,
        io_timeout: Duration,
    ) -> Result<Self, PlaybackError> {
        let io = |e: std::io::Error| PlaybackError::video(format!("mpv IPC: {e}"));
        stream.set_read_timeout(Some(io_timeout)).map_err(io)?;
        stream.set_write_timeout(Some(io_timeout)).map_err(io)?;
        let writer = stream.try_clone().map_err(io)?;

        Ok(Self {
            child,
            reader: BufReader::new(stream),
            writer,
            socket,
            next_id: 1,
            load_failed: false,
        })
    }

    /// Send one command and wait for its reply. Events read on the way are
    /// noted; an unavailable property reads as `null`.
    fn request(&mut self, command: Value) -> Result<Value, IpcError> {
        let id = self.next_id;
        self.next_id += 1;

        let mut line = json!({ "command": command, "request_id": id }).to_string();
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;

        let mut buf = String::new();
        loop {
            buf.clear();
            if self.reader.read_line(&mut buf)? == 0 {
                return Err(IpcError::Link("connection closed".into()));
            }
            let Ok(reply) = serde_json::from_str::<Value>(&buf) else {
                continue;
            };
            if reply.get("request_id").and_then(Value::as_i64) != Some(id) {
                self.note_event(&reply);
                continue;
            }
            return match reply.get("error").and_then(Value::as_str) {
                Some("success") => Ok(reply.get("data").cloned().unwrap_or(Value::Null)),
                Some("property unavailable") => Ok(Value::Null),
                other => Err(IpcError::Rejected(other.unwrap_or("no status").to_string())),
            };
        }
    }

    fn note_event(&mut self, event: &Value) {
        let is_end = event.get("event").and_then(Value::as_str) == Some("end-file");
        if is_end && event.get("reason").and_then(Value::as_str) == Some("error") {
            debug!(?event, "mpv could not play file");
            self.load_failed = true;
        }
    }

    fn get(&mut self, property: &str) -> Result<Value, IpcError> {
        self.request(json!(["get_property", property]))
    }

    /// A rejected load is a failed video, not a broken link.
    fn load(&mut self, url: &str, start_secs: u64) -> Result<(), PlaybackError> {
        self.load_failed = false;
        let loaded = self
            .request(json!(["set_property", "start", start_secs.to_string()]))
            .and_then(|_| self.request(json!(["loadfile", url, "replace"])))
            .and_then(|_| self.request(json!(["set_property", "pause", false])));
        match loaded {
            Ok(_) => Ok(()),
            Err(IpcError::Rejected(reason)) => {
                warn!(%url, %reason, "mpv refused to load");
                self.load_failed = true;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        match self.request(json!(["set_property", "pause", true])) {
            Ok(_) => Ok(()),
            Err(IpcError::Rejected(reason)) => {
                warn!(%reason, "mpv pause refused");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn status(&mut self) -> Result<PlayerStatus, PlaybackError> {
        let position = self.get("time-pos")?.as_f64();
        let duration = self.get("duration")?.as_f64();
        let idle = self.get("idle-active")?.as_bool().unwrap_or(false);
        Ok(PlayerStatus {
            position,
            duration,
            idle,
            failed: self.load_failed,
        })
    }

    /// Ask mpv to exit, then make sure it has.
    fn quit(mut self) {
        let _ = self.request(json!(["quit"]));
        self.abandon();
    }

    /// Kill mpv without talking to it; the link is already unusable.
    fn abandon(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_file(&self.socket);
    }
}

#[cfg(test)]
mod tests;
