use super::*;

#[derive(Clone, Copy, PartialEq)]
enum Peer {
    Plays,
    EndsWithError,
    RefusesLoads,
}

/// Answers IPC requests on `stream` the way an mpv in `mode` would.
fn fake_mpv(stream: UnixStream, mode: Peer) {
    thread::spawn(move || {
        let mut writer = stream.try_clone().unwrap();
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else { return };
            let msg: Value = serde_json::from_str(&line).unwrap();
            let id = msg["request_id"].clone();
            let ok = |data: Value| json!({ "request_id": id, "error": "success", "data": data });
            let command = msg["command"][0].as_str().unwrap_or_default();
            let property = msg["command"][1].as_str().unwrap_or_default();

            let mut out = Vec::new();
            let reply = match (command, property) {
                ("loadfile", _) if mode == Peer::RefusesLoads => {
                    json!({ "request_id": id, "error": "error running command" })
                }
                ("loadfile", _) if mode == Peer::EndsWithError => {
                    out.push(json!({ "event": "end-file", "reason": "error" }));
                    ok(Value::Null)
                }
                ("get_property", "time-pos") if mode == Peer::Plays => ok(json!(3.5)),
                ("get_property", "time-pos") => {
                    json!({ "request_id": id, "error": "property unavailable" })
                }
                ("get_property", "duration") => ok(json!(200.0)),
                ("get_property", "idle-active") => ok(json!(mode != Peer::Plays)),
                _ => ok(Value::Null),
            };
            out.push(reply);
            for v in out {
                if writeln!(writer, "{v}").is_err() {
                    return;
                }
            }
        }
    });
}

/// A player whose worker talks to `stream`, with `sleep` standing in for mpv.
fn player_over(stream: UnixStream, io_timeout: Duration) -> (MpvPlayer, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let child = Command::new("sleep").arg("30").spawn().unwrap();
    let link = Link::connected(child, stream, dir.path().join("mpv.sock"), io_timeout).unwrap();
    let player = MpvPlayer::attach(
        link,
        Duration::from_millis(20),
        "https://example.test/watch?v=".into(),
    )
    .unwrap();
    (player, dir)
}

fn wait_for(
    player: &mut MpvPlayer,
    done: impl Fn(&Result<PlayerStatus, PlaybackError>) -> bool,
) -> Result<PlayerStatus, PlaybackError> {
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let got = player.status();
        if done(&got) {
            return got;
        }
        assert!(Instant::now() < deadline, "gave up waiting, last: {got:?}");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn status_is_empty_until_a_load_then_follows_the_player() {
    let (ours, theirs) = UnixStream::pair().unwrap();
    fake_mpv(theirs, Peer::Plays);
    let (mut player, _dir) = player_over(ours, IO_TIMEOUT);

    thread::sleep(Duration::from_millis(60));
    let before = player.status().unwrap();
    assert_eq!(before.position, None);
    assert!(!before.failed);

    player.load("abc123", 12).unwrap();
    let status = wait_for(&mut player, |s| {
        s.as_ref().is_ok_and(|s| s.position.is_some())
    })
    .unwrap();
    assert_eq!(status.position, Some(3.5));
    assert_eq!(status.duration, Some(200.0));
    assert!(!status.idle);
    assert!(!status.failed);
}

#[test]
fn end_file_error_marks_the_video_failed() {
    let (ours, theirs) = UnixStream::pair().unwrap();
    fake_mpv(theirs, Peer::EndsWithError);
    let (mut player, _dir) = player_over(ours, IO_TIMEOUT);

    player.load("missing", 0).unwrap();
    let status = wait_for(&mut player, |s| s.as_ref().is_ok_and(|s| s.failed)).unwrap();
    assert!(status.idle);
    assert_eq!(status.position, None);
}

#[test]
fn refused_load_is_a_failed_video_not_a_broken_link() {
    let (ours, theirs) = UnixStream::pair().unwrap();
    fake_mpv(theirs, Peer::RefusesLoads);
    let (mut player, _dir) = player_over(ours, IO_TIMEOUT);

    player.load("nope", 0).unwrap();
    wait_for(&mut player, |s| s.as_ref().is_ok_and(|s| s.failed)).unwrap();
    // The link still answers afterwards.
    player.pause();
    thread::sleep(Duration::from_millis(60));
    assert!(player.status().is_ok());
}

#[test]
fn silent_player_breaks_the_link_and_drop_does_not_wait_on_it() {
    let (ours, theirs) = UnixStream::pair().unwrap();
    let (mut player, _dir) = player_over(ours, Duration::from_millis(100));

    player.load("abc123", 0).unwrap();
    wait_for(&mut player, |s| s.is_err()).unwrap_err();
    assert!(player.status().is_err());

    let started = Instant::now();
    drop(player);
    assert!(started.elapsed() < Duration::from_millis(500));
    drop(theirs);
}

#[test]
fn commands_after_the_worker_exits_are_errors() {
    let (ours, theirs) = UnixStream::pair().unwrap();
    drop(theirs);
    let (mut player, _dir) = player_over(ours, IO_TIMEOUT);

    player.load("abc123", 0).unwrap();
    wait_for(&mut player, |s| s.is_err()).unwrap_err();
    thread::sleep(Duration::from_millis(20));
    assert!(player.load("again", 0).is_err());
    player.pause();
}
