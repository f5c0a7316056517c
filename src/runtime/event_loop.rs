use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::debug;

use crate::app::{App, Prompt};
use crate::config;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::playback::Interval;
use crate::transport::NowPlaying;
use crate::ui;

/// Upper bound on how long the loop sleeps waiting for input.
const MAX_IDLE: Duration = Duration::from_millis(50);

/// State tracked by the runtime event loop across iterations.
pub struct EventLoopState {
    /// The elapsed-time tick.
    pub tick: Interval,
    /// Last snapshot pushed to MPRIS.
    pub last_mpris: Option<NowPlaying>,
}

impl EventLoopState {
    pub fn new(settings: &config::Settings, now: Instant) -> Self {
        Self {
            tick: Interval::starting_after(now, Duration::from_millis(settings.transport.tick_ms)),
            last_mpris: None,
        }
    }
}

/// Main terminal event loop: drives the transport and its adapters, draws,
/// and handles keys and MPRIS commands. Returns `Ok(())` when the user quits.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    mpris: Option<&MprisHandle>,
    control_rx: &mpsc::Receiver<ControlCmd>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        let now = Instant::now();
        app.transport.pump(now);
        if state.tick.poll(now) {
            app.transport.tick(now);
        }

        sync_mpris(mpris, app, state);
        terminal.draw(|f| ui::draw(f, app, &settings.ui))?;

        while let Ok(cmd) = control_rx.try_recv() {
            handle_control_cmd(cmd, app, Instant::now());
        }
        if app.should_quit {
            return Ok(());
        }

        let timeout = poll_timeout(
            Instant::now(),
            state.tick.next_due(),
            app.transport.next_deadline(),
        );
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                handle_key_event(key, app, Instant::now());
                if app.should_quit {
                    return Ok(());
                }
            }
        }
    }
}

/// Sleep until the nearest deadline, but never longer than `MAX_IDLE`.
pub(super) fn poll_timeout(now: Instant, tick: Instant, adapter: Option<Instant>) -> Duration {
    let nearest = adapter.map_or(tick, |a| a.min(tick));
    nearest.saturating_duration_since(now).min(MAX_IDLE)
}

/// Push the current track to MPRIS when anything it shows has changed.
fn sync_mpris(mpris: Option<&MprisHandle>, app: &App, state: &mut EventLoopState) {
    let Some(mpris) = mpris else {
        return;
    };
    let now = app.now_playing();
    if state.last_mpris.as_ref() != Some(&now) {
        mpris.update(&now);
        state.last_mpris = Some(now);
    }
}

/// Apply a command from the media keys.
pub(super) fn handle_control_cmd(cmd: ControlCmd, app: &mut App, now: Instant) {
    debug!(?cmd, "control command");
    let transport = &mut app.transport;
    match cmd {
        ControlCmd::Quit => app.should_quit = true,
        ControlCmd::Play => {
            if !transport.is_playing() {
                transport.toggle_play(now);
            }
        }
        ControlCmd::Pause | ControlCmd::Stop => {
            if transport.is_playing() {
                transport.toggle_play(now);
            }
        }
        ControlCmd::PlayPause => transport.toggle_play(now),
        ControlCmd::Next => transport.next(now),
        ControlCmd::Prev => transport.prev(now),
    }
}

/// Apply a key press. While a prompt is open, keys edit it instead of
/// driving the wheel.
pub(super) fn handle_key_event(key: KeyEvent, app: &mut App, now: Instant) {
    if app.prompt_open() {
        match key.code {
            KeyCode::Esc => app.cancel_prompt(),
            KeyCode::Enter => app.submit_prompt(now),
            KeyCode::Backspace => app.pop_input_char(),
            KeyCode::Char(c) => {
                if !c.is_control() && !key.modifiers.contains(KeyModifiers::CONTROL) {
                    app.push_input_char(c);
                }
            }
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('m') => app.transport.cycle_playlist(now),
        KeyCode::Char('h') | KeyCode::Left => app.transport.prev(now),
        KeyCode::Char('l') | KeyCode::Right => app.transport.next(now),
        KeyCode::Char('p') | KeyCode::Char(' ') | KeyCode::Enter => app.transport.toggle_play(now),
        KeyCode::Char('y') => app.toggle_lyrics(),
        KeyCode::Char('P') => app.open_prompt(Prompt::AddPlaylist),
        KeyCode::Char('a') => app.open_prompt(Prompt::AddSong),
        _ => {}
    }
}
