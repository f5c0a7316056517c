use std::env;
use std::path::Path;
use std::sync::mpsc;
use std::time::Instant;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::app::App;
use crate::mpris::ControlCmd;
use crate::playback::AdapterEvent;
use crate::transport::Transport;

mod event_loop;
mod logging;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, config_warning) = settings::load_settings();

    let store = startup::store_for(&settings);
    logging::init_logging(store.as_ref().and_then(|s| s.path().parent()));
    if let Some(msg) = config_warning {
        warn!("{msg}");
    }
    if let Some(store) = &store {
        info!(path = %store.path().display(), "library state");
    }

    let (mut library, mut state) = startup::load_library(store.as_ref());
    if let Some(dir) = env::args().nth(1) {
        startup::import_into(&mut library, &mut state, Path::new(&dir), &settings);
    }

    let (events_tx, events_rx) = mpsc::channel::<AdapterEvent>();
    let adapters = startup::build_adapters(&settings, events_tx);
    let transport = Transport::new(library, state, adapters, events_rx, store);
    let mut app = App::new(transport, settings.ui.show_lyrics);

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = settings
        .mpris
        .enabled
        .then(|| crate::mpris::spawn_mpris(control_tx));

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result: Result<(), Box<dyn std::error::Error>> = (|| {
        let mut state = event_loop::EventLoopState::new(&settings, Instant::now());
        event_loop::run(
            &mut terminal,
            &settings,
            &mut app,
            mpris.as_ref(),
            &control_rx,
            &mut state,
        )
    })();

    app.transport.shutdown();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("exiting");
    run_result
}
