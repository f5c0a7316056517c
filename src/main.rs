mod app;
mod config;
mod error;
mod library;
mod lyrics;
mod mpris;
mod playback;
mod runtime;
mod transport;
mod ui;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
