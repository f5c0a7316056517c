//! UI rendering for the terminal device.
//!
//! Everything is drawn from a fresh `NowPlaying` snapshot each frame; the
//! renderer keeps no state of its own.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Padding, Paragraph, Wrap},
};

use crate::app::App;
use crate::config::{TimeField, UiSettings};
use crate::lyrics::LyricsView;
use crate::playback::SourceKind;
use crate::transport::NowPlaying;

const DEVICE_WIDTH: u16 = 48;

const CONTROLS: [(&str, &str); 8] = [
    ("m", "menu"),
    ("h/l", "prev/next"),
    ("p/space", "play/pause"),
    ("y", "lyrics"),
    ("P", "new playlist"),
    ("a", "add song"),
    ("esc", "cancel"),
    ("q", "quit"),
];

fn controls_text() -> String {
    CONTROLS
        .iter()
        .map(|(k, v)| format!("[{k}] {v}"))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Seconds as `m:ss`.
pub(crate) fn format_time(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// The time line under the title, per `UiSettings::time_fields`.
pub(crate) fn time_text(now: &NowPlaying, ui: &UiSettings) -> String {
    let total = u64::from(now.duration_secs);
    ui.time_fields
        .iter()
        .map(|f| match f {
            TimeField::Elapsed => format_time(now.elapsed_secs),
            TimeField::Total => format_time(total),
            TimeField::Remaining => {
                format!("-{}", format_time(total.saturating_sub(now.elapsed_secs)))
            }
        })
        .collect::<Vec<_>>()
        .join(&ui.time_separator)
}

/// Fraction of the track played, clamped to `0..=1`.
pub(crate) fn progress_ratio(now: &NowPlaying) -> f64 {
    if now.duration_secs == 0 {
        return 0.0;
    }
    (now.elapsed_secs as f64 / f64::from(now.duration_secs)).clamp(0.0, 1.0)
}

fn source_label(kind: Option<SourceKind>) -> &'static str {
    match kind {
        Some(SourceKind::Synth) => "synth",
        Some(SourceKind::NativeAudio) => "audio",
        Some(SourceKind::EmbeddedVideo) => "video",
        None => "-",
    }
}

/// A fixed-width column centered in `r`.
fn device_rect(r: Rect) -> Rect {
    let width = DEVICE_WIDTH.min(r.width);
    Rect {
        x: r.x + (r.width - width) / 2,
        y: r.y,
        width,
        height: r.height,
    }
}

fn left_pad(n: u16) -> Padding {
    Padding {
        left: n,
        right: 0,
        top: 0,
        bottom: 0,
    }
}

fn draw_screen(frame: &mut Frame, area: Rect, now: &NowPlaying, ui: &UiSettings) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", now.playlist))
        .title_alignment(Alignment::Center)
        .padding(left_pad(1));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Length(1)])
        .split(inner);

    let state = if now.playing { "Playing" } else { "Paused" };
    let text = vec![
        Line::from(now.title.as_str().bold()),
        Line::from(now.artist.as_str()),
        Line::from(format!(
            "{}/{} • {} • {}",
            now.track_position,
            now.total_tracks,
            state,
            source_label(now.source)
        )),
    ];
    frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), rows[0]);

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(progress_ratio(now))
        .label(time_text(now, ui));
    frame.render_widget(gauge, rows[1]);
}

fn draw_lyrics(frame: &mut Frame, area: Rect, view: &LyricsView) {
    let lines: Vec<Line> = match view {
        LyricsView::NoTrack | LyricsView::None => vec![Line::from("No lyrics".dim())],
        LyricsView::Static(lines) => lines.iter().map(|l| Line::from(l.as_str())).collect(),
        LyricsView::Synced { lines, active } => lines
            .iter()
            .enumerate()
            .map(|(i, l)| {
                if Some(i) == *active {
                    Line::from(Span::styled(
                        l.as_str(),
                        Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED),
                    ))
                } else {
                    Line::from(l.as_str().dim())
                }
            })
            .collect(),
    };
    let para = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" lyrics · {} ", view.mode_label()))
                .padding(left_pad(1)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(para, area);
}

fn draw_wheel(frame: &mut Frame, area: Rect, playing: bool) {
    let center = if playing { "( ❚❚ )" } else { "( ▶ )" };
    let wheel = vec![
        Line::from("MENU"),
        Line::from(format!("|◀◀      {center}      ▶▶|")),
        Line::from("▶ ❚❚"),
    ];
    let para = Paragraph::new(wheel)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(para, area);
}

/// Render the whole device into `frame`.
pub fn draw(frame: &mut Frame, app: &App, ui_settings: &UiSettings) {
    let now = app.now_playing();
    let device = device_rect(frame.area());

    let lyrics_height = if app.show_lyrics {
        Constraint::Min(5)
    } else {
        Constraint::Length(0)
    };
    let prompt_height = if app.prompt_open() {
        Constraint::Length(3)
    } else {
        Constraint::Length(0)
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(7),
            lyrics_height,
            Constraint::Length(2),
            prompt_height,
            Constraint::Length(5),
            Constraint::Length(3),
        ])
        .split(device);

    // Top bar
    let glyph = if now.playing { "▶" } else { "❚❚" };
    let header = Paragraph::new(Line::from(vec![
        Span::raw(ui_settings.header_text.as_str()),
        Span::raw(" "),
        Span::raw(glyph),
    ]))
    .alignment(Alignment::Center)
    .reversed();
    frame.render_widget(header, chunks[0]);

    draw_screen(frame, chunks[1], &now, ui_settings);

    if app.show_lyrics {
        draw_lyrics(frame, chunks[2], &App::lyrics_view(&now));
    }

    if let Some(status) = app.transport.status() {
        let style = if status.is_error {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Green)
        };
        let para = Paragraph::new(status.text.as_str())
            .style(style)
            .wrap(Wrap { trim: true });
        frame.render_widget(para, chunks[3]);
    }

    if app.prompt_open() {
        let input = Paragraph::new(format!("{}█", app.input)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", app.prompt.label()))
                .padding(left_pad(1)),
        );
        frame.render_widget(input, chunks[4]);
    }

    draw_wheel(frame, chunks[5], now.playing);

    let footer = Paragraph::new(controls_text())
        .style(Style::default().add_modifier(Modifier::DIM))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[6]);
}
