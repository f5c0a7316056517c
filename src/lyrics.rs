//! LRC-style lyrics: `[mm:ss]` / `[mm:ss.fff]` stamps in front of text lines.
//!
//! Lines with stamps become timed lines (one per stamp); lines without become
//! plain text. Only the renderer consumes this.

/// One timed lyric line.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedLine {
    /// Seconds from the start of the track.
    pub time: f64,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLyrics {
    /// Sorted by time.
    pub timed: Vec<TimedLine>,
    pub plain: Vec<String>,
}

/// How the lyrics panel should present a track.
#[derive(Debug, Clone, PartialEq)]
pub enum LyricsView {
    NoTrack,
    None,
    Static(Vec<String>),
    Synced {
        lines: Vec<String>,
        /// Index into `lines` of the line being sung, if one has started.
        active: Option<usize>,
    },
}

impl LyricsView {
    pub fn mode_label(&self) -> &'static str {
        match self {
            Self::NoTrack => "No Track",
            Self::None => "None",
            Self::Static(_) => "Static",
            Self::Synced { .. } => "Synced",
        }
    }
}

/// Try to read one `[m:ss]`, `[mm:ss]` or `[mm:ss.f{1,3}]` stamp at the start
/// of `s`. Returns the seconds (if valid) and the byte length consumed.
fn read_stamp(s: &str) -> Option<(Option<f64>, usize)> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'[') {
        return None;
    }
    let close = s.find(']')?;
    let inner = &s[1..close];
    let (clock, fraction) = match inner.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (inner, None),
    };
    let (min, sec) = clock.split_once(':')?;

    let all_digits = |v: &str| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(min) || min.len() > 2 || !all_digits(sec) || sec.len() != 2 {
        return None;
    }
    if let Some(f) = fraction {
        if !all_digits(f) || f.len() > 3 {
            return None;
        }
    }

    let min: u32 = min.parse().ok()?;
    let sec: u32 = sec.parse().ok()?;
    // Right-pad to milliseconds: ".5" is 500 ms, ".05" is 50 ms.
    let millis: u32 = match fraction {
        Some(f) => format!("{f:0<3}").parse().ok()?,
        None => 0,
    };

    let time = (sec <= 59).then(|| (min * 60 + sec) as f64 + millis as f64 / 1000.0);
    Some((time, close + 1))
}

/// Remove every stamp from `line`, collecting the valid ones.
fn split_stamps(line: &str) -> (Vec<f64>, String) {
    let mut stamps = Vec::new();
    let mut text = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(open) = rest.find('[') {
        text.push_str(&rest[..open]);
        match read_stamp(&rest[open..]) {
            Some((time, consumed)) => {
                stamps.extend(time);
                rest = &rest[open + consumed..];
            }
            None => {
                text.push('[');
                rest = &rest[open + 1..];
            }
        }
    }
    text.push_str(rest);

    (stamps, text.trim().to_string())
}

pub fn parse(raw: &str) -> ParsedLyrics {
    let mut parsed = ParsedLyrics::default();
    if raw.trim().is_empty() {
        return parsed;
    }

    for line in raw.replace('\r', "").split('\n') {
        let (stamps, text) = split_stamps(line);
        if text.is_empty() {
            continue;
        }
        if stamps.is_empty() {
            parsed.plain.push(text);
        } else {
            parsed.timed.extend(stamps.into_iter().map(|time| TimedLine {
                time,
                text: text.clone(),
            }));
        }
    }

    parsed.timed.sort_by(|a, b| a.time.total_cmp(&b.time));
    parsed
}

/// Index of the last timed line whose stamp has been reached.
pub fn active_index(timed: &[TimedLine], elapsed_secs: f64) -> Option<usize> {
    timed
        .iter()
        .take_while(|line| elapsed_secs >= line.time)
        .count()
        .checked_sub(1)
}

/// Build the lyrics panel for a track at `elapsed_secs`.
///
/// Synced lyrics show a window of two lines before the active one and two
/// after it, or the first three lines before anything has started.
pub fn view(lyrics: Option<&str>, has_track: bool, elapsed_secs: u64) -> LyricsView {
    if !has_track {
        return LyricsView::NoTrack;
    }
    let parsed = parse(lyrics.unwrap_or_default());

    if !parsed.timed.is_empty() {
        let active = active_index(&parsed.timed, elapsed_secs as f64);
        let (start, end) = match active {
            Some(i) => (i.saturating_sub(2), (i + 3).min(parsed.timed.len())),
            None => (0, 3.min(parsed.timed.len())),
        };
        return LyricsView::Synced {
            lines: parsed.timed[start..end]
                .iter()
                .map(|l| l.text.clone())
                .collect(),
            active: active.map(|i| i - start),
        };
    }

    if !parsed.plain.is_empty() {
        return LyricsView::Static(parsed.plain);
    }

    LyricsView::None
}
