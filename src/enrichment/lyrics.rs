//! Time-coded lyric parsing.
//!
//! Lyric documents are plain text with one `[MM:SS.ff]` (or `[MM:SS.fff]`,
//! or bare `[MM:SS]`) tag per line:
//!
//! ```text
//! [00:12.50]First line
//! [00:17.200]Second line
//! ```
//!
//! Only the first tag on a line counts. Lines without a tag or without text
//! are dropped; the rest keep their order in the document.

/// One timed lyric line.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    /// Seconds from the start of the song
    pub time: f64,
    pub text: String,
}

/// Parse a lyric document into timed lines, in appearance order.
pub fn parse_lyrics(text: &str) -> Vec<LyricLine> {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<LyricLine> {
    let (start, end, time) = find_tag(line)?;

    let mut remaining = String::with_capacity(line.len());
    remaining.push_str(&line[..start]);
    remaining.push_str(&line[end..]);
    let text = remaining.trim();
    if text.is_empty() {
        return None;
    }

    Some(LyricLine {
        time,
        text: text.to_string(),
    })
}

/// First well-formed time tag in `line`: (byte start, byte end, seconds).
fn find_tag(line: &str) -> Option<(usize, usize, f64)> {
    let mut from = 0;
    while let Some(offset) = line[from..].find('[') {
        let start = from + offset;
        if let Some(close) = line[start..].find(']') {
            let end = start + close + 1;
            if let Some(time) = parse_timestamp(&line[start + 1..end - 1]) {
                return Some((start, end, time));
            }
        }
        from = start + 1;
    }
    None
}

/// `MM:SS`, `MM:SS.ff` or `MM:SS.fff` to seconds.
fn parse_timestamp(tag: &str) -> Option<f64> {
    let (minutes, rest) = tag.split_once(':')?;
    let (seconds, fraction) = match rest.split_once('.') {
        Some((s, f)) => (s, Some(f)),
        None => (rest, None),
    };

    if minutes.len() != 2 || seconds.len() != 2 || !all_digits(minutes) || !all_digits(seconds) {
        return None;
    }

    let millis = match fraction {
        None => 0,
        Some(f) if (2..=3).contains(&f.len()) && all_digits(f) => {
            // "50" is 500 ms, "050" is 50 ms
            let padded = format!("{f:0<3}");
            padded.parse::<u32>().ok()?
        }
        Some(_) => return None,
    };

    let minutes: u32 = minutes.parse().ok()?;
    let seconds: u32 = seconds.parse().ok()?;
    Some(f64::from(minutes) * 60.0 + f64::from(seconds) + f64::from(millis) / 1000.0)
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Index of the line being sung at `time`.
///
/// That is the first line whose start is at or before `time` and whose
/// successor (if any) starts after it. `None` before the first line.
pub fn active_line(lines: &[LyricLine], time: f64) -> Option<usize> {
    lines.iter().enumerate().position(|(i, line)| {
        time >= line.time && lines.get(i + 1).is_none_or(|next| time < next.time)
    })
}
