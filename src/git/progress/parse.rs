//! Parsing of git's human-readable progress lines.
//!
//! Git reports progress on stderr as lines like
//!
//! ```text
//! remote: Compressing objects:  45% (10/22)
//! Receiving objects: 100% (167587/167587), 279.67 MiB | 14.05 MiB/s, done.
//! Counting objects: 7
//! ```
//!
//! The title is everything before the last `": "`. The first comma-separated
//! part after it is either a bare count or `NN% (value/total)`.

use once_cell::sync::Lazy;
use regex::Regex;

static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3})% \((\d+)/(\d+)\)$").expect("valid regex"));

/// One recognized progress line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLine {
    /// Step title, e.g. "Receiving objects" or "remote: Compressing objects".
    pub title: String,
    pub value: u64,
    pub total: Option<u64>,
    pub percent: Option<u32>,
    /// Whether any later part of the line is "done.".
    pub done: bool,
    /// The full line as received.
    pub text: String,
}

impl ProgressLine {
    /// Completed fraction of this step, when a total is known.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some(self.value as f64 / total as f64),
            None => None,
        }
    }
}

/// Parse one stderr line. Returns `None` for anything that isn't progress.
pub fn parse(line: &str) -> Option<ProgressLine> {
    let title_len = line.rfind(": ")?;
    if title_len == 0 {
        return None;
    }
    let title = &line[..title_len];
    let progress_text = line[title_len + 2..].trim();
    if progress_text.is_empty() {
        return None;
    }

    let mut parts = progress_text.split(", ");
    let first = parts.next()?;

    let (value, total, percent) = if !first.is_empty() && first.bytes().all(|b| b.is_ascii_digit())
    {
        (first.parse().ok()?, None, None)
    } else {
        let caps = PERCENT_RE.captures(first)?;
        (
            caps[2].parse().ok()?,
            Some(caps[3].parse().ok()?),
            Some(caps[1].parse().ok()?),
        )
    };

    let done = parts.any(|part| part == "done.");

    Some(ProgressLine {
        title: title.to_string(),
        value,
        total,
        percent,
        done,
        text: line.to_string(),
    })
}
