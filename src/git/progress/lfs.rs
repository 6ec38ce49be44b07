//! git-lfs transfer progress.
//!
//! When `GIT_LFS_PROGRESS` names a file, git-lfs appends one line per update:
//!
//! ```text
//! <direction> <current>/<total files> <transferred>/<total bytes> <name>
//! download 1/3 1048576/4194304 assets/video.mp4
//! ```
//!
//! [`tail`] follows that file from a background thread while the git process
//! runs; [`LfsProgressParser`] folds its lines into an overall fraction.

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel as chan;
use once_cell::sync::Lazy;
use regex::Regex;

/// Environment variable git-lfs reads to find its progress file.
pub const PROGRESS_ENV_VAR: &str = "GIT_LFS_PROGRESS";

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const LINE_BUFFER: usize = 64;

static LFS_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+) (\d+)/(\d+) (\d+)/(\d+) (.+)$").expect("valid regex"));

/// One parsed git-lfs progress line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LfsLine {
    pub direction: String,
    pub current_file: u64,
    pub total_files: u64,
    pub transferred_bytes: u64,
    pub total_bytes: u64,
    pub name: String,
}

pub fn parse_line(line: &str) -> Option<LfsLine> {
    let caps = LFS_LINE_RE.captures(line.trim())?;
    Some(LfsLine {
        direction: caps[1].to_string(),
        current_file: caps[2].parse().ok()?,
        total_files: caps[3].parse().ok()?,
        transferred_bytes: caps[4].parse().ok()?,
        total_bytes: caps[5].parse().ok()?,
        name: caps[6].to_string(),
    })
}

/// Aggregated LFS progress after one line.
#[derive(Debug, Clone, PartialEq)]
pub struct LfsProgress {
    /// Overall completed fraction across all files, in `[0, 1]`.
    pub fraction: f64,
    /// e.g. "Downloading Git LFS file 1 of 3".
    pub title: String,
}

/// Folds git-lfs progress lines into an overall fraction.
///
/// Each file contributes an equal share; a file's share fills as its bytes
/// arrive.
#[derive(Debug, Default)]
pub struct LfsProgressParser {
    files: HashMap<String, (u64, u64)>,
}

impl LfsProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&mut self, line: &str) -> Option<LfsProgress> {
        let parsed = parse_line(line)?;
        self.files.insert(
            parsed.name.clone(),
            (parsed.transferred_bytes, parsed.total_bytes),
        );

        let total_files = parsed.total_files.max(self.files.len() as u64).max(1);
        let done: f64 = self
            .files
            .values()
            .map(|&(transferred, total)| {
                if total == 0 {
                    1.0
                } else {
                    (transferred as f64 / total as f64).min(1.0)
                }
            })
            .sum();

        let verb = match parsed.direction.as_str() {
            "download" => "Downloading",
            "upload" => "Uploading",
            "checkout" => "Checking out",
            _ => "Transferring",
        };
        Some(LfsProgress {
            fraction: (done / total_files as f64).clamp(0.0, 1.0),
            title: format!(
                "{verb} Git LFS file {} of {}",
                parsed.current_file, parsed.total_files
            ),
        })
    }
}

/// Follow `path` line by line until `stop` is set.
///
/// After `stop` is observed the file is read one final time, then the sender
/// is dropped so the receiver disconnects.
pub fn tail(path: PathBuf, stop: Arc<AtomicBool>) -> (chan::Receiver<String>, JoinHandle<()>) {
    let (tx, rx) = chan::bounded(LINE_BUFFER);
    let handle = std::thread::spawn(move || {
        let mut offset = 0u64;
        let mut pending = String::new();
        loop {
            let stopping = stop.load(Ordering::Relaxed);
            match read_from(&path, offset) {
                Ok(chunk) => {
                    offset += chunk.len() as u64;
                    pending.push_str(&String::from_utf8_lossy(&chunk));
                    while let Some(pos) = pending.find('\n') {
                        let line: String = pending.drain(..=pos).collect();
                        let line = line.trim_end();
                        if !line.is_empty() && tx.send(line.to_string()).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => log::debug!("Reading LFS progress file failed: {e}"),
            }
            if stopping {
                let rest = pending.trim();
                if !rest.is_empty() {
                    let _ = tx.send(rest.to_string());
                }
                return;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    });
    (rx, handle)
}

fn read_from(path: &std::path::Path, offset: u64) -> std::io::Result<Vec<u8>> {
    let mut file = std::fs::File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(buf)
}
