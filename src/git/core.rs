//! Git execution core.
//!
//! One call spawns exactly one `git` process, captures its output, and
//! classifies failures. A non-zero exit is an error only when the caller did
//! not list the exit code as a success or the classified error as expected;
//! otherwise the classification comes back as data on [`ExecutionResult`].

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel as chan;

use super::error::{ErrorClass, GitError, classify_output};
use super::progress::lfs;
use crate::shell_exec::Cmd;

/// Per-call execution options.
#[derive(Debug, Clone)]
pub struct GitOptions {
    success_exit_codes: HashSet<i32>,
    expected_errors: HashSet<ErrorClass>,
    env: Vec<(String, String)>,
    track_lfs_progress: bool,
}

impl Default for GitOptions {
    fn default() -> Self {
        Self {
            success_exit_codes: HashSet::from([0]),
            expected_errors: HashSet::new(),
            env: Vec::new(),
            track_lfs_progress: false,
        }
    }
}

impl GitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit codes treated as success. Replaces the default `{0}`.
    pub fn success_exit_codes(mut self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.success_exit_codes = codes.into_iter().collect();
        self
    }

    /// Error classes returned as data instead of raised.
    pub fn expected_errors(mut self, classes: impl IntoIterator<Item = ErrorClass>) -> Self {
        self.expected_errors.extend(classes);
        self
    }

    /// Extra environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, val: impl Into<String>) -> Self {
        self.env.push((key.into(), val.into()));
        self
    }

    /// Ask git-lfs to report transfer progress (streaming calls only).
    pub fn track_lfs_progress(mut self, enabled: bool) -> Self {
        self.track_lfs_progress = enabled;
        self
    }

    pub fn is_success_code(&self, code: i32) -> bool {
        self.success_exit_codes.contains(&code)
    }
}

/// Outcome of one git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// Set when the exit code was not a success code.
    pub error_class: Option<ErrorClass>,
    pub error_description: Option<String>,
}

impl ExecutionResult {
    /// Whether the process exited with a declared success code.
    pub fn succeeded(&self) -> bool {
        self.error_class.is_none()
    }
}

/// Receives stderr from a streaming invocation.
pub trait StderrHandler {
    /// Handle one line of git's stderr.
    ///
    /// Return `true` when the line was progress output; such lines are not
    /// retained for error classification.
    fn git_line(&mut self, line: &str) -> bool;

    /// Handle one line written by git-lfs to its progress file.
    fn lfs_line(&mut self, _line: &str) {}
}

/// Run git with `args` in `repo_path`, capturing all output.
pub fn run(
    args: &[&str],
    repo_path: &Path,
    context: &str,
    options: &GitOptions,
) -> anyhow::Result<ExecutionResult> {
    let output = command(args, repo_path, context, options)
        .run()
        .map_err(|e| spawn_error(e, repo_path))?;

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    finish(args, options, exit_code, stdout, stderr)
}

/// Run git with stderr streamed line by line to `handler` on this thread.
///
/// A reader thread feeds lines through a bounded channel; when LFS progress
/// is requested a second thread tails the progress file into another one.
pub fn run_streaming(
    args: &[&str],
    repo_path: &Path,
    context: &str,
    options: &GitOptions,
    handler: &mut dyn StderrHandler,
) -> anyhow::Result<ExecutionResult> {
    let mut cmd = command(args, repo_path, context, options);

    let lfs_file = if options.track_lfs_progress {
        let file = tempfile::Builder::new()
            .prefix("gf-lfs-progress")
            .tempfile()?;
        cmd = cmd.env(lfs::PROGRESS_ENV_VAR, file.path().to_string_lossy());
        Some(file)
    } else {
        None
    };

    let child = cmd.spawn_streaming().map_err(|e| spawn_error(e, repo_path))?;

    let stop = Arc::new(AtomicBool::new(false));
    let (lfs_lines, tail) = match &lfs_file {
        Some(file) => {
            let (rx, handle) = lfs::tail(file.path().to_path_buf(), Arc::clone(&stop));
            (rx, Some(handle))
        }
        None => (chan::never(), None),
    };

    let never = chan::never();
    let mut retained: Vec<String> = Vec::new();
    let mut lfs_open = tail.is_some();
    loop {
        chan::select! {
            recv(child.lines()) -> msg => match msg {
                Ok(line) => {
                    if !handler.git_line(&line) {
                        retained.push(line);
                    }
                }
                Err(_) => break,
            },
            recv(if lfs_open { &lfs_lines } else { &never }) -> msg => match msg {
                Ok(line) => handler.lfs_line(&line),
                Err(_) => lfs_open = false,
            },
        }
    }

    let waited = child.wait();
    stop.store(true, Ordering::Relaxed);
    if let Some(handle) = tail {
        // The tailer does one last read after the stop flag, then hangs up.
        if lfs_open {
            for line in lfs_lines.iter() {
                handler.lfs_line(&line);
            }
        }
        let _ = handle.join();
    }
    let (status, stdout) = waited.map_err(|e| spawn_error(e, repo_path))?;

    let exit_code = status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&stdout).into_owned();
    finish(args, options, exit_code, stdout, retained.join("\n"))
}

fn command(args: &[&str], repo_path: &Path, context: &str, options: &GitOptions) -> Cmd {
    let mut cmd = Cmd::new(crate::config::git_executable())
        .args(args.iter().copied())
        .current_dir(repo_path)
        .context(context);
    for (key, val) in &options.env {
        cmd = cmd.env(key.as_str(), val.as_str());
    }
    cmd
}

fn spawn_error(e: std::io::Error, repo_path: &Path) -> anyhow::Error {
    let program = crate::config::git_executable().to_path_buf();
    // A missing working directory also surfaces as NotFound.
    if e.kind() == std::io::ErrorKind::NotFound && !repo_path.is_dir() {
        GitError::Spawn {
            program,
            message: format!("{} is not a directory", repo_path.display()),
        }
        .into()
    } else if e.kind() == std::io::ErrorKind::NotFound {
        GitError::GitNotFound { program }.into()
    } else {
        GitError::Spawn {
            program,
            message: e.to_string(),
        }
        .into()
    }
}

fn finish(
    args: &[&str],
    options: &GitOptions,
    exit_code: i32,
    stdout: String,
    stderr: String,
) -> anyhow::Result<ExecutionResult> {
    if options.is_success_code(exit_code) {
        return Ok(ExecutionResult {
            stdout,
            stderr,
            exit_code,
            error_class: None,
            error_description: None,
        });
    }

    let class = classify_output(&stderr, &stdout, exit_code).unwrap_or(ErrorClass::Unknown);
    if options.expected_errors.contains(&class) {
        log::debug!("git {} failed with expected {class}", args.join(" "));
        return Ok(ExecutionResult {
            stdout,
            stderr,
            exit_code,
            error_class: Some(class),
            error_description: Some(class.description().to_string()),
        });
    }

    Err(GitError::Command {
        class,
        exit_code,
        stderr,
        args: args.iter().map(|a| a.to_string()).collect(),
    }
    .into())
}
