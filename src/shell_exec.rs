//! Process execution with logging and tracing.
//!
//! Every external command goes through [`Cmd`], which logs the command line at
//! debug level and emits a `[gf-trace]` line with timing once it finishes:
//!
//! ```text
//! $ git status --porcelain=2 [/path/to/repo]
//! [gf-trace] ts=1234 tid=1 context=/path/to/repo cmd="git status --porcelain=2" dur_us=5120 ok=true
//! ```
//!
//! Long-running commands use [`Cmd::spawn_streaming`], which hands stderr back
//! line by line over a bounded channel while stdout is captured in the
//! background.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::OnceLock;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel as chan;

/// Monotonic epoch for trace timestamps.
static TRACE_EPOCH: OnceLock<Instant> = OnceLock::new();

fn trace_epoch() -> &'static Instant {
    TRACE_EPOCH.get_or_init(Instant::now)
}

/// Lines buffered between the stderr reader and its consumer.
///
/// A slow consumer blocks the reader, which in turn stops draining the pipe
/// and lets the child block on write.
const STDERR_LINE_BUFFER: usize = 64;

/// Extract numeric thread ID from ThreadId's debug format ("ThreadId(N)").
fn thread_id_number() -> u64 {
    let debug_str = format!("{:?}", std::thread::current().id());
    debug_str
        .strip_prefix("ThreadId(")
        .and_then(|s| s.strip_suffix(")"))
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Timing and identity of one invocation, reported when it completes.
struct Trace {
    cmd_str: String,
    context: Option<String>,
    t0: Instant,
    ts: u64,
    tid: u64,
}

impl Trace {
    fn start(cmd_str: String, context: Option<String>) -> Self {
        match &context {
            Some(ctx) => log::debug!("$ {} [{}]", cmd_str, ctx),
            None => log::debug!("$ {}", cmd_str),
        }
        let t0 = Instant::now();
        Self {
            ts: t0.duration_since(*trace_epoch()).as_micros() as u64,
            tid: thread_id_number(),
            cmd_str,
            context,
            t0,
        }
    }

    fn finish(&self, result: Result<bool, &std::io::Error>) {
        let dur_us = self.t0.elapsed().as_micros() as u64;
        let context = self
            .context
            .as_ref()
            .map(|ctx| format!(" context={ctx}"))
            .unwrap_or_default();
        let outcome = match result {
            Ok(ok) => format!("ok={ok}"),
            Err(e) => format!("err=\"{e}\""),
        };
        log::debug!(
            "[gf-trace] ts={} tid={}{} cmd=\"{}\" dur_us={} {}",
            self.ts,
            self.tid,
            context,
            self.cmd_str,
            dur_us,
            outcome
        );
    }
}

/// Builder for executing commands with logging and tracing.
///
/// ```ignore
/// let output = Cmd::new("git")
///     .args(["status", "--porcelain=2"])
///     .current_dir(&repo_path)
///     .context("status")
///     .run()?;
/// ```
pub struct Cmd {
    program: PathBuf,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    context: Option<String>,
    envs: Vec<(String, String)>,
}

impl Cmd {
    /// Create a new command builder for the given program.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            context: None,
            envs: Vec::new(),
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory for the command.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Set the logging context (typically the repository path).
    pub fn context(mut self, ctx: impl Into<String>) -> Self {
        self.context = Some(ctx.into());
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl Into<String>, val: impl Into<String>) -> Self {
        self.envs.push((key.into(), val.into()));
        self
    }

    fn command_line(&self) -> String {
        let program = self
            .program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string());
        if self.args.is_empty() {
            program
        } else {
            format!("{} {}", program, self.args.join(" "))
        }
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        for (key, val) in &self.envs {
            cmd.env(key, val);
        }
        cmd
    }

    /// Execute the command to completion and return its output.
    pub fn run(self) -> std::io::Result<std::process::Output> {
        let trace = Trace::start(self.command_line(), self.context.clone());
        let result = self.build().stdin(Stdio::null()).output();
        trace.finish(result.as_ref().map(|output| output.status.success()));
        result
    }

    /// Spawn the command with stderr delivered line by line.
    ///
    /// Stderr is split on both `\r` and `\n`, so in-place progress updates
    /// arrive as separate lines. Empty lines are dropped. Stdout is captured
    /// on a background thread and returned by [`StreamingChild::wait`].
    pub fn spawn_streaming(self) -> std::io::Result<StreamingChild> {
        let trace = Trace::start(self.command_line(), self.context.clone());
        let spawned = self
            .build()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                trace.finish(Err(&e));
                return Err(e);
            }
        };

        let mut stdout_handle = child.stdout.take();
        let stdout = std::thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(ref mut handle) = stdout_handle {
                let _ = handle.read_to_end(&mut buf);
            }
            buf
        });

        let (tx, rx) = chan::bounded(STDERR_LINE_BUFFER);
        let stderr_handle = child.stderr.take();
        let reader = std::thread::spawn(move || {
            if let Some(handle) = stderr_handle {
                forward_lines(handle, &tx);
            }
        });

        Ok(StreamingChild {
            child,
            stdout,
            reader,
            lines: rx,
            trace,
        })
    }
}

/// Read `source` to EOF, sending each `\r`- or `\n`-terminated line.
///
/// Once the receiving side hangs up the rest is read and discarded, so the
/// child never blocks on a full pipe.
fn forward_lines(mut source: impl Read, tx: &chan::Sender<String>) {
    let mut connected = true;
    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        for &byte in &chunk[..n] {
            if byte == b'\r' || byte == b'\n' {
                if !pending.is_empty() {
                    let line = String::from_utf8_lossy(&pending).into_owned();
                    pending.clear();
                    connected = connected && tx.send(line).is_ok();
                }
            } else if connected {
                pending.push(byte);
            }
        }
    }
    if connected && !pending.is_empty() {
        let _ = tx.send(String::from_utf8_lossy(&pending).into_owned());
    }
}

/// A running child whose stderr is consumed line by line.
pub struct StreamingChild {
    child: Child,
    stdout: JoinHandle<Vec<u8>>,
    reader: JoinHandle<()>,
    lines: chan::Receiver<String>,
    trace: Trace,
}

impl StreamingChild {
    /// Stderr lines in arrival order. Disconnects once stderr reaches EOF.
    pub fn lines(&self) -> &chan::Receiver<String> {
        &self.lines
    }

    /// Wait for the child to exit, returning its status and captured stdout.
    ///
    /// Stderr lines not yet received are discarded.
    pub fn wait(self) -> std::io::Result<(ExitStatus, Vec<u8>)> {
        let StreamingChild {
            mut child,
            stdout,
            reader,
            lines,
            trace,
        } = self;
        drop(lines);
        let _ = reader.join();
        let status = child.wait();
        let stdout = stdout.join().unwrap_or_default();
        trace.finish(status.as_ref().map(|status| status.success()));
        Ok((status?, stdout))
    }
}
