//! Progress translation for long-running git operations.
//!
//! Git reports fetch, pull, push, checkout and clone progress as a sequence of
//! named phases ("Receiving objects", "Resolving deltas", ...), each counting
//! from 0 to 100%. [`GitProgressParser`] maps those phases onto one weighted
//! scale, and [`ProgressTranslator`] turns the result into a stream of
//! [`ProgressEvent`]s whose `value` never decreases.

pub mod lfs;
pub mod parse;

use strum::Display;

use self::lfs::LfsProgressParser;
use self::parse::ProgressLine;
use super::core::StderrHandler;

/// Highest value reported before the operation has exited successfully.
const MAX_INTERMEDIATE_VALUE: f64 = 0.99;

/// Weight of the git-lfs step relative to the git steps of an operation.
const LFS_STEP_WEIGHT: f64 = 0.5;

/// Step title used for git-lfs transfers.
pub const LFS_STEP_TITLE: &str = "Git LFS";

/// Titles git has used for the working-tree update phase.
const CHECKOUT_TITLES: [&str; 2] = ["Updating files", "Checking out files"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OperationKind {
    Fetch,
    Pull,
    Push,
    Checkout,
    Clone,
}

impl OperationKind {
    /// The phases git reports for this operation, with relative weights.
    pub fn steps(self) -> Vec<ProgressStep> {
        let steps: &[(&str, f64)] = match self {
            OperationKind::Fetch => &[
                ("remote: Compressing objects", 10.0),
                ("Receiving objects", 70.0),
                ("Resolving deltas", 20.0),
            ],
            OperationKind::Pull => &[
                ("remote: Compressing objects", 10.0),
                ("Receiving objects", 60.0),
                ("Resolving deltas", 15.0),
                ("Updating files", 15.0),
            ],
            OperationKind::Push => &[
                ("Compressing objects", 20.0),
                ("Writing objects", 70.0),
                ("remote: Resolving deltas", 10.0),
            ],
            OperationKind::Checkout => &[("Updating files", 100.0)],
            OperationKind::Clone => &[
                ("remote: Compressing objects", 10.0),
                ("Receiving objects", 60.0),
                ("Resolving deltas", 10.0),
                ("Updating files", 20.0),
            ],
        };
        steps
            .iter()
            .map(|(title, weight)| ProgressStep::new(*title, *weight))
            .collect()
    }

    /// Steps including a git-lfs phase.
    ///
    /// Uploads happen before git writes objects, so push gets the LFS phase
    /// first; everything else transfers LFS content after git is done.
    pub fn steps_with_lfs(self) -> Vec<ProgressStep> {
        let mut steps = self.steps();
        let git_total: f64 = steps.iter().map(|s| s.weight).sum();
        let lfs = ProgressStep::new(LFS_STEP_TITLE, git_total * LFS_STEP_WEIGHT);
        if self == OperationKind::Push {
            steps.insert(0, lfs);
        } else {
            steps.push(lfs);
        }
        steps
    }

    /// Whether a non-progress line should be shown to the user.
    ///
    /// Push shows everything (the remote's merge-request hints, the `To`
    /// line). Receiving operations also print ref updates, which are noise.
    fn forwards_context(self, text: &str) -> bool {
        match self {
            OperationKind::Checkout => false,
            OperationKind::Push => true,
            _ => text.starts_with("remote: Counting objects"),
        }
    }
}

/// A named phase and its relative weight.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStep {
    pub title: String,
    pub weight: f64,
}

impl ProgressStep {
    pub fn new(title: impl Into<String>, weight: f64) -> Self {
        Self {
            title: title.into(),
            weight,
        }
    }

    fn matches(&self, title: &str) -> bool {
        self.title == title
            || (CHECKOUT_TITLES.contains(&self.title.as_str()) && CHECKOUT_TITLES.contains(&title))
    }
}

/// Result of feeding one line to [`GitProgressParser`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedOutput {
    /// The line advanced a known step.
    Progress { percent: f64, details: ProgressLine },
    /// Anything else; carries the last known percentage.
    Context { text: String, percent: f64 },
}

/// Maps progress lines onto a weighted sequence of steps.
///
/// Steps are expected in order. A line for an earlier step after a later one
/// has been seen, or for an unknown title, is reported as context.
#[derive(Debug, Clone)]
pub struct GitProgressParser {
    steps: Vec<ProgressStep>,
    step_index: usize,
    last_percent: f64,
}

impl GitProgressParser {
    /// Create a parser. Weights are normalized to sum to 1.
    pub fn new(steps: Vec<ProgressStep>) -> anyhow::Result<Self> {
        anyhow::ensure!(!steps.is_empty(), "must specify at least one progress step");
        let total: f64 = steps.iter().map(|s| s.weight).sum();
        anyhow::ensure!(
            total > 0.0 && steps.iter().all(|s| s.weight >= 0.0),
            "progress step weights must be non-negative and not all zero"
        );
        let steps = steps
            .into_iter()
            .map(|s| ProgressStep::new(s.title, s.weight / total))
            .collect();
        Ok(Self {
            steps,
            step_index: 0,
            last_percent: 0.0,
        })
    }

    pub fn parse(&mut self, line: &str) -> ParsedOutput {
        let Some(details) = parse::parse(line) else {
            return self.context(line);
        };
        let fraction = details.fraction();
        match self.advance(&details.title, fraction) {
            Some(percent) => ParsedOutput::Progress { percent, details },
            None => self.context(line),
        }
    }

    /// Report `fraction` of the step titled `title`, if it is current or later.
    pub fn advance(&mut self, title: &str, fraction: Option<f64>) -> Option<f64> {
        let mut percent = 0.0;
        for (i, step) in self.steps.iter().enumerate() {
            if i < self.step_index {
                percent += step.weight;
                continue;
            }
            if step.matches(title) {
                if let Some(fraction) = fraction {
                    percent += step.weight * fraction.clamp(0.0, 1.0);
                }
                self.step_index = i;
                self.last_percent = percent;
                return Some(percent);
            }
            percent += step.weight;
        }
        None
    }

    fn context(&self, line: &str) -> ParsedOutput {
        ParsedOutput::Context {
            text: line.to_string(),
            percent: self.last_percent,
        }
    }
}

/// Normalized progress notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub kind: OperationKind,
    pub title: String,
    pub description: Option<String>,
    /// Overall completion in `[0, 1]`, never decreasing within one operation.
    pub value: f64,
    pub remote: Option<String>,
    pub branch: Option<String>,
}

/// Turns git (and git-lfs) output into [`ProgressEvent`]s for a callback.
pub struct ProgressTranslator<'a> {
    kind: OperationKind,
    title: String,
    remote: Option<String>,
    branch: Option<String>,
    parser: GitProgressParser,
    lfs: Option<LfsProgressParser>,
    value: f64,
    callback: &'a mut dyn FnMut(ProgressEvent),
}

impl<'a> ProgressTranslator<'a> {
    pub fn new(
        kind: OperationKind,
        title: impl Into<String>,
        track_lfs: bool,
        callback: &'a mut dyn FnMut(ProgressEvent),
    ) -> anyhow::Result<Self> {
        let steps = if track_lfs {
            kind.steps_with_lfs()
        } else {
            kind.steps()
        };
        Ok(Self {
            kind,
            title: title.into(),
            remote: None,
            branch: None,
            parser: GitProgressParser::new(steps)?,
            lfs: track_lfs.then(LfsProgressParser::new),
            value: 0.0,
            callback,
        })
    }

    pub fn remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Emit the initial `value = 0` event.
    pub fn start(&mut self) {
        self.emit(None, 0.0);
    }

    /// Emit the terminal `value = 1` event. Call only after a successful exit.
    pub fn finish(&mut self) {
        self.value = 1.0;
        let event = self.event(None);
        (self.callback)(event);
    }

    fn emit(&mut self, description: Option<String>, value: f64) {
        self.value = value.clamp(self.value, MAX_INTERMEDIATE_VALUE.max(self.value));
        let event = self.event(description);
        (self.callback)(event);
    }

    fn event(&self, description: Option<String>) -> ProgressEvent {
        ProgressEvent {
            kind: self.kind,
            title: self.title.clone(),
            description,
            value: self.value,
            remote: self.remote.clone(),
            branch: self.branch.clone(),
        }
    }
}

impl StderrHandler for ProgressTranslator<'_> {
    fn git_line(&mut self, line: &str) -> bool {
        let is_progress = parse::parse(line).is_some();
        match self.parser.parse(line) {
            ParsedOutput::Progress { percent, details } => {
                self.emit(Some(details.text), percent);
            }
            ParsedOutput::Context { text, percent } => {
                if self.kind.forwards_context(&text) {
                    self.emit(Some(text), percent);
                }
            }
        }
        is_progress
    }

    fn lfs_line(&mut self, line: &str) {
        let Some(progress) = self.lfs.as_mut().and_then(|lfs| lfs.parse(line)) else {
            return;
        };
        if let Some(percent) = self.parser.advance(LFS_STEP_TITLE, Some(progress.fraction)) {
            self.emit(Some(progress.title), percent);
        }
    }
}
