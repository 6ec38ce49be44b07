//! Repository handle and repository-type classification.
//!
//! Feature areas live in submodules as further `impl Repository` blocks:
//! refs, config, remotes, branches, tracking, status, state, history and
//! transfer.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use super::core::{self, ExecutionResult, GitOptions, StderrHandler};

mod branches;
mod config;
mod history;
mod refs;
mod remotes;
mod state;
mod status;
mod tracking;
mod transfer;

pub use branches::{Branch, BranchTip, BranchType, CommitIdentity};
pub use config::{BranchConfig, parse_config_bool};
pub use history::{ChangedFile, Commit};
pub use refs::format_as_local_ref;
pub use remotes::{Remote, RemoteRole, find_default_remote};
pub use state::RebaseState;
pub use status::{
    AppFileStatusKind, BranchStatus, ConflictAction, ConflictDetail, FileEntry, GitStatusEntry,
    StatusResult, SubmoduleStatus,
};
pub use tracking::TrackingRef;
pub use transfer::{CheckoutOptions, ProgressCallback, PullOptions, PushOptions};

static DUBIOUS_OWNERSHIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"fatal: detected dubious ownership in repository at '(.+)'").expect("valid regex")
});

/// What a path turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryType {
    /// A repository with a working directory. Subdirectories resolve to the
    /// top level; submodules resolve to their own root.
    Regular { top_level_working_directory: PathBuf },
    Bare,
    /// Not a repository, or the path doesn't exist.
    Missing,
    /// A repository git refuses to use because another user owns it.
    Unsafe { path: PathBuf },
}

/// Repository context for git operations.
///
/// Holds only the path; every query spawns git afresh.
///
/// # Examples
///
/// ```no_run
/// use gongfeng_git::git::Repository;
///
/// let repo = Repository::current();
/// let branch = repo.current_branch()?;
/// let remotes = repo.remotes()?;
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    path: PathBuf,
}

impl Repository {
    /// Create a repository context at the specified path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a repository context for the current directory.
    pub fn current() -> Self {
        Self::at(".")
    }

    /// Get the path this repository context operates on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a git command with default options and return stdout.
    pub fn run_command(&self, args: &[&str]) -> anyhow::Result<String> {
        let context = args.first().copied().unwrap_or("git");
        Ok(self.run_with(args, context, &GitOptions::new())?.stdout)
    }

    /// Run a git command with explicit options.
    pub fn run_with(
        &self,
        args: &[&str],
        context: &str,
        options: &GitOptions,
    ) -> anyhow::Result<ExecutionResult> {
        core::run(args, &self.path, context, options)
    }

    /// Run a git command, streaming stderr to `handler`.
    pub fn run_streaming(
        &self,
        args: &[&str],
        context: &str,
        options: &GitOptions,
        handler: &mut dyn StderrHandler,
    ) -> anyhow::Result<ExecutionResult> {
        core::run_streaming(args, &self.path, context, options, handler)
    }

    /// Classify the path: regular repository, bare, missing, or unsafe.
    pub fn repository_type(&self) -> anyhow::Result<RepositoryType> {
        if !self.path.is_dir() {
            return Ok(RepositoryType::Missing);
        }

        let result = self.run_with(
            &["rev-parse", "--is-bare-repository", "--show-cdup"],
            "repository_type",
            &GitOptions::new().success_exit_codes([0, 128]),
        )?;

        if result.exit_code == 0 {
            let mut lines = result.stdout.lines();
            if lines.next().map(str::trim) == Some("true") {
                return Ok(RepositoryType::Bare);
            }
            let cdup = lines.next().map(str::trim).unwrap_or_default();
            let top = self.path.join(cdup);
            let top = dunce::canonicalize(&top).unwrap_or(top);
            return Ok(RepositoryType::Regular {
                top_level_working_directory: top,
            });
        }

        if let Some(caps) = DUBIOUS_OWNERSHIP_RE.captures(&result.stderr) {
            return Ok(RepositoryType::Unsafe {
                path: PathBuf::from(&caps[1]),
            });
        }

        Ok(RepositoryType::Missing)
    }

    /// Path of the repository context relative to the top level, e.g. `src/`.
    ///
    /// Empty at the top level; `None` outside a working tree.
    pub fn path_from_repo_root(&self) -> anyhow::Result<Option<String>> {
        let result = self.run_with(
            &["rev-parse", "--show-prefix"],
            "path_from_repo_root",
            &GitOptions::new().success_exit_codes([0, 128]),
        )?;
        if result.exit_code != 0 {
            return Ok(None);
        }
        Ok(Some(result.stdout.trim().to_string()))
    }

    /// The repository's top-level working directory, if it is a regular repository.
    pub fn top_level(&self) -> anyhow::Result<Option<PathBuf>> {
        Ok(match self.repository_type()? {
            RepositoryType::Regular {
                top_level_working_directory,
            } => Some(top_level_working_directory),
            _ => None,
        })
    }
}
