//! Git error classification and the error type surfaced by this crate.
//!
//! Uses anyhow for propagation. [`GitError`] carries the semantic detail that
//! callers pattern-match on; recover it with [`git_error`] or [`error_class`].
//!
//! All stderr patterns live in [`ERROR_PATTERNS`]. The first matching entry
//! wins, so more specific patterns come before general ones.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::styling::{ERROR, ERROR_BOLD, ERROR_EMOJI, HINT, HINT_EMOJI, format_with_gutter};

/// Classified git failure, derived from stderr and exit code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter, strum::IntoStaticStr,
)]
#[non_exhaustive]
pub enum ErrorClass {
    NotAGitRepository,
    BadRevision,
    InvalidObjectName,
    AuthenticationFailed,
    SSHKeyUnverified,
    RepositoryNotFound,
    RemoteDisconnection,
    HostDown,
    ProtectedBranchForcePush,
    ProtectedBranchPushRejected,
    PushRejectedNonFastForward,
    PushWithFileSizeExceedingLimit,
    RemoteAlreadyExists,
    BranchAlreadyExists,
    TagAlreadyExists,
    NoMatchingRemoteBranch,
    CannotMergeUnrelatedHistories,
    MergeConflicts,
    RebaseConflicts,
    LocalChangesOverwritten,
    NothingToCommit,
    LockFileAlreadyExists,
    ConfigLockFileAlreadyExists,
    UnsafeDirectory,
    /// Non-zero exit that matched no known pattern.
    Unknown,
}

/// Ordered `(class, pattern)` table. Patterns are compiled multi-line.
static ERROR_PATTERNS: &[(ErrorClass, &str)] = &[
    (
        ErrorClass::NotAGitRepository,
        r"fatal: [Nn]ot a git repository( \(or any (of the parent directories|parent up to mount point .+)\))?",
    ),
    (ErrorClass::UnsafeDirectory, r"fatal: detected dubious ownership in repository at"),
    (ErrorClass::BadRevision, r"fatal: bad revision '(.*)'"),
    (ErrorClass::InvalidObjectName, r"fatal: invalid object name '(.+)'"),
    (ErrorClass::SSHKeyUnverified, r"\[EPOLICYKEYAGE\]"),
    (
        ErrorClass::AuthenticationFailed,
        r"(fatal: Authentication failed|fatal: could not read Username for|HTTP Basic: Access denied|remote: HTTP Basic: Access denied|Permission denied \(publickey)",
    ),
    (
        ErrorClass::RepositoryNotFound,
        r"(fatal: repository '(.+)' not found|ERROR: Repository not found|The project you were looking for could not be found)",
    ),
    (ErrorClass::HostDown, r"fatal: unable to access '(.+)': Failed to connect to (.+): Host is down"),
    (
        ErrorClass::RemoteDisconnection,
        r"(fatal: [Tt]he remote end hung up unexpectedly|fatal: Could not read from remote repository)",
    ),
    (
        ErrorClass::ProtectedBranchForcePush,
        r"(Cannot force-push to a protected branch|You are not allowed to force push code to a protected branch)",
    ),
    (
        ErrorClass::ProtectedBranchPushRejected,
        r"(You are not allowed to push code to protected branches|Protected branch update failed for (.+))",
    ),
    (
        ErrorClass::PushRejectedNonFastForward,
        r"\((non-fast-forward|fetch first)\)\n(hint: .*\n)*error: failed to push some refs to",
    ),
    (
        ErrorClass::PushWithFileSizeExceedingLimit,
        r"(exceeds file size limit|error: GH001: )",
    ),
    (ErrorClass::RemoteAlreadyExists, r"error: remote (.+) already exists\."),
    (ErrorClass::BranchAlreadyExists, r"fatal: (A branch named|a branch named) '(.+)' already exists"),
    (ErrorClass::TagAlreadyExists, r"fatal: tag '(.+)' already exists"),
    (
        ErrorClass::NoMatchingRemoteBranch,
        r"There are no candidates for (rebasing|merging) among the refs that you just fetched\.",
    ),
    (ErrorClass::CannotMergeUnrelatedHistories, r"fatal: refusing to merge unrelated histories"),
    (ErrorClass::RebaseConflicts, r"(Failed to merge in the changes\.|could not apply [0-9a-f]+)"),
    (
        ErrorClass::MergeConflicts,
        r"(Merge conflict|Automatic merge failed; fix conflicts and then commit the result\.)",
    ),
    (
        ErrorClass::LocalChangesOverwritten,
        r"error: (Your local changes to the following|The following untracked working tree) files would be overwritten by",
    ),
    (ErrorClass::NothingToCommit, r"nothing to commit"),
    (ErrorClass::ConfigLockFileAlreadyExists, r"error: could not lock config file (.+): File exists"),
    (
        ErrorClass::LockFileAlreadyExists,
        r"Another git process seems to be running in this repository",
    ),
];

static COMPILED_PATTERNS: Lazy<Vec<(ErrorClass, Regex)>> = Lazy::new(|| {
    ERROR_PATTERNS
        .iter()
        .filter_map(|(class, pattern)| match Regex::new(&format!("(?m){pattern}")) {
            Ok(re) => Some((*class, re)),
            Err(e) => {
                log::warn!("Invalid git error pattern for {class}: {e}");
                None
            }
        })
        .collect()
});

/// Classify a failed invocation from its output.
///
/// Returns `None` for a zero exit code. Otherwise returns the first matching
/// class, or [`ErrorClass::Unknown`] when nothing matches.
pub fn classify(stderr: &str, exit_code: i32) -> Option<ErrorClass> {
    if exit_code == 0 {
        return None;
    }
    Some(match_pattern(stderr).unwrap_or(ErrorClass::Unknown))
}

fn match_pattern(text: &str) -> Option<ErrorClass> {
    COMPILED_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(class, _)| *class)
}

/// Classify using stderr first, then stdout (some commands report on stdout).
pub(crate) fn classify_output(stderr: &str, stdout: &str, exit_code: i32) -> Option<ErrorClass> {
    if exit_code == 0 {
        return None;
    }
    Some(
        match_pattern(stderr)
            .or_else(|| match_pattern(stdout))
            .unwrap_or(ErrorClass::Unknown),
    )
}

impl ErrorClass {
    /// Short human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            ErrorClass::NotAGitRepository => "Not a git repository",
            ErrorClass::BadRevision => "Bad revision",
            ErrorClass::InvalidObjectName => "Invalid object name",
            ErrorClass::AuthenticationFailed => "Authentication failed",
            ErrorClass::SSHKeyUnverified => "The SSH key used for this push is no longer verified",
            ErrorClass::RepositoryNotFound => "Repository not found",
            ErrorClass::RemoteDisconnection => "The remote disconnected",
            ErrorClass::HostDown => "The host is down",
            ErrorClass::ProtectedBranchForcePush => "Cannot force push to a protected branch",
            ErrorClass::ProtectedBranchPushRejected => "Push to a protected branch was rejected",
            ErrorClass::PushRejectedNonFastForward => {
                "The remote contains commits not present locally"
            }
            ErrorClass::PushWithFileSizeExceedingLimit => "A file exceeds the size limit",
            ErrorClass::RemoteAlreadyExists => "A remote with that name already exists",
            ErrorClass::BranchAlreadyExists => "A branch with that name already exists",
            ErrorClass::TagAlreadyExists => "A tag with that name already exists",
            ErrorClass::NoMatchingRemoteBranch => "No matching branch on the remote",
            ErrorClass::CannotMergeUnrelatedHistories => "Unable to merge unrelated histories",
            ErrorClass::MergeConflicts => "Merge produced conflicts",
            ErrorClass::RebaseConflicts => "Rebase produced conflicts",
            ErrorClass::LocalChangesOverwritten => "Local changes would be overwritten",
            ErrorClass::NothingToCommit => "Nothing to commit",
            ErrorClass::LockFileAlreadyExists => "Another git process holds the index lock",
            ErrorClass::ConfigLockFileAlreadyExists => "The git config file is locked",
            ErrorClass::UnsafeDirectory => "Repository owned by another user",
            ErrorClass::Unknown => "Git command failed",
        }
    }

    /// Actionable suggestion, when one exists.
    pub fn hint(self) -> Option<&'static str> {
        match self {
            ErrorClass::AuthenticationFailed => {
                Some("Log in again or check that your credentials can access this repository")
            }
            ErrorClass::SSHKeyUnverified => Some("Re-verify your SSH key in your account settings"),
            ErrorClass::RepositoryNotFound => {
                Some("Check the remote URL and that you have access to the project")
            }
            ErrorClass::RemoteDisconnection | ErrorClass::HostDown => {
                Some("Check your network connection and try again")
            }
            ErrorClass::ProtectedBranchForcePush | ErrorClass::ProtectedBranchPushRejected => {
                Some("Push to a new branch and open a merge request instead")
            }
            ErrorClass::PushRejectedNonFastForward => Some("Pull the latest changes, then push again"),
            ErrorClass::LocalChangesOverwritten => Some("Commit or stash your changes first"),
            ErrorClass::LockFileAlreadyExists => {
                Some("Wait for the other git process to finish, or remove .git/index.lock")
            }
            ErrorClass::UnsafeDirectory => {
                Some("Add the repository to git's safe.directory list")
            }
            ErrorClass::NotAGitRepository => Some("Run this inside a git repository"),
            _ => None,
        }
    }
}

/// Errors surfaced by git invocations.
#[derive(Debug)]
pub enum GitError {
    /// The git executable could not be found. Never suppressible.
    GitNotFound { program: PathBuf },
    /// The process could not be started for another reason.
    Spawn { program: PathBuf, message: String },
    /// Git ran and failed in a way the caller did not declare as expected.
    Command {
        class: ErrorClass,
        exit_code: i32,
        stderr: String,
        args: Vec<String>,
    },
}

impl GitError {
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            GitError::Command { class, .. } => Some(*class),
            _ => None,
        }
    }
}

impl std::fmt::Display for GitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitError::GitNotFound { program } => write!(
                f,
                "{ERROR_EMOJI} {ERROR}Git executable not found: {ERROR_BOLD}{}{ERROR_BOLD:#}{ERROR:#}\n\n{HINT_EMOJI} {HINT}Install git from https://git-scm.com/downloads or set git_path in the config file{HINT:#}",
                program.display()
            ),
            GitError::Spawn { program, message } => write!(
                f,
                "{ERROR_EMOJI} {ERROR}Failed to run {ERROR_BOLD}{}{ERROR_BOLD:#}{ERROR}: {message}{ERROR:#}",
                program.display()
            ),
            GitError::Command {
                class,
                exit_code,
                stderr,
                args,
            } => {
                let command = args.first().map(String::as_str).unwrap_or("git");
                write!(
                    f,
                    "{ERROR_EMOJI} {ERROR}{}{ERROR:#} {ERROR}(git {ERROR_BOLD}{command}{ERROR_BOLD:#}{ERROR} exited with {exit_code}){ERROR:#}",
                    class.description()
                )?;
                let trimmed = stderr.trim();
                if !trimmed.is_empty() {
                    write!(f, "\n{}", format_with_gutter(trimmed))?;
                }
                if let Some(hint) = class.hint() {
                    write!(f, "\n\n{HINT_EMOJI} {HINT}{hint}{HINT:#}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for GitError {}

/// Find the [`GitError`] inside an anyhow error, if any.
pub fn git_error(err: &anyhow::Error) -> Option<&GitError> {
    err.downcast_ref::<GitError>()
}

/// Extract the error class from an anyhow error, if it came from git.
pub fn error_class(err: &anyhow::Error) -> Option<ErrorClass> {
    git_error(err).and_then(GitError::class)
}

/// Check if error means git itself is missing.
pub fn is_git_not_found(err: &anyhow::Error) -> bool {
    git_error(err).is_some_and(|e| matches!(e, GitError::GitNotFound { .. }))
}
