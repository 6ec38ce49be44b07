//! Git introspection and operations.
//!
//! [`Repository`] is the entry point; [`core`] runs git, [`error`] classifies
//! its failures and [`progress`] turns its stderr into [`ProgressEvent`]s.

pub mod core;
pub mod error;
pub mod progress;
mod repository;
pub mod url;

pub use error::{ErrorClass, GitError, error_class, git_error, is_git_not_found};
pub use progress::{OperationKind, ProgressEvent};
pub use repository::{
    AppFileStatusKind, Branch, BranchConfig, BranchStatus, BranchTip, BranchType, ChangedFile,
    CheckoutOptions, Commit, CommitIdentity, ConflictAction, ConflictDetail, FileEntry,
    GitStatusEntry, ProgressCallback, PullOptions, PushOptions, RebaseState, Remote, RemoteRole,
    Repository, RepositoryType, StatusResult, SubmoduleStatus, TrackingRef, find_default_remote,
    format_as_local_ref, parse_config_bool,
};
pub use url::{GitRemoteUrl, Protocol};
