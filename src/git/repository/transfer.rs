//! Fetch, pull, push and checkout with progress reporting.
//!
//! Each operation streams git's stderr through a [`ProgressTranslator`]:
//! the callback sees `value = 0` before git starts, intermediate values while
//! it runs, and `value = 1` only once git has exited successfully.

use std::path::Path;

use anyhow::Context;

use super::Repository;
use super::branches::{Branch, BranchType};
use crate::git::core::{ExecutionResult, GitOptions};
use crate::git::error::{ErrorClass, GitError};
use crate::git::progress::{OperationKind, ProgressEvent, ProgressTranslator};

/// Failures that may come from talking to a remote.
const AUTHENTICATION_ERRORS: [ErrorClass; 4] = [
    ErrorClass::AuthenticationFailed,
    ErrorClass::SSHKeyUnverified,
    ErrorClass::HostDown,
    ErrorClass::RepositoryNotFound,
];

#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    pub recurse_submodules: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// Ignored when setting a new upstream.
    pub force_with_lease: bool,
    /// Tags to push along with the branch.
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutOptions {
    pub recurse_submodules: bool,
}

/// Callback receiving progress events. `None` runs silently.
pub type ProgressCallback<'a> = Option<&'a mut dyn FnMut(ProgressEvent)>;

struct Transfer<'a> {
    kind: OperationKind,
    context: &'static str,
    title: String,
    remote: Option<&'a str>,
    branch: Option<&'a str>,
    expected_errors: &'a [ErrorClass],
}

fn command_error(result: ExecutionResult, args: &[&str]) -> anyhow::Error {
    GitError::Command {
        class: result.error_class.unwrap_or(ErrorClass::Unknown),
        exit_code: result.exit_code,
        stderr: result.stderr,
        args: args.iter().map(|a| a.to_string()).collect(),
    }
    .into()
}

impl Repository {
    /// `git fetch --prune <remote>`.
    pub fn fetch(&self, remote: &str, progress: ProgressCallback<'_>) -> anyhow::Result<()> {
        let args = ["fetch", "--progress", "--prune", remote];
        self.run_transfer(
            &args,
            Transfer {
                kind: OperationKind::Fetch,
                context: "fetch",
                title: format!("Fetching {remote}"),
                remote: Some(remote),
                branch: None,
                expected_errors: &AUTHENTICATION_ERRORS,
            },
            progress,
        )
    }

    /// `git pull <remote>`, defaulting to `--ff` unless `pull.ff` is configured.
    pub fn pull(
        &self,
        remote: &str,
        options: &PullOptions,
        progress: ProgressCallback<'_>,
    ) -> anyhow::Result<()> {
        let mut args = vec!["pull"];
        if self.config_value("pull.ff")?.is_none() {
            args.push("--ff");
        }
        if options.recurse_submodules {
            args.push("--recurse-submodules");
        }
        args.extend(["--progress", remote]);

        self.run_transfer(
            &args,
            Transfer {
                kind: OperationKind::Pull,
                context: "pull",
                title: format!("Pulling {remote}"),
                remote: Some(remote),
                branch: None,
                expected_errors: &AUTHENTICATION_ERRORS,
            },
            progress,
        )
    }

    /// Push `local_branch` to `remote`.
    ///
    /// Without `remote_branch` the branch is pushed under its own name and
    /// set as upstream.
    pub fn push(
        &self,
        remote: &str,
        local_branch: &str,
        remote_branch: Option<&str>,
        options: &PushOptions,
        progress: ProgressCallback<'_>,
    ) -> anyhow::Result<()> {
        let refspec = match remote_branch {
            Some(remote_branch) => format!("{local_branch}:{remote_branch}"),
            None => local_branch.to_string(),
        };
        let mut args = vec!["push", remote, refspec.as_str()];
        args.extend(options.tags.iter().map(String::as_str));
        if remote_branch.is_none() {
            args.push("--set-upstream");
        } else if options.force_with_lease {
            args.push("--force-with-lease");
        }
        args.push("--progress");

        let mut expected = AUTHENTICATION_ERRORS.to_vec();
        expected.push(ErrorClass::ProtectedBranchForcePush);
        self.run_transfer(
            &args,
            Transfer {
                kind: OperationKind::Push,
                context: "push",
                title: format!("Pushing to {remote}"),
                remote: Some(remote),
                branch: Some(local_branch),
                expected_errors: &expected,
            },
            progress,
        )
    }

    /// Check out `branch`. A remote branch gets a local branch of the same
    /// name created from it.
    pub fn checkout_branch(
        &self,
        branch: &Branch,
        options: &CheckoutOptions,
        progress: ProgressCallback<'_>,
    ) -> anyhow::Result<()> {
        let mut args = vec!["checkout", "--progress"];
        if branch.branch_type == BranchType::Remote {
            args.extend(["-b", branch.name_without_remote()]);
        }
        args.push(branch.name.as_str());
        if options.recurse_submodules {
            args.push("--recurse-submodules");
        }
        args.push("--");

        self.run_transfer(
            &args,
            Transfer {
                kind: OperationKind::Checkout,
                context: "checkout_branch",
                title: format!("Checking out branch {}", branch.name),
                remote: branch.remote_name(),
                branch: Some(branch.name.as_str()),
                expected_errors: &AUTHENTICATION_ERRORS,
            },
            progress,
        )
    }

    /// Restore `paths` in the index and working tree to their `HEAD` versions.
    pub fn checkout_paths(&self, paths: &[&str]) -> anyhow::Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["checkout", "HEAD", "--"];
        args.extend_from_slice(paths);
        self.run_command(&args)?;
        Ok(())
    }

    /// Clone `url` into `path` and return a handle on the new repository.
    pub fn clone_from(
        url: &str,
        path: &Path,
        progress: ProgressCallback<'_>,
    ) -> anyhow::Result<Repository> {
        let name = path
            .file_name()
            .with_context(|| format!("{} does not name a directory", path.display()))?
            .to_string_lossy()
            .into_owned();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;

        let args = ["clone", "--progress", "--", url, name.as_str()];
        Repository::at(parent).run_transfer(
            &args,
            Transfer {
                kind: OperationKind::Clone,
                context: "clone",
                title: format!("Cloning into {name}"),
                remote: None,
                branch: None,
                expected_errors: &AUTHENTICATION_ERRORS,
            },
            progress,
        )?;
        Ok(Repository::at(path))
    }

    fn run_transfer(
        &self,
        args: &[&str],
        transfer: Transfer<'_>,
        progress: ProgressCallback<'_>,
    ) -> anyhow::Result<()> {
        let track_lfs = crate::config::settings().track_lfs_progress;
        let mut silent = |_: ProgressEvent| {};
        let callback: &mut dyn FnMut(ProgressEvent) = match progress {
            Some(callback) => callback,
            None => &mut silent,
        };

        let mut translator =
            ProgressTranslator::new(transfer.kind, transfer.title, track_lfs, callback)?;
        if let Some(remote) = transfer.remote {
            translator = translator.remote(remote);
        }
        if let Some(branch) = transfer.branch {
            translator = translator.branch(branch);
        }

        let options = GitOptions::new()
            .expected_errors(transfer.expected_errors.iter().copied())
            .track_lfs_progress(track_lfs);

        translator.start();
        let result = self.run_streaming(args, transfer.context, &options, &mut translator)?;
        if !result.succeeded() {
            // Expected classes come back as data; a transfer still failed.
            return Err(command_error(result, args));
        }
        translator.finish();
        Ok(())
    }
}
