//! In-progress operations, read from marker files in the git directory.

use std::path::PathBuf;

use super::Repository;
use crate::git::core::GitOptions;

/// A rebase stopped part-way, e.g. on a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebaseState {
    /// Tip of the branch before the rebase started.
    pub original_branch_tip: String,
    /// Branch being rebased, without `refs/heads/`.
    pub target_branch: String,
    /// Commit the branch is being replayed onto.
    pub base_branch_tip: String,
}

impl Repository {
    /// Absolute path of `name` inside the git directory, honouring worktrees
    /// and `GIT_DIR`. `None` outside a repository.
    fn git_path(&self, name: &str) -> anyhow::Result<Option<PathBuf>> {
        let result = self.run_with(
            &["rev-parse", "--path-format=absolute", "--git-path", name],
            "git_path",
            &GitOptions::new().success_exit_codes([0, 128]),
        )?;
        if result.exit_code != 0 {
            return Ok(None);
        }
        Ok(Some(PathBuf::from(result.stdout.trim())))
    }

    fn git_path_exists(&self, name: &str) -> anyhow::Result<bool> {
        Ok(self.git_path(name)?.is_some_and(|path| path.exists()))
    }

    /// Whether `MERGE_HEAD` exists.
    pub fn merge_in_progress(&self) -> anyhow::Result<bool> {
        self.git_path_exists("MERGE_HEAD")
    }

    /// Whether `SQUASH_MSG` exists, left by `merge --squash` until the commit.
    ///
    /// Aborting the merge doesn't remove it.
    pub fn squash_message_set(&self) -> anyhow::Result<bool> {
        self.git_path_exists("SQUASH_MSG")
    }

    /// Whether a cherry-pick stopped part-way.
    pub fn cherry_pick_in_progress(&self) -> anyhow::Result<bool> {
        self.git_path_exists("CHERRY_PICK_HEAD")
    }

    /// State of a stopped rebase. `None` when no rebase is stopped or its
    /// state files can't be read.
    pub fn rebase_state(&self) -> anyhow::Result<Option<RebaseState>> {
        if !self.git_path_exists("REBASE_HEAD")? {
            return Ok(None);
        }
        let Some(dir) = self.git_path("rebase-merge")? else {
            return Ok(None);
        };

        let read = |name: &str| match std::fs::read_to_string(dir.join(name)) {
            Ok(contents) => Some(contents.trim().to_string()),
            Err(e) => {
                log::debug!("Reading rebase-merge/{name} failed: {e}");
                None
            }
        };
        let (Some(original_branch_tip), Some(head_name), Some(base_branch_tip)) =
            (read("orig-head"), read("head-name"), read("onto"))
        else {
            return Ok(None);
        };

        let target_branch = head_name
            .strip_prefix("refs/heads/")
            .unwrap_or(&head_name)
            .to_string();
        Ok(Some(RebaseState {
            original_branch_tip,
            target_branch,
            base_branch_tip,
        }))
    }
}
