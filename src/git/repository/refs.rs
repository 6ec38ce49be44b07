//! Ref resolution for Repository.

use super::Repository;
use crate::git::core::GitOptions;

/// Qualify a branch name as a local ref.
///
/// - `refs/heads/x` is returned unchanged
/// - `heads/x` becomes `refs/heads/x`
/// - anything else becomes `refs/heads/<name>`
pub fn format_as_local_ref(name: &str) -> String {
    if name.starts_with("refs/heads/") {
        name.to_string()
    } else if name.starts_with("heads/") {
        format!("refs/{name}")
    } else {
        format!("refs/heads/{name}")
    }
}

impl Repository {
    /// Resolve a symbolic ref to the ref it points at.
    ///
    /// Returns `None` when `reference` is not symbolic or doesn't exist.
    pub fn symbolic_ref(&self, reference: &str) -> anyhow::Result<Option<String>> {
        let result = self.run_with(
            &["symbolic-ref", "-q", reference],
            "symbolic_ref",
            &GitOptions::new().success_exit_codes([0, 1, 128]),
        )?;
        if result.exit_code == 1 || result.exit_code == 128 {
            return Ok(None);
        }
        Ok(Some(result.stdout.trim().to_string()))
    }

    /// Get the current branch name, or `None` when HEAD is detached or the
    /// path is not a repository.
    pub fn current_branch(&self) -> anyhow::Result<Option<String>> {
        Ok(self.symbolic_ref("HEAD")?.map(|reference| {
            reference
                .strip_prefix("refs/heads/")
                .map(str::to_string)
                .unwrap_or(reference)
        }))
    }

    /// Verify a ref, returning git's `"<sha> <ref>"` line.
    ///
    /// Returns `None` when the ref doesn't exist.
    pub fn ref_sha(&self, reference: &str) -> anyhow::Result<Option<String>> {
        let result = self.run_with(
            &["show-ref", "--verify", "--", reference],
            "ref_sha",
            &GitOptions::new().success_exit_codes([0, 128]),
        )?;
        if result.exit_code == 128 {
            return Ok(None);
        }
        Ok(Some(result.stdout.trim().to_string()))
    }

    /// The commit SHA a revision resolves to.
    pub fn rev_parse(&self, revision: &str) -> anyhow::Result<Option<String>> {
        let result = self.run_with(
            &["rev-parse", "--verify", "--quiet", &format!("{revision}^{{commit}}")],
            "rev_parse",
            &GitOptions::new().success_exit_codes([0, 1, 128]),
        )?;
        if result.exit_code != 0 {
            return Ok(None);
        }
        Ok(Some(result.stdout.trim().to_string()))
    }
}
