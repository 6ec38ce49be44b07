//! Tracking-branch resolution.
//!
//! Git's own upstream config is often missing for branches created by other
//! tools, so the tracking branch is inferred: a remote branch counts as the
//! tracking branch when it points at the same commit as `HEAD`.

use super::Repository;
use crate::git::core::GitOptions;

/// A remote branch a local branch tracks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackingRef {
    pub remote_name: String,
    pub branch_name: String,
}

impl TrackingRef {
    pub fn new(remote_name: impl Into<String>, branch_name: impl Into<String>) -> Self {
        Self {
            remote_name: remote_name.into(),
            branch_name: branch_name.into(),
        }
    }

    /// Full ref, e.g. `refs/remotes/origin/main`.
    pub fn to_ref(&self) -> String {
        format!("refs/remotes/{}/{}", self.remote_name, self.branch_name)
    }
}

impl std::fmt::Display for TrackingRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.remote_name, self.branch_name)
    }
}

/// Parse `show-ref --head` output into `(hash, refname)` pairs.
fn parse_show_ref(output: &str) -> Vec<(&str, &str)> {
    output
        .lines()
        .filter_map(|line| line.trim().split_once(' '))
        .collect()
}

/// First candidate whose ref exists with the same hash as `HEAD`.
fn pick_tracking_ref(candidates: Vec<TrackingRef>, refs: &[(&str, &str)]) -> Option<TrackingRef> {
    let head = refs
        .iter()
        .find(|(_, name)| *name == "HEAD")
        .map(|(hash, _)| *hash)?;
    candidates.into_iter().find(|candidate| {
        let full = candidate.to_ref();
        refs.iter()
            .any(|(hash, name)| *name == full && *hash == head)
    })
}

impl Repository {
    /// Infer the remote branch `branch` tracks.
    ///
    /// Candidates are the configured upstream (`branch.<b>.remote` and
    /// `branch.<b>.merge`) followed by a same-named branch on every remote.
    /// The first candidate that exists and points at the same commit as
    /// `HEAD` wins.
    pub fn determine_tracking_branch(&self, branch: &str) -> anyhow::Result<Option<TrackingRef>> {
        let remotes = self.remotes()?;
        if remotes.is_empty() {
            return Ok(None);
        }

        let mut candidates = Vec::new();
        if let Some(config) = self.branch_config(branch)?
            && let Some(remote) = config.remote_name()
        {
            candidates.push(TrackingRef::new(
                remote,
                config.merge_branch().unwrap_or_default(),
            ));
        }
        for remote in &remotes {
            let candidate = TrackingRef::new(&remote.name, branch);
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }

        let refs: Vec<String> = candidates.iter().map(TrackingRef::to_ref).collect();
        let mut args = vec!["show-ref", "--head"];
        args.extend(refs.iter().map(String::as_str));
        // Missing refs are skipped; exit 1 when nothing at all matched.
        let result = self.run_with(
            &args,
            "determine_tracking_branch",
            &GitOptions::new().success_exit_codes([0, 1, 128]),
        )?;

        Ok(pick_tracking_ref(candidates, &parse_show_ref(&result.stdout)))
    }
}
