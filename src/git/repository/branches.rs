//! Branch enumeration for Repository.

use chrono::{DateTime, FixedOffset};

use super::Repository;
use super::refs::format_as_local_ref;
use crate::git::core::GitOptions;
use crate::git::error::ErrorClass;

/// Field separator in `for-each-ref` output.
const FIELD_SEP: char = '\u{1f}';

/// Local branches sort before remote ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum BranchType {
    Local,
    Remote,
}

/// Who made a commit, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
    pub date: DateTime<FixedOffset>,
}

impl CommitIdentity {
    /// Parse git's raw identity form: `Name <email> 1700000000 +0100`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (name, rest) = raw.split_once(" <")?;
        let (email, rest) = rest.split_once("> ")?;
        let (timestamp, offset) = rest.trim().split_once(' ')?;
        Some(Self {
            name: name.trim().to_string(),
            email: email.to_string(),
            date: parse_raw_date(timestamp, offset)?,
        })
    }
}

fn parse_raw_date(timestamp: &str, offset: &str) -> Option<DateTime<FixedOffset>> {
    let secs: i64 = timestamp.parse().ok()?;
    let (sign, digits) = match offset.as_bytes().first()? {
        b'+' => (1, &offset[1..]),
        b'-' => (-1, &offset[1..]),
        _ => return None,
    };
    if digits.len() != 4 {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;
    Some(DateTime::from_timestamp(secs, 0)?.with_timezone(&offset))
}

/// The latest commit on a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchTip {
    pub sha: String,
    pub author: CommitIdentity,
}

/// A branch as loaded from git.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    /// Short name: `main` for local branches, `origin/main` for remote ones.
    pub name: String,
    pub branch_type: BranchType,
    /// Remote-prefixed upstream, e.g. `origin/main`.
    pub upstream: Option<String>,
    pub tip: BranchTip,
    /// Full ref, e.g. `refs/heads/main`.
    pub ref_name: String,
}

impl Branch {
    /// Remote of a remote branch, from its ref. `None` for local branches.
    pub fn remote_name(&self) -> Option<&str> {
        match self.branch_type {
            BranchType::Local => None,
            BranchType::Remote => self
                .ref_name
                .strip_prefix("refs/remotes/")?
                .split_once('/')
                .map(|(remote, _)| remote),
        }
    }

    /// Remote part of the upstream, e.g. `origin`.
    pub fn upstream_remote_name(&self) -> Option<&str> {
        self.upstream
            .as_deref()?
            .split_once('/')
            .map(|(remote, _)| remote)
    }

    /// Upstream without its remote prefix, e.g. `main`.
    pub fn upstream_without_remote(&self) -> Option<&str> {
        self.upstream.as_deref().map(remove_remote_prefix)
    }

    /// Name without the remote prefix; local branches return `name`.
    pub fn name_without_remote(&self) -> &str {
        match self.branch_type {
            BranchType::Local => &self.name,
            BranchType::Remote => remove_remote_prefix(&self.name),
        }
    }
}

fn remove_remote_prefix(name: &str) -> &str {
    match name.split_once('/') {
        Some((_, rest)) if !rest.is_empty() => rest,
        _ => name,
    }
}

/// Short upstream name: `refs/remotes/` stripped, other refs kept whole.
fn short_upstream(full: &str) -> Option<String> {
    if full.is_empty() {
        return None;
    }
    Some(full.strip_prefix("refs/remotes/").unwrap_or(full).to_string())
}

fn parse_branches(output: &str) -> Vec<Branch> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split(FIELD_SEP);
            let ref_name = fields.next()?;
            let upstream = fields.next()?;
            let symref = fields.next()?;
            let sha = fields.next()?;
            let author = fields.next()?;

            if !symref.is_empty() {
                return None;
            }
            let (branch_type, name) = if let Some(name) = ref_name.strip_prefix("refs/heads/") {
                (BranchType::Local, name)
            } else if let Some(name) = ref_name.strip_prefix("refs/remotes/") {
                (BranchType::Remote, name)
            } else {
                return None;
            };
            if branch_type == BranchType::Remote && name.ends_with("/HEAD") {
                return None;
            }
            let Some(author) = CommitIdentity::parse(author) else {
                log::debug!("Skipping {ref_name}: unparseable author {author:?}");
                return None;
            };

            Some(Branch {
                name: name.to_string(),
                branch_type,
                upstream: short_upstream(upstream),
                tip: BranchTip {
                    sha: sha.to_string(),
                    author,
                },
                ref_name: ref_name.to_string(),
            })
        })
        .collect()
}

impl Repository {
    /// All local and remote-tracking branches. Empty outside a repository.
    ///
    /// `<remote>/HEAD` symrefs are skipped.
    pub fn branches(&self) -> anyhow::Result<Vec<Branch>> {
        if !self.path().is_dir() {
            return Ok(Vec::new());
        }
        let format = [
            "%(refname)",
            "%(upstream)",
            "%(symref)",
            "%(objectname)",
            "%(author)",
        ]
        .join("%1f");
        let result = self.run_with(
            &[
                "for-each-ref",
                &format!("--format={format}"),
                "refs/heads",
                "refs/remotes",
            ],
            "branches",
            &GitOptions::new().expected_errors([ErrorClass::NotAGitRepository]),
        )?;
        if result.error_class.is_some() {
            return Ok(Vec::new());
        }
        Ok(parse_branches(&result.stdout))
    }

    /// Whether a local branch named `branch` exists.
    pub fn local_branch_exists(&self, branch: &str) -> anyhow::Result<bool> {
        Ok(self.ref_sha(&format_as_local_ref(branch))?.is_some())
    }

    /// Whether `remote` currently has a branch named `branch`.
    ///
    /// Asks the remote itself, so remote-tracking refs may be stale.
    pub fn remote_branch_exists(&self, remote: &str, branch: &str) -> anyhow::Result<bool> {
        let pattern = format_as_local_ref(branch);
        // Exit 2 when no ref matched.
        let result = self.run_with(
            &["ls-remote", "--exit-code", "--heads", remote, &pattern],
            "remote_branch_exists",
            &GitOptions::new().success_exit_codes([0, 2]),
        )?;
        Ok(result.exit_code == 0 && !result.stdout.trim().is_empty())
    }

    /// Local branches whose tip differs from their upstream's tip.
    ///
    /// Branches whose upstream is gone are not included.
    pub fn branches_differing_from_upstream(&self) -> anyhow::Result<Vec<Branch>> {
        let branches = self.branches()?;
        let differing = branches
            .iter()
            .filter(|b| b.branch_type == BranchType::Local)
            .filter(|b| {
                let Some(upstream) = b.upstream.as_deref() else {
                    return false;
                };
                branches
                    .iter()
                    .find(|u| u.branch_type == BranchType::Remote && u.name == upstream)
                    .is_some_and(|u| u.tip.sha != b.tip.sha)
            })
            .cloned()
            .collect();
        Ok(differing)
    }

    /// Fast-forward local branches to their upstreams without checking them out.
    ///
    /// The checked-out branch is skipped. Branches that can't fast-forward are
    /// left alone; `FETCH_HEAD` is not written.
    pub fn fast_forward_branches(&self, branches: &[Branch]) -> anyhow::Result<()> {
        let current = self.current_branch()?;
        let refspecs: Vec<String> = branches
            .iter()
            .filter(|b| b.branch_type == BranchType::Local)
            .filter(|b| current.as_deref() != Some(b.name.as_str()))
            .filter_map(|b| {
                let upstream = b.upstream.as_deref()?;
                let upstream_ref = if upstream.starts_with("refs/") {
                    upstream.to_string()
                } else {
                    format!("refs/remotes/{upstream}")
                };
                Some(format!("{upstream_ref}:{}", b.ref_name))
            })
            .collect();

        if refspecs.is_empty() {
            return Ok(());
        }

        let mut args = vec!["fetch", "--no-write-fetch-head", "--quiet", "."];
        args.extend(refspecs.iter().map(String::as_str));
        // Exit 1 when any refspec was rejected as non-fast-forward.
        let result = self.run_with(
            &args,
            "fast_forward_branches",
            &GitOptions::new().success_exit_codes([0, 1]),
        )?;
        if result.exit_code != 0 {
            log::debug!(
                "Some branches could not be fast-forwarded: {}",
                result.stderr.trim()
            );
        }
        Ok(())
    }
}
