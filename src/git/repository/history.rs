//! Commit history for Repository.

use super::branches::CommitIdentity;
use super::status::AppFileStatusKind;
use super::Repository;
use crate::git::core::GitOptions;
use crate::git::error::ErrorClass;

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

/// `git log` format matching [`parse_commits`]; identities in raw form.
const LOG_FORMAT: &str =
    "--format=%H%x1f%h%x1f%s%x1f%b%x1f%an <%ae> %ad%x1f%cn <%ce> %cd%x1f%P%x1f%D%x1e";

/// A commit as loaded from git.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub sha: String,
    pub short_sha: String,
    pub summary: String,
    pub body: String,
    pub author: CommitIdentity,
    pub committer: CommitIdentity,
    pub parent_shas: Vec<String>,
    /// Tags pointing at this commit.
    pub tags: Vec<String>,
}

impl Commit {
    pub fn is_merge(&self) -> bool {
        self.parent_shas.len() > 1
    }
}

/// A file changed by a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,
    pub old_path: Option<String>,
    pub kind: AppFileStatusKind,
}

fn parse_commits(output: &str) -> Vec<Commit> {
    output
        .split(RECORD_SEP)
        .map(|record| record.trim_start_matches('\n'))
        .filter(|record| !record.is_empty())
        .filter_map(|record| {
            let fields: Vec<&str> = record.split(FIELD_SEP).collect();
            let [sha, short_sha, summary, body, author, committer, parents, refs] = fields[..]
            else {
                log::debug!("Skipping malformed log record {record:?}");
                return None;
            };
            Some(Commit {
                sha: sha.to_string(),
                short_sha: short_sha.to_string(),
                summary: summary.to_string(),
                body: body.trim_end().to_string(),
                author: CommitIdentity::parse(author)?,
                committer: CommitIdentity::parse(committer)?,
                parent_shas: parents.split_whitespace().map(str::to_string).collect(),
                tags: refs
                    .split(", ")
                    .filter_map(|r| r.strip_prefix("tag: "))
                    .map(str::to_string)
                    .collect(),
            })
        })
        .collect()
}

/// Parse `--name-status -z` output: a status token followed by one path,
/// or two paths for renames and copies.
fn parse_changed_files(output: &str) -> Vec<ChangedFile> {
    let mut files = Vec::new();
    let mut tokens = output.split('\0').filter(|t| !t.is_empty());
    while let Some(status) = tokens.next() {
        let kind = match status.chars().next() {
            Some('A') => AppFileStatusKind::New,
            Some('D') => AppFileStatusKind::Deleted,
            Some('R') => AppFileStatusKind::Renamed,
            Some('C') => AppFileStatusKind::Copied,
            Some('U') => AppFileStatusKind::Conflicted,
            _ => AppFileStatusKind::Modified,
        };
        let old_path = match kind {
            AppFileStatusKind::Renamed | AppFileStatusKind::Copied => tokens.next(),
            _ => None,
        };
        let Some(path) = tokens.next() else {
            break;
        };
        files.push(ChangedFile {
            path: path.to_string(),
            old_path: old_path.map(str::to_string),
            kind,
        });
    }
    files
}

/// Paths `diff --numstat -z` reports as binary (`-` for both counts).
///
/// Each record is `<added>\t<deleted>\t<path>\0`; renames leave the path
/// empty and follow with `<old>\0<new>\0`.
fn parse_binary_paths(output: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut tokens = output.split('\0');
    while let Some(record) = tokens.next() {
        let mut fields = record.splitn(3, '\t');
        let (Some(added), Some(deleted), Some(path)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let path = if path.is_empty() {
            // Skip the old path of a rename.
            let Some(new) = tokens.nth(1) else {
                break;
            };
            new
        } else {
            path
        };
        if added == "-" && deleted == "-" {
            paths.push(path.to_string());
        }
    }
    paths
}

impl Repository {
    /// Commits reachable from `revision_range` (default `HEAD`), newest first.
    ///
    /// Empty before the first commit and outside a repository.
    pub fn commits(
        &self,
        revision_range: Option<&str>,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Commit>> {
        if revision_range.is_none() && self.rev_parse("HEAD")?.is_none() {
            return Ok(Vec::new());
        }
        let limit_arg = limit.map(|n| format!("--max-count={n}"));
        let mut args = vec![
            "-c",
            "log.showSignature=false",
            "log",
            "--no-color",
            "--date=raw",
            LOG_FORMAT,
        ];
        if let Some(limit_arg) = &limit_arg {
            args.push(limit_arg);
        }
        args.push(revision_range.unwrap_or("HEAD"));
        args.push("--");

        let result = self.run_with(
            &args,
            "commits",
            &GitOptions::new().expected_errors([ErrorClass::NotAGitRepository]),
        )?;
        if result.error_class.is_some() {
            return Ok(Vec::new());
        }
        Ok(parse_commits(&result.stdout))
    }

    /// A single commit by revision.
    pub fn commit(&self, revision: &str) -> anyhow::Result<Option<Commit>> {
        let Some(sha) = self.rev_parse(revision)? else {
            return Ok(None);
        };
        Ok(self.commits(Some(&sha), Some(1))?.into_iter().next())
    }

    /// Files changed by `sha` relative to its first parent, with rename and
    /// copy detection.
    pub fn changed_files(&self, sha: &str) -> anyhow::Result<Vec<ChangedFile>> {
        let output = self.run_command(&[
            "log",
            sha,
            "-C",
            "-M",
            "-m",
            "-1",
            "--no-show-signature",
            "--first-parent",
            "--name-status",
            "--format=format:",
            "-z",
            "--",
        ])?;
        Ok(parse_changed_files(&output))
    }

    /// Binary files that differ between the working tree and `reference`.
    pub fn binary_paths(&self, reference: &str) -> anyhow::Result<Vec<String>> {
        let output = self.run_command(&["diff", "--numstat", "-z", reference, "--"])?;
        Ok(parse_binary_paths(&output))
    }
}
