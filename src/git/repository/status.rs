//! Working-directory status from `git status --porcelain=2 -z`.
//!
//! Record formats (see `git help status`):
//!
//! ```text
//! # branch.oid <commit> | (initial)
//! # branch.head <branch> | (detached)
//! # branch.upstream <upstream>
//! # branch.ab +<ahead> -<behind>
//! 1 <XY> <sub> <mH> <mI> <mW> <hH> <hI> <path>
//! 2 <XY> <sub> <mH> <mI> <mW> <hH> <hI> <X><score> <path>\0<origPath>
//! u <XY> <sub> <m1> <m2> <m3> <mW> <h1> <h2> <h3> <path>
//! ? <path>
//! ```
//!
//! Paths are relative to the repository root.

use std::path::Path;

use super::Repository;
use crate::git::core::GitOptions;
use crate::git::error::ErrorClass;

/// Bytes inspected when deciding whether a file is binary.
const BINARY_SNIFF_LEN: usize = 8000;

const CONFLICT_MARKERS: [&str; 3] = ["<<<<<<<", "=======", ">>>>>>>"];

/// Summary kind of a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
pub enum AppFileStatusKind {
    New,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Conflicted,
}

/// One side's state in an unmerged entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum GitStatusEntry {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    UpdatedButUnmerged,
}

/// Which sides touched a conflicted path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ConflictAction {
    BothDeleted,
    AddedByUs,
    DeletedByThem,
    AddedByThem,
    DeletedByUs,
    BothAdded,
    BothModified,
}

impl ConflictAction {
    fn from_xy(xy: &str) -> Option<(Self, GitStatusEntry, GitStatusEntry)> {
        use GitStatusEntry::{Added, Deleted, UpdatedButUnmerged as Unmerged};
        Some(match xy {
            "DD" => (Self::BothDeleted, Deleted, Deleted),
            "AU" => (Self::AddedByUs, Added, Unmerged),
            "UD" => (Self::DeletedByThem, Unmerged, Deleted),
            "UA" => (Self::AddedByThem, Unmerged, Added),
            "DU" => (Self::DeletedByUs, Deleted, Unmerged),
            "AA" => (Self::BothAdded, Added, Added),
            "UU" => (Self::BothModified, Unmerged, Unmerged),
            _ => return None,
        })
    }

    /// Whether both sides left content that may hold conflict markers.
    fn has_markers(self) -> bool {
        matches!(self, Self::BothAdded | Self::BothModified)
    }
}

/// Detail attached to every conflicted entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictDetail {
    pub action: ConflictAction,
    pub us: GitStatusEntry,
    pub them: GitStatusEntry,
    /// Conflict-marker lines left in the file.
    ///
    /// `None` for binary files, submodules and one-sided conflicts;
    /// `Some(0)` once the markers are gone but the file isn't staged.
    pub marker_count: Option<usize>,
}

/// State of a submodule's working directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmoduleStatus {
    pub commit_changed: bool,
    pub modified_changes: bool,
    pub untracked_changes: bool,
}

/// One changed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    /// Source path of a rename or copy.
    pub old_path: Option<String>,
    pub kind: AppFileStatusKind,
    pub conflict: Option<ConflictDetail>,
    pub submodule: Option<SubmoduleStatus>,
}

/// The `# branch.*` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchStatus {
    /// `None` before the first commit.
    pub oid: Option<String>,
    /// `None` when HEAD is detached.
    pub head: Option<String>,
    pub upstream: Option<String>,
    /// `(ahead, behind)` relative to the upstream.
    pub ahead_behind: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusResult {
    pub branch: BranchStatus,
    pub entries: Vec<FileEntry>,
    pub merge_in_progress: bool,
}

impl StatusResult {
    pub fn conflicted(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter().filter(|e| e.conflict.is_some())
    }

    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A porcelain record before conflict and submodule details are filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawEntry {
    path: String,
    old_path: Option<String>,
    xy: String,
    /// The `<sub>` field: `N...` or `S<c><m><u>`.
    sub: String,
    /// Commit recorded in `HEAD` (`hH`), for submodule comparison.
    head_oid: Option<String>,
    /// Commit recorded in the index (`hI`), for submodule comparison.
    index_oid: Option<String>,
    untracked: bool,
    unmerged: bool,
}

impl RawEntry {
    fn is_submodule(&self) -> bool {
        self.sub.starts_with('S')
    }

    fn kind(&self) -> AppFileStatusKind {
        if self.unmerged {
            return AppFileStatusKind::Conflicted;
        }
        if self.untracked {
            return AppFileStatusKind::New;
        }
        let mut xy = self.xy.chars();
        let x = xy.next().unwrap_or('.');
        let y = xy.next().unwrap_or('.');
        match (x, y) {
            ('R', _) => AppFileStatusKind::Renamed,
            ('C', _) => AppFileStatusKind::Copied,
            ('A', _) => AppFileStatusKind::New,
            ('D', _) | (_, 'D') => AppFileStatusKind::Deleted,
            _ => AppFileStatusKind::Modified,
        }
    }

    fn pointer_staged(&self) -> bool {
        matches!((&self.head_oid, &self.index_oid), (Some(head), Some(index)) if head != index)
    }

    /// Submodule flags straight from the `<sub>` field.
    ///
    /// `C` only covers an unstaged pointer change; a staged one shows up as
    /// differing `hH` and `hI`.
    fn submodule_flags(&self) -> SubmoduleStatus {
        let flags: Vec<char> = self.sub.chars().collect();
        SubmoduleStatus {
            commit_changed: flags.get(1) == Some(&'C') || self.pointer_staged(),
            modified_changes: flags.get(2) == Some(&'M'),
            untracked_changes: flags.get(3) == Some(&'U'),
        }
    }
}

fn parse_branch_header(header: &str, branch: &mut BranchStatus) {
    let Some((key, value)) = header.split_once(' ') else {
        return;
    };
    match key {
        "branch.oid" if value != "(initial)" => branch.oid = Some(value.to_string()),
        "branch.head" if value != "(detached)" => branch.head = Some(value.to_string()),
        "branch.upstream" => branch.upstream = Some(value.to_string()),
        "branch.ab" => {
            let mut counts = value.split(' ');
            let ahead = counts.next().and_then(|a| a.strip_prefix('+')?.parse().ok());
            let behind = counts.next().and_then(|b| b.strip_prefix('-')?.parse().ok());
            if let (Some(ahead), Some(behind)) = (ahead, behind) {
                branch.ahead_behind = Some((ahead, behind));
            }
        }
        _ => {}
    }
}

/// Parse `status --porcelain=2 -z --branch` output. Unparseable records are skipped.
fn parse_porcelain(output: &str) -> (BranchStatus, Vec<RawEntry>) {
    let mut branch = BranchStatus::default();
    let mut entries = Vec::new();
    let mut records = output.split('\0');

    while let Some(record) = records.next() {
        let Some(tag) = record.chars().next() else {
            continue;
        };
        let rest = &record[tag.len_utf8()..];
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        match tag {
            '#' => parse_branch_header(rest, &mut branch),
            '1' => {
                let fields: Vec<&str> = rest.splitn(8, ' ').collect();
                if let [xy, sub, _, _, _, h_head, h_index, path] = fields[..] {
                    entries.push(RawEntry {
                        path: path.to_string(),
                        old_path: None,
                        xy: xy.to_string(),
                        sub: sub.to_string(),
                        head_oid: Some(h_head.to_string()),
                        index_oid: Some(h_index.to_string()),
                        untracked: false,
                        unmerged: false,
                    });
                }
            }
            '2' => {
                // The original path follows as its own NUL-terminated record.
                let old_path = records.next();
                let fields: Vec<&str> = rest.splitn(9, ' ').collect();
                if let ([xy, sub, _, _, _, h_head, h_index, _, path], Some(old_path)) =
                    (&fields[..], old_path)
                {
                    entries.push(RawEntry {
                        path: path.to_string(),
                        old_path: Some(old_path.to_string()),
                        xy: xy.to_string(),
                        sub: sub.to_string(),
                        head_oid: Some(h_head.to_string()),
                        index_oid: Some(h_index.to_string()),
                        untracked: false,
                        unmerged: false,
                    });
                }
            }
            'u' => {
                let fields: Vec<&str> = rest.splitn(10, ' ').collect();
                if let [xy, sub, .., path] = fields[..]
                    && fields.len() == 10
                {
                    entries.push(RawEntry {
                        path: path.to_string(),
                        old_path: None,
                        xy: xy.to_string(),
                        sub: sub.to_string(),
                        head_oid: None,
                        index_oid: None,
                        untracked: false,
                        unmerged: true,
                    });
                }
            }
            '?' => entries.push(RawEntry {
                path: rest.to_string(),
                old_path: None,
                xy: "??".to_string(),
                sub: "N...".to_string(),
                head_oid: None,
                index_oid: None,
                untracked: true,
                unmerged: false,
            }),
            _ => log::debug!("Skipping status record {record:?}"),
        }
    }
    (branch, entries)
}

/// Count conflict-marker lines, or `None` for binary content.
fn count_conflict_markers(contents: &[u8]) -> Option<usize> {
    let head = &contents[..contents.len().min(BINARY_SNIFF_LEN)];
    if head.contains(&0) {
        return None;
    }
    let count = contents
        .split(|&b| b == b'\n')
        .filter(|line| {
            CONFLICT_MARKERS
                .iter()
                .any(|marker| line.starts_with(marker.as_bytes()))
        })
        .count();
    Some(count)
}

fn marker_count_for(path: &Path) -> Option<usize> {
    match std::fs::read(path) {
        Ok(contents) => count_conflict_markers(&contents),
        Err(e) => {
            log::debug!("Reading {} for conflict markers failed: {e}", path.display());
            None
        }
    }
}

impl Repository {
    /// Working-directory status. `None` outside a repository.
    pub fn status(&self) -> anyhow::Result<Option<StatusResult>> {
        let Some((branch, raw_entries)) = self.porcelain_status()? else {
            return Ok(None);
        };

        let top_level = if raw_entries.iter().any(|e| e.unmerged || e.is_submodule()) {
            self.top_level()?
        } else {
            None
        };

        let entries = raw_entries
            .into_iter()
            .map(|raw| self.file_entry(raw, top_level.as_deref()))
            .collect();

        Ok(Some(StatusResult {
            branch,
            entries,
            merge_in_progress: self.merge_in_progress()?,
        }))
    }

    fn porcelain_status(&self) -> anyhow::Result<Option<(BranchStatus, Vec<RawEntry>)>> {
        if !self.path().is_dir() {
            return Ok(None);
        }
        let result = self.run_with(
            &[
                "--no-optional-locks",
                "status",
                "--untracked-files=all",
                "--branch",
                "--porcelain=2",
                "-z",
            ],
            "status",
            &GitOptions::new().expected_errors([ErrorClass::NotAGitRepository]),
        )?;
        if result.error_class.is_some() {
            return Ok(None);
        }
        Ok(Some(parse_porcelain(&result.stdout)))
    }

    fn file_entry(&self, raw: RawEntry, top_level: Option<&Path>) -> FileEntry {
        let kind = raw.kind();
        let conflict = raw.unmerged.then(|| {
            let (action, us, them) = ConflictAction::from_xy(&raw.xy).unwrap_or((
                ConflictAction::BothModified,
                GitStatusEntry::UpdatedButUnmerged,
                GitStatusEntry::UpdatedButUnmerged,
            ));
            let marker_count = match top_level {
                Some(top) if action.has_markers() && !raw.is_submodule() => {
                    marker_count_for(&top.join(&raw.path))
                }
                _ => None,
            };
            ConflictDetail {
                action,
                us,
                them,
                marker_count,
            }
        });
        let submodule = match top_level {
            Some(top) if raw.is_submodule() => Some(self.submodule_status(&raw, top)),
            _ if raw.is_submodule() => Some(raw.submodule_flags()),
            _ => None,
        };

        FileEntry {
            path: raw.path,
            old_path: raw.old_path,
            kind,
            conflict,
            submodule,
        }
    }

    /// Status read from inside a submodule's own working directory.
    ///
    /// Falls back to the parent's `<sub>` flags when the submodule can't be
    /// inspected (e.g. not checked out).
    fn submodule_status(&self, raw: &RawEntry, top_level: &Path) -> SubmoduleStatus {
        let flags = raw.submodule_flags();
        let submodule = Repository::at(top_level.join(&raw.path));
        let Ok(Some((branch, entries))) = submodule.porcelain_status() else {
            return flags;
        };

        let checkout_differs = match (&raw.index_oid, &branch.oid) {
            (Some(recorded), Some(checked_out)) => recorded != checked_out,
            _ => flags.commit_changed,
        };
        SubmoduleStatus {
            commit_changed: raw.pointer_staged() || checkout_differs,
            modified_changes: entries.iter().any(|e| !e.untracked),
            untracked_changes: entries.iter().any(|e| e.untracked),
        }
    }
}
