use gongfeng_git::git::TrackingRef;

use crate::common::TestRepo;

/// `feature` exists on both `origin` and `upstream`; only `upstream` has the
/// local tip.
fn repo_with_two_remotes() -> TestRepo {
    let repo = TestRepo::with_initial_commit();
    repo.add_bare_remote("origin");
    repo.add_bare_remote("upstream");
    repo.git(&["checkout", "-q", "-b", "feature"]);
    repo.commit("Old feature");
    repo.git(&["push", "-q", "origin", "feature"]);
    repo.commit("New feature");
    repo.git(&["push", "-q", "upstream", "feature"]);
    repo
}

#[test]
fn test_tracking_branch_matches_head() {
    let repo = repo_with_two_remotes();
    assert_eq!(
        repo.repository().determine_tracking_branch("feature").unwrap(),
        Some(TrackingRef::new("upstream", "feature"))
    );
}

#[test]
fn test_tracking_branch_prefers_configured_upstream() {
    let repo = repo_with_two_remotes();
    // Both remotes at HEAD; config points at upstream under another name.
    repo.git(&["push", "-q", "origin", "feature"]);
    repo.git(&["push", "-q", "upstream", "feature:review/feature"]);
    repo.git(&["config", "branch.feature.remote", "upstream"]);
    repo.git(&["config", "branch.feature.merge", "refs/heads/review/feature"]);

    assert_eq!(
        repo.repository().determine_tracking_branch("feature").unwrap(),
        Some(TrackingRef::new("upstream", "review/feature"))
    );
}

#[test]
fn test_tracking_branch_first_remote_in_list_order() {
    let repo = repo_with_two_remotes();
    repo.git(&["push", "-q", "origin", "feature"]);
    assert_eq!(
        repo.repository().determine_tracking_branch("feature").unwrap(),
        Some(TrackingRef::new("origin", "feature"))
    );
}

#[test]
fn test_tracking_branch_none_when_nothing_matches() {
    let repo = repo_with_two_remotes();
    repo.commit("Unpushed");
    assert_eq!(
        repo.repository().determine_tracking_branch("feature").unwrap(),
        None
    );
}

#[test]
fn test_tracking_branch_without_remotes() {
    let repo = TestRepo::with_initial_commit();
    assert_eq!(
        repo.repository().determine_tracking_branch("main").unwrap(),
        None
    );
}
