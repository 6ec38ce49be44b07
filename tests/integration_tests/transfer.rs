use gongfeng_git::git::{
    BranchType, CheckoutOptions, GitError, OperationKind, ProgressEvent, PullOptions, PushOptions,
    Repository, RepositoryType, git_error,
};
use rstest::rstest;

use crate::common::{TestRepo, git_in, repo, repo_with_origin};

/// Progress starts at 0, never goes backwards and ends with a single 1.
fn assert_completed(events: &[ProgressEvent]) {
    assert!(!events.is_empty());
    assert_eq!(events[0].value, 0.0);
    assert!(
        events.windows(2).all(|w| w[0].value <= w[1].value),
        "progress went backwards: {:?}",
        events.iter().map(|e| e.value).collect::<Vec<_>>()
    );
    assert_eq!(events.iter().filter(|e| e.value == 1.0).count(), 1);
    assert_eq!(events.last().unwrap().value, 1.0);
}

/// A clone of `origin` next to the main repository.
fn clone_origin(repo: &TestRepo) -> Repository {
    let origin = repo.temp_path().join("origin.git");
    let path = repo.temp_path().join("clone");
    git_in(
        repo.temp_path(),
        &["clone", "-q", origin.to_str().unwrap(), path.to_str().unwrap()],
    );
    Repository::at(path)
}

#[rstest]
fn test_fetch_reports_progress(repo_with_origin: TestRepo) {
    let repo = repo_with_origin;
    repo.git(&["update-ref", "-d", "refs/remotes/origin/main"]);

    let mut events = Vec::new();
    let mut record = |event: ProgressEvent| events.push(event);
    repo.repository().fetch("origin", Some(&mut record)).unwrap();

    assert_completed(&events);
    assert!(events.iter().all(|e| e.kind == OperationKind::Fetch));
    assert_eq!(events[0].title, "Fetching origin");
    assert_eq!(events[0].remote.as_deref(), Some("origin"));
    assert_eq!(
        repo.repository().rev_parse("origin/main").unwrap(),
        Some(repo.head_sha())
    );
}

#[rstest]
fn test_fetch_failure_never_completes(repo: TestRepo) {
    let mut events = Vec::new();
    let mut record = |event: ProgressEvent| events.push(event);
    let err = repo
        .repository()
        .fetch("missing", Some(&mut record))
        .unwrap_err();

    assert!(matches!(
        git_error(&err),
        Some(GitError::Command { exit_code, .. }) if *exit_code != 0
    ));
    assert_eq!(events[0].value, 0.0);
    assert!(events.iter().all(|e| e.value < 1.0));
}

#[rstest]
fn test_fetch_without_callback(repo_with_origin: TestRepo) {
    repo_with_origin.repository().fetch("origin", None).unwrap();
}

#[rstest]
fn test_push_sets_upstream(repo_with_origin: TestRepo) {
    let repo = repo_with_origin;
    repo.git(&["checkout", "-q", "-b", "feature"]);
    repo.commit("Feature");

    let mut events = Vec::new();
    let mut record = |event: ProgressEvent| events.push(event);
    repo.repository()
        .push("origin", "feature", None, &PushOptions::default(), Some(&mut record))
        .unwrap();

    assert_completed(&events);
    assert_eq!(events[0].branch.as_deref(), Some("feature"));
    assert_eq!(
        repo.git(&["rev-parse", "--abbrev-ref", "feature@{upstream}"]).trim(),
        "origin/feature"
    );
}

#[rstest]
fn test_push_with_lease_to_named_branch(repo_with_origin: TestRepo) {
    let repo = repo_with_origin;
    let repository = repo.repository();
    repository
        .push(
            "origin",
            "main",
            Some("review"),
            &PushOptions::default(),
            None,
        )
        .unwrap();

    // Rewrite main and force it over the remote branch.
    repo.git(&["commit", "-q", "--amend", "-m", "Rewritten"]);
    repo.git(&["fetch", "-q", "origin"]);
    repository
        .push(
            "origin",
            "main",
            Some("review"),
            &PushOptions {
                force_with_lease: true,
                ..Default::default()
            },
            None,
        )
        .unwrap();

    let origin = repo.temp_path().join("origin.git");
    assert_eq!(git_in(&origin, &["rev-parse", "review"]).trim(), repo.head_sha());
}

#[rstest]
fn test_pull_fast_forwards(repo_with_origin: TestRepo) {
    let repo = repo_with_origin;
    let clone = clone_origin(&repo);

    repo.commit("Upstream change");
    repo.git(&["push", "-q", "origin", "main"]);

    let mut events = Vec::new();
    let mut record = |event: ProgressEvent| events.push(event);
    clone
        .pull("origin", &PullOptions::default(), Some(&mut record))
        .unwrap();

    assert_completed(&events);
    assert!(events.iter().all(|e| e.kind == OperationKind::Pull));
    assert_eq!(clone.rev_parse("HEAD").unwrap(), Some(repo.head_sha()));
}

#[rstest]
fn test_checkout_remote_branch_creates_local(repo_with_origin: TestRepo) {
    let repo = repo_with_origin;
    repo.git(&["checkout", "-q", "-b", "topic"]);
    repo.commit("Topic");
    repo.git(&["push", "-q", "origin", "topic"]);
    let clone = clone_origin(&repo);

    let remote_topic = clone
        .branches()
        .unwrap()
        .into_iter()
        .find(|b| b.branch_type == BranchType::Remote && b.name == "origin/topic")
        .unwrap();

    let mut events = Vec::new();
    let mut record = |event: ProgressEvent| events.push(event);
    clone
        .checkout_branch(&remote_topic, &CheckoutOptions::default(), Some(&mut record))
        .unwrap();

    assert_completed(&events);
    assert_eq!(events[0].remote.as_deref(), Some("origin"));
    assert_eq!(clone.current_branch().unwrap().as_deref(), Some("topic"));
    assert_eq!(clone.rev_parse("HEAD").unwrap(), Some(repo.head_sha()));
}

#[rstest]
fn test_checkout_local_branch(repo: TestRepo) {
    repo.git(&["branch", "other"]);
    let repository = repo.repository();
    let other = repository
        .branches()
        .unwrap()
        .into_iter()
        .find(|b| b.name == "other")
        .unwrap();

    repository
        .checkout_branch(&other, &CheckoutOptions::default(), None)
        .unwrap();
    assert_eq!(repository.current_branch().unwrap().as_deref(), Some("other"));
}

#[rstest]
fn test_clone_from_creates_parent(repo_with_origin: TestRepo) {
    let repo = repo_with_origin;
    let origin = repo.temp_path().join("origin.git");
    let target = repo.temp_path().join("work/nested/copy");

    let mut events = Vec::new();
    let mut record = |event: ProgressEvent| events.push(event);
    let cloned =
        Repository::clone_from(origin.to_str().unwrap(), &target, Some(&mut record)).unwrap();

    assert_completed(&events);
    assert_eq!(events[0].title, "Cloning into copy");
    assert_eq!(cloned.path(), target);
    assert!(matches!(
        cloned.repository_type().unwrap(),
        RepositoryType::Regular { .. }
    ));
    assert_eq!(cloned.rev_parse("HEAD").unwrap(), Some(repo.head_sha()));
}

#[rstest]
fn test_clone_from_missing_url_fails(repo: TestRepo) {
    let missing = repo.temp_path().join("nowhere.git");
    let target = repo.temp_path().join("copy");

    let result = Repository::clone_from(missing.to_str().unwrap(), &target, None);
    assert!(git_error(&result.unwrap_err()).is_some());
}

#[rstest]
fn test_checkout_paths_restores_head_versions(repo: TestRepo) {
    repo.commit_file("notes.md", "notes\n", "Add notes");
    repo.write_file("file.txt", "edited\n");
    repo.write_file("notes.md", "staged edit\n");
    repo.git(&["add", "notes.md"]);
    repo.write_file("keep.txt", "untouched\n");

    let repository = repo.repository();
    repository.checkout_paths(&["file.txt", "notes.md"]).unwrap();
    repository.checkout_paths(&[]).unwrap();

    assert_eq!(
        std::fs::read_to_string(repo.root_path().join("notes.md")).unwrap(),
        "notes\n"
    );
    assert_eq!(
        std::fs::read_to_string(repo.root_path().join("file.txt")).unwrap(),
        "Initial commit"
    );
    assert_eq!(repo.git(&["status", "--porcelain"]), "?? keep.txt\n");
}
