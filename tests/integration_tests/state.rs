use gongfeng_git::git::{RebaseState, Repository};
use rstest::rstest;

use crate::common::{TestRepo, repo};

#[test]
fn test_rebase_state_during_conflict() {
    let repo = TestRepo::new();
    repo.setup_diverged_branches();
    let main_tip = repo.head_sha();
    repo.git(&["checkout", "-q", "feature"]);
    let feature_tip = repo.head_sha();

    let repository = repo.repository();
    assert_eq!(repository.rebase_state().unwrap(), None);

    repo.git_conflicting(&["rebase", "main"]);
    assert_eq!(
        repository.rebase_state().unwrap(),
        Some(RebaseState {
            original_branch_tip: feature_tip,
            target_branch: "feature".into(),
            base_branch_tip: main_tip,
        })
    );

    repo.git(&["rebase", "--abort"]);
    assert_eq!(repository.rebase_state().unwrap(), None);
}

#[test]
fn test_rebase_state_with_unreadable_state_files() {
    let repo = TestRepo::new();
    repo.setup_diverged_branches();
    repo.git(&["checkout", "-q", "feature"]);
    repo.git_conflicting(&["rebase", "main"]);

    std::fs::remove_file(repo.root_path().join(".git/rebase-merge/onto")).unwrap();
    assert_eq!(repo.repository().rebase_state().unwrap(), None);
}

#[test]
fn test_cherry_pick_in_progress() {
    let repo = TestRepo::new();
    repo.setup_diverged_branches();
    let repository = repo.repository();
    assert!(!repository.cherry_pick_in_progress().unwrap());

    repo.git_conflicting(&["cherry-pick", "feature"]);
    assert!(repository.cherry_pick_in_progress().unwrap());
    assert!(!repository.merge_in_progress().unwrap());

    repo.git(&["cherry-pick", "--abort"]);
    assert!(!repository.cherry_pick_in_progress().unwrap());
}

#[rstest]
fn test_squash_message_until_commit(repo: TestRepo) {
    repo.git(&["checkout", "-q", "-b", "side"]);
    repo.commit_file("side.txt", "side\n", "Side");
    repo.git(&["checkout", "-q", "main"]);

    let repository = repo.repository();
    assert!(!repository.squash_message_set().unwrap());

    repo.git(&["merge", "-q", "--squash", "side"]);
    assert!(repository.squash_message_set().unwrap());
    assert!(!repository.merge_in_progress().unwrap());

    repo.git(&["commit", "-q", "-m", "Squashed side"]);
    assert!(!repository.squash_message_set().unwrap());
}

#[test]
fn test_states_seen_from_subdirectory() {
    let repo = TestRepo::new();
    repo.setup_diverged_branches();
    repo.git_conflicting(&["cherry-pick", "feature"]);
    let nested = repo.root_path().join("nested/deeper");
    std::fs::create_dir_all(&nested).unwrap();

    let repository = Repository::at(&nested);
    assert!(repository.cherry_pick_in_progress().unwrap());
    assert!(!repository.squash_message_set().unwrap());
    assert_eq!(repository.rebase_state().unwrap(), None);
}

#[rstest]
fn test_states_outside_repository(repo: TestRepo) {
    let plain = repo.temp_path().join("plain");
    std::fs::create_dir(&plain).unwrap();

    let repository = Repository::at(&plain);
    assert!(!repository.merge_in_progress().unwrap());
    assert!(!repository.cherry_pick_in_progress().unwrap());
    assert!(!repository.squash_message_set().unwrap());
    assert_eq!(repository.rebase_state().unwrap(), None);
}
