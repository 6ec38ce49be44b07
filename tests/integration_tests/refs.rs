use crate::common::TestRepo;

#[test]
fn test_current_branch() {
    let repo = TestRepo::with_initial_commit();
    let repository = repo.repository();
    assert_eq!(repository.current_branch().unwrap().as_deref(), Some("main"));

    repo.git(&["checkout", "-q", "-b", "feature/login"]);
    assert_eq!(
        repository.current_branch().unwrap().as_deref(),
        Some("feature/login")
    );
}

#[test]
fn test_current_branch_unborn() {
    let repo = TestRepo::new();
    assert_eq!(
        repo.repository().current_branch().unwrap().as_deref(),
        Some("main")
    );
}

#[test]
fn test_current_branch_detached() {
    let repo = TestRepo::with_initial_commit();
    let sha = repo.head_sha();
    repo.git(&["checkout", "-q", "--detach", &sha]);
    assert_eq!(repo.repository().current_branch().unwrap(), None);
}

#[test]
fn test_symbolic_ref_of_non_symbolic_ref() {
    let repo = TestRepo::with_initial_commit();
    // Exit code 1: refs/heads/main is not symbolic.
    assert_eq!(repo.repository().symbolic_ref("refs/heads/main").unwrap(), None);
}

#[test]
fn test_symbolic_ref_outside_repository() {
    let repo = TestRepo::new();
    let outside = repo.temp_path().join("plain");
    std::fs::create_dir(&outside).unwrap();
    // Exit code 128: not a repository.
    let repository = gongfeng_git::git::Repository::at(&outside);
    assert_eq!(repository.symbolic_ref("HEAD").unwrap(), None);
}

#[test]
fn test_ref_sha() {
    let repo = TestRepo::with_initial_commit();
    let repository = repo.repository();
    let sha = repo.head_sha();

    assert_eq!(
        repository.ref_sha("refs/heads/main").unwrap(),
        Some(format!("{sha} refs/heads/main"))
    );
    assert_eq!(repository.ref_sha("refs/heads/missing").unwrap(), None);
}

#[test]
fn test_rev_parse() {
    let repo = TestRepo::with_initial_commit();
    let repository = repo.repository();
    assert_eq!(repository.rev_parse("main").unwrap(), Some(repo.head_sha()));
    assert_eq!(repository.rev_parse("missing").unwrap(), None);
}

#[test]
fn test_remote_head() {
    let repo = TestRepo::with_initial_commit();
    repo.add_bare_remote("origin");
    repo.git(&["push", "-q", "origin", "main"]);
    repo.git(&["remote", "set-head", "origin", "main"]);

    let repository = repo.repository();
    assert_eq!(
        repository.remote_head("origin").unwrap().as_deref(),
        Some("main")
    );
    assert_eq!(repository.remote_head("upstream").unwrap(), None);
}
