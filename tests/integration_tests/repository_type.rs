use gongfeng_git::git::{Repository, RepositoryType};

use crate::common::{TestRepo, git_in};

#[test]
fn test_regular_repository() {
    let repo = TestRepo::with_initial_commit();
    assert_eq!(
        repo.repository().repository_type().unwrap(),
        RepositoryType::Regular {
            top_level_working_directory: repo.root_path().to_path_buf(),
        }
    );
}

#[test]
fn test_subdirectory_resolves_to_top_level() {
    let repo = TestRepo::with_initial_commit();
    let nested = repo.root_path().join("src/deep");
    std::fs::create_dir_all(&nested).unwrap();
    let repository = Repository::at(&nested);

    assert_eq!(
        repository.top_level().unwrap().as_deref(),
        Some(repo.root_path())
    );
    assert_eq!(
        repository.path_from_repo_root().unwrap().as_deref(),
        Some("src/deep/")
    );
    assert_eq!(
        repo.repository().path_from_repo_root().unwrap().as_deref(),
        Some("")
    );
}

#[test]
fn test_bare_repository() {
    let repo = TestRepo::new();
    let bare = repo.add_bare_remote("origin");
    let repository = Repository::at(&bare);
    assert_eq!(repository.repository_type().unwrap(), RepositoryType::Bare);
    assert_eq!(repository.top_level().unwrap(), None);
}

#[test]
fn test_missing_repository() {
    let repo = TestRepo::new();
    let plain = repo.temp_path().join("plain");
    std::fs::create_dir(&plain).unwrap();

    assert_eq!(
        Repository::at(&plain).repository_type().unwrap(),
        RepositoryType::Missing
    );
    assert_eq!(
        Repository::at(repo.temp_path().join("nope"))
            .repository_type()
            .unwrap(),
        RepositoryType::Missing
    );
    assert_eq!(Repository::at(&plain).path_from_repo_root().unwrap(), None);
}

#[test]
fn test_file_path_is_missing() {
    let repo = TestRepo::with_initial_commit();
    assert_eq!(
        Repository::at(repo.root_path().join("file.txt"))
            .repository_type()
            .unwrap(),
        RepositoryType::Missing
    );
}

#[test]
fn test_worktree_is_regular() {
    let repo = TestRepo::with_initial_commit();
    let worktree = repo.temp_path().join("wt");
    git_in(
        repo.root_path(),
        &["worktree", "add", "-q", "-b", "wt", worktree.to_str().unwrap()],
    );
    let worktree = worktree.canonicalize().unwrap();

    assert_eq!(
        Repository::at(&worktree).repository_type().unwrap(),
        RepositoryType::Regular {
            top_level_working_directory: worktree,
        }
    );
}

#[test]
fn test_submodule_resolves_to_its_own_root() {
    let repo = TestRepo::with_initial_commit();
    let lib = repo.add_submodule();
    assert_eq!(
        Repository::at(&lib).repository_type().unwrap(),
        RepositoryType::Regular {
            top_level_working_directory: lib.canonicalize().unwrap(),
        }
    );
}
