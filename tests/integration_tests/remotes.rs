use gongfeng_git::git::{Protocol, RemoteRole, Repository, find_default_remote};

use crate::common::TestRepo;

fn repo_with_remotes() -> TestRepo {
    let repo = TestRepo::with_initial_commit();
    repo.git(&[
        "remote",
        "add",
        "origin",
        "https://git.example.com/team/app.git",
    ]);
    repo.git(&["remote", "add", "upstream", "git@git.example.com:core/app.git"]);
    repo.git(&[
        "remote",
        "set-url",
        "--push",
        "origin",
        "ssh://git@git.example.com:2222/team/app.git",
    ]);
    repo
}

#[test]
fn test_remotes_merge_fetch_and_push_urls() {
    let repo = repo_with_remotes();
    let remotes = repo.repository().remotes().unwrap();

    let names: Vec<_> = remotes.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["origin", "upstream"]);

    let origin = &remotes[0];
    let fetch = origin.fetch_url.as_ref().unwrap();
    assert_eq!(fetch.protocol(), Protocol::Https);
    assert_eq!(fetch.project_path(), "team/app");
    let push = origin.push_url.as_ref().unwrap();
    assert_eq!(push.protocol(), Protocol::Ssh);
    assert_eq!(push.port(), Some(2222));
    assert_eq!(origin.role, None);

    let upstream = &remotes[1];
    assert_eq!(upstream.fetch_url.as_ref().unwrap().owner(), "core");
}

#[test]
fn test_remotes_outside_repository() {
    let repo = TestRepo::new();
    let outside = repo.temp_path().join("plain");
    std::fs::create_dir(&outside).unwrap();
    assert!(Repository::at(&outside).remotes().unwrap().is_empty());
    assert!(
        Repository::at(repo.temp_path().join("missing"))
            .remotes()
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_resolved_remotes_overlay_roles() {
    let repo = repo_with_remotes();
    let repository = repo.repository();
    repository
        .set_remote_role("upstream", RemoteRole::Target)
        .unwrap();
    repository
        .set_remote_role("origin", RemoteRole::Base)
        .unwrap();
    // Setting the same role again changes nothing.
    repository
        .set_remote_role("origin", RemoteRole::Base)
        .unwrap();

    let remotes = repository.resolved_remotes().unwrap();
    assert_eq!(remotes[0].role, Some(RemoteRole::Base));
    assert_eq!(remotes[1].role, Some(RemoteRole::Target));

    let target = repository.target_remote().unwrap().unwrap();
    assert_eq!(target.name, "upstream");

    let raw = repo.git(&["config", "--get-all", "remote.origin.gf-resolved"]);
    assert_eq!(raw, "base\n");
}

#[test]
fn test_set_remote_role_keeps_one_value() {
    let repo = repo_with_remotes();
    let repository = repo.repository();
    for role in [
        RemoteRole::Base,
        RemoteRole::Target,
        RemoteRole::Base,
        RemoteRole::Target,
    ] {
        repository.set_remote_role("origin", role).unwrap();
    }

    let raw = repo.git(&["config", "--get-all", "remote.origin.gf-resolved"]);
    assert_eq!(raw, "target\n");
    let remotes = repository.resolved_remotes().unwrap();
    assert_eq!(remotes[0].role, Some(RemoteRole::Target));
}

#[test]
fn test_roles_written_by_appending_resolve_to_last() {
    let repo = repo_with_remotes();
    repo.git(&["config", "--add", "remote.upstream.gf-resolved", "base"]);
    repo.git(&["config", "--add", "remote.upstream.gf-resolved", "target"]);

    let remotes = repo.repository().resolved_remotes().unwrap();
    assert_eq!(remotes[1].role, Some(RemoteRole::Target));

    repo.repository()
        .set_remote_role("upstream", RemoteRole::Base)
        .unwrap();
    let raw = repo.git(&["config", "--get-all", "remote.upstream.gf-resolved"]);
    assert_eq!(raw, "base\n");
}

#[test]
fn test_add_and_remove_remote() {
    let repo = TestRepo::with_initial_commit();
    let repository = repo.repository();

    let added = repository
        .add_remote("fork", "https://git.example.com/me/app.git")
        .unwrap();
    assert_eq!(added.name, "fork");
    assert_eq!(added.fetch_url.unwrap().project_path(), "me/app");

    repository.remove_remote("fork").unwrap();
    assert!(repository.remotes().unwrap().is_empty());

    // Removing again is not an error.
    repository.remove_remote("fork").unwrap();
}

#[test]
fn test_remote_url() {
    let repo = repo_with_remotes();
    let repository = repo.repository();

    assert_eq!(
        repository.remote_url("origin").unwrap().as_deref(),
        Some("https://git.example.com/team/app.git")
    );
    assert_eq!(repository.remote_url("missing").unwrap(), None);

    repository
        .set_remote_url("origin", "https://git.example.com/team/renamed.git")
        .unwrap();
    assert_eq!(
        repository.remote_url("origin").unwrap().as_deref(),
        Some("https://git.example.com/team/renamed.git")
    );
}

#[test]
fn test_default_remote_and_project_paths() {
    let repo = repo_with_remotes();
    let repository = repo.repository();
    let remotes = repository.remotes().unwrap();
    assert_eq!(find_default_remote(&remotes).unwrap().name, "origin");

    assert_eq!(
        repository.project_path_from_remote(None).unwrap().as_deref(),
        Some("team/app")
    );
    assert_eq!(
        repository
            .project_path_from_remote(Some("upstream"))
            .unwrap()
            .as_deref(),
        Some("core/app")
    );
    assert_eq!(repository.project_path_from_remote(Some("nope")).unwrap(), None);

    let found = repository.find_remote_by_project_path("core/app").unwrap();
    assert_eq!(found.unwrap().name, "upstream");
    assert_eq!(
        repository.find_remote_by_project_path("other/app").unwrap(),
        None
    );
}

#[test]
fn test_default_remote_without_origin() {
    let repo = repo_with_remotes();
    repo.git(&["remote", "remove", "origin"]);
    let remotes = repo.repository().remotes().unwrap();
    assert_eq!(find_default_remote(&remotes).unwrap().name, "upstream");
}
