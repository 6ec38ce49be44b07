use std::path::{Path, PathBuf};
use std::process::Command;

use gongfeng_git::git::Repository;
use rstest::fixture;
use tempfile::TempDir;

/// Point git at empty global/system config and pin dates and locale.
#[allow(unsafe_code)]
pub fn isolate_git_env() {
    // Every test writes the same values, so concurrent writers agree.
    unsafe {
        std::env::set_var("GIT_CONFIG_GLOBAL", "/dev/null");
        std::env::set_var("GIT_CONFIG_SYSTEM", "/dev/null");
        std::env::set_var("GIT_AUTHOR_DATE", "2025-01-01T00:00:00Z");
        std::env::set_var("GIT_COMMITTER_DATE", "2025-01-01T00:00:00Z");
        std::env::set_var("GIT_TERMINAL_PROMPT", "0");
        std::env::set_var("LC_ALL", "C");
        std::env::set_var("LANG", "C");
    }
}

/// Run git in `dir`, panicking with its output on failure.
pub fn git_in(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to execute git");
    if !output.status.success() {
        panic!(
            "git {} failed:\nstdout: {}\nstderr: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// A repository with one commit on `main`.
#[fixture]
pub fn repo() -> TestRepo {
    TestRepo::with_initial_commit()
}

/// `main` pushed to a bare `origin`, with upstream set.
#[fixture]
pub fn repo_with_origin() -> TestRepo {
    let repo = TestRepo::with_initial_commit();
    repo.add_bare_remote("origin");
    repo.git(&["push", "-q", "-u", "origin", "main"]);
    repo
}

pub struct TestRepo {
    temp_dir: TempDir,
    root: PathBuf,
}

impl TestRepo {
    /// Create a new test repository with isolated git environment
    pub fn new() -> Self {
        isolate_git_env();
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        // Subdirectory so remotes and clones can be siblings
        let root = temp_dir.path().join("main");
        std::fs::create_dir(&root).expect("Failed to create main repo directory");
        // Canonicalize to resolve symlinks (macOS /var -> /private/var)
        let root = root
            .canonicalize()
            .expect("Failed to canonicalize temp path");

        git_in(&root, &["init", "-q", "-b", "main"]);
        git_in(&root, &["config", "user.name", "Test User"]);
        git_in(&root, &["config", "user.email", "test@example.com"]);

        Self { temp_dir, root }
    }

    /// A repository with one commit on `main`.
    pub fn with_initial_commit() -> Self {
        let repo = Self::new();
        repo.commit("Initial commit");
        repo
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Scratch directory next to the repository.
    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn repository(&self) -> Repository {
        Repository::at(&self.root)
    }

    pub fn git(&self, args: &[&str]) -> String {
        git_in(&self.root, args)
    }

    pub fn head_sha(&self) -> String {
        self.git(&["rev-parse", "HEAD"]).trim().to_string()
    }

    pub fn write_file(&self, path: &str, contents: &str) {
        let file_path = self.root.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, contents).expect("Failed to write file");
    }

    /// Create a commit with the given message, changing `file.txt`.
    pub fn commit(&self, message: &str) {
        self.commit_file("file.txt", message, message);
    }

    pub fn commit_file(&self, path: &str, contents: &str, message: &str) {
        self.write_file(path, contents);
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "-m", message]);
    }

    /// Create a bare repository next to this one and register it as `name`.
    pub fn add_bare_remote(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(format!("{name}.git"));
        std::fs::create_dir(&path).expect("Failed to create remote directory");
        git_in(&path, &["init", "-q", "--bare", "-b", "main"]);
        self.git(&["remote", "add", name, path.to_str().unwrap()]);
        path
    }

    /// Run git where it is expected to stop on a conflict.
    pub fn git_conflicting(&self, args: &[&str]) {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .expect("Failed to execute git");
        assert!(
            !output.status.success(),
            "git {} should conflict",
            args.join(" ")
        );
    }

    /// Leave `file.txt` in a both-modified conflict between `main` and `feature`.
    pub fn setup_merge_conflict(&self) {
        self.setup_diverged_branches();
        self.git_conflicting(&["merge", "feature"]);
    }

    /// `main` and `feature` each change `file.txt` differently; `main` is
    /// checked out.
    pub fn setup_diverged_branches(&self) {
        self.commit_file("file.txt", "base\n", "Base");
        self.git(&["checkout", "-q", "-b", "feature"]);
        self.commit_file("file.txt", "feature side\n", "Feature change");
        self.git(&["checkout", "-q", "main"]);
        self.commit_file("file.txt", "main side\n", "Main change");
    }

    /// Add a one-commit repository as a submodule at `vendor/lib` and commit it.
    ///
    /// Returns the submodule's working directory.
    pub fn add_submodule(&self) -> PathBuf {
        let source = self.temp_dir.path().join("lib");
        std::fs::create_dir(&source).expect("Failed to create submodule source");
        git_in(&source, &["init", "-q", "-b", "main"]);
        git_in(&source, &["config", "user.name", "Test User"]);
        git_in(&source, &["config", "user.email", "test@example.com"]);
        std::fs::write(source.join("lib.txt"), "lib\n").expect("Failed to write file");
        git_in(&source, &["add", "-A"]);
        git_in(&source, &["commit", "-q", "-m", "Library"]);

        self.git(&[
            "-c",
            "protocol.file.allow=always",
            "submodule",
            "add",
            "-q",
            source.to_str().unwrap(),
            "vendor/lib",
        ]);
        self.git(&["commit", "-q", "-m", "Add submodule"]);

        let path = self.root.join("vendor/lib");
        git_in(&path, &["config", "user.name", "Test User"]);
        git_in(&path, &["config", "user.email", "test@example.com"]);
        path
    }
}
