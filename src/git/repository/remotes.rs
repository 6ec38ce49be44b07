//! Remote registry: `git remote -v` parsing plus the role overlay.

use once_cell::sync::Lazy;
use regex::Regex;

use super::Repository;
use crate::git::core::GitOptions;
use crate::git::error::ErrorClass;
use crate::git::url::GitRemoteUrl;

static REMOTE_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.+)\s+(.+)\s+\((push|fetch)\)").expect("valid regex"));

/// Config key suffix under `remote.<name>.` holding the role.
const ROLE_KEY: &str = "gf-resolved";

/// The part a remote plays for the hosted project.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum RemoteRole {
    /// The repository changes are based on (e.g. a fork's parent).
    Base,
    /// The repository merge requests target.
    Target,
}

/// A configured remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    pub name: String,
    pub role: Option<RemoteRole>,
    /// `None` when the URL is absent or unparseable.
    pub fetch_url: Option<GitRemoteUrl>,
    pub push_url: Option<GitRemoteUrl>,
}

impl Remote {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            role: None,
            fetch_url: None,
            push_url: None,
        }
    }

    /// `owner/repo` of the fetch URL.
    pub fn project_path(&self) -> Option<String> {
        self.fetch_url.as_ref().map(GitRemoteUrl::project_path)
    }
}

/// `origin` if present, otherwise the first remote.
pub fn find_default_remote(remotes: &[Remote]) -> Option<&Remote> {
    remotes
        .iter()
        .find(|r| r.name == "origin")
        .or_else(|| remotes.first())
}

/// Merge `git remote -v` rows by name, keeping first-seen order.
fn parse_remotes(output: &str) -> Vec<Remote> {
    let mut remotes: Vec<Remote> = Vec::new();
    for line in output.lines() {
        let Some(caps) = REMOTE_LINE_RE.captures(line) else {
            continue;
        };
        let name = caps[1].trim();
        let url = GitRemoteUrl::parse(caps[2].trim());

        let index = match remotes.iter().position(|r| r.name == name) {
            Some(index) => index,
            None => {
                remotes.push(Remote::named(name));
                remotes.len() - 1
            }
        };
        let remote = &mut remotes[index];
        match &caps[3] {
            "fetch" => remote.fetch_url = url,
            _ => remote.push_url = url,
        }
    }
    remotes
}

/// Extract the remote name from `remote.<name>.gf-resolved`.
fn role_key_remote(key: &str) -> Option<&str> {
    key.strip_prefix("remote.")?
        .strip_suffix(ROLE_KEY)?
        .strip_suffix('.')
}

/// Assign roles from config records. Later records win.
fn apply_roles(remotes: &mut [Remote], records: &[(String, String)]) {
    for (key, value) in records {
        let Some(name) = role_key_remote(key) else {
            continue;
        };
        let Ok(role) = value.trim().parse::<RemoteRole>() else {
            log::debug!("Ignoring unknown remote role {value:?} for {name}");
            continue;
        };
        if let Some(remote) = remotes.iter_mut().find(|r| r.name == name) {
            remote.role = Some(role);
        }
    }
}

impl Repository {
    /// List remotes in configuration order. Empty outside a repository.
    pub fn remotes(&self) -> anyhow::Result<Vec<Remote>> {
        if !self.path().is_dir() {
            return Ok(Vec::new());
        }
        let result = self.run_with(
            &["remote", "-v"],
            "remotes",
            &GitOptions::new().expected_errors([ErrorClass::NotAGitRepository]),
        )?;
        if result.error_class == Some(ErrorClass::NotAGitRepository) {
            return Ok(Vec::new());
        }
        Ok(parse_remotes(&result.stdout))
    }

    /// List remotes with their roles filled in from config.
    pub fn resolved_remotes(&self) -> anyhow::Result<Vec<Remote>> {
        let mut remotes = self.remotes()?;
        if remotes.is_empty() {
            return Ok(remotes);
        }
        let records = self.config_values_matching(&format!(r"^remote\..*\.{ROLE_KEY}$"))?;
        apply_roles(&mut remotes, &records);
        Ok(remotes)
    }

    /// The remote marked [`RemoteRole::Target`], if any.
    pub fn target_remote(&self) -> anyhow::Result<Option<Remote>> {
        Ok(self
            .resolved_remotes()?
            .into_iter()
            .find(|r| r.role == Some(RemoteRole::Target)))
    }

    /// Add a remote and return it as it would be listed.
    pub fn add_remote(&self, name: &str, url: &str) -> anyhow::Result<Remote> {
        self.run_with(&["remote", "add", name, url], "add_remote", &GitOptions::new())?;
        Ok(Remote {
            name: name.to_string(),
            role: None,
            fetch_url: GitRemoteUrl::parse(url),
            push_url: GitRemoteUrl::parse(url),
        })
    }

    /// Remove a remote. Removing a missing remote succeeds.
    pub fn remove_remote(&self, name: &str) -> anyhow::Result<()> {
        self.run_with(
            &["remote", "remove", name],
            "remove_remote",
            &GitOptions::new().success_exit_codes([0, 2, 128]),
        )?;
        Ok(())
    }

    pub fn set_remote_url(&self, name: &str, url: &str) -> anyhow::Result<()> {
        self.run_with(
            &["remote", "set-url", name, url],
            "set_remote_url",
            &GitOptions::new(),
        )?;
        Ok(())
    }

    /// The fetch URL of `name`, or `None` when no such remote exists.
    pub fn remote_url(&self, name: &str) -> anyhow::Result<Option<String>> {
        let result = self.run_with(
            &["remote", "get-url", name],
            "remote_url",
            &GitOptions::new().success_exit_codes([0, 2, 128]),
        )?;
        if result.exit_code != 0 {
            return Ok(None);
        }
        Ok(Some(result.stdout.trim().to_string()))
    }

    /// Record the role of a remote in repository-local config, replacing any
    /// earlier role.
    pub fn set_remote_role(&self, name: &str, role: RemoteRole) -> anyhow::Result<()> {
        self.set_config_value(&format!("remote.{name}.{ROLE_KEY}"), role.into())
    }

    /// The branch `refs/remotes/<remote>/HEAD` points at, e.g. `main`.
    pub fn remote_head(&self, remote: &str) -> anyhow::Result<Option<String>> {
        let namespace = format!("refs/remotes/{remote}/");
        let Some(target) = self.symbolic_ref(&format!("{namespace}HEAD"))? else {
            return Ok(None);
        };
        Ok(target
            .strip_prefix(&namespace)
            .filter(|branch| !branch.is_empty())
            .map(str::to_string))
    }

    /// `owner/repo` of the named remote, or of the default remote.
    pub fn project_path_from_remote(&self, name: Option<&str>) -> anyhow::Result<Option<String>> {
        let remotes = self.remotes()?;
        let remote = match name {
            Some(name) => remotes.iter().find(|r| r.name == name),
            None => find_default_remote(&remotes),
        };
        Ok(remote.and_then(Remote::project_path))
    }

    /// The first remote whose fetch URL names `project_path` (`owner/repo`).
    pub fn find_remote_by_project_path(&self, project_path: &str) -> anyhow::Result<Option<Remote>> {
        Ok(self
            .remotes()?
            .into_iter()
            .find(|r| r.project_path().as_deref() == Some(project_path)))
    }
}
