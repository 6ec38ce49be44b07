//! Git remote URL parsing.
//!
//! Parses git remote URLs into structured components (protocol, host, port,
//! namespace, repo). Supports HTTP(S), git, SSH, and scp-like URL formats.
//! Namespaces may be nested (`group/subgroup`) or empty.

use strum::{Display, EnumString};

/// Transport named by a remote URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Protocol {
    Https,
    Http,
    Git,
    Ssh,
}

/// Parsed git remote URL.
///
/// # Supported URL formats
///
/// - `https://[user[:pass]@]<host>[:port]/<namespace>/<repo>.git`
/// - `http://<host>[:port]/<namespace>/<repo>.git`
/// - `git://<host>[:port]/<namespace>/<repo>.git`
/// - `ssh://[user@]<host>[:port]/<namespace>/<repo>.git`
/// - `[user@]<host>:<namespace>/<repo>.git` (scp-like)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRemoteUrl {
    raw: String,
    protocol: Protocol,
    user: Option<String>,
    host: String,
    port: Option<u16>,
    owner: String,
    repo: String,
}

impl GitRemoteUrl {
    /// Parse a git remote URL into structured components.
    ///
    /// Returns `None` for local paths, malformed URLs, and unsupported schemes.
    pub fn parse(url: &str) -> Option<Self> {
        let raw = url.trim();

        let (protocol, authority, path) = if let Some((scheme, rest)) = raw.split_once("://") {
            let protocol = match scheme.to_ascii_lowercase().as_str() {
                "https" => Protocol::Https,
                "http" => Protocol::Http,
                "git" => Protocol::Git,
                "ssh" | "git+ssh" | "ssh+git" => Protocol::Ssh,
                _ => return None,
            };
            let (authority, path) = rest.split_once('/')?;
            (protocol, authority, path)
        } else {
            // scp-like syntax: no slash may come before the first colon.
            let (authority, path) = raw.split_once(':')?;
            if authority.is_empty() || authority.contains('/') || path.starts_with("//") {
                return None;
            }
            (Protocol::Ssh, authority, path)
        };

        let (user, host_port) = match authority.rsplit_once('@') {
            Some((user, host_port)) => {
                // Drop any password component.
                let user = user.split(':').next().unwrap_or(user);
                (Some(user.to_string()), host_port)
            }
            None => (None, authority),
        };

        let (host, port) = if raw.contains("://") {
            match host_port.rsplit_once(':') {
                Some((host, port)) => (host, Some(port.parse::<u16>().ok()?)),
                None => (host_port, None),
            }
        } else {
            (host_port, None)
        };

        let path = path.trim_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let (owner, repo) = match path.rsplit_once('/') {
            Some((owner, repo)) => (owner, repo),
            None => ("", path),
        };

        if host.is_empty() || repo.is_empty() {
            return None;
        }

        Some(Self {
            raw: raw.to_string(),
            protocol,
            user: user.filter(|u| !u.is_empty()),
            host: host.to_string(),
            port,
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// The URL exactly as configured, trimmed.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// The user part of the authority, if any (e.g. "git" for `git@host:...`).
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// The host (e.g. "git.example.com").
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, if the URL names one.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// The namespace holding the repository. May be nested ("group/sub") or empty.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The repository name without .git suffix.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Project path in "namespace/repo" format, as used by the hosting service.
    pub fn project_path(&self) -> String {
        if self.owner.is_empty() {
            self.repo.clone()
        } else {
            format!("{}/{}", self.owner, self.repo)
        }
    }

    /// Project identifier in "host/namespace/repo" format.
    pub fn project_identifier(&self) -> String {
        format!("{}/{}", self.host, self.project_path())
    }
}

impl std::fmt::Display for GitRemoteUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
