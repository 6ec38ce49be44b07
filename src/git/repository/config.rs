//! Git config access for Repository.
//!
//! Reads go through `git config -z` so values containing spaces or newlines
//! survive intact.

use super::Repository;
use crate::git::core::GitOptions;

/// Upstream configuration of a local branch (`branch.<name>.remote` / `.merge`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchConfig {
    /// Raw `branch.<name>.remote`; may be a filesystem path such as `.`.
    pub remote: Option<String>,
    /// Raw `branch.<name>.merge`, e.g. `refs/heads/main`.
    pub merge_ref: Option<String>,
}

impl BranchConfig {
    /// The remote name, unless the branch tracks a filesystem path.
    pub fn remote_name(&self) -> Option<&str> {
        self.remote.as_deref().filter(|r| !is_filesystem_path(r))
    }

    /// The upstream branch name without `refs/heads/`.
    pub fn merge_branch(&self) -> Option<&str> {
        self.merge_ref
            .as_deref()
            .map(|r| r.strip_prefix("refs/heads/").unwrap_or(r))
    }
}

/// Whether a `branch.<name>.remote` value names a local path rather than a remote.
fn is_filesystem_path(value: &str) -> bool {
    value == "."
        || value.starts_with("./")
        || value.starts_with("../")
        || value.starts_with('/')
        || value.starts_with('~')
}

/// Parse a git boolean. Returns `None` for values git wouldn't accept.
pub fn parse_config_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" | "" => Some(false),
        _ => None,
    }
}

/// Escape a literal for use inside a POSIX extended regex.
fn escape_posix_regex(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if ".^$*+?()[]{}|\\".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Parse `git config -z --get-regexp` output into `(key, value)` pairs.
fn parse_config_records(output: &str) -> Vec<(String, String)> {
    output
        .split('\0')
        .filter(|record| !record.is_empty())
        .map(|record| match record.split_once('\n') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (record.to_string(), String::new()),
        })
        .collect()
}

impl Repository {
    /// Read a config value. `None` when unset.
    pub fn config_value(&self, name: &str) -> anyhow::Result<Option<String>> {
        let result = self.run_with(
            &["config", "-z", "--get", name],
            "config_value",
            &GitOptions::new().success_exit_codes([0, 1]),
        )?;
        if result.exit_code != 0 {
            return Ok(None);
        }
        Ok(Some(result.stdout.trim_end_matches('\0').to_string()))
    }

    /// Read a boolean config value using git's spelling rules.
    pub fn boolean_config_value(&self, name: &str) -> anyhow::Result<Option<bool>> {
        Ok(self
            .config_value(name)?
            .as_deref()
            .and_then(parse_config_bool))
    }

    /// All `(key, value)` pairs whose key matches a POSIX regex.
    pub fn config_values_matching(&self, pattern: &str) -> anyhow::Result<Vec<(String, String)>> {
        let result = self.run_with(
            &["config", "-z", "--get-regexp", pattern],
            "config_values_matching",
            &GitOptions::new().success_exit_codes([0, 1]),
        )?;
        if result.exit_code != 0 {
            return Ok(Vec::new());
        }
        Ok(parse_config_records(&result.stdout))
    }

    /// Set a repository-local config value, replacing any existing one.
    pub fn set_config_value(&self, name: &str, value: &str) -> anyhow::Result<()> {
        self.run_with(
            &["config", "--local", "--replace-all", name, value],
            "set_config_value",
            &GitOptions::new(),
        )?;
        Ok(())
    }

    /// Append a repository-local config value (multi-valued keys).
    pub fn add_config_value(&self, name: &str, value: &str) -> anyhow::Result<()> {
        self.run_with(
            &["config", "--local", "--add", name, value],
            "add_config_value",
            &GitOptions::new(),
        )?;
        Ok(())
    }

    /// Remove every repository-local value of `name`. Missing keys are fine.
    pub fn remove_config_value(&self, name: &str) -> anyhow::Result<()> {
        self.run_with(
            &["config", "--local", "--unset-all", name],
            "remove_config_value",
            &GitOptions::new().success_exit_codes([0, 5]),
        )?;
        Ok(())
    }

    /// Upstream configuration for `branch`, or `None` when neither key is set.
    pub fn branch_config(&self, branch: &str) -> anyhow::Result<Option<BranchConfig>> {
        let pattern = format!(
            "^branch\\.{}\\.(remote|merge)$",
            escape_posix_regex(branch)
        );
        let mut config = BranchConfig::default();
        for (key, value) in self.config_values_matching(&pattern)? {
            if key.ends_with(".remote") {
                config.remote = Some(value);
            } else if key.ends_with(".merge") {
                config.merge_ref = Some(value);
            }
        }
        if config == BranchConfig::default() {
            return Ok(None);
        }
        Ok(Some(config))
    }
}
