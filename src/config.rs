//! User configuration.
//!
//! Settings come from `git.toml` in the platform config directory, with
//! `GONGFENG_GIT_*` environment variables layered on top:
//!
//! ```toml
//! git_path = "/opt/git/bin/git"
//! track_lfs_progress = true
//! ```
//!
//! Everything is optional; with no file present the defaults apply.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use config::ConfigError;
use etcetera::base_strategy::{BaseStrategy, choose_base_strategy};
use serde::Deserialize;

/// Environment prefix for overrides (e.g. `GONGFENG_GIT_GIT_PATH`).
pub const ENV_PREFIX: &str = "GONGFENG_GIT";

/// Environment variable naming an alternate config file.
pub const CONFIG_PATH_ENV_VAR: &str = "GONGFENG_GIT_CONFIG_PATH";

/// Override for the config path, set via the `--config` CLI flag.
static CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Resolved git executable, computed on first use.
static GIT_EXECUTABLE: OnceLock<PathBuf> = OnceLock::new();

static SETTINGS: OnceLock<GitSettings> = OnceLock::new();

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitSettings {
    /// Explicit git executable. When unset, `git` is looked up on `PATH`.
    pub git_path: Option<PathBuf>,
    /// Track git-lfs transfer progress during fetch, pull, push and checkout.
    pub track_lfs_progress: bool,
    /// Default log filter for the CLI, overridden by `RUST_LOG`.
    pub log_level: Option<String>,
}

impl GitSettings {
    /// Load settings from the default location plus environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(config_path().as_deref())
    }

    /// Load settings from `path` (if it exists) plus environment overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()
    }
}

/// Settings for this process, loaded on first use.
///
/// An unreadable config file is logged and replaced by the defaults.
pub fn settings() -> &'static GitSettings {
    SETTINGS.get_or_init(|| {
        GitSettings::load().unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable config: {e}");
            GitSettings::default()
        })
    })
}

/// Set the config path override (called from the CLI `--config` flag).
pub fn set_config_path(path: PathBuf) {
    CONFIG_PATH.set(path).ok();
}

/// Get the config file path.
///
/// Priority:
/// 1. CLI `--config` flag
/// 2. `GONGFENG_GIT_CONFIG_PATH`
/// 3. Platform config directory (`~/.config/gongfeng/git.toml` on Linux)
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = CONFIG_PATH.get() {
        return Some(path.clone());
    }
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    let strategy = choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("gongfeng").join("git.toml"))
}

/// Install the git executable used by every invocation.
///
/// Only the first call has an effect; later calls (and the lazy default)
/// keep the first value.
pub fn set_git_executable(path: PathBuf) {
    GIT_EXECUTABLE.set(path).ok();
}

/// The git executable used by every invocation.
///
/// Resolved once from settings, then `PATH`, falling back to plain `git` so
/// that a missing binary surfaces as a spawn error.
pub fn git_executable() -> &'static Path {
    GIT_EXECUTABLE.get_or_init(|| resolve_git_executable(settings()))
}

fn resolve_git_executable(settings: &GitSettings) -> PathBuf {
    if let Some(path) = &settings.git_path {
        return path.clone();
    }
    match which::which("git") {
        Ok(path) => path,
        Err(e) => {
            log::debug!("git not found on PATH: {e}");
            PathBuf::from("git")
        }
    }
}
