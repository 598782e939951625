//! Run configuration and fix file loading.
//!
//! Repository identity and credentials are resolved once per run into a
//! [`RunConfig`] that is then passed to every fix.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracker::{RepoRef, GITHUB_API_URL};

use crate::assignee::DEFAULT_MAX_RETRIES;
use crate::engine::ReconcileSettings;
use crate::violation::FixEntry;

/// Target repository as `owner/name`.
pub const ENV_TARGET_REPO: &str = "TARGET_REPO";
/// Token used against the GitHub API.
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
/// Optional API root override (GitHub Enterprise).
pub const ENV_GITHUB_API_URL: &str = "GITHUB_API_URL";
/// Optional bound on assignee retries.
pub const ENV_ASSIGNEE_MAX_RETRIES: &str = "ASSIGNEE_MAX_RETRIES";

/// Placeholder repository used in dry-run mode.
const DRY_RUN_OWNER: &str = "test";
const DRY_RUN_REPO: &str = "tester-repo";
const DRY_RUN_TOKEN: &str = "fake";

/// Configuration errors. Fatal to the fix invocation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not perform fix due to missing/invalid environment variables! Please set TARGET_REPO and GITHUB_TOKEN environment variables.")]
    MissingEnvironment,

    #[error("Invalid target repository '{0}' (expected owner/name)")]
    InvalidRepository(String),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },

    #[error("Failed to read fix file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse fix file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unsupported fix file format: {0} (expected .json, .yaml, .yml or .toml)")]
    UnsupportedFormat(PathBuf),

    #[error("Invalid uniqueRuleId {id:?}: {reason}")]
    InvalidRuleId { id: String, reason: &'static str },
}

/// Per-run configuration.
#[derive(Clone)]
pub struct RunConfig {
    pub repository: RepoRef,
    pub token: String,
    pub api_url: String,
    /// Route every tracker call through the in-memory store
    pub dry_run: bool,
    pub max_assignee_retries: usize,
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("repository", &self.repository)
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("dry_run", &self.dry_run)
            .field("max_assignee_retries", &self.max_assignee_retries)
            .finish()
    }
}

impl RunConfig {
    /// Load configuration from environment variables.
    pub fn from_env(dry_run: bool) -> Result<Self, ConfigError> {
        Self::from_lookup(dry_run, |key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(dry_run: bool, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = get(ENV_GITHUB_API_URL).unwrap_or_else(|| GITHUB_API_URL.to_string());
        let max_assignee_retries = match get(ENV_ASSIGNEE_MAX_RETRIES) {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: ENV_ASSIGNEE_MAX_RETRIES,
                    value: raw.clone(),
                })?,
            None => DEFAULT_MAX_RETRIES,
        };

        if dry_run {
            return Ok(Self {
                repository: RepoRef::new(DRY_RUN_OWNER, DRY_RUN_REPO),
                token: DRY_RUN_TOKEN.to_string(),
                api_url,
                dry_run: true,
                max_assignee_retries,
            });
        }

        let (Some(target), Some(token)) = (get(ENV_TARGET_REPO), get(ENV_GITHUB_TOKEN)) else {
            return Err(ConfigError::MissingEnvironment);
        };
        let repository =
            RepoRef::parse(&target).ok_or_else(|| ConfigError::InvalidRepository(target.clone()))?;

        Ok(Self {
            repository,
            token,
            api_url,
            dry_run: false,
            max_assignee_retries,
        })
    }

    /// Settings the reconciler needs from this run.
    pub fn reconcile_settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            repository: self.repository.clone(),
            max_assignee_retries: self.max_assignee_retries,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FixFile {
    #[serde(default)]
    fixes: Vec<FixEntry>,
}

/// Load fix entries from a JSON, YAML or TOML file.
///
/// JSON and YAML files may hold either a bare list of entries or a
/// `fixes` list; TOML files use `[[fixes]]` tables. Every entry must carry a
/// rule id that survives the issue body marker unchanged.
pub fn load_fix_file(path: &Path) -> Result<Vec<FixEntry>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let entries: Vec<FixEntry> = match extension.as_deref() {
        Some("json") => {
            let value: serde_json::Value =
                serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?;
            if value.is_array() {
                serde_json::from_value(value).map_err(|e| parse_err(e.to_string()))
            } else {
                serde_json::from_value::<FixFile>(value)
                    .map(|f| f.fixes)
                    .map_err(|e| parse_err(e.to_string()))
            }
        }
        Some("yaml" | "yml") => {
            let value: serde_yaml::Value =
                serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))?;
            if value.is_sequence() {
                serde_yaml::from_value(value).map_err(|e| parse_err(e.to_string()))
            } else {
                serde_yaml::from_value::<FixFile>(value)
                    .map(|f| f.fixes)
                    .map_err(|e| parse_err(e.to_string()))
            }
        }
        Some("toml") => toml::from_str::<FixFile>(&content)
            .map(|f| f.fixes)
            .map_err(|e| parse_err(e.to_string())),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }?;

    for entry in &entries {
        entry.violation.validate()?;
    }
    Ok(entries)
}
