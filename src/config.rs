use crate::error::ConfigError;
use crate::utils::config_paths::ConfigPaths;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_DIRECTORY: &str = ".procpool";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const LOG_FILE_NAME: &str = "procpool.log";

pub const CAPACITY_ENV: &str = "PROCPOOL_CAPACITY";
pub const ROOT_ENV: &str = "PROCPOOL_ROOT";
pub const POLL_INTERVAL_ENV: &str = "PROCPOOL_POLL_INTERVAL_MS";

pub const DEFAULT_CAPACITY: usize = 1;
// Worst-case latency before freed capacity is noticed by a blocked launch.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Settings for a [`ProcessSupervisor`](crate::supervisor::ProcessSupervisor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Maximum number of pending workers; 0 disables admission control.
    pub capacity: usize,
    /// Base directory targets are resolved against (current directory when unset).
    pub root: Option<PathBuf>,
    pub poll_interval_ms: u64,
    /// Program used to run targets, e.g. `php` or `python3`.
    pub interpreter: Option<PathBuf>,
    /// Suffix appended to every target name, without the leading dot.
    pub extension: Option<String>,
    /// Environment variable prefixes passed through to workers.
    /// Empty means workers inherit the full environment.
    pub env_allow_prefixes: Vec<String>,
    /// Move workers that never obtained a pid to the completed list on the next poll.
    pub finish_failed_spawns: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            root: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            interpreter: None,
            extension: None,
            env_allow_prefixes: Vec::new(),
            finish_failed_spawns: false,
        }
    }
}

impl SupervisorConfig {
    /// Load `~/.procpool/config.json` (if present) and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let paths = ConfigPaths::new()?;
        Self::load_from(&paths.config_file)?.with_overrides(|key| std::env::var(key).ok())
    }

    /// Read a config file; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::InvalidFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `PROCPOOL_*` overrides through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(CAPACITY_ENV) {
            self.capacity = parse_number(CAPACITY_ENV, &value)?;
        }
        if let Some(value) = lookup(ROOT_ENV) {
            self.root = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup(POLL_INTERVAL_ENV) {
            self.poll_interval_ms = parse_number(POLL_INTERVAL_ENV, &value)?;
        }
        Ok(self)
    }

    pub fn root_dir(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn env_policy(&self) -> EnvPolicy {
        EnvPolicy {
            allow_prefixes: self.env_allow_prefixes.clone(),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Which parts of the supervisor's environment reach its workers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvPolicy {
    pub allow_prefixes: Vec<String>,
}

impl EnvPolicy {
    /// Snapshot the current process environment under this policy.
    ///
    /// `None` means "inherit everything".
    pub fn capture(&self) -> Option<Vec<(OsString, OsString)>> {
        self.filter(std::env::vars_os())
    }

    pub fn filter<I>(&self, vars: I) -> Option<Vec<(OsString, OsString)>>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        if self.allow_prefixes.is_empty() {
            return None;
        }
        Some(
            vars.into_iter()
                .filter(|(key, _)| {
                    key.to_str().is_some_and(|name| {
                        name == "PATH"
                            || self
                                .allow_prefixes
                                .iter()
                                .any(|prefix| name.starts_with(prefix.as_str()))
                    })
                })
                .collect(),
        )
    }
}
