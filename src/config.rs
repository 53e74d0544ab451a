//! Configuration loading and management.
//!
//! Lookup order: an explicit `--config` path, `.gtd-triage/config.yaml` in
//! the working directory, `~/.gtd-triage/config.yaml`, then defaults.
//! Environment variables override whichever file was used:
//! - `GTD_TRIAGE_DB_PATH` - Database path
//! - `GTD_TRIAGE_DEDUP_SUGGESTIONS` - `true`/`false`
//! - `GTD_TRIAGE_ATOMIC_BATCHES` - `true`/`false`

use crate::engine::suggest::{SuggestionRule, default_rules};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Project-level config file, relative to the working directory.
pub const PROJECT_CONFIG: &str = ".gtd-triage/config.yaml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub batching: BatchingConfig,

    #[serde(default)]
    pub suggestions: SuggestionsConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".gtd-triage/tasks.db")
}

/// Auto-batching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchingConfig {
    /// Commit each batch and its member assignments together.
    /// When false, members are assigned one at a time after the batch is created.
    #[serde(default = "default_true")]
    pub atomic: bool,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self { atomic: true }
    }
}

fn default_true() -> bool {
    true
}

/// Dependency suggestion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionsConfig {
    /// Remove repeated ids from suggestion lists.
    #[serde(default)]
    pub dedup: bool,

    /// Trigger/dependency phrase table. Replaces the built-in table when set.
    #[serde(default = "default_rules")]
    pub rules: Vec<SuggestionRule>,
}

impl Default for SuggestionsConfig {
    fn default() -> Self {
        Self {
            dedup: false,
            rules: default_rules(),
        }
    }
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// User-level config file, if a home directory is known.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".gtd-triage").join("config.yaml"))
    }

    /// Load from an explicit path, or from the default locations.
    ///
    /// An explicit path that fails to load is an error; missing default
    /// files fall through to built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::load_or_default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from default locations or return defaults.
    pub fn load_or_default() -> Self {
        let mut candidates = vec![PathBuf::from(PROJECT_CONFIG)];
        candidates.extend(Self::user_config_path());

        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded config");
                    return config;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Ignoring unreadable config"),
            }
        }

        Self::default()
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(db_path) = std::env::var("GTD_TRIAGE_DB_PATH") {
            self.server.db_path = PathBuf::from(db_path);
        }

        if let Some(dedup) = env_bool("GTD_TRIAGE_DEDUP_SUGGESTIONS") {
            self.suggestions.dedup = dedup;
        }

        if let Some(atomic) = env_bool("GTD_TRIAGE_ATOMIC_BATCHES") {
            self.batching.atomic = atomic;
        }
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

fn env_bool(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    parse_bool(&value).or_else(|| {
        warn!(var = name, value = %value, "Ignoring non-boolean environment value");
        None
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.server.db_path, PathBuf::from(".gtd-triage/tasks.db"));
        assert!(config.batching.atomic);
        assert!(!config.suggestions.dedup);
        assert_eq!(config.suggestions.rules, default_rules());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str("suggestions:\n  dedup: true\n").unwrap();
        assert!(config.suggestions.dedup);
        assert_eq!(config.suggestions.rules, default_rules());
        assert!(config.batching.atomic);
    }

    #[test]
    fn custom_rules_from_yaml() {
        let yaml = "suggestions:\n  rules:\n    - trigger: bake\n      depends_on: [buy flour]\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.suggestions.rules.len(), 1);
        assert_eq!(config.suggestions.rules[0].trigger, "bake");
        assert_eq!(config.suggestions.rules[0].depends_on, vec!["buy flour"]);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  db_path: /tmp/x.db\nbatching:\n  atomic: false").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.db_path, PathBuf::from("/tmp/x.db"));
        assert!(!config.batching.atomic);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        assert!(Config::resolve(Some(Path::new("/nonexistent/config.yaml"))).is_err());
    }

    #[test]
    fn bool_parsing() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
