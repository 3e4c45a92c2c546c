//! Application configuration.
//!
//! Read once at startup from an optional YAML file, then overridden by
//! `EXPENSES_*` environment variables. Nothing re-reads it afterwards: the
//! backend choice it implies is fixed for the life of the process.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::storage::FileStore;

pub const DEFAULT_HEALTHCHECK_PATH: &str = "/health";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Flags that are on unless explicitly disabled
const DEFAULT_FLAGS: &[&str] = &["charts"];

/// Shape of the YAML config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub api_base: Option<String>,
    pub healthcheck_path: Option<String>,
    pub feature_flags: Vec<String>,
    pub experiments_enabled: Option<bool>,
    pub data_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub default_headers: BTreeMap<String, String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let yaml_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: FileConfig = serde_yaml::from_str(&yaml_content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        debug!("Loaded config file {:?}", path);
        Ok(config)
    }
}

/// Named feature switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureFlags {
    enabled: BTreeSet<String>,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::parse(std::iter::empty::<&str>())
    }
}

impl FeatureFlags {
    /// Build from flag names. `!name` turns a flag off, which is the only way
    /// to disable a default flag.
    pub fn parse<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut enabled = BTreeSet::new();
        let mut disabled = BTreeSet::new();
        for name in names {
            let name = name.as_ref().trim();
            if let Some(off) = name.strip_prefix('!') {
                let off = off.trim();
                if !off.is_empty() {
                    disabled.insert(off.to_string());
                }
            } else if !name.is_empty() {
                enabled.insert(name.to_string());
            }
        }
        for default in DEFAULT_FLAGS {
            if !disabled.contains(*default) {
                enabled.insert(default.to_string());
            }
        }
        enabled.retain(|name| !disabled.contains(name));

        Self { enabled }
    }

    /// Parse a comma separated list such as `"charts,newFilters"`
    pub fn from_list(list: &str) -> Self {
        Self::parse(list.split(','))
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.enabled.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Remote API base. `None` selects the local backend.
    pub api_base: Option<String>,
    pub healthcheck_path: String,
    pub features: FeatureFlags,
    pub experiments_enabled: bool,
    /// Directory of the file store; `None` means the platform default
    pub data_dir: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub default_headers: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(FileConfig::default(), |_| None)
    }
}

impl AppConfig {
    /// Config file (if any) overridden by the process environment
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let file = match config_file {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::from_lookup(file, |key| std::env::var(key).ok()))
    }

    pub fn from_env() -> Self {
        Self::from_lookup(FileConfig::default(), |key| std::env::var(key).ok())
    }

    /// Merge `file` with variables resolved through `lookup`; variables win.
    /// Empty variables count as unset.
    pub fn from_lookup<F>(file: FileConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_base = var("EXPENSES_API_BASE")
            .or_else(|| var("EXPENSES_BACKEND_URL"))
            .or(file.api_base)
            .map(|base| base.trim().to_string())
            .filter(|base| !base.is_empty());

        let healthcheck_path = var("EXPENSES_HEALTHCHECK_PATH")
            .or(file.healthcheck_path)
            .unwrap_or_else(|| DEFAULT_HEALTHCHECK_PATH.to_string());

        let features = match var("EXPENSES_FEATURE_FLAGS") {
            Some(list) => FeatureFlags::from_list(&list),
            None => FeatureFlags::parse(&file.feature_flags),
        };

        let experiments_enabled = match var("EXPENSES_EXPERIMENTS_ENABLED") {
            Some(value) => value.eq_ignore_ascii_case("true"),
            None => file.experiments_enabled.unwrap_or(false),
        };

        let data_dir = var("EXPENSES_DATA_DIR").map(PathBuf::from).or(file.data_dir);

        let request_timeout_secs = match var("EXPENSES_REQUEST_TIMEOUT_SECS") {
            Some(value) => value.parse().unwrap_or_else(|_| {
                warn!("Ignoring invalid EXPENSES_REQUEST_TIMEOUT_SECS '{}'", value);
                file.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
            }),
            None => file.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Self {
            api_base,
            healthcheck_path,
            features,
            experiments_enabled,
            data_dir,
            request_timeout_secs,
            default_headers: file.default_headers,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn is_remote(&self) -> bool {
        self.api_base.is_some()
    }

    /// Open the file store at the configured or default data directory
    pub fn open_store(&self) -> Result<FileStore> {
        match &self.data_dir {
            Some(dir) => FileStore::new(dir),
            None => FileStore::new_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.api_base, None);
        assert!(!config.is_remote());
        assert_eq!(config.healthcheck_path, "/health");
        assert!(config.features.is_enabled("charts"));
        assert!(!config.experiments_enabled);
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_api_base_fallback_and_empty() {
        let config = AppConfig::from_lookup(
            FileConfig::default(),
            lookup_from(&[("EXPENSES_BACKEND_URL", "http://api.test")]),
        );
        assert_eq!(config.api_base.as_deref(), Some("http://api.test"));

        let config = AppConfig::from_lookup(
            FileConfig::default(),
            lookup_from(&[("EXPENSES_API_BASE", "  "), ("EXPENSES_BACKEND_URL", "")]),
        );
        assert_eq!(config.api_base, None);
    }

    #[test]
    fn test_feature_flags() {
        let flags = FeatureFlags::from_list(" newFilters, ,charts");
        assert!(flags.is_enabled("newFilters"));
        assert!(flags.is_enabled("charts"));

        let flags = FeatureFlags::from_list("!charts,beta");
        assert!(!flags.is_enabled("charts"));
        assert_eq!(flags.names().collect::<Vec<_>>(), vec!["beta"]);
    }

    #[test]
    fn test_experiments_flag_is_case_insensitive() {
        let on = AppConfig::from_lookup(
            FileConfig::default(),
            lookup_from(&[("EXPENSES_EXPERIMENTS_ENABLED", "TRUE")]),
        );
        let off = AppConfig::from_lookup(
            FileConfig::default(),
            lookup_from(&[("EXPENSES_EXPERIMENTS_ENABLED", "yes")]),
        );
        assert!(on.experiments_enabled);
        assert!(!off.experiments_enabled);
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(
            &path,
            "api_base: http://file.test\n\
             healthcheck_path: /status\n\
             request_timeout_secs: 3\n\
             feature_flags: ['!charts']\n\
             default_headers:\n  x-client: cli\n",
        )
        .unwrap();
        let file = FileConfig::load(&path).unwrap();

        let config = AppConfig::from_lookup(
            file,
            lookup_from(&[
                ("EXPENSES_API_BASE", "http://env.test"),
                ("EXPENSES_REQUEST_TIMEOUT_SECS", "not a number"),
            ]),
        );

        assert_eq!(config.api_base.as_deref(), Some("http://env.test"));
        assert_eq!(config.healthcheck_path, "/status");
        assert_eq!(config.request_timeout_secs, 3);
        assert!(!config.features.is_enabled("charts"));
        assert_eq!(config.default_headers.get("x-client").map(String::as_str), Some("cli"));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        assert!(AppConfig::load(Some(Path::new("/definitely/not/here.yaml"))).is_err());
    }

    #[test]
    fn test_open_store_uses_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig {
            data_dir: Some(temp_dir.path().join("data")),
            ..AppConfig::default()
        };

        let store = config.open_store().unwrap();
        assert_eq!(store.base_directory(), temp_dir.path().join("data"));
    }
}
