//! User configuration management
//!
//! Configuration is stored in TOML format at `~/.unrealpm/config.toml`. It lists the
//! catalog directories (remotes) to resolve against, in priority order, and the
//! resolver and logging settings.
//!
//! # Examples
//!
//! ```no_run
//! use unrealpm_resolver::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::load()?;
//! config.add_remote("studio", "~/plugins/studio");
//! config.set("resolver.resolution_timeout_seconds", "30")?;
//! config.save()?;
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// User configuration file (`~/.unrealpm/config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Dependency resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Catalog directories, highest priority first
    #[serde(default)]
    pub remotes: Vec<RemoteConfig>,
}

/// Dependency resolver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Maximum dependency depth to prevent runaway chains (default: 100)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Timeout for resolution in seconds (0 = no timeout)
    #[serde(default)]
    pub resolution_timeout_seconds: u64,
}

fn default_max_depth() -> usize {
    100
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            resolution_timeout_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter when neither RUST_LOG nor --verbose is given
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub name: String,
    /// Catalog directory; `~` and environment variables are expanded
    pub path: String,
}

impl Config {
    /// Get the default config file path
    ///
    /// Uses UNREALPM_CONFIG_DIR if set, otherwise ~/.unrealpm/config.toml
    pub fn default_path() -> Result<PathBuf> {
        // Check for custom config directory (useful for testing)
        if let Ok(config_dir) = std::env::var("UNREALPM_CONFIG_DIR") {
            return Ok(PathBuf::from(config_dir).join("config.toml"));
        }

        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| Error::Other("Could not find home directory".to_string()))?;

        Ok(PathBuf::from(home).join(".unrealpm").join("config.toml"))
    }

    /// Load config from file, or defaults if it doesn't exist
    ///
    /// Environment variable overrides:
    /// - `UNREALPM_RESOLUTION_TIMEOUT`: Overrides `resolver.resolution_timeout_seconds`
    /// - `UNREALPM_CONFIG_DIR`: Overrides the config directory location
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(Self::default_path()?)?;

        if let Ok(timeout) = std::env::var("UNREALPM_RESOLUTION_TIMEOUT") {
            if !timeout.is_empty() {
                config.resolver.resolution_timeout_seconds = timeout.parse().map_err(|_| {
                    Error::Other(format!(
                        "UNREALPM_RESOLUTION_TIMEOUT must be a number of seconds, got '{}'",
                        timeout
                    ))
                })?;
            }
        }

        Ok(config)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::default_path()?)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Add a remote, replacing any remote with the same name in place
    pub fn add_remote(&mut self, name: impl Into<String>, path: impl Into<String>) {
        let remote = RemoteConfig {
            name: name.into(),
            path: path.into(),
        };

        match self.remotes.iter_mut().find(|r| r.name == remote.name) {
            Some(existing) => *existing = remote,
            None => self.remotes.push(remote),
        }
    }

    /// Remove a remote; returns false if no remote had that name
    pub fn remove_remote(&mut self, name: &str) -> bool {
        let before = self.remotes.len();
        self.remotes.retain(|r| r.name != name);
        self.remotes.len() != before
    }

    /// Remote catalog directories in priority order, with paths expanded
    pub fn remote_paths(&self) -> Result<Vec<PathBuf>> {
        self.remotes
            .iter()
            .map(|remote| {
                shellexpand::full(&remote.path)
                    .map(|expanded| PathBuf::from(expanded.as_ref()))
                    .map_err(|e| {
                        Error::Other(format!("Invalid path for remote '{}': {}", remote.name, e))
                    })
            })
            .collect()
    }

    /// Set a single value by its dotted key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "resolver.max_depth" => {
                self.resolver.max_depth = parse_number(key, value)?;
            }
            "resolver.resolution_timeout_seconds" => {
                self.resolver.resolution_timeout_seconds = parse_number(key, value)?;
            }
            "logging.level" => {
                self.logging.level = value.to_string();
            }
            _ => {
                return Err(Error::Other(format!(
                    "Unknown config key: {}\n\n\
                     Valid keys:\n  \
                     resolver.max_depth\n  \
                     resolver.resolution_timeout_seconds\n  \
                     logging.level",
                    key
                )))
            }
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Other(format!("{} expects a number, got '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.resolver.max_depth, 100);
        assert_eq!(config.resolver.resolution_timeout_seconds, 0);
        assert_eq!(config.logging.level, "warn");
        assert!(config.remotes.is_empty());
    }

    #[test]
    fn test_remote_management() {
        let mut config = Config::default();

        config.add_remote("primary", "/srv/primary");
        config.add_remote("mirror", "/srv/mirror");
        assert_eq!(config.remotes.len(), 2);

        // Re-adding keeps the position
        config.add_remote("primary", "/srv/primary-v2");
        assert_eq!(config.remotes[0].path, "/srv/primary-v2");
        assert_eq!(config.remotes.len(), 2);

        assert!(config.remove_remote("primary"));
        assert!(!config.remove_remote("primary"));
        assert_eq!(config.remotes[0].name, "mirror");
    }

    #[test]
    fn test_set_values() {
        let mut config = Config::default();
        config.set("resolver.max_depth", "12").unwrap();
        config.set("resolver.resolution_timeout_seconds", "30").unwrap();
        config.set("logging.level", "debug").unwrap();

        assert_eq!(config.resolver.max_depth, 12);
        assert_eq!(config.resolver.resolution_timeout_seconds, 30);
        assert_eq!(config.logging.level, "debug");

        assert!(config.set("resolver.max_depth", "lots").is_err());
        assert!(config.set("registry.url", "x").is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.add_remote("primary", "/srv/primary");
        config.resolver.max_depth = 7;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[resolver]\nresolution_timeout_seconds = 5\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.resolver.resolution_timeout_seconds, 5);
        assert_eq!(config.resolver.max_depth, 100);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_from(temp.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_remote_paths_expand_tilde() {
        let mut config = Config::default();
        config.add_remote("plain", "/srv/plugins");
        config.add_remote("home", "~/plugins");

        let paths = config.remote_paths().unwrap();
        assert_eq!(paths[0], PathBuf::from("/srv/plugins"));
        if std::env::var("HOME").is_ok() {
            assert!(!paths[1].to_string_lossy().starts_with('~'));
        }
    }
}
