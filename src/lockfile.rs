//! Lockfile generation and parsing for reproducible resolutions
//!
//! `unrealpm.lock` records the exact plugin versions of the last resolution. The
//! resolver reads it back to prefer what is already installed, or with `--locked`
//! to reproduce the previous result exactly.
//!
//! # Examples
//!
//! ```no_run
//! use unrealpm_resolver::Lockfile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! if let Some(lockfile) = Lockfile::load()? {
//!     for (name, locked) in &lockfile.plugins {
//!         println!("{} {}", name, locked.version);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::version::SelectedVersion;
use crate::{Error, Result};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// The lockfile filename
pub const LOCKFILE_NAME: &str = "unrealpm.lock";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lockfile {
    pub metadata: LockfileMetadata,

    /// Locked plugins by name
    #[serde(rename = "plugin", default)]
    pub plugins: BTreeMap<String, LockedPlugin>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockfileMetadata {
    /// Version of the resolver that wrote this lockfile
    pub unrealpm_version: String,

    /// Timestamp when the lockfile was generated (RFC 3339)
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPlugin {
    pub version: Version,

    /// Index of the remote the version was resolved from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<u32>,
}

impl Lockfile {
    pub fn new() -> Self {
        Self {
            metadata: LockfileMetadata {
                unrealpm_version: env!("CARGO_PKG_VERSION").to_string(),
                generated_at: chrono::Utc::now().to_rfc3339(),
            },
            plugins: BTreeMap::new(),
        }
    }

    /// Lock every selected version
    pub fn from_selection(selected: &[SelectedVersion]) -> Self {
        let mut lockfile = Self::new();
        for s in selected {
            lockfile.plugins.insert(
                s.name.clone(),
                LockedPlugin {
                    version: s.version.clone(),
                    remote: s.remote_index,
                },
            );
        }
        lockfile
    }

    /// Load lockfile from the current directory
    pub fn load() -> Result<Option<Self>> {
        Self::load_from(LOCKFILE_NAME)
    }

    /// Load lockfile from a specific path; `None` if it does not exist
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)?;
        let lockfile: Lockfile = toml::from_str(&contents)
            .map_err(|e| Error::Other(format!("Failed to parse lockfile {}: {}", path.display(), e)))?;

        Ok(Some(lockfile))
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), toml_string)?;
        Ok(())
    }

    /// Locked version per plugin name
    pub fn installed_versions(&self) -> HashMap<String, Version> {
        self.plugins
            .iter()
            .map(|(name, locked)| (name.clone(), locked.version.clone()))
            .collect()
    }
}

impl Default for Lockfile {
    fn default() -> Self {
        Self::new()
    }
}
