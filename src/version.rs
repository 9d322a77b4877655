//! Candidate versions and their preference order
//!
//! A [`SelectedVersion`] names one concrete version of one plugin, together with the
//! two tie-breakers used when several candidates are otherwise equal: whether the
//! version is already installed, and which remote catalog it came from.
//!
//! The [`Ord`] implementation is the preference order used everywhere in the
//! resolver: a *greater* value is a *more preferred* candidate. The solver branches
//! on the greatest free variable first, and candidate lists are sorted descending.
//!
//! Order keys, in priority:
//!
//! 1. plugin name (case-insensitive, then case-sensitive)
//! 2. installed before not installed
//! 3. SemVer precedence (build metadata ignored)
//! 4. remote index, lower first; a version without a remote index counts as index `-1`
//!    and is preferred over every remote
//! 5. build metadata, so that the order stays total and agrees with `Eq`

use crate::{Error, Result};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Display};

/// Separator between plugin name and version in encoded variable names
pub const VARIABLE_SEPARATOR: &str = "-v";

/// One concrete version of one plugin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectedVersion {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub installed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_index: Option<u32>,
}

impl SelectedVersion {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            installed: false,
            remote_index: None,
        }
    }

    pub fn with_installed(mut self, installed: bool) -> Self {
        self.installed = installed;
        self
    }

    pub fn with_remote_index(mut self, remote_index: Option<u32>) -> Self {
        self.remote_index = remote_index;
        self
    }

    /// Encoded name of this candidate as a formula variable (`{name}-v{version}`)
    pub fn variable_name(&self) -> String {
        format!("{}{}{}", self.name, VARIABLE_SEPARATOR, self.version)
    }

    fn remote_rank(&self) -> i64 {
        self.remote_index.map(i64::from).unwrap_or(-1)
    }
}

impl Display for SelectedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

impl Ord for SelectedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_names(&self.name, &other.name)
            .then_with(|| compare_candidates(self, other))
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl PartialOrd for SelectedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare plugin names case-insensitively, falling back to byte order for ties
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
        .then_with(|| a.cmp(b))
}

/// Preference between two candidates of the same plugin, ignoring the name
///
/// `Greater` means `a` is preferred over `b`.
pub fn compare_candidates(a: &SelectedVersion, b: &SelectedVersion) -> Ordering {
    a.installed
        .cmp(&b.installed)
        .then_with(|| a.version.cmp_precedence(&b.version))
        .then_with(|| b.remote_rank().cmp(&a.remote_rank()))
}

/// Parse a version string, accepting `v` prefixes and two-component versions
///
/// Unreal plugins frequently declare `VersionName` as `1.2`, which is read as `1.2.0`.
pub fn parse_version(input: &str) -> Result<Version> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    // Only the core (before any prerelease or build suffix) may be short
    let core_end = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(core_end);
    let normalized = match core.matches('.').count() {
        0 if !core.is_empty() => format!("{}.0.0{}", core, suffix),
        1 => format!("{}.0{}", core, suffix),
        _ => trimmed.to_string(),
    };

    Version::parse(&normalized).map_err(Error::from)
}

/// Split an encoded variable name back into plugin name and version
///
/// Plugin names may themselves contain `-v`, so every occurrence is tried from the
/// right and the first split whose tail is a valid version wins.
pub fn parse_variable_name(encoded: &str) -> Option<(String, Version)> {
    encoded
        .rmatch_indices(VARIABLE_SEPARATOR)
        .filter(|(pos, _)| *pos > 0)
        .find_map(|(pos, sep)| {
            let version = Version::parse(&encoded[pos + sep.len()..]).ok()?;
            Some((encoded[..pos].to_string(), version))
        })
}
