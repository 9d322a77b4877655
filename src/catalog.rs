//! Plugin catalog snapshots
//!
//! The resolver never talks to storage directly. Callers hand it a [`Catalog`]: a
//! read-only snapshot mapping plugin names to the versions available for them.
//! [`MemoryCatalog`] is the in-memory snapshot; [`load_catalog_dir`] fills one from a
//! directory in the registry metadata format (`packages/<Name>.json`), and
//! [`load_remotes`] merges several such directories in priority order.
//!
//! # Examples
//!
//! ```no_run
//! use unrealpm_resolver::{load_remotes, Catalog};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = load_remotes(&["/srv/plugins/primary", "/srv/plugins/mirror"])?;
//! for record in catalog.versions("Paper2DExtras") {
//!     println!("{} (remote {:?})", record.version, record.remote_index);
//! }
//! # Ok(())
//! # }
//! ```

use crate::range::VersionRange;
use crate::version::{parse_version, SelectedVersion};
use crate::{Error, Result};
use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Who provides a dependency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Another catalog plugin that must be resolved
    #[default]
    Provided,
    /// Ships with the engine; never looked up in the catalog
    Engine,
}

/// A dependency declared by one plugin version on another plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub name: String,
    #[serde(default)]
    pub version: VersionRange,
    #[serde(default, rename = "type")]
    pub kind: DependencyKind,
    #[serde(default)]
    pub optional: bool,
}

impl DependencyEdge {
    pub fn provided(name: impl Into<String>, version: VersionRange) -> Self {
        Self {
            name: name.into(),
            version,
            kind: DependencyKind::Provided,
            optional: false,
        }
    }

    pub fn engine(name: impl Into<String>, version: VersionRange) -> Self {
        Self {
            kind: DependencyKind::Engine,
            ..Self::provided(name, version)
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Whether the resolver has to account for this edge at all
    pub fn is_resolvable(&self) -> bool {
        self.kind == DependencyKind::Provided
    }
}

/// One published version of a plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub name: String,
    pub version: Version,
    pub dependencies: Vec<DependencyEdge>,
    pub installed: bool,
    pub remote_index: Option<u32>,
}

impl VersionRecord {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            dependencies: Vec::new(),
            installed: false,
            remote_index: None,
        }
    }

    pub fn with_dependency(mut self, edge: DependencyEdge) -> Self {
        self.dependencies.push(edge);
        self
    }

    /// The candidate this record stands for in a formula
    pub fn selected(&self) -> SelectedVersion {
        SelectedVersion::new(self.name.clone(), self.version.clone())
            .with_installed(self.installed)
            .with_remote_index(self.remote_index)
    }

    /// Edges that the resolver walks and compiles
    pub fn resolvable_dependencies(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.dependencies.iter().filter(|d| d.is_resolvable())
    }
}

/// Read-only lookup from plugin name to its available versions
pub trait Catalog {
    /// All versions of `name`; empty when the plugin is unknown
    fn versions(&self, name: &str) -> &[VersionRecord];
}

impl<C: Catalog + ?Sized> Catalog for &C {
    fn versions(&self, name: &str) -> &[VersionRecord] {
        (**self).versions(name)
    }
}

/// In-memory catalog snapshot
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    plugins: IndexMap<String, Vec<VersionRecord>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a version record
    ///
    /// A `(name, version)` pair already present is kept as is, so the first source
    /// of a version wins.
    pub fn insert(&mut self, record: VersionRecord) -> bool {
        let versions = self.plugins.entry(record.name.clone()).or_default();
        if versions.iter().any(|v| v.version == record.version) {
            return false;
        }
        versions.push(record);
        true
    }

    pub fn with(mut self, record: VersionRecord) -> Self {
        self.insert(record);
        self
    }

    pub fn plugin_names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Union with another catalog; versions already present here take priority
    pub fn merge(mut self, other: MemoryCatalog) -> Self {
        for record in other.plugins.into_values().flatten() {
            self.insert(record);
        }
        self
    }

    /// Stamp every record with the index of the remote it came from
    pub fn set_remote_index(&mut self, remote_index: u32) -> &mut Self {
        for record in self.plugins.values_mut().flatten() {
            record.remote_index = Some(remote_index);
        }
        self
    }

    /// Flag the records matching the installed plugin set
    pub fn mark_installed(&mut self, installed: &HashMap<String, Version>) -> &mut Self {
        for record in self.plugins.values_mut().flatten() {
            if installed.get(&record.name) == Some(&record.version) {
                record.installed = true;
            }
        }
        self
    }

    /// Keep only the pinned version of every pinned plugin
    pub fn restrict_to(&mut self, pinned: &HashMap<String, Version>) -> &mut Self {
        for (name, versions) in self.plugins.iter_mut() {
            if let Some(version) = pinned.get(name) {
                versions.retain(|r| &r.version == version);
            }
        }
        self
    }
}

impl Catalog for MemoryCatalog {
    fn versions(&self, name: &str) -> &[VersionRecord] {
        self.plugins.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Plugin metadata file stored under `packages/` in a catalog directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub versions: Vec<PluginVersion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginVersion {
    pub version: String,
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
}

impl PluginMetadata {
    /// Convert into version records, rejecting unparseable versions
    pub fn into_records(self) -> Result<Vec<VersionRecord>> {
        let name = self.name;
        self.versions
            .into_iter()
            .map(|v| {
                let version = parse_version(&v.version).map_err(|e| {
                    Error::InvalidCatalog(format!(
                        "plugin '{}' has invalid version '{}': {}",
                        name, v.version, e
                    ))
                })?;
                Ok(VersionRecord {
                    name: name.clone(),
                    version,
                    dependencies: v.dependencies,
                    installed: false,
                    remote_index: None,
                })
            })
            .collect()
    }
}

/// Load every plugin metadata file under `<path>/packages`
pub fn load_catalog_dir<P: AsRef<Path>>(path: P) -> Result<MemoryCatalog> {
    let packages_dir = path.as_ref().join("packages");
    if !packages_dir.is_dir() {
        return Err(Error::InvalidCatalog(format!(
            "{} is not a catalog directory (missing packages/)",
            path.as_ref().display()
        )));
    }

    let mut files: Vec<_> = walkdir::WalkDir::new(&packages_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    let mut catalog = MemoryCatalog::new();
    for file in files {
        let content = fs::read_to_string(&file)?;
        let metadata: PluginMetadata = serde_json::from_str(&content).map_err(|e| {
            Error::InvalidCatalog(format!("failed to parse {}: {}", file.display(), e))
        })?;
        for record in metadata.into_records()? {
            catalog.insert(record);
        }
    }

    debug!(
        path = %path.as_ref().display(),
        plugins = catalog.len(),
        "loaded catalog directory"
    );
    Ok(catalog)
}

/// Load several catalog directories, earlier ones taking priority
///
/// Each directory is stamped with its position as remote index.
pub fn load_remotes<P: AsRef<Path>>(paths: &[P]) -> Result<MemoryCatalog> {
    let mut merged = MemoryCatalog::new();
    for (index, path) in paths.iter().enumerate() {
        let mut catalog = load_catalog_dir(path)?;
        catalog.set_remote_index(index as u32);
        merged = merged.merge(catalog);
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn write_plugin(dir: &Path, json: &str, file: &str) {
        let packages = dir.join("packages");
        fs::create_dir_all(&packages).unwrap();
        fs::write(packages.join(file), json).unwrap();
    }

    #[test]
    fn test_insert_keeps_first_version() {
        let mut catalog = MemoryCatalog::new();
        let mut first = VersionRecord::new("Foo", v("1.0.0"));
        first.remote_index = Some(0);
        let mut second = VersionRecord::new("Foo", v("1.0.0"));
        second.remote_index = Some(1);

        assert!(catalog.insert(first));
        assert!(!catalog.insert(second));
        assert_eq!(catalog.versions("Foo").len(), 1);
        assert_eq!(catalog.versions("Foo")[0].remote_index, Some(0));
    }

    #[test]
    fn test_unknown_plugin_is_empty() {
        let catalog = MemoryCatalog::new();
        assert!(catalog.versions("Nothing").is_empty());
    }

    #[test]
    fn test_mark_installed_and_restrict() {
        let mut catalog = MemoryCatalog::new()
            .with(VersionRecord::new("Foo", v("1.0.0")))
            .with(VersionRecord::new("Foo", v("2.0.0")))
            .with(VersionRecord::new("Bar", v("1.0.0")));

        let installed = HashMap::from([("Foo".to_string(), v("1.0.0"))]);
        catalog.mark_installed(&installed);
        assert!(catalog.versions("Foo")[0].installed);
        assert!(!catalog.versions("Foo")[1].installed);

        catalog.restrict_to(&installed);
        assert_eq!(catalog.versions("Foo").len(), 1);
        assert_eq!(catalog.versions("Bar").len(), 1);
    }

    #[test]
    fn test_load_catalog_dir() {
        let temp = TempDir::new().unwrap();
        write_plugin(
            temp.path(),
            r#"{
                "name": "Plugin2",
                "versions": [
                    {
                        "version": "1.0",
                        "dependencies": [
                            { "name": "Plugin1", "version": ">=1.0.0" },
                            { "name": "Paper2D", "version": ">=1.0.0", "type": "engine" }
                        ]
                    }
                ]
            }"#,
            "Plugin2.json",
        );

        let catalog = load_catalog_dir(temp.path()).unwrap();
        let versions = catalog.versions("Plugin2");
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, v("1.0.0"));
        assert_eq!(versions[0].dependencies.len(), 2);
        assert_eq!(versions[0].resolvable_dependencies().count(), 1);
        assert_eq!(versions[0].dependencies[1].kind, DependencyKind::Engine);
    }

    #[test]
    fn test_load_catalog_dir_rejects_bad_json() {
        let temp = TempDir::new().unwrap();
        write_plugin(temp.path(), "{ not json", "Broken.json");

        let err = load_catalog_dir(temp.path()).unwrap_err();
        assert!(err.to_string().contains("Broken.json"));
    }

    #[test]
    fn test_load_catalog_dir_requires_packages() {
        let temp = TempDir::new().unwrap();
        assert!(load_catalog_dir(temp.path()).is_err());
    }

    #[test]
    fn test_load_remotes_priority() {
        let primary = TempDir::new().unwrap();
        let mirror = TempDir::new().unwrap();
        let json = r#"{ "name": "Foo", "versions": [ { "version": "1.0.0" } ] }"#;
        write_plugin(primary.path(), json, "Foo.json");
        write_plugin(
            mirror.path(),
            r#"{ "name": "Foo", "versions": [ { "version": "1.0.0" }, { "version": "1.1.0" } ] }"#,
            "Foo.json",
        );

        let catalog = load_remotes(&[primary.path(), mirror.path()]).unwrap();
        let versions = catalog.versions("Foo");
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].remote_index, Some(0));
        assert_eq!(versions[1].version, v("1.1.0"));
        assert_eq!(versions[1].remote_index, Some(1));
    }
}
