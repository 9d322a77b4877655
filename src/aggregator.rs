//! Requirement aggregation
//!
//! Before any formula is built, the aggregator walks the dependency graph reachable
//! from the root, collects every range declared against each plugin and narrows each
//! plugin's candidate list to the versions every requirer can accept. Most real
//! conflicts show up here as an empty candidate list, and are reported with the full
//! list of requirers without ever running the solver.
//!
//! A candidate `t` of plugin `T` survives when every requirer plugin `R` *permits* it:
//! some surviving version of `R` either has no edge to `T` or has only edges whose
//! ranges match `t`. Narrowing one plugin can narrow its requirers' contributions in
//! turn, so the walk and the filter repeat until nothing changes.
//!
//! A version that requires a plugin the catalog does not have can never be selected,
//! so it is dropped. Missing plugins are only an error once a plugin has no version
//! left that avoids them.

use crate::catalog::{Catalog, VersionRecord};
use crate::range::VersionRange;
use crate::version::compare_candidates;
use crate::{Error, Result};
use indexmap::{IndexMap, IndexSet};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use tracing::{debug, info};

/// Requirer name used for the constraint given with the resolution request
pub const ROOT_REQUIRER: &str = "$Root";

/// Default limit on the length of a dependency chain
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// One requirer's range on a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRequirement {
    pub required_by: String,
    pub required_version: VersionRange,
}

/// A plugin whose requirers cannot agree on any available version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub plugin_name: String,
    pub requirements: Vec<PluginRequirement>,
}

impl Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} required by:", self.plugin_name)?;
        for requirement in &self.requirements {
            write!(
                f,
                "\n    {} => {}",
                requirement.required_by, requirement.required_version
            )?;
        }
        Ok(())
    }
}

/// Surviving candidate versions per plugin, in discovery order
///
/// The root plugin comes first, then plugins in breadth-first order. Versions of each
/// plugin are sorted most preferred first.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    root: String,
    plugins: IndexMap<String, Vec<VersionRecord>>,
}

impl CandidateSet {
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn versions(&self, name: &str) -> &[VersionRecord] {
        self.plugins.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn plugins(&self) -> impl Iterator<Item = (&str, &[VersionRecord])> {
        self.plugins.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
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

    pub fn version_count(&self) -> usize {
        self.plugins.values().map(Vec::len).sum()
    }
}

/// Outcome of aggregation
#[derive(Debug, Clone)]
pub enum Aggregation {
    Candidates(CandidateSet),
    Conflicts(Vec<Conflict>),
}

struct Walk {
    order: IndexMap<String, usize>,
    requirements: IndexMap<String, Vec<PluginRequirement>>,
    missing: IndexSet<String>,
}

pub struct RequirementAggregator<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    max_depth: usize,
}

impl<'a, C: Catalog + ?Sized> RequirementAggregator<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self {
            catalog,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Collect and intersect requirements for everything reachable from `root`
    ///
    /// Without a `root_range`, every release version of the root is a candidate.
    pub fn aggregate(&self, root: &str, root_range: Option<&VersionRange>) -> Result<Aggregation> {
        let root_versions = self.catalog.versions(root);
        if root_versions.is_empty() {
            return Err(Error::PluginNotFound(root.to_string()));
        }

        let root_range = root_range.cloned().unwrap_or_else(VersionRange::all_release);
        let matching: Vec<VersionRecord> = root_versions
            .iter()
            .filter(|r| root_range.matches(&r.version))
            .cloned()
            .collect();

        if matching.is_empty() {
            info!(plugin = root, range = %root_range, "no version of the root matches the request");
            return Ok(Aggregation::Conflicts(vec![Conflict {
                plugin_name: root.to_string(),
                requirements: vec![PluginRequirement {
                    required_by: ROOT_REQUIRER.to_string(),
                    required_version: root_range,
                }],
            }]));
        }

        let mut survivors: IndexMap<String, Vec<VersionRecord>> = IndexMap::new();
        survivors.insert(root.to_string(), sorted_by_preference(&matching));

        let mut round = 0;
        loop {
            round += 1;
            let walk = self.walk(root, &mut survivors)?;

            // Drop plugins that are no longer reachable and restore discovery order
            let mut reachable = IndexMap::with_capacity(walk.order.len());
            for name in walk.order.keys() {
                if let Some(versions) = survivors.swap_remove(name) {
                    reachable.insert(name.clone(), versions);
                }
            }
            survivors = reachable;

            if !walk.missing.is_empty() {
                let mut exhausted = false;
                for versions in survivors.values_mut() {
                    versions.retain(|record| !requires_any(record, &walk.missing));
                    exhausted |= versions.is_empty();
                }
                if exhausted {
                    return Err(Error::MissingDependencies(walk.missing.into_iter().collect()));
                }
                debug!(
                    round,
                    missing = ?walk.missing,
                    "dropped versions that require plugins missing from the catalog"
                );
                continue;
            }

            debug!(
                round,
                plugins = survivors.len(),
                versions = survivors.values().map(Vec::len).sum::<usize>(),
                "aggregation round"
            );

            let mut conflicts = Vec::new();
            let mut narrowed = Vec::new();

            for (target, requirements) in &walk.requirements {
                let Some(current) = survivors.get(target) else {
                    // Only reached through optional edges
                    continue;
                };

                let requirers: IndexSet<&str> = requirements
                    .iter()
                    .map(|r| r.required_by.as_str())
                    .filter(|r| *r != target.as_str())
                    .collect();

                let kept: Vec<VersionRecord> = current
                    .iter()
                    .filter(|candidate| {
                        requirers.iter().all(|requirer| {
                            survivors.get(*requirer).map_or(true, |versions| {
                                permits(versions, target, &candidate.version)
                            })
                        })
                    })
                    .cloned()
                    .collect();

                if kept.is_empty() {
                    conflicts.push(Conflict {
                        plugin_name: target.clone(),
                        requirements: requirements.clone(),
                    });
                } else if kept.len() < current.len() {
                    narrowed.push((target.clone(), kept));
                }
            }

            if !conflicts.is_empty() {
                info!(
                    conflicts = conflicts.len(),
                    "version ranges cannot be satisfied together"
                );
                return Ok(Aggregation::Conflicts(conflicts));
            }

            if narrowed.is_empty() {
                break;
            }

            for (name, versions) in narrowed {
                survivors.insert(name, versions);
            }
        }

        Ok(Aggregation::Candidates(CandidateSet {
            root: root.to_string(),
            plugins: survivors,
        }))
    }

    /// Breadth-first walk over the surviving versions' edges
    ///
    /// Newly reached plugins are fetched from the catalog into `survivors`.
    fn walk(&self, root: &str, survivors: &mut IndexMap<String, Vec<VersionRecord>>) -> Result<Walk> {
        let mut order: IndexMap<String, usize> = IndexMap::new();
        order.insert(root.to_string(), 0);
        let mut requirements: IndexMap<String, Vec<PluginRequirement>> = IndexMap::new();
        let mut missing: IndexSet<String> = IndexSet::new();

        let mut next = 0;
        while let Some((name, depth)) = order.get_index(next).map(|(n, d)| (n.clone(), *d)) {
            next += 1;

            let edges: Vec<_> = survivors
                .get(&name)
                .into_iter()
                .flatten()
                .flat_map(|record| record.resolvable_dependencies().cloned())
                .collect();

            for edge in edges {
                let requirement = PluginRequirement {
                    required_by: name.clone(),
                    required_version: edge.version.clone(),
                };
                let existing = requirements.entry(edge.name.clone()).or_default();
                if !existing.contains(&requirement) {
                    existing.push(requirement);
                }

                if edge.optional || order.contains_key(&edge.name) {
                    continue;
                }

                if !survivors.contains_key(&edge.name) {
                    let found = self.catalog.versions(&edge.name);
                    if found.is_empty() {
                        missing.insert(edge.name);
                        continue;
                    }
                    survivors.insert(edge.name.clone(), sorted_by_preference(found));
                }

                if depth + 1 > self.max_depth {
                    return Err(Error::DependencyDepthExceeded {
                        plugin: edge.name,
                        max_depth: self.max_depth,
                    });
                }
                order.insert(edge.name, depth + 1);
            }
        }

        Ok(Walk {
            order,
            requirements,
            missing,
        })
    }
}

/// Whether some version of the requirer accepts `version` of `target`
fn permits(requirer_versions: &[VersionRecord], target: &str, version: &Version) -> bool {
    requirer_versions.iter().any(|record| {
        record
            .resolvable_dependencies()
            .filter(|edge| edge.name == target)
            .all(|edge| edge.version.matches(version))
    })
}

fn requires_any(record: &VersionRecord, names: &IndexSet<String>) -> bool {
    record
        .resolvable_dependencies()
        .any(|edge| !edge.optional && names.contains(&edge.name))
}

fn sorted_by_preference(records: &[VersionRecord]) -> Vec<VersionRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| compare_candidates(&b.selected(), &a.selected()));
    sorted
}
