//! Dependency resolution for a root plugin
//!
//! Resolution runs in three stages over a read-only [`Catalog`] snapshot:
//!
//! 1. [`RequirementAggregator`] walks the dependency graph and intersects ranges. A
//!    plugin nobody can agree on ends resolution with
//!    [`ResolutionResult::ConflictsDetected`].
//! 2. [`compile`] turns the surviving candidates into a boolean formula.
//! 3. [`Solver`] finds the preferred satisfying assignment. When there is none, the
//!    candidate versions disagree through their own dependencies and
//!    [`Error::DependencyResolution`] is returned instead of a conflict list.
//!
//! # Examples
//!
//! ```no_run
//! use unrealpm_resolver::{load_remotes, DependencyResolver, ResolutionRequest, ResolutionResult};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = load_remotes(&["/srv/plugins"])?;
//! let resolver = DependencyResolver::new(&catalog);
//!
//! match resolver.resolve(&"Http@>=3.0.0".parse::<ResolutionRequest>()?)? {
//!     ResolutionResult::Resolved(selected) => {
//!         for s in selected {
//!             println!("{}", s);
//!         }
//!     }
//!     ResolutionResult::ConflictsDetected(conflicts) => {
//!         for c in conflicts {
//!             eprintln!("{}", c);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::aggregator::{Aggregation, CandidateSet, Conflict, RequirementAggregator};
use crate::catalog::{Catalog, VersionRecord};
use crate::compiler::compile;
use crate::config::ResolverConfig;
use crate::range::VersionRange;
use crate::solver::{Bindings, SearchBudget, Solver};
use crate::version::SelectedVersion;
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Root plugin to resolve, with an optional range on the root itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub plugin: String,
    pub version: Option<VersionRange>,
}

impl ResolutionRequest {
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: VersionRange) -> Self {
        self.version = Some(version);
        self
    }

    /// Parse `Name` or `Name@range`
    pub fn parse(input: &str) -> Result<Self> {
        let (plugin, range) = match input.split_once('@') {
            Some((plugin, range)) => (plugin.trim(), Some(range.trim())),
            None => (input.trim(), None),
        };

        if plugin.is_empty() {
            return Err(Error::Other(format!(
                "Invalid plugin request '{}': expected Name or Name@range",
                input
            )));
        }

        let version = match range {
            Some(r) if !r.is_empty() => Some(VersionRange::parse(r)?),
            _ => None,
        };

        Ok(Self {
            plugin: plugin.to_string(),
            version,
        })
    }
}

impl FromStr for ResolutionRequest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Outcome of a resolution: exactly one of a selection or a conflict list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResolutionResult {
    /// One version per required plugin, in discovery order
    #[serde(rename = "resolved")]
    Resolved(Vec<SelectedVersion>),
    #[serde(rename = "conflicts")]
    ConflictsDetected(Vec<Conflict>),
}

impl ResolutionResult {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionResult::Resolved(_))
    }

    /// The selection, or the conflicts wrapped as [`Error::DependencyConflict`]
    pub fn into_selected(self) -> Result<Vec<SelectedVersion>> {
        match self {
            ResolutionResult::Resolved(selected) => Ok(selected),
            ResolutionResult::ConflictsDetected(conflicts) => {
                Err(Error::DependencyConflict(conflicts))
            }
        }
    }
}

pub struct DependencyResolver<C: Catalog> {
    catalog: C,
    config: ResolverConfig,
    cancel: Option<CancellationToken>,
}

impl<C: Catalog> DependencyResolver<C> {
    pub fn new(catalog: C) -> Self {
        Self {
            catalog,
            config: ResolverConfig::default(),
            cancel: None,
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn resolve(&self, request: &ResolutionRequest) -> Result<ResolutionResult> {
        let aggregation = RequirementAggregator::new(&self.catalog)
            .with_max_depth(self.config.max_depth)
            .aggregate(&request.plugin, request.version.as_ref())?;

        let candidates = match aggregation {
            Aggregation::Candidates(candidates) => candidates,
            Aggregation::Conflicts(conflicts) => {
                return Ok(ResolutionResult::ConflictsDetected(conflicts));
            }
        };

        debug!(
            plugins = candidates.len(),
            versions = candidates.version_count(),
            "candidate set ready"
        );

        let formula = compile(&candidates);
        let mut solver = Solver::new(self.budget());
        let Some(bindings) = solver.solve(&formula.expression)? else {
            return Err(Error::DependencyResolution {
                root: request.plugin.clone(),
                plugins: candidates.plugin_names().map(String::from).collect(),
                variables: formula.variables,
                clauses: formula.clauses,
            });
        };

        let selected = selected_versions(&candidates, &bindings);
        info!(
            plugin = %request.plugin,
            selected = selected.len(),
            "dependencies resolved"
        );
        Ok(ResolutionResult::Resolved(selected))
    }

    /// Resolve every release version of `plugin` and return the selection
    pub fn dependency_list(&self, plugin: &str) -> Result<Vec<SelectedVersion>> {
        self.resolve(&ResolutionRequest::new(plugin))?.into_selected()
    }

    fn budget(&self) -> SearchBudget {
        let mut budget = SearchBudget::unlimited();
        if self.config.resolution_timeout_seconds > 0 {
            budget = budget.with_timeout(Duration::from_secs(self.config.resolution_timeout_seconds));
        }
        if let Some(token) = &self.cancel {
            budget = budget.with_cancellation(token.clone());
        }
        budget
    }
}

/// The true-bound versions the root actually needs, in candidate discovery order
///
/// The search binds variables true first, so a plugin only reachable through an
/// unselected version can still come back true. Only plugins reached from the root
/// over the required edges of selected versions are kept.
fn selected_versions(candidates: &CandidateSet, bindings: &Bindings) -> Vec<SelectedVersion> {
    let chosen: IndexMap<&str, &VersionRecord> = candidates
        .plugins()
        .filter_map(|(name, versions)| {
            versions
                .iter()
                .find(|record| bindings.get(&record.selected()) == Some(&true))
                .map(|record| (name, record))
        })
        .collect();

    let mut needed: HashSet<&str> = HashSet::new();
    let mut pending = vec![candidates.root()];
    while let Some(name) = pending.pop() {
        if !needed.insert(name) {
            continue;
        }
        if let Some(&record) = chosen.get(name) {
            pending.extend(
                record
                    .resolvable_dependencies()
                    .filter(|edge| !edge.optional)
                    .map(|edge| edge.name.as_str()),
            );
        }
    }

    chosen
        .into_iter()
        .filter(|(name, _)| needed.contains(name))
        .map(|(_, record)| record.selected())
        .collect()
}

/// Resolve on the blocking thread pool so async callers are never stalled
///
/// With a non-zero `resolution_timeout_seconds`, the search is cancelled once the
/// timeout elapses and [`Error::ResolutionTimeout`] is returned.
pub async fn resolve_async<C>(
    catalog: Arc<C>,
    request: ResolutionRequest,
    config: ResolverConfig,
) -> Result<ResolutionResult>
where
    C: Catalog + Send + Sync + 'static,
{
    let timeout_seconds = config.resolution_timeout_seconds;
    let token = CancellationToken::new();
    let worker_token = token.clone();

    let task = tokio::task::spawn_blocking(move || {
        DependencyResolver::new(&*catalog)
            .with_config(config)
            .with_cancellation(worker_token)
            .resolve(&request)
    });

    let joined = if timeout_seconds > 0 {
        match tokio::time::timeout(Duration::from_secs(timeout_seconds), task).await {
            Ok(joined) => joined,
            Err(_) => {
                token.cancel();
                return Err(Error::ResolutionTimeout(timeout_seconds));
            }
        }
    } else {
        task.await
    };

    joined.map_err(|e| Error::Other(format!("Resolution task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DependencyEdge, MemoryCatalog};
    use semver::Version;

    fn record(name: &str, version: &str, deps: &[(&str, &str)]) -> VersionRecord {
        deps.iter().fold(
            VersionRecord::new(name, Version::parse(version).unwrap()),
            |r, (dep, req)| r.with_dependency(DependencyEdge::provided(*dep, VersionRange::parse(req).unwrap())),
        )
    }

    /// Every pair of A and B versions disagrees on C or X
    fn crossed_catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with(record("Root", "1.0.0", &[("A", "*"), ("B", "*")]))
            .with(record("A", "1.0.0", &[("C", "=1.0.0"), ("X", "=1.0.0")]))
            .with(record("A", "2.0.0", &[("C", "=2.0.0"), ("X", "=2.0.0")]))
            .with(record("B", "1.0.0", &[("C", "=1.0.0"), ("X", "=2.0.0")]))
            .with(record("B", "2.0.0", &[("C", "=2.0.0"), ("X", "=1.0.0")]))
            .with(record("C", "1.0.0", &[]))
            .with(record("C", "2.0.0", &[]))
            .with(record("X", "1.0.0", &[]))
            .with(record("X", "2.0.0", &[]))
    }

    /// Nine plugins competing for eight exclusive slots, too many combinations to
    /// search quickly
    fn crowded_catalog() -> MemoryCatalog {
        let plugins = 9;
        let slots = 8;
        let mut catalog = MemoryCatalog::new();

        let root = (1..=plugins).fold(VersionRecord::new("Root", Version::new(1, 0, 0)), |r, p| {
            r.with_dependency(DependencyEdge::provided(format!("Plugin{}", p), VersionRange::all()))
        });
        catalog.insert(root);

        for p in 1..=plugins {
            for slot in 1..=slots {
                let occupant = VersionRange::exact(&Version::new(p, 0, 0));
                catalog.insert(
                    VersionRecord::new(format!("Plugin{}", p), Version::new(slot, 0, 0))
                        .with_dependency(DependencyEdge::provided(format!("Slot{}", slot), occupant)),
                );
            }
        }
        for slot in 1..=slots {
            for p in 1..=plugins {
                catalog.insert(VersionRecord::new(format!("Slot{}", slot), Version::new(p, 0, 0)));
            }
        }
        catalog
    }

    #[test]
    fn test_request_parse() {
        let plain: ResolutionRequest = "Plugin1".parse().unwrap();
        assert_eq!(plain, ResolutionRequest::new("Plugin1"));

        let ranged: ResolutionRequest = "Http@>=3.0.0 <=4.0.0".parse().unwrap();
        assert_eq!(ranged.plugin, "Http");
        assert_eq!(ranged.version.unwrap().as_str(), ">=3.0.0 <=4.0.0");

        assert!(ResolutionRequest::parse("@1.0.0").is_err());
        assert!(ResolutionRequest::parse("Http@>=").is_err());
    }

    #[test]
    fn test_plugin_without_dependencies() {
        let catalog = MemoryCatalog::new().with(record("Plugin1", "1.0.0", &[]));
        let selected = DependencyResolver::new(&catalog).dependency_list("Plugin1").unwrap();

        assert_eq!(
            selected,
            vec![SelectedVersion::new("Plugin1", Version::new(1, 0, 0))]
        );
    }

    #[test]
    fn test_highest_root_version_wins() {
        let catalog = MemoryCatalog::new()
            .with(record("Plugin1", "1.0.0", &[]))
            .with(record("Plugin2", "1.0.0", &[("Plugin1", ">=1.0.0")]))
            .with(record("Plugin3", "1.0.0", &[("Plugin2", "")]))
            .with(record("Plugin3", "1.2.1", &[("Plugin2", "")]));

        let selected = DependencyResolver::new(&catalog).dependency_list("Plugin3").unwrap();
        let rendered: Vec<_> = selected.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["Plugin3@1.2.1", "Plugin2@1.0.0", "Plugin1@1.0.0"]);
    }

    #[test]
    fn test_solver_level_failure_is_an_error() {
        let catalog = crossed_catalog();
        let err = DependencyResolver::new(&catalog)
            .resolve(&ResolutionRequest::new("Root"))
            .unwrap_err();

        match err {
            Error::DependencyResolution { root, plugins, .. } => {
                assert_eq!(root, "Root");
                assert_eq!(plugins, vec!["Root", "A", "B", "C", "X"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_conflicts_are_data() {
        let catalog = MemoryCatalog::new()
            .with(record("Root", "1.0.0", &[("A", "*"), ("B", "*")]))
            .with(record("A", "1.0.0", &[("X", ">=2.0.0")]))
            .with(record("B", "1.0.0", &[("X", "<1.0.0")]))
            .with(record("X", "1.5.0", &[]));

        let result = DependencyResolver::new(&catalog)
            .resolve(&ResolutionRequest::new("Root"))
            .unwrap();
        assert!(!result.is_resolved());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["conflicts"][0]["plugin_name"], "X");
        assert_eq!(json["conflicts"][0]["requirements"][1]["required_version"], "<1.0.0");

        let err = result.into_selected().unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_cancelled_resolution() {
        let catalog = crossed_catalog();
        let token = CancellationToken::new();
        token.cancel();

        let err = DependencyResolver::new(&catalog)
            .with_cancellation(token)
            .resolve(&ResolutionRequest::new("Root"))
            .unwrap_err();
        assert!(matches!(err, Error::ResolutionCancelled));
    }

    #[test]
    fn test_unneeded_true_bindings_are_left_out() {
        // Http 1.0.0 is the only path to OldLib and is not selected
        let catalog = MemoryCatalog::new()
            .with(record("App", "1.0.0", &[("Http", "*")]))
            .with(record("Http", "1.0.0", &[("OldLib", "*")]))
            .with(record("Http", "2.0.0", &[]))
            .with(record("OldLib", "1.0.0", &[]));

        let selected = DependencyResolver::new(&catalog).dependency_list("App").unwrap();
        let rendered: Vec<_> = selected.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["App@1.0.0", "Http@2.0.0"]);
    }

    #[test]
    fn test_cancelled_during_search() {
        let catalog = crowded_catalog();
        let token = CancellationToken::new();
        let canceller = {
            let token = token.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(100));
                token.cancel();
            })
        };

        let err = DependencyResolver::new(&catalog)
            .with_cancellation(token)
            .resolve(&ResolutionRequest::new("Root"))
            .unwrap_err();
        canceller.join().unwrap();
        assert!(matches!(err, Error::ResolutionCancelled));
    }

    #[test]
    fn test_resolved_json_shape() {
        let catalog = MemoryCatalog::new().with(record("Plugin1", "1.0.0", &[]));
        let result = DependencyResolver::new(&catalog)
            .resolve(&ResolutionRequest::new("Plugin1"))
            .unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["resolved"][0]["name"], "Plugin1");
        assert_eq!(json["resolved"][0]["version"], "1.0.0");
    }

    #[tokio::test]
    async fn test_resolve_async() {
        let catalog = Arc::new(
            MemoryCatalog::new()
                .with(record("Plugin1", "1.0.0", &[]))
                .with(record("Plugin2", "1.0.0", &[("Plugin1", ">=1.0.0")])),
        );

        let config = ResolverConfig {
            resolution_timeout_seconds: 30,
            ..ResolverConfig::default()
        };
        let result = resolve_async(catalog, ResolutionRequest::new("Plugin2"), config)
            .await
            .unwrap();

        let selected = result.into_selected().unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].name, "Plugin2");
    }

    #[tokio::test]
    async fn test_resolve_async_timeout() {
        let config = ResolverConfig {
            resolution_timeout_seconds: 1,
            ..ResolverConfig::default()
        };

        let started = std::time::Instant::now();
        let err = resolve_async(Arc::new(crowded_catalog()), ResolutionRequest::new("Root"), config)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ResolutionTimeout(1)));
        assert!(started.elapsed() < Duration::from_secs(10));
        // Dropping the runtime waits for the blocking worker, so the test only ends
        // once the search has noticed the cancellation.
    }
}
