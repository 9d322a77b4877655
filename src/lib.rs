//! UnrealPM resolver - dependency resolution for Unreal Engine plugin catalogs
//!
//! Given a root plugin and a read-only catalog snapshot, the resolver picks one
//! version of every plugin the root needs, or explains why no such choice exists:
//!
//! - Range conflicts are found up front and returned as data, listing every requirer
//! - Remaining choices are compiled to a boolean formula and solved by a
//!   deterministic backtracking search that prefers installed, newer and
//!   higher-priority-remote versions
//! - Engine-provided dependencies are ignored; optional dependencies only constrain
//! - Long searches can be bounded by a timeout or a cancellation token
//!
//! # Examples
//!
//! ```no_run
//! use unrealpm_resolver::{load_remotes, DependencyResolver};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = load_remotes(&["/srv/plugins/primary", "/srv/plugins/mirror"])?;
//! let selected = DependencyResolver::new(&catalog).dependency_list("Http")?;
//!
//! println!("Resolved {} plugins", selected.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`version`] - Candidate versions and their preference order
//! - [`range`] - npm-style version ranges
//! - [`catalog`] - Catalog snapshots and directory loading
//! - [`expression`] - Boolean formulas over candidate versions
//! - [`aggregator`] - Range aggregation and conflict detection
//! - [`compiler`] - Formula compilation
//! - [`solver`] - Backtracking search
//! - [`resolver`] - End-to-end resolution
//! - [`lockfile`] - Manage unrealpm.lock for reproducible resolutions
//! - [`config`] - User configuration management
//! - [`error`] - Error types and result handling

pub mod aggregator;
pub mod catalog;
pub mod compiler;
pub mod config;
pub mod error;
pub mod expression;
pub mod lockfile;
pub mod range;
pub mod resolver;
pub mod solver;
pub mod version;

pub use aggregator::{Aggregation, CandidateSet, Conflict, PluginRequirement, RequirementAggregator};
pub use catalog::{
    load_catalog_dir, load_remotes, Catalog, DependencyEdge, DependencyKind, MemoryCatalog,
    PluginMetadata, PluginVersion, VersionRecord,
};
pub use compiler::{compile, CompiledFormula};
pub use config::{Config, LoggingConfig, RemoteConfig, ResolverConfig};
pub use error::{Error, Result};
pub use expression::Expression;
pub use lockfile::{LockedPlugin, Lockfile, LOCKFILE_NAME};
pub use range::VersionRange;
pub use resolver::{resolve_async, DependencyResolver, ResolutionRequest, ResolutionResult};
pub use solver::{Bindings, SearchBudget, Solver};
pub use version::SelectedVersion;
