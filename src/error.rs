use crate::aggregator::Conflict;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Version parsing error: {0}")]
    SemVer(#[from] semver::Error),

    #[error("Invalid version range '{range}': {reason}")]
    InvalidVersionRange { range: String, reason: String },

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Plugin not found: {0}\n\n\
             Hint: The plugin has no versions in any configured catalog.\n\
             Try: unrealpm-resolver versions {0}")]
    PluginNotFound(String),

    #[error("The following plugins could not be found: {}", .0.join(", "))]
    MissingDependencies(Vec<String>),

    #[error("There were conflicts trying to resolve the dependencies!{}",
            .0.iter().map(|c| format!("\n\n{}", c)).collect::<String>())]
    DependencyConflict(Vec<Conflict>),

    #[error("Dependency resolution failed for '{root}': no combination of versions satisfies \
             every dependency ({variables} candidate versions, {clauses} clauses across {})\n\n\
             Hint: Every version range is satisfiable on its own, but the dependencies of the\n\
             candidate versions disagree with each other.\n\n\
             Possible solutions:\n\
             1. Loosen the version constraints of the plugins listed above\n\
             2. Publish a version that accepts the newer dependency range\n\
             3. Re-run with --verbose to see the candidate set",
             .plugins.join(", "))]
    DependencyResolution {
        root: String,
        plugins: Vec<String>,
        variables: usize,
        clauses: usize,
    },

    #[error("Dependency chain through '{plugin}' is deeper than the configured limit of {max_depth}")]
    DependencyDepthExceeded { plugin: String, max_depth: usize },

    #[error("Resolution timeout exceeded ({0} seconds)")]
    ResolutionTimeout(u64),

    #[error("Resolution was cancelled")]
    ResolutionCancelled,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Process exit status used by the CLI for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::DependencyConflict(_) => 2,
            Error::PluginNotFound(_) | Error::MissingDependencies(_) => 12,
            _ => 1,
        }
    }
}
