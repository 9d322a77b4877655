pub mod config;
pub mod resolve;
pub mod versions;

use anyhow::Result;
use std::path::PathBuf;
use unrealpm_resolver::{load_remotes, Config, MemoryCatalog};

/// Load the catalogs given on the command line, or the configured remotes
pub fn open_catalog(catalogs: Vec<PathBuf>, config: &Config) -> Result<MemoryCatalog> {
    let paths = if catalogs.is_empty() {
        config.remote_paths()?
    } else {
        catalogs
    };

    if paths.is_empty() {
        anyhow::bail!(
            "No catalog to resolve against\n\n\
             Pass one with --catalog <DIR>, or configure a remote:\n  \
             unrealpm-resolver config add-remote <name> <path>"
        );
    }

    Ok(load_remotes(&paths)?)
}
