use anyhow::Result;
use std::path::{Path, PathBuf};
use unrealpm_resolver::version::compare_candidates;
use unrealpm_resolver::{Catalog, Config, Error, Lockfile, SelectedVersion};

pub fn run(plugin: &str, catalogs: Vec<PathBuf>, lockfile: &Path) -> Result<()> {
    let config = Config::load()?;
    let mut catalog = super::open_catalog(catalogs, &config)?;

    if let Some(lockfile) = Lockfile::load_from(lockfile)? {
        catalog.mark_installed(&lockfile.installed_versions());
    }

    let mut versions: Vec<SelectedVersion> = catalog
        .versions(plugin)
        .iter()
        .map(|record| record.selected())
        .collect();

    if versions.is_empty() {
        return Err(Error::PluginNotFound(plugin.to_string()).into());
    }

    versions.sort_by(|a, b| compare_candidates(b, a));

    println!();
    println!("{} ({} version{}):", plugin, versions.len(), if versions.len() == 1 { "" } else { "s" });
    println!();
    for v in &versions {
        let mut line = format!("  {}", v.version);
        if v.installed {
            line.push_str("  [installed]");
        }
        if let Some(index) = v.remote_index {
            line.push_str(&format!("  (remote {})", index));
        }
        println!("{}", line);
    }
    println!();

    Ok(())
}
