use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use semver::Version;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use unrealpm_resolver::{
    Config, DependencyResolver, Error, Lockfile, ResolutionRequest, ResolutionResult,
    SelectedVersion,
};

pub struct ResolveArgs {
    pub plugin: String,
    pub catalogs: Vec<PathBuf>,
    pub lockfile: PathBuf,
    pub locked: bool,
    pub write_lock: bool,
    pub json: bool,
}

fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

pub fn run(args: ResolveArgs) -> Result<()> {
    let config = Config::load()?;
    let request: ResolutionRequest = args.plugin.parse()?;

    let mut catalog = super::open_catalog(args.catalogs, &config)?;
    let lockfile = Lockfile::load_from(&args.lockfile)?;
    let installed = lockfile
        .as_ref()
        .map(Lockfile::installed_versions)
        .unwrap_or_default();

    catalog.mark_installed(&installed);
    if args.locked {
        if lockfile.is_none() {
            anyhow::bail!(
                "--locked requires an existing lockfile, but {} was not found",
                args.lockfile.display()
            );
        }
        catalog.restrict_to(&installed);
    }

    let spinner = (!args.json).then(|| create_spinner(format!("Resolving {}...", args.plugin)));
    let result = DependencyResolver::new(&catalog)
        .with_config(config.resolver.clone())
        .resolve(&request);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let result = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    match result {
        ResolutionResult::Resolved(selected) => {
            if !args.json {
                print_changes(&selected, &installed);
            }

            if args.write_lock {
                Lockfile::from_selection(&selected).save_to(&args.lockfile)?;
                if !args.json {
                    println!();
                    println!("✓ Wrote {}", args.lockfile.display());
                }
            }
            Ok(())
        }
        ResolutionResult::ConflictsDetected(conflicts) => {
            Err(Error::DependencyConflict(conflicts).into())
        }
    }
}

fn print_changes(selected: &[SelectedVersion], installed: &HashMap<String, Version>) {
    println!();
    println!(
        "Resolved {} plugin{}:",
        selected.len(),
        if selected.len() == 1 { "" } else { "s" }
    );
    println!();

    for s in selected {
        match installed.get(&s.name) {
            Some(current) if *current == s.version => println!("  = {}@{}", s.name, s.version),
            Some(current) => println!("  ~ {} {} -> {}", s.name, current, s.version),
            None => println!("  + {}@{}", s.name, s.version),
        }
    }
}
