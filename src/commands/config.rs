use anyhow::Result;
use unrealpm_resolver::Config;

pub fn run(action: &crate::ConfigAction) -> Result<()> {
    use crate::ConfigAction;

    match action {
        ConfigAction::Show => show_config(),
        ConfigAction::Set { key, value } => set_config(key, value),
        ConfigAction::AddRemote { name, path } => add_remote(name, path),
        ConfigAction::RemoveRemote { name } => remove_remote(name),
    }
}

fn show_config() -> Result<()> {
    let config = Config::load()?;
    let config_path = Config::default_path()?;

    println!();
    println!("  📁 Config file: {}", config_path.display());
    println!();

    println!("  Resolver:");
    println!("    max_depth:                  {}", config.resolver.max_depth);
    println!(
        "    resolution_timeout_seconds: {}",
        match config.resolver.resolution_timeout_seconds {
            0 => "0 (no limit)".to_string(),
            secs => secs.to_string(),
        }
    );
    println!();

    println!("  Logging:");
    println!("    level: {}", config.logging.level);
    println!();

    println!("  Remotes (highest priority first):");
    if config.remotes.is_empty() {
        println!("    none");
        println!();
        println!("  💡 Add one: unrealpm-resolver config add-remote <name> <path>");
    } else {
        for (index, remote) in config.remotes.iter().enumerate() {
            println!("    [{}] {:12} → {}", index, remote.name, remote.path);
        }
    }
    println!();

    Ok(())
}

fn set_config(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;

    println!("✓ {} = {}", key, value);
    Ok(())
}

fn add_remote(name: &str, path: &str) -> Result<()> {
    let mut config = Config::load()?;
    let replaced = config.remotes.iter().any(|r| r.name == name);
    config.add_remote(name, path);
    config.save()?;

    if replaced {
        println!("✓ Updated remote '{}' → {}", name, path);
    } else {
        println!("✓ Added remote '{}' → {}", name, path);
    }
    Ok(())
}

fn remove_remote(name: &str) -> Result<()> {
    let mut config = Config::load()?;

    if !config.remove_remote(name) {
        println!();
        println!("  💡 View configured remotes: unrealpm-resolver config show");
        println!();
        anyhow::bail!("Remote '{}' not found", name);
    }

    config.save()?;
    println!("✓ Removed remote '{}'", name);
    Ok(())
}
