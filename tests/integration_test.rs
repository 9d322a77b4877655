
use assert_cmd::Command;
use predicates::prelude::*;
use test_utils::{MockPlugin, TestCatalog, TestProject};

/// Helper to get the binary command, isolated from the user's config
fn resolver_cmd(project: &TestProject) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_unrealpm-resolver"));
    cmd.current_dir(project.path())
        .env("UNREALPM_CONFIG_DIR", project.config_path())
        .env_remove("RUST_LOG")
        .env_remove("UNREALPM_RESOLUTION_TIMEOUT");
    cmd
}

fn sample_catalog() -> TestCatalog {
    TestCatalog::with_plugins(&[
        MockPlugin::new("Plugin1", "1.0.0"),
        MockPlugin::new("Plugin1", "1.1.0"),
        MockPlugin::new("Plugin2", "1.0.0")
            .with_dependency("Plugin1", ">=1.0.0")
            .with_engine_dependency("Paper2D", ">=1.0.0"),
        MockPlugin::new("Conflicted", "1.0.0")
            .with_any_dependency("NeedsNew")
            .with_any_dependency("NeedsOld"),
        MockPlugin::new("NeedsNew", "1.0.0").with_dependency("Plugin1", ">=1.1.0"),
        MockPlugin::new("NeedsOld", "1.0.0").with_dependency("Plugin1", "<1.1.0"),
    ])
}

#[test]
fn test_resolve_prints_change_list() {
    let project = TestProject::new();
    let catalog = sample_catalog();

    resolver_cmd(&project)
        .arg("resolve")
        .arg("Plugin2")
        .arg("--catalog")
        .arg(catalog.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Resolved 2 plugins"))
        .stdout(predicate::str::contains("+ Plugin2@1.0.0"))
        .stdout(predicate::str::contains("+ Plugin1@1.1.0"))
        .stdout(predicate::str::contains("Paper2D").not());
}

#[test]
fn test_resolve_uses_configured_remotes() {
    let project = TestProject::new();
    let catalog = sample_catalog();
    project.configure_remotes(&[("local", catalog.path())]);

    resolver_cmd(&project)
        .arg("resolve")
        .arg("Plugin1@<1.1.0")
        .assert()
        .success()
        .stdout(predicate::str::contains("+ Plugin1@1.0.0"));
}

#[test]
fn test_resolve_without_catalog_fails() {
    let project = TestProject::new();

    resolver_cmd(&project)
        .arg("resolve")
        .arg("Plugin1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No catalog to resolve against"));
}

#[test]
fn test_resolve_conflict_table_and_exit_code() {
    let project = TestProject::new();
    let catalog = sample_catalog();

    resolver_cmd(&project)
        .arg("resolve")
        .arg("Conflicted")
        .arg("--catalog")
        .arg(catalog.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "There were conflicts trying to resolve the dependencies!",
        ))
        .stderr(predicate::str::contains("Plugin1 required by:"))
        .stderr(predicate::str::contains("NeedsNew => >=1.1.0"))
        .stderr(predicate::str::contains("NeedsOld => <1.1.0"));
}

#[test]
fn test_resolve_unknown_plugin() {
    let project = TestProject::new();
    let catalog = sample_catalog();

    resolver_cmd(&project)
        .arg("resolve")
        .arg("Ghost")
        .arg("--catalog")
        .arg(catalog.path())
        .assert()
        .code(12)
        .stderr(predicate::str::contains("Plugin not found: Ghost"));
}

#[test]
fn test_resolve_json_output() {
    let project = TestProject::new();
    let catalog = sample_catalog();

    let output = resolver_cmd(&project)
        .arg("resolve")
        .arg("Plugin2")
        .arg("--catalog")
        .arg(catalog.path())
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let resolved = json["resolved"].as_array().unwrap();
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0]["name"], "Plugin2");
}

#[test]
fn test_write_lock_then_locked_resolution() {
    let project = TestProject::new();
    let catalog = TestCatalog::with_plugins(&[MockPlugin::new("Plugin1", "1.0.0")]);

    resolver_cmd(&project)
        .args(["resolve", "Plugin1", "--write-lock", "--catalog"])
        .arg(catalog.path())
        .assert()
        .success();

    assert!(project.has_lockfile());
    assert!(project.read_lockfile().contains("[plugin.Plugin1]"));

    // A newer version appears; the locked resolution keeps the old one
    catalog.add_plugin(&MockPlugin::new("Plugin1", "2.0.0"));

    resolver_cmd(&project)
        .args(["resolve", "Plugin1", "--locked", "--catalog"])
        .arg(catalog.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("= Plugin1@1.0.0"));

    // Without --locked the installed version is still preferred
    resolver_cmd(&project)
        .args(["resolve", "Plugin1", "--catalog"])
        .arg(catalog.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("= Plugin1@1.0.0"));
}

#[test]
fn test_locked_without_lockfile_fails() {
    let project = TestProject::new();
    let catalog = sample_catalog();

    resolver_cmd(&project)
        .args(["resolve", "Plugin1", "--locked", "--catalog"])
        .arg(catalog.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--locked requires an existing lockfile"));
}

#[test]
fn test_versions_command() {
    let project = TestProject::new();
    let catalog = sample_catalog();

    resolver_cmd(&project)
        .args(["versions", "Plugin1", "--catalog"])
        .arg(catalog.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Plugin1 (2 versions)"))
        .stdout(predicate::str::contains("1.1.0  (remote 0)"));
}

#[test]
fn test_config_remotes() {
    let project = TestProject::new();

    resolver_cmd(&project)
        .args(["config", "add-remote", "studio", "/srv/plugins"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added remote 'studio'"));

    resolver_cmd(&project)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("studio"))
        .stdout(predicate::str::contains("/srv/plugins"));

    resolver_cmd(&project)
        .args(["config", "remove-remote", "studio"])
        .assert()
        .success();

    resolver_cmd(&project)
        .args(["config", "remove-remote", "studio"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Remote 'studio' not found"));
}

#[test]
fn test_config_set() {
    let project = TestProject::new();

    resolver_cmd(&project)
        .args(["config", "set", "resolver.max_depth", "25"])
        .assert()
        .success();

    let config = std::fs::read_to_string(project.config_path().join("config.toml")).unwrap();
    assert!(config.contains("max_depth = 25"));

    resolver_cmd(&project)
        .args(["config", "set", "registry.url", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn test_completions() {
    let project = TestProject::new();

    resolver_cmd(&project)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unrealpm-resolver"));
}
