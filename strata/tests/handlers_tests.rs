use std::fs;
use std::path::PathBuf;
use strata::handlers::*;
use strata_core::config::WalkConfig;
use strata_core::report::OutputFormat;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("walk.json");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_write_config_template_creates_loadable_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("strata.json");

    let written = write_config_template(&path, false).unwrap();
    assert_eq!(written, path);

    let config = load_config(&path, &WalkOverrides::default()).unwrap();
    assert_eq!(config.source_name, "example");
    assert_eq!(config.targets.len(), 2);
}

#[test]
fn test_write_config_template_refuses_overwrite_without_force() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "keep me");

    let result = write_config_template(&path, false);
    assert!(result.is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");

    write_config_template(&path, true).unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        WalkConfig::default_template()
    );
}

#[test]
fn test_load_config_applies_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        r#"{"seed_url": "https://example.com", "targets": [{"selector": "a"}]}"#,
    );

    let overrides = WalkOverrides {
        seed_url: Some("https://example.org/start".to_string()),
        output_dir: Some(PathBuf::from("/tmp/strata-out")),
        format: Some(OutputFormat::Sqlite),
        user_agent: Some("strata-test".to_string()),
        retries: Some(1),
        backoff_factor: Some(0.25),
        timeout_secs: Some(3),
    };
    let config = load_config(&path, &overrides).unwrap();

    assert_eq!(config.seed_url, "https://example.org/start");
    assert_eq!(config.output_dir, PathBuf::from("/tmp/strata-out"));
    assert_eq!(config.format, OutputFormat::Sqlite);
    assert_eq!(config.user_agent.as_deref(), Some("strata-test"));
    assert_eq!(config.retries, 1);
    assert_eq!(config.backoff_factor, 0.25);
    assert_eq!(config.timeout_secs, 3);
}

#[test]
fn test_load_config_without_overrides_keeps_file_values() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        r#"{"seed_url": "https://example.com", "targets": [{"xpath": "//a"}], "retries": 2}"#,
    );

    let config = load_config(&path, &WalkOverrides::default()).unwrap();
    assert_eq!(config.retries, 2);
    assert_eq!(config.backoff_factor, 2.0);
    assert_eq!(config.format, OutputFormat::Json);
}

#[test]
fn test_load_config_rejects_invalid_override() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(
        &temp_dir,
        r#"{"seed_url": "https://example.com", "targets": [{"selector": "a"}]}"#,
    );

    let overrides = WalkOverrides {
        seed_url: Some("not a url".to_string()),
        ..Default::default()
    };
    assert!(load_config(&path, &overrides).is_err());
}

#[test]
fn test_load_config_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = load_config(
        &temp_dir.path().join("missing.json"),
        &WalkOverrides::default(),
    );
    assert!(result.is_err());
}

#[test]
fn test_describe_plan_lists_targets() {
    let config = WalkConfig::from_json_str(
        r#"{
            "seed_url": "https://example.com",
            "source_name": "shop",
            "output_dir": "/tmp/out",
            "targets": [
                {"xpath": "//nav//a"},
                {"selector": "ul > li > a", "params": {"page": "2"}}
            ]
        }"#,
    )
    .unwrap();

    let plan = describe_plan(&config).unwrap();
    assert!(plan.contains("Seed: https://example.com"));
    assert!(plan.contains("Depth 1: //nav//a"));
    assert!(plan.contains("Depth 2: ul > li > a"));
    assert!(plan.contains("page=2"));
    assert!(plan.contains("shop.json"));
}

#[test]
fn test_describe_plan_rejects_bad_selector() {
    let config = WalkConfig::new(
        "https://example.com",
        vec![strata_scanner::TargetSpec::new("//a[last()]")],
    );
    assert!(describe_plan(&config).is_err());
}
