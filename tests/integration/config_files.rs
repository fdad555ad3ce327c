//! Loading configuration files from disk

use std::path::Path;

use netcheck::config::{Config, ProbeConfig, WaitPolicy};
use pretty_assertions::assert_eq;

fn demo(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

#[test]
fn test_dual_demo_matches_builtin_defaults() {
    let config = Config::load(Some(&demo("dual.toml"))).unwrap();

    assert_eq!(config, Config::default());
}

#[test]
fn test_single_demo_measures_everything_in_one_tick() {
    let config = Config::load(Some(&demo("single.toml"))).unwrap();

    assert_eq!(config.groups.len(), 1);
    assert_eq!(config.groups[0].wait, WaitPolicy::Uniform { max_minutes: 9.0 });
    assert_eq!(
        config.groups[0].probe.metric_names(),
        vec!["Download", "Upload", "Home", "Google"]
    );
    // Speed and ping charts both read from the one group
    assert_eq!(config.groups[0].charts().len(), 2);
}

#[test]
fn test_json_demo() {
    let config = Config::load(Some(&demo("simple.json"))).unwrap();

    assert_eq!(config.title, "Speed");
    assert_eq!(config.groups[0].wait, WaitPolicy::Fixed { minutes: 5.0 });
    assert!(matches!(config.groups[0].probe, ProbeConfig::Throughput(_)));
}

#[test]
fn test_load_from_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("netcheck.toml");
    std::fs::write(
        &path,
        r#"
        title = "Cabin"

        [[groups]]
        id = "ping"
        wait = { policy = "fixed", minutes = 0.5 }
        jitter_max_minutes = 1.5
        probe = { kind = "latency", targets = [{ name = "Router", address = "10.0.0.1" }] }
        "#,
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.title, "Cabin");
    assert_eq!(config.groups[0].jitter_max_minutes, Some(1.5));
    assert_eq!(config.groups[0].charts()[0].series[0].label, "Router Ping");
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();

    assert!(Config::load(Some(&dir.path().join("absent.toml"))).is_err());
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("netcheck.json");
    std::fs::write(
        &path,
        r#"{ "groups": [{ "id": "speed", "wait": { "policy": "fixed", "minutes": -1 }, "probe": { "kind": "throughput" } }] }"#,
    )
    .unwrap();

    assert!(Config::load(Some(&path)).is_err());
}
