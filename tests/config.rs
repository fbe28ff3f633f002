use std::collections::HashMap;
use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use kokkai_collector::config::{CollectorConfig, Config, ConfigLoader, MEETING_API_URL};
use kokkai_collector::error::CollectorError;

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect::<HashMap<_, _>>();
    move |name| map.get(name).cloned()
}

#[test]
fn environment_overrides_file() {
    let config = Config {
        default_process_date: Some("2023-04-01".to_string()),
        cache_dir: Some(Utf8PathBuf::from("/srv/file-cache")),
        output_dir: Some(Utf8PathBuf::from("/srv/out")),
        request_interval_seconds: Some(1),
        ..Config::default()
    };
    let env = env_of(&[
        ("DEFAULT_PROCESS_DATE", "2022-01-01"),
        ("CACHE_SAVE_DIR", "/tmp/env-cache"),
        ("PROCESS_DATE_SAVE_DIR", "/tmp/env-config"),
    ]);

    let resolved = ConfigLoader::resolve_config(config, env).unwrap();
    assert_eq!(resolved.default_process_date.to_string(), "2022-01-01");
    assert_eq!(resolved.cache_dir, Utf8PathBuf::from("/tmp/env-cache"));
    assert_eq!(resolved.checkpoint_dir, Utf8PathBuf::from("/tmp/env-config"));
    assert_eq!(resolved.output_dir, Utf8PathBuf::from("/srv/out"));
    assert_eq!(resolved.request_interval, Duration::from_secs(1));
    assert_eq!(resolved.detail_url, MEETING_API_URL);
}

#[test]
fn blank_environment_values_are_ignored() {
    let env = env_of(&[("MEETING_DATA_SAVE_DIR", "  ")]);
    let resolved = ConfigLoader::resolve_config(Config::default(), env).unwrap();
    assert_eq!(
        resolved.output_dir,
        Utf8PathBuf::from("/usr/share/logstash/ingest_data")
    );
}

#[test]
fn invalid_default_date_is_rejected() {
    let env = env_of(&[("DEFAULT_PROCESS_DATE", "20240101")]);
    let err = ConfigLoader::resolve_config(Config::default(), env).unwrap_err();
    assert_matches!(err, CollectorError::InvalidDate(_));
}

#[test]
fn invalid_interval_is_rejected() {
    let env = env_of(&[("REQUEST_INTERVAL_SECONDS", "five")]);
    let err = ConfigLoader::resolve_config(Config::default(), env).unwrap_err();
    assert_matches!(err, CollectorError::Config(_));
}

#[test]
fn config_file_is_read() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("collector.json");
    std::fs::write(
        &path,
        r#"{"list_url": "http://localhost:8080/api/meeting_list", "http_timeout_seconds": 5}"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str(), |_| None).unwrap();
    assert_eq!(resolved.list_url, "http://localhost:8080/api/meeting_list");
    assert_eq!(resolved.http_timeout, Duration::from_secs(5));
}

#[test]
fn missing_config_file_is_reported() {
    let err = ConfigLoader::resolve(Some("/nonexistent/collector.json"), |_| None).unwrap_err();
    assert_matches!(err, CollectorError::ConfigRead(_));
}

#[test]
fn rooted_defaults_keep_state_together() {
    let root = Utf8PathBuf::from("/var/lib/collector");
    let config = CollectorConfig::new_with_root(root.clone()).unwrap();
    assert!(config.checkpoint_dir.starts_with(&root));
    assert!(config.cache_dir.starts_with(&root));
    assert!(config.output_dir.starts_with(&root));
}
