use std::fs;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::ProcessDate;
use crate::error::CollectorError;

pub const DEFAULT_PROCESS_DATE: &str = "2024-01-01";
pub const MEETING_LIST_API_URL: &str = "https://kokkai.ndl.go.jp/api/meeting_list";
pub const MEETING_API_URL: &str = "https://kokkai.ndl.go.jp/api/meeting";
pub const REQUEST_INTERVAL_SECONDS: u64 = 5;
pub const HTTP_TIMEOUT_SECONDS: u64 = 60;

pub const ENV_DEFAULT_PROCESS_DATE: &str = "DEFAULT_PROCESS_DATE";
pub const ENV_CHECKPOINT_DIR: &str = "PROCESS_DATE_SAVE_DIR";
pub const ENV_CACHE_DIR: &str = "CACHE_SAVE_DIR";
pub const ENV_OUTPUT_DIR: &str = "MEETING_DATA_SAVE_DIR";
pub const ENV_REQUEST_INTERVAL: &str = "REQUEST_INTERVAL_SECONDS";

/// Optional on-disk configuration; every field falls back to a default.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    #[serde(default)]
    pub default_process_date: Option<String>,
    #[serde(default)]
    pub checkpoint_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub cache_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub output_dir: Option<Utf8PathBuf>,
    #[serde(default)]
    pub list_url: Option<String>,
    #[serde(default)]
    pub detail_url: Option<String>,
    #[serde(default)]
    pub request_interval_seconds: Option<u64>,
    #[serde(default)]
    pub http_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub default_process_date: ProcessDate,
    pub checkpoint_dir: Utf8PathBuf,
    pub cache_dir: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,
    pub list_url: String,
    pub detail_url: String,
    pub request_interval: Duration,
    pub http_timeout: Duration,
}

impl CollectorConfig {
    /// Defaults with all state kept under `root`; used by embedders and tests.
    pub fn new_with_root(root: Utf8PathBuf) -> Result<Self, CollectorError> {
        Ok(Self {
            default_process_date: DEFAULT_PROCESS_DATE.parse()?,
            checkpoint_dir: root.join("config"),
            cache_dir: root.join("cache"),
            output_dir: root.join("output"),
            list_url: MEETING_LIST_API_URL.to_string(),
            detail_url: MEETING_API_URL.to_string(),
            request_interval: Duration::from_secs(REQUEST_INTERVAL_SECONDS),
            http_timeout: Duration::from_secs(HTTP_TIMEOUT_SECONDS),
        })
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the optional config file and overlays environment values taken
    /// from `env`.
    pub fn resolve<F>(path: Option<&str>, env: F) -> Result<CollectorConfig, CollectorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = match path {
            Some(path) => {
                let config_path = Utf8PathBuf::from(path);
                let content = fs::read_to_string(config_path.as_std_path())
                    .map_err(|_| CollectorError::ConfigRead(config_path.clone()))?;
                serde_json::from_str(&content)
                    .map_err(|err| CollectorError::Config(err.to_string()))?
            }
            None => Config::default(),
        };
        Self::resolve_config(config, env)
    }

    pub fn resolve_config<F>(config: Config, env: F) -> Result<CollectorConfig, CollectorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|value| !value.trim().is_empty());

        let default_process_date = env(ENV_DEFAULT_PROCESS_DATE)
            .or(config.default_process_date)
            .unwrap_or_else(|| DEFAULT_PROCESS_DATE.to_string())
            .parse()?;

        let collector_root = Utf8PathBuf::from(".collector");
        let checkpoint_dir = env(ENV_CHECKPOINT_DIR)
            .map(Utf8PathBuf::from)
            .or(config.checkpoint_dir)
            .unwrap_or_else(|| collector_root.join("config"));
        let cache_dir = env(ENV_CACHE_DIR)
            .map(Utf8PathBuf::from)
            .or(config.cache_dir)
            .unwrap_or_else(|| collector_root.join("cache"));
        let output_dir = env(ENV_OUTPUT_DIR)
            .map(Utf8PathBuf::from)
            .or(config.output_dir)
            .unwrap_or_else(|| Utf8PathBuf::from("/usr/share/logstash/ingest_data"));

        let request_interval_seconds = match env(ENV_REQUEST_INTERVAL) {
            Some(value) => value.trim().parse::<u64>().map_err(|_| {
                CollectorError::Config(format!("{ENV_REQUEST_INTERVAL} must be whole seconds: {value}"))
            })?,
            None => config
                .request_interval_seconds
                .unwrap_or(REQUEST_INTERVAL_SECONDS),
        };

        Ok(CollectorConfig {
            default_process_date,
            checkpoint_dir,
            cache_dir,
            output_dir,
            list_url: config
                .list_url
                .unwrap_or_else(|| MEETING_LIST_API_URL.to_string()),
            detail_url: config
                .detail_url
                .unwrap_or_else(|| MEETING_API_URL.to_string()),
            request_interval: Duration::from_secs(request_interval_seconds),
            http_timeout: Duration::from_secs(
                config.http_timeout_seconds.unwrap_or(HTTP_TIMEOUT_SECONDS),
            ),
        })
    }
}
