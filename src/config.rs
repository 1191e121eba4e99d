use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("cannot resolve host '{host}': {reason}")]
    Unresolvable { host: String, reason: String },
}

/// Telescope channels are numbered `0..MAX_CHANNELS`.
pub const MAX_CHANNELS: u32 = 20;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub results: ResultsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_channels")]
    pub channels: u32,
    #[serde(default = "default_initial_delay", deserialize_with = "human_duration")]
    pub initial_delay: Duration,
    #[serde(default = "default_period", deserialize_with = "human_duration")]
    pub period: Duration,
    #[serde(default = "default_request_timeout", deserialize_with = "human_duration")]
    pub request_timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            base_url: default_base_url(),
            channels: default_channels(),
            initial_delay: default_initial_delay(),
            period: default_period(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8333".to_string()
}

fn default_channels() -> u32 {
    20
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_period() -> Duration {
    Duration::from_secs(5)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultsConfig {
    #[serde(default = "default_results_root")]
    pub root: PathBuf,
    /// Upper bound on append handles the writer keeps open at once.
    #[serde(default = "default_max_open_files")]
    pub max_open_files: usize,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        ResultsConfig {
            root: default_results_root(),
            max_open_files: default_max_open_files(),
        }
    }
}

fn default_results_root() -> PathBuf {
    PathBuf::from("results")
}

fn default_max_open_files() -> usize {
    256
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_merge_buffer")]
    pub merge_buffer: usize,
    #[serde(default = "default_consumer_buffer")]
    pub consumer_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            merge_buffer: default_merge_buffer(),
            consumer_buffer: default_consumer_buffer(),
        }
    }
}

fn default_merge_buffer() -> usize {
    64
}

fn default_consumer_buffer() -> usize {
    1
}

fn human_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to null; treat it as all defaults.
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.source.base_url).map_err(|e| {
            ConfigError::Invalid(format!("base_url '{}': {}", self.source.base_url, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Invalid(format!(
                "base_url '{}' must use http or https",
                self.source.base_url
            )));
        }
        if url.host_str().is_none() {
            return Err(ConfigError::Invalid(format!(
                "base_url '{}' has no host",
                self.source.base_url
            )));
        }
        if self.source.channels == 0 || self.source.channels > MAX_CHANNELS {
            return Err(ConfigError::Invalid(format!(
                "channels must be between 1 and {}",
                MAX_CHANNELS
            )));
        }
        if self.source.period.is_zero() {
            return Err(ConfigError::Invalid("period must be non-zero".into()));
        }
        if self.results.max_open_files == 0 {
            return Err(ConfigError::Invalid(
                "max_open_files must be at least 1".into(),
            ));
        }
        if self.pipeline.merge_buffer == 0 || self.pipeline.consumer_buffer == 0 {
            return Err(ConfigError::Invalid("buffers must be at least 1".into()));
        }
        Ok(())
    }

    /// Looks up the source host once. An unresolvable host is a startup
    /// error, not a per-poll one.
    pub async fn resolve_host(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.source.base_url).map_err(|e| {
            ConfigError::Invalid(format!("base_url '{}': {}", self.source.base_url, e))
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| {
                ConfigError::Invalid(format!("base_url '{}' has no host", self.source.base_url))
            })?
            .trim_start_matches('[')
            .trim_end_matches(']');
        let port = url.port_or_known_default().unwrap_or(80);

        let unresolvable = |reason: String| ConfigError::Unresolvable {
            host: host.to_string(),
            reason,
        };
        let mut addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| unresolvable(e.to_string()))?;
        if addrs.next().is_none() {
            return Err(unresolvable("no addresses".into()));
        }
        Ok(())
    }

    /// Endpoint polled for one telescope channel.
    pub fn channel_url(&self, channel: u32) -> String {
        format!(
            "{}/telescope/{}",
            self.source.base_url.trim_end_matches('/'),
            channel
        )
    }
}
