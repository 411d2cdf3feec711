use crate::monitor::MonitorConfig;
use anyhow::{bail, Result};
use serde::Deserialize;
use std::time::Duration;

/// Prefix of environment overrides, e.g. `CALL_AGENT__BACKEND__URL`
const ENV_PREFIX: &str = "CALL_AGENT";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,
    #[serde(default)]
    pub monitor: MonitorSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Emit JSON log lines instead of the human readable format
    #[serde(default)]
    pub log_json: bool,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    #[serde(default = "default_nats_url")]
    pub url: String,
    /// Upper bound on request/reply round trips (spoken replies included)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Analytics, agent configuration and knowledge base backend.
    /// Analytics submission is skipped when unset.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_inference_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model used for transcript classification
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Bound on a whole classification call
    #[serde(default = "default_inference_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Results returned to the assistant per search
    #[serde(default = "default_kb_search_limit")]
    pub search_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSettings {
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default = "default_warn_after_secs")]
    pub warn_after_secs: u64,
    #[serde(default = "default_close_after_secs")]
    pub close_after_secs: u64,
}

fn default_service_name() -> String {
    "voice-call-agent".to_string()
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_inference_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_inference_timeout_secs() -> u64 {
    30
}

fn default_kb_search_limit() -> usize {
    3
}

fn default_check_interval_secs() -> u64 {
    5
}

fn default_warn_after_secs() -> u64 {
    5
}

fn default_close_after_secs() -> u64 {
    10
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_json: false,
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: default_nats_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_prefix: default_api_prefix(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_inference_url(),
            api_key: None,
            model: default_model(),
            embedding_model: default_embedding_model(),
            timeout_secs: default_inference_timeout_secs(),
        }
    }
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            search_limit: default_kb_search_limit(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            warn_after_secs: default_warn_after_secs(),
            close_after_secs: default_close_after_secs(),
        }
    }
}

impl MonitorSettings {
    /// Reject timings that would spin the monitor or skip the check-in
    pub fn validate(&self) -> Result<()> {
        if self.check_interval_secs == 0 {
            bail!("monitor.check_interval_secs must be greater than zero");
        }
        if self.warn_after_secs >= self.close_after_secs {
            bail!(
                "monitor.warn_after_secs ({}) must be lower than monitor.close_after_secs ({})",
                self.warn_after_secs,
                self.close_after_secs
            );
        }
        Ok(())
    }

    pub fn to_monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            check_interval: Duration::from_secs(self.check_interval_secs),
            warn_after: Duration::from_secs(self.warn_after_secs),
            close_after: Duration::from_secs(self.close_after_secs),
            ..MonitorConfig::default()
        }
    }
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl NatsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load `path` (extension optional) and apply `CALL_AGENT__*` overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.monitor.validate()?;
        Ok(config)
    }
}
