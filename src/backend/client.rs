use super::messages::{AgentConfig, CalendarBooking, CallMetadata, KnowledgeChunk};
use crate::config::BackendConfig;
use anyhow::{Context, Result};
use chrono::{Duration, Local};
use serde_json::json;
use tracing::{debug, error, info};

/// Header carrying the caller's access token
const TOKEN_HEADER: &str = "x-token";

/// Window of upcoming bookings injected into the instructions
const CALENDAR_LOOKAHEAD_DAYS: i64 = 60;

/// Source of per-agent configuration
#[async_trait::async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn fetch_agent_config(&self, access_token: &str, agent_id: u64) -> Result<AgentConfig>;

    async fn fetch_calendar_events(&self, access_token: &str) -> Result<Vec<CalendarBooking>>;
}

/// Receiver of post-call analytics
#[async_trait::async_trait]
pub trait AnalyticsSender: Send + Sync {
    async fn send_call_analytics(&self, access_token: &str, metadata: &CallMetadata) -> Result<()>;
}

/// Vector search over an agent's documents
#[async_trait::async_trait]
pub trait ChunkIndex: Send + Sync {
    async fn vector_search(
        &self,
        access_token: &str,
        query_embedding: &[f32],
        agent_id: u64,
        limit: usize,
    ) -> Result<Vec<KnowledgeChunk>>;
}

/// HTTP client for the agent backend
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    api_prefix: String,
}

impl BackendClient {
    pub fn new(base_url: &str, api_prefix: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build backend HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_prefix: api_prefix.to_string(),
        })
    }

    /// Client for the configured backend, `None` when no URL is set
    pub fn from_config(config: &BackendConfig) -> Result<Option<Self>> {
        match config.url.as_deref().filter(|url| !url.is_empty()) {
            Some(url) => Ok(Some(Self::new(url, &config.api_prefix)?)),
            None => Ok(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, path)
    }
}

#[async_trait::async_trait]
impl AgentDirectory for BackendClient {
    async fn fetch_agent_config(&self, access_token: &str, agent_id: u64) -> Result<AgentConfig> {
        info!("Fetching agent config (agent_id={})", agent_id);

        let config = self
            .http
            .get(self.url(&format!("/agents/by-token/{}", agent_id)))
            .header(TOKEN_HEADER, access_token)
            .send()
            .await
            .context("Agent config request failed")?
            .error_for_status()
            .context("Agent config request rejected")?
            .json::<AgentConfig>()
            .await
            .context("Invalid agent configuration")?;

        info!("Agent config fetched successfully");
        Ok(config)
    }

    async fn fetch_calendar_events(&self, access_token: &str) -> Result<Vec<CalendarBooking>> {
        let now = Local::now();
        let from = now.format("%Y-%m-%dT%H:%M:%S").to_string();
        let to = (now + Duration::days(CALENDAR_LOOKAHEAD_DAYS))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();

        let events = self
            .http
            .get(self.url("/calendar-events/by-token"))
            .header(TOKEN_HEADER, access_token)
            .query(&[("from", from), ("to", to)])
            .send()
            .await
            .context("Calendar request failed")?
            .error_for_status()
            .context("Calendar request rejected")?
            .json::<Vec<CalendarBooking>>()
            .await
            .context("Malformed calendar response")?;

        debug!("Fetched {} calendar events", events.len());
        Ok(events)
    }
}

#[async_trait::async_trait]
impl AnalyticsSender for BackendClient {
    async fn send_call_analytics(&self, access_token: &str, metadata: &CallMetadata) -> Result<()> {
        let result = self
            .http
            .post(self.url("/call-analytics/create"))
            .header(TOKEN_HEADER, access_token)
            .json(metadata)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => {
                info!("Call metadata sent successfully");
                Ok(())
            }
            Err(e) => {
                error!("Failed to send call metadata: {}", e);
                Err(e).context("Call analytics submission failed")
            }
        }
    }
}

#[async_trait::async_trait]
impl ChunkIndex for BackendClient {
    async fn vector_search(
        &self,
        access_token: &str,
        query_embedding: &[f32],
        agent_id: u64,
        limit: usize,
    ) -> Result<Vec<KnowledgeChunk>> {
        let body = json!({
            "queryEmbedding": query_embedding,
            "limit": limit,
            "agentId": agent_id,
        });

        let chunks = self
            .http
            .get(self.url("/agents/documents/chunks/vector-search/by-token"))
            .header(TOKEN_HEADER, access_token)
            .json(&body)
            .send()
            .await
            .context("Vector search request failed")?
            .error_for_status()
            .context("Vector search rejected")?
            .json::<Vec<KnowledgeChunk>>()
            .await
            .context("Malformed vector search response")?;

        info!("Chunks fetched successfully ({})", chunks.len());
        Ok(chunks)
    }
}
