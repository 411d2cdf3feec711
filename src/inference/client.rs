use super::messages::{ChatCompletionChunk, ChatRequest, EmbeddingResponse};
use crate::config::InferenceConfig;
use anyhow::{anyhow, bail, Context, Result};
use eventsource_stream::Eventsource;
use futures::stream::{BoxStream, StreamExt};
use serde_json::json;
use tracing::{debug, info};

/// Stream of content fragments from a chat completion
pub type ContentStream = BoxStream<'static, Result<String>>;

/// Structured-output inference
#[async_trait::async_trait]
pub trait InferenceService: Send + Sync {
    /// Run a chat completion and stream its content fragments
    async fn chat(&self, request: ChatRequest) -> Result<ContentStream>;
}

/// Text embeddings for knowledge base search
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Client for an OpenAI-compatible inference gateway
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    embedding_model: String,
}

impl OpenAiClient {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build inference HTTP client")?;

        info!("Inference client configured for {} ({})", config.base_url, config.model);

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.http.post(format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

/// Extract the content fragment of one SSE data line
fn parse_chunk(data: &str) -> Result<Option<String>> {
    let chunk: ChatCompletionChunk =
        serde_json::from_str(data).context("Malformed completion chunk")?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

#[async_trait::async_trait]
impl InferenceService for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> Result<ContentStream> {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "stream": true,
        });

        if let Some(format) = &request.response_format {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": format.name,
                    "schema": format.schema,
                },
            });
        }

        debug!("Requesting chat completion ({} messages)", request.messages.len());

        let response = self
            .post("/chat/completions")
            .json(&body)
            .send()
            .await
            .context("Chat completion request failed")?
            .error_for_status()
            .context("Chat completion rejected")?;

        let stream = response
            .bytes_stream()
            .eventsource()
            .take_while(|event| {
                let done = matches!(event, Ok(event) if event.data.trim() == "[DONE]");
                futures::future::ready(!done)
            })
            .filter_map(|event| async move {
                match event {
                    Ok(event) => parse_chunk(&event.data).transpose(),
                    Err(e) => Some(Err(anyhow!("SSE stream error: {}", e))),
                }
            });

        Ok(stream.boxed())
    }
}

#[async_trait::async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            bail!("Cannot generate embedding for empty text");
        }

        debug!("Generating embedding for text ({} chars)", text.len());

        let response: EmbeddingResponse = self
            .post("/embeddings")
            .json(&json!({ "input": text, "model": self.embedding_model }))
            .send()
            .await
            .context("Embedding request failed")?
            .error_for_status()
            .context("Embedding request rejected")?
            .json()
            .await
            .context("Malformed embedding response")?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .context("Embedding response contained no data")?;

        debug!("Embedding generated ({} dimensions)", embedding.len());
        Ok(embedding)
    }
}
