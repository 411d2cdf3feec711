use super::models::CallClassification;
use crate::conversation::{build_transcript, ConversationItem};
use crate::inference::{ChatMessage, ChatRequest, InferenceService, ResponseFormat};
use anyhow::{Context, Result};
use futures::stream::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info};

/// System instruction describing the fields to extract
pub const CLASSIFICATION_INSTRUCTIONS: &str = "Analyze this phone call transcript and extract:\n\
1. is_spam: SPAM if sales/marketing, NOT_SPAM if legitimate inquiry, NOT_SURE if unclear\n\
2. reason_for_call: Brief reason the caller contacted\n\
3. callback_required: YES if caller needs follow-up, NO if resolved, NOT_SURE if unclear\n\
4. callback_required_reason: Why callback is or isn't needed\n\
5. caller_name: Name if provided, else null\n\
6. calendar_event: If caller mentioned scheduling, extract title, description, start_time, end_time\n\
7. service_pricing: If a service and its price were discussed, extract name, price_from, price_to\n\n\
Be precise. Use null for unknown values.";

/// Derives a [`CallClassification`] from a finished call.
///
/// Best effort: every failure is logged and reported as "no classification".
pub struct CallClassifier {
    inference: Arc<dyn InferenceService>,
    timeout: Duration,
}

impl CallClassifier {
    pub fn new(inference: Arc<dyn InferenceService>, timeout: Duration) -> Self {
        Self { inference, timeout }
    }

    /// Classify a conversation history
    pub async fn classify(&self, history: &[ConversationItem]) -> Option<CallClassification> {
        self.classify_transcript(&build_transcript(history)).await
    }

    /// Classify an already built transcript; empty transcripts skip inference
    pub async fn classify_transcript(&self, transcript: &str) -> Option<CallClassification> {
        if transcript.is_empty() {
            debug!("Empty transcript, skipping classification");
            return None;
        }

        match timeout(self.timeout, self.request_classification(transcript)).await {
            Ok(Ok(Some(classification))) => {
                info!(
                    "Call classified: spam={:?}, callback={:?}",
                    classification.is_spam, classification.callback_required
                );
                Some(classification)
            }
            Ok(Ok(None)) => {
                info!("Classifier returned no content");
                None
            }
            Ok(Err(e)) => {
                error!("Failed to extract call metadata: {:#}", e);
                None
            }
            Err(_) => {
                error!(
                    "Failed to extract call metadata: timed out after {}s",
                    self.timeout.as_secs_f64()
                );
                None
            }
        }
    }

    /// Fresh request: fixed instruction followed by the transcript
    pub fn build_request(transcript: &str) -> ChatRequest {
        ChatRequest {
            messages: vec![
                ChatMessage::system(CLASSIFICATION_INSTRUCTIONS),
                ChatMessage::user(transcript),
            ],
            response_format: Some(ResponseFormat {
                name: "CallClassification".to_string(),
                schema: CallClassification::json_schema(),
            }),
        }
    }

    async fn request_classification(&self, transcript: &str) -> Result<Option<CallClassification>> {
        let mut stream = self
            .inference
            .chat(Self::build_request(transcript))
            .await
            .context("Classification request failed")?;

        let mut content = String::new();
        while let Some(fragment) = stream.next().await {
            content.push_str(&fragment.context("Classification stream failed")?);
        }

        let payload = strip_code_fence(&content);
        if payload.is_empty() {
            return Ok(None);
        }

        let classification =
            serde_json::from_str(payload).context("Unparseable classification output")?;
        Ok(Some(classification))
    }
}

/// Some gateways wrap structured output in a markdown fence
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}
