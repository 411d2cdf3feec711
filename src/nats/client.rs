use super::messages::{
    AckMessage, EventMessage, GenerateReplyMessage, JoinMessage, ShutdownMessage,
    StartSessionMessage,
};
use crate::pipeline::{
    AgentSpec, AudioOptions, CloseReason, Participant, PipelineConnector, SessionEvent,
    SessionReport, ToolInvocation, VoicePipeline,
};
use anyhow::{anyhow, Context, Result};
use async_nats::{Client, Message, Subscriber};
use futures::StreamExt;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 64;

/// Shared NATS connection that opens one pipeline per call
pub struct NatsConnector {
    client: Client,
    agent_name: String,
}

impl NatsConnector {
    /// Connect to NATS server
    pub async fn connect(url: &str, agent_name: &str, request_timeout: Duration) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::ConnectOptions::new()
            .request_timeout(Some(request_timeout))
            .connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self {
            client,
            agent_name: agent_name.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl PipelineConnector for NatsConnector {
    async fn open(&self, call_id: &str) -> Result<Arc<dyn VoicePipeline>> {
        Ok(Arc::new(NatsVoicePipeline::new(
            self.client.clone(),
            call_id,
            &self.agent_name,
        )))
    }
}

/// Voice pipeline driven over `call.{id}.*` subjects
pub struct NatsVoicePipeline {
    client: Client,
    call_id: String,
    agent_name: String,
    participant: Mutex<Option<Subscriber>>,
    events: Mutex<Option<Subscriber>>,
}

impl NatsVoicePipeline {
    pub fn new(client: Client, call_id: &str, agent_name: &str) -> Self {
        Self {
            client,
            call_id: call_id.to_string(),
            agent_name: agent_name.to_string(),
            participant: Mutex::new(None),
            events: Mutex::new(None),
        }
    }

    pub fn subject(&self, suffix: &str) -> String {
        format!("call.{}.{}", self.call_id, suffix)
    }

    async fn publish<T: Serialize>(&self, suffix: &str, message: &T) -> Result<()> {
        let subject = self.subject(suffix);
        let payload = serde_json::to_vec(message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .with_context(|| format!("Failed to publish to {}", subject))?;

        debug!("Published to {}", subject);
        Ok(())
    }

    async fn request<T: Serialize>(&self, suffix: &str, message: &T) -> Result<Message> {
        let subject = self.subject(suffix);
        let payload = serde_json::to_vec(message)?;

        self.client
            .request(subject.clone(), payload.into())
            .await
            .with_context(|| format!("Request to {} failed", subject))
    }

    /// Request that only returns an acknowledgement
    async fn request_ack<T: Serialize>(&self, suffix: &str, message: &T) -> Result<()> {
        let reply = self.request(suffix, message).await?;
        if reply.payload.is_empty() {
            return Ok(());
        }

        let ack: AckMessage =
            serde_json::from_slice(&reply.payload).context("Malformed acknowledgement")?;
        if ack.ok {
            Ok(())
        } else {
            Err(anyhow!(
                "Pipeline rejected {}: {}",
                self.subject(suffix),
                ack.error.unwrap_or_else(|| "unknown error".to_string())
            ))
        }
    }
}

#[async_trait::async_trait]
impl VoicePipeline for NatsVoicePipeline {
    async fn connect(&self) -> Result<()> {
        // Subscribe before joining so the participant announcement is not missed
        let participant = self
            .client
            .subscribe(self.subject("participant"))
            .await
            .context("Failed to subscribe to participant announcements")?;
        let events = self
            .client
            .subscribe(self.subject("events"))
            .await
            .context("Failed to subscribe to session events")?;

        *self.participant.lock().await = Some(participant);
        *self.events.lock().await = Some(events);

        self.publish(
            "join",
            &JoinMessage {
                call_id: self.call_id.clone(),
                agent_name: self.agent_name.clone(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
        )
        .await?;
        self.client.flush().await.context("Failed to flush join")?;

        info!("Joined room {}", self.call_id);
        Ok(())
    }

    async fn wait_for_participant(&self) -> Result<Participant> {
        let mut subscriber = self
            .participant
            .lock()
            .await
            .take()
            .context("Not connected to the room")?;

        let message = subscriber
            .next()
            .await
            .context("Participant subscription closed")?;

        serde_json::from_slice(&message.payload).context("Malformed participant announcement")
    }

    async fn subscribe_events(&self) -> Result<mpsc::Receiver<SessionEvent>> {
        let subscriber = self
            .events
            .lock()
            .await
            .take()
            .context("Session events already subscribed or not connected")?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(forward_events(self.client.clone(), subscriber, tx));

        Ok(rx)
    }

    async fn start(&self, agent: &AgentSpec, options: &AudioOptions) -> Result<()> {
        self.request_ack("start", &StartSessionMessage::new(agent, options))
            .await
    }

    async fn generate_reply(&self, instructions: &str, allow_interruptions: bool) -> Result<()> {
        self.request_ack(
            "reply",
            &GenerateReplyMessage {
                instructions: instructions.to_string(),
                allow_interruptions,
            },
        )
        .await
    }

    async fn shutdown(&self, drain: bool) -> Result<()> {
        self.publish("shutdown", &ShutdownMessage { drain }).await?;
        self.client
            .flush()
            .await
            .context("Failed to flush shutdown")?;
        Ok(())
    }

    async fn make_session_report(&self) -> Result<SessionReport> {
        let reply = self.request("report", &json!({})).await?;
        serde_json::from_slice(&reply.payload).context("Malformed session report")
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// Translate NATS event messages into session events until the session closes
async fn forward_events(client: Client, mut subscriber: Subscriber, tx: mpsc::Sender<SessionEvent>) {
    while let Some(message) = subscriber.next().await {
        let event = match serde_json::from_slice::<EventMessage>(&message.payload) {
            Ok(event) => event,
            Err(e) => {
                warn!("Ignoring malformed session event: {}", e);
                continue;
            }
        };

        let event = match event {
            EventMessage::ConversationItemAdded { item } => {
                SessionEvent::ConversationItemAdded(item)
            }
            EventMessage::ToolCall { name, arguments } => {
                let (responder, response) = oneshot::channel();
                match message.reply {
                    Some(reply) => {
                        let client = client.clone();
                        tokio::spawn(async move {
                            let output = response
                                .await
                                .unwrap_or_else(|_| json!({ "error": "tool call dropped" }));
                            if let Err(e) = client.publish(reply, output.to_string().into()).await {
                                warn!("Failed to answer tool call: {}", e);
                            }
                        });
                    }
                    None => warn!("Tool call '{}' has no reply subject", name),
                }
                SessionEvent::ToolCall(ToolInvocation {
                    name,
                    arguments,
                    responder,
                })
            }
            EventMessage::Close { reason } => {
                let _ = tx.send(SessionEvent::Close(CloseReason::Closed(reason))).await;
                return;
            }
        };

        if tx.send(event).await.is_err() {
            debug!("Session event receiver dropped");
            return;
        }
    }

    warn!("Session event subscription ended");
}
