// Shared test doubles for session, monitor and HTTP tests

#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use futures::stream;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use voice_call_agent::backend::{
    AgentConfig, AgentDirectory, AnalyticsSender, CalendarBooking, CallMetadata, InitiationMode,
    Instructions,
};
use voice_call_agent::inference::{ChatRequest, ContentStream, InferenceService};
use voice_call_agent::pipeline::{
    AgentSpec, AudioOptions, CloseReason, Participant, ParticipantKind, PipelineConnector,
    SessionEvent, SessionReport, VoicePipeline,
};
use voice_call_agent::session::SessionServices;
use voice_call_agent::{CallClassifier, ConversationItem};

pub const NOT_SURE_CLASSIFICATION: &str = r#"{
    "is_spam": "NOT_SURE",
    "reason_for_call": "Unclear",
    "callback_required": "NOT_SURE",
    "callback_required_reason": "Caller went silent",
    "caller_name": null,
    "calendar_event": null,
    "service_pricing": null
}"#;

pub fn caller_attributes() -> HashMap<String, String> {
    HashMap::from([
        ("accessToken".to_string(), "token-123".to_string()),
        ("agentId".to_string(), "42".to_string()),
    ])
}

// ============================================================================
// Voice pipeline
// ============================================================================

/// In-memory voice pipeline.
///
/// `shutdown` emits a close event, like a real pipeline finishing its drain.
pub struct MockPipeline {
    participant: Participant,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<SessionEvent>>>,
    history: Mutex<Vec<ConversationItem>>,
    replies: Mutex<Vec<(Instant, String)>>,
    shutdowns: Mutex<Vec<(Instant, bool)>>,
    started: Mutex<Option<(Instant, AgentSpec, AudioOptions)>>,
    reply_delay: Duration,
    fail_replies: bool,
    fail_report: bool,
    fail_connect: bool,
}

impl MockPipeline {
    pub fn new() -> Self {
        Self::with_participant(Participant {
            identity: "sip_+15550100".to_string(),
            kind: ParticipantKind::Sip,
            attributes: caller_attributes(),
        })
    }

    pub fn with_participant(participant: Participant) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        Self {
            participant,
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            history: Mutex::new(Vec::new()),
            replies: Mutex::new(Vec::new()),
            shutdowns: Mutex::new(Vec::new()),
            started: Mutex::new(None),
            reply_delay: Duration::ZERO,
            fail_replies: false,
            fail_report: false,
            fail_connect: false,
        }
    }

    pub fn with_attributes(attributes: HashMap<String, String>) -> Self {
        Self::with_participant(Participant {
            identity: "web-caller".to_string(),
            kind: ParticipantKind::Standard,
            attributes,
        })
    }

    /// Spoken replies take this long to finish
    pub fn reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    pub fn failing_replies(mut self) -> Self {
        self.fail_replies = true;
        self
    }

    pub fn failing_report(mut self) -> Self {
        self.fail_report = true;
        self
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// The caller speaks
    pub fn user_says(&self, text: &str) {
        self.emit(ConversationItem::user(text));
    }

    /// Push a raw session event (tool calls, close)
    pub fn send_event(&self, event: SessionEvent) {
        let _ = self.events_tx.try_send(event);
    }

    fn emit(&self, item: ConversationItem) {
        self.history.lock().unwrap().push(item.clone());
        let _ = self
            .events_tx
            .try_send(SessionEvent::ConversationItemAdded(item));
    }

    pub fn replies(&self) -> Vec<String> {
        self.replies
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Reply instructions with their offset from session start
    pub fn replies_at(&self) -> Vec<(Duration, String)> {
        let start = self.start_instant();
        self.replies
            .lock()
            .unwrap()
            .iter()
            .map(|(at, text)| (at.saturating_duration_since(start), text.clone()))
            .collect()
    }

    pub fn shutdowns_at(&self) -> Vec<Duration> {
        let start = self.start_instant();
        self.shutdowns
            .lock()
            .unwrap()
            .iter()
            .map(|(at, _)| at.saturating_duration_since(start))
            .collect()
    }

    /// Drain flag of every shutdown request, in order
    pub fn shutdown_drains(&self) -> Vec<bool> {
        self.shutdowns.lock().unwrap().iter().map(|(_, drain)| *drain).collect()
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.lock().unwrap().len()
    }

    pub fn started_with(&self) -> Option<(AgentSpec, AudioOptions)> {
        self.started
            .lock()
            .unwrap()
            .as_ref()
            .map(|(_, agent, options)| (agent.clone(), options.clone()))
    }

    fn start_instant(&self) -> Instant {
        self.started
            .lock()
            .unwrap()
            .as_ref()
            .map(|(at, _, _)| *at)
            .unwrap_or_else(Instant::now)
    }
}

#[async_trait::async_trait]
impl VoicePipeline for MockPipeline {
    async fn connect(&self) -> Result<()> {
        if self.fail_connect {
            bail!("room unavailable");
        }
        Ok(())
    }

    async fn wait_for_participant(&self) -> Result<Participant> {
        Ok(self.participant.clone())
    }

    async fn subscribe_events(&self) -> Result<mpsc::Receiver<SessionEvent>> {
        self.events_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| anyhow!("events already subscribed"))
    }

    async fn start(&self, agent: &AgentSpec, options: &AudioOptions) -> Result<()> {
        *self.started.lock().unwrap() = Some((Instant::now(), agent.clone(), options.clone()));
        Ok(())
    }

    async fn generate_reply(&self, instructions: &str, _allow_interruptions: bool) -> Result<()> {
        self.replies
            .lock()
            .unwrap()
            .push((Instant::now(), instructions.to_string()));

        if !self.reply_delay.is_zero() {
            tokio::time::sleep(self.reply_delay).await;
        }
        if self.fail_replies {
            bail!("text-to-speech unavailable");
        }

        self.emit(ConversationItem::assistant(instructions));
        Ok(())
    }

    async fn shutdown(&self, drain: bool) -> Result<()> {
        self.shutdowns.lock().unwrap().push((Instant::now(), drain));
        let _ = self
            .events_tx
            .try_send(SessionEvent::Close(CloseReason::Closed(Some("shutdown".to_string()))));
        Ok(())
    }

    async fn make_session_report(&self) -> Result<SessionReport> {
        if self.fail_report {
            bail!("report unavailable");
        }
        Ok(SessionReport {
            chat_history: self.history.lock().unwrap().clone(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Hands out pre-built pipelines by call id
#[derive(Default)]
pub struct MockConnector {
    pub pipelines: Mutex<HashMap<String, Arc<MockPipeline>>>,
}

impl MockConnector {
    pub fn pipeline(&self, call_id: &str) -> Option<Arc<MockPipeline>> {
        self.pipelines.lock().unwrap().get(call_id).cloned()
    }
}

#[async_trait::async_trait]
impl PipelineConnector for MockConnector {
    async fn open(&self, call_id: &str) -> Result<Arc<dyn VoicePipeline>> {
        let pipeline = Arc::new(MockPipeline::new());
        self.pipelines
            .lock()
            .unwrap()
            .insert(call_id.to_string(), pipeline.clone());
        Ok(pipeline)
    }
}

// ============================================================================
// Backend
// ============================================================================

pub struct MockDirectory {
    pub config: Option<AgentConfig>,
    pub bookings: Vec<CalendarBooking>,
    pub requested: Mutex<Vec<(String, u64)>>,
}

impl MockDirectory {
    pub fn new(mode: InitiationMode, initial_message: Option<&str>) -> Self {
        Self {
            config: Some(AgentConfig {
                voice_model_name: "Craig".to_string(),
                initiation_mode: mode,
                knowledge_base_trigger: Some(false),
                initial_message: initial_message.map(str::to_string),
                instructions: Instructions::Text("You answer calls for Acme Dental.".to_string()),
            }),
            bookings: Vec::new(),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Agent that waits for the caller to speak first
    pub fn caller_first() -> Self {
        Self::new(InitiationMode::UserInitiates, None)
    }

    pub fn missing() -> Self {
        Self {
            config: None,
            bookings: Vec::new(),
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl AgentDirectory for MockDirectory {
    async fn fetch_agent_config(&self, access_token: &str, agent_id: u64) -> Result<AgentConfig> {
        self.requested
            .lock()
            .unwrap()
            .push((access_token.to_string(), agent_id));
        self.config
            .clone()
            .ok_or_else(|| anyhow!("agent {} not found", agent_id))
    }

    async fn fetch_calendar_events(&self, _access_token: &str) -> Result<Vec<CalendarBooking>> {
        Ok(self.bookings.clone())
    }
}

#[derive(Default)]
pub struct MockAnalytics {
    pub sent: Mutex<Vec<(String, CallMetadata)>>,
    pub fail: bool,
}

impl MockAnalytics {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, CallMetadata)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AnalyticsSender for MockAnalytics {
    async fn send_call_analytics(&self, access_token: &str, metadata: &CallMetadata) -> Result<()> {
        if self.fail {
            bail!("backend returned 500");
        }
        self.sent
            .lock()
            .unwrap()
            .push((access_token.to_string(), metadata.clone()));
        Ok(())
    }
}

// ============================================================================
// Inference
// ============================================================================

/// Replies to every chat request with fixed content fragments
pub struct ScriptedInference {
    fragments: Vec<String>,
    fail: bool,
    delay: Duration,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedInference {
    pub fn replying(content: &str) -> Self {
        // Split so the classifier has to reassemble the stream
        let mid = content.len() / 2;
        let mid = (mid..content.len())
            .find(|i| content.is_char_boundary(*i))
            .unwrap_or(content.len());
        Self {
            fragments: vec![content[..mid].to_string(), content[mid..].to_string()],
            fail: false,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::replying("")
        }
    }

    pub fn slow(content: &str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::replying(content)
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl InferenceService for ScriptedInference {
    async fn chat(&self, request: ChatRequest) -> Result<ContentStream> {
        self.requests.lock().unwrap().push(request);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            bail!("inference gateway unavailable");
        }

        let fragments: Vec<Result<String>> = self.fragments.iter().cloned().map(Ok).collect();
        Ok(Box::pin(stream::iter(fragments)))
    }
}

pub fn classifier(inference: Arc<ScriptedInference>) -> Arc<CallClassifier> {
    Arc::new(CallClassifier::new(inference, Duration::from_secs(30)))
}

pub fn services(
    directory: Arc<MockDirectory>,
    inference: Arc<ScriptedInference>,
    analytics: Arc<MockAnalytics>,
) -> SessionServices {
    SessionServices {
        directory,
        classifier: classifier(inference),
        analytics: Some(analytics),
        knowledge: None,
    }
}
