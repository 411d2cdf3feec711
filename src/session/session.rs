use super::config::SessionConfig;
use super::participant::CallerCredentials;
use super::setup::{self, Greeting};
use super::shutdown::{CallReport, CloseLatch, ShutdownHandler};
use super::stats::{CallState, CallStats, CallTiming, CompletedCall};
use crate::backend::{AgentDirectory, AnalyticsSender};
use crate::classify::CallClassifier;
use crate::conversation::{build_transcript, ConversationItem, Role};
use crate::error::CallError;
use crate::knowledge::KnowledgeBase;
use crate::monitor::{InactivityMonitor, MonitorHandle, SilenceTracker};
use crate::pipeline::{
    AgentSpec, AudioOptions, CloseReason, SessionEvent, SessionReport, VoicePipeline,
};
use crate::tools::ToolBox;
use anyhow::{bail, Context, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Collaborators shared by every call
#[derive(Clone)]
pub struct SessionServices {
    pub directory: Arc<dyn AgentDirectory>,
    pub classifier: Arc<CallClassifier>,
    /// `None` when no analytics backend is configured
    pub analytics: Option<Arc<dyn AnalyticsSender>>,
    /// `None` when knowledge base search is unavailable
    pub knowledge: Option<Arc<KnowledgeBase>>,
}

/// A call session that coordinates the voice pipeline, inactivity monitor and
/// post-call analytics
pub struct CallSession {
    /// Session configuration
    config: SessionConfig,

    /// Room transport and voice pipeline
    pipeline: Arc<dyn VoicePipeline>,

    services: SessionServices,

    /// Guards against running the protocol twice
    started: AtomicBool,

    state: RwLock<CallState>,

    /// Set when the voice session starts, frozen at close
    timing: Mutex<Option<CallTiming>>,

    /// Time of the last user utterance, written by the conversation observer
    silence: SilenceTracker,

    /// Number of conversation items observed
    conversation_items: AtomicUsize,

    /// Handle for the inactivity monitor task
    monitor: Mutex<Option<MonitorHandle>>,

    /// Post-call processing, taken exactly once
    shutdown_handler: Mutex<Option<ShutdownHandler>>,

    close: CloseLatch,
}

impl CallSession {
    pub fn new(
        config: SessionConfig,
        pipeline: Arc<dyn VoicePipeline>,
        services: SessionServices,
    ) -> Self {
        info!("Creating call session: {}", config.call_id);

        Self {
            config,
            pipeline,
            services,
            started: AtomicBool::new(false),
            state: RwLock::new(CallState::Connecting),
            timing: Mutex::new(None),
            silence: SilenceTracker::new(),
            conversation_items: AtomicUsize::new(0),
            monitor: Mutex::new(None),
            shutdown_handler: Mutex::new(None),
            close: CloseLatch::new(),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.config.call_id
    }

    /// Run the call from room connection to post-call analytics.
    ///
    /// Only setup failures (room, participant attributes, agent configuration,
    /// session start) are returned as errors; everything after the session
    /// starts is absorbed and logged.
    pub async fn run(&self) -> Result<CallReport> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(CallError::AlreadyStarted(self.config.call_id.clone()).into());
        }

        match self.run_protocol().await {
            Ok(report) => {
                self.set_state(CallState::Ended).await;
                info!(
                    "Call session {} finished ({:.1}s, analytics sent: {})",
                    report.call_id, report.duration_secs, report.analytics_sent
                );
                Ok(report)
            }
            Err(e) => {
                error!("Call session {} failed: {:#}", self.config.call_id, e);
                self.set_state(CallState::Failed).await;
                Err(e)
            }
        }
    }

    async fn run_protocol(&self) -> Result<CallReport> {
        info!("Starting call session: {}", self.config.call_id);

        self.pipeline
            .connect()
            .await
            .context("Failed to connect to room")?;

        let (greeting, mut events, toolbox) = match self.start_session().await {
            Ok(started) => started,
            Err(e) => {
                self.leave_room().await;
                return Err(e);
            }
        };

        *self.timing.lock().await = Some(CallTiming::start());
        self.silence.record_activity();
        self.set_state(CallState::Active).await;
        info!("Voice session started on {}", self.pipeline.name());

        let monitor = InactivityMonitor::new(
            self.config.monitor.clone(),
            Arc::clone(&self.pipeline),
            self.silence.watch(),
        )
        .spawn();
        let _monitor_guard = monitor.cancel_on_drop();
        *self.monitor.lock().await = Some(monitor);

        let greeting = async {
            tokio::select! {
                biased;
                _ = self.close.closed() => {}
                _ = self.greet(&greeting) => {}
            }
        };
        let (_, close_reason) = tokio::join!(greeting, self.observe(&mut events, &toolbox));

        let call = self.on_close(&close_reason).await?;
        Ok(self.run_shutdown_handler(close_reason, call).await)
    }

    /// Intake and session start: participant, credentials, agent configuration,
    /// tools and the voice session itself
    async fn start_session(
        &self,
    ) -> Result<(Greeting, mpsc::Receiver<SessionEvent>, Arc<ToolBox>)> {
        let participant = self
            .pipeline
            .wait_for_participant()
            .await
            .context("Participant never joined")?;
        info!(
            "Participant joined: {} ({:?})",
            participant.identity, participant.kind
        );

        let credentials = CallerCredentials::from_attributes(&participant.attributes)?;
        let profile = setup::prepare_agent(self.services.directory.as_ref(), &credentials)
            .await
            .context("Failed to set up agent")?;

        self.register_shutdown_handler(ShutdownHandler::new(
            credentials.clone(),
            Arc::clone(&self.services.classifier),
            self.services.analytics.clone(),
        ))
        .await?;

        let mut toolbox = ToolBox::new(Arc::clone(&self.pipeline));
        if profile.knowledge_base {
            match &self.services.knowledge {
                Some(knowledge) => {
                    toolbox = toolbox.with_knowledge_base(Arc::clone(knowledge), credentials.clone());
                }
                None => warn!("Agent requests knowledge base search but none is configured"),
            }
        }
        let toolbox = Arc::new(toolbox);

        // Subscribe before starting so no early conversation item is missed
        let events = self
            .pipeline
            .subscribe_events()
            .await
            .context("Failed to subscribe to session events")?;

        let agent = AgentSpec {
            instructions: profile.instructions.clone(),
            voice: profile.voice.clone(),
            tools: toolbox.specs(),
        };
        self.pipeline
            .start(&agent, &AudioOptions::for_participant(&participant))
            .await
            .context("Failed to start voice session")?;

        Ok((profile.greeting, events, toolbox))
    }

    /// Best-effort room exit when setup fails after connecting
    async fn leave_room(&self) {
        info!("Leaving room {} after failed setup", self.config.call_id);
        if let Err(e) = self.pipeline.shutdown(false).await {
            warn!("Failed to leave room {}: {:#}", self.config.call_id, e);
        }
    }

    /// Speak the opening line, if the agent speaks first
    async fn greet(&self, greeting: &Greeting) {
        match greeting.instructions() {
            Some(instructions) => {
                info!("Greeting caller ({:?})", greeting);
                if let Err(e) = self.pipeline.generate_reply(instructions, true).await {
                    warn!("Greeting failed: {:#}", e);
                }
            }
            None => info!("Waiting for the caller to speak first"),
        }
    }

    /// Consume session events until the session closes
    async fn observe(
        &self,
        events: &mut mpsc::Receiver<SessionEvent>,
        toolbox: &Arc<ToolBox>,
    ) -> CloseReason {
        let reason = loop {
            match events.recv().await {
                Some(SessionEvent::ConversationItemAdded(item)) => {
                    self.on_conversation_item(&item);
                }
                Some(SessionEvent::ToolCall(invocation)) => {
                    info!("Assistant called tool '{}'", invocation.name);
                    let toolbox = Arc::clone(toolbox);
                    tokio::spawn(async move { toolbox.invoke(invocation).await });
                }
                Some(SessionEvent::Close(reason)) => break reason,
                None => {
                    warn!("Session event stream ended without a close event");
                    break CloseReason::TransportLost;
                }
            }
        };

        self.close.close(reason)
    }

    /// Conversation observer; never suspends
    fn on_conversation_item(&self, item: &ConversationItem) {
        if item.role == Role::User {
            self.silence.record_activity();
        }
        self.conversation_items.fetch_add(1, Ordering::SeqCst);
        info!("[Chat] {}: {}", item.role, item.text);
    }

    /// Freeze the call duration and stop the monitor
    async fn on_close(&self, reason: &CloseReason) -> Result<CompletedCall> {
        self.set_state(CallState::Closing).await;

        let call = self
            .timing
            .lock()
            .await
            .as_mut()
            .map(CallTiming::finish)
            .context("Call closed before the voice session started")?;
        info!(
            "Call {} {} after {:.1}s",
            self.config.call_id,
            reason,
            call.duration_seconds()
        );

        self.stop_monitor().await;
        Ok(call)
    }

    async fn stop_monitor(&self) {
        let monitor = self.monitor.lock().await;
        if let Some(monitor) = monitor.as_ref() {
            monitor.cancel();
            match monitor.wait().await {
                Ok(Some(outcome)) => info!("Inactivity monitor removed ({:?})", outcome),
                Ok(None) => {}
                Err(e) => warn!("Inactivity monitor did not stop cleanly: {:#}", e),
            }
        }
    }

    async fn register_shutdown_handler(&self, handler: ShutdownHandler) -> Result<()> {
        let mut slot = self.shutdown_handler.lock().await;
        if slot.is_some() {
            bail!(
                "Shutdown handler already registered for {}",
                self.config.call_id
            );
        }
        *slot = Some(handler);
        Ok(())
    }

    async fn run_shutdown_handler(&self, close_reason: CloseReason, call: CompletedCall) -> CallReport {
        let report = match self.pipeline.make_session_report().await {
            Ok(report) => report,
            Err(e) => {
                warn!("Session report unavailable: {:#}", e);
                SessionReport::default()
            }
        };

        let handler = self.shutdown_handler.lock().await.take();
        match handler {
            Some(handler) => {
                handler
                    .run(&self.config.call_id, close_reason, call, report)
                    .await
            }
            None => {
                warn!("No shutdown handler registered for {}", self.config.call_id);
                CallReport {
                    call_id: self.config.call_id.clone(),
                    close_reason,
                    duration_secs: call.duration_seconds(),
                    transcript: build_transcript(&report.chat_history),
                    classification: None,
                    analytics_sent: false,
                }
            }
        }
    }

    /// Explicit end-call request; drains the session. No-op once closed.
    pub async fn end_call(&self, reason: &str) -> Result<()> {
        if self.close.is_closed() {
            info!("Call {} already closed", self.config.call_id);
            return Ok(());
        }

        info!("Ending call {}: {}", self.config.call_id, reason);
        self.pipeline
            .shutdown(true)
            .await
            .context("Failed to request shutdown")
    }

    pub fn is_closed(&self) -> bool {
        self.close.is_closed()
    }

    /// Wait until the session has closed
    pub async fn closed(&self) -> CloseReason {
        self.close.closed().await
    }

    pub async fn state(&self) -> CallState {
        *self.state.read().await
    }

    async fn set_state(&self, state: CallState) {
        *self.state.write().await = state;
    }

    /// Get current call statistics
    pub async fn get_stats(&self) -> CallStats {
        let state = self.state().await;
        let timing = self.timing.lock().await;

        let silence_secs = (state == CallState::Active).then(|| {
            Instant::now()
                .saturating_duration_since(self.silence.last_activity())
                .as_secs_f64()
        });

        CallStats {
            call_id: self.config.call_id.clone(),
            state,
            started_at: timing.as_ref().map(CallTiming::started_at),
            duration_secs: timing.as_ref().map(|t| t.elapsed().as_secs_f64()),
            conversation_items: self.conversation_items.load(Ordering::SeqCst),
            silence_secs,
        }
    }
}
