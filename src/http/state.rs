use crate::monitor::MonitorConfig;
use crate::pipeline::PipelineConnector;
use crate::session::{CallSession, SessionConfig, SessionServices};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Builds call sessions on top of a pipeline connector
pub struct CallLauncher {
    connector: Arc<dyn PipelineConnector>,
    services: SessionServices,
    monitor: MonitorConfig,
}

impl CallLauncher {
    pub fn new(
        connector: Arc<dyn PipelineConnector>,
        services: SessionServices,
        monitor: MonitorConfig,
    ) -> Self {
        Self {
            connector,
            services,
            monitor,
        }
    }

    pub async fn create_session(&self, call_id: &str) -> Result<Arc<CallSession>> {
        let pipeline = self.connector.open(call_id).await?;
        let config = SessionConfig {
            call_id: call_id.to_string(),
            monitor: self.monitor.clone(),
        };

        Ok(Arc::new(CallSession::new(
            config,
            pipeline,
            self.services.clone(),
        )))
    }
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active call sessions (call_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<CallSession>>>>,

    pub launcher: Arc<CallLauncher>,
}

impl AppState {
    pub fn new(launcher: CallLauncher) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            launcher: Arc::new(launcher),
        }
    }
}
