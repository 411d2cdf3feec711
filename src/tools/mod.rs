//! Function tools exposed to the assistant
//!
//! - `end_call`: the caller asked to hang up, drain the session
//! - `kb_search`: answer from the agent's knowledge base (opt-in per agent)

use crate::knowledge::{format_results, KnowledgeBase};
use crate::pipeline::{ToolInvocation, ToolSpec, VoicePipeline};
use crate::session::CallerCredentials;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const END_CALL: &str = "end_call";
pub const KB_SEARCH: &str = "kb_search";

/// Tools available to one call
pub struct ToolBox {
    pipeline: Arc<dyn VoicePipeline>,
    knowledge: Option<(Arc<KnowledgeBase>, CallerCredentials)>,
}

impl ToolBox {
    pub fn new(pipeline: Arc<dyn VoicePipeline>) -> Self {
        Self {
            pipeline,
            knowledge: None,
        }
    }

    /// Enable `kb_search` for this caller
    pub fn with_knowledge_base(
        mut self,
        knowledge: Arc<KnowledgeBase>,
        credentials: CallerCredentials,
    ) -> Self {
        self.knowledge = Some((knowledge, credentials));
        self
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs = vec![ToolSpec {
            name: END_CALL.to_string(),
            description: "End the current call. Always speak a farewell message to the user \
                          before calling this function."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "reason": { "type": "string", "description": "The reason for ending the call" },
                },
                "required": ["reason"],
            }),
        }];

        if self.knowledge.is_some() {
            specs.push(ToolSpec {
                name: KB_SEARCH.to_string(),
                description: "When user says knowledge base.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "A detailed and specific search query that captures \
                                            the full context of what the user is asking about.",
                        },
                    },
                    "required": ["query"],
                }),
            });
        }

        specs
    }

    /// Run a tool call and answer it. Never fails; errors become tool output.
    pub async fn invoke(&self, invocation: ToolInvocation) {
        let ToolInvocation {
            name,
            arguments,
            responder,
        } = invocation;

        let output = match name.as_str() {
            END_CALL => self.end_call(&arguments).await,
            KB_SEARCH if self.knowledge.is_some() => self.kb_search(&arguments).await,
            other => {
                warn!("Assistant called unknown tool '{}'", other);
                json!({ "error": format!("unknown tool '{}'", other) })
            }
        };

        if responder.send(output).is_err() {
            warn!("Tool '{}' finished after the caller stopped waiting", name);
        }
    }

    async fn end_call(&self, arguments: &Value) -> Value {
        let reason = arguments
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("caller ended the call")
            .to_string();

        info!("Assistant ending call: {}", reason);

        if let Err(e) = self.pipeline.shutdown(true).await {
            error!("Failed to request shutdown: {:#}", e);
        }

        json!({ "status": "call_ended", "reason": reason })
    }

    async fn kb_search(&self, arguments: &Value) -> Value {
        let Some((knowledge, credentials)) = &self.knowledge else {
            return json!({ "error": "knowledge base disabled" });
        };

        info!("kb is called");

        let query = arguments.get("query").and_then(Value::as_str).unwrap_or("");
        if query.is_empty() {
            return json!({ "result": "Please provide a specific question or topic." });
        }

        let result = match knowledge
            .search(&credentials.access_token, credentials.agent_id, query)
            .await
        {
            Ok(chunks) if chunks.is_empty() => {
                "I couldn't find specific information about that topic.".to_string()
            }
            Ok(chunks) => format_results(&chunks),
            Err(e) => {
                error!("RAG search failed: {:#}", e);
                "Sorry, I encountered an error searching the knowledge base.".to_string()
            }
        };

        json!({ "result": result })
    }
}
