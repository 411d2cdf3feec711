// Assistant tools: end_call and knowledge base search

mod common;

use anyhow::{bail, Result};
use common::MockPipeline;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use voice_call_agent::backend::{ChunkIndex, KnowledgeChunk};
use voice_call_agent::inference::Embedder;
use voice_call_agent::knowledge::KnowledgeBase;
use voice_call_agent::pipeline::ToolInvocation;
use voice_call_agent::session::CallerCredentials;
use voice_call_agent::tools::{ToolBox, END_CALL, KB_SEARCH};

struct FixedEmbedder;

#[async_trait::async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.1, 0.2, 0.3])
    }
}

#[derive(Default)]
struct MockIndex {
    chunks: Vec<KnowledgeChunk>,
    fail: bool,
    searches: Mutex<Vec<(String, u64, usize)>>,
}

#[async_trait::async_trait]
impl ChunkIndex for MockIndex {
    async fn vector_search(
        &self,
        access_token: &str,
        query_embedding: &[f32],
        agent_id: u64,
        limit: usize,
    ) -> Result<Vec<KnowledgeChunk>> {
        assert_eq!(query_embedding.len(), 3);
        self.searches
            .lock()
            .unwrap()
            .push((access_token.to_string(), agent_id, limit));
        if self.fail {
            bail!("vector search unavailable");
        }
        Ok(self.chunks.clone())
    }
}

fn credentials() -> CallerCredentials {
    CallerCredentials {
        access_token: "token-123".to_string(),
        agent_id: 42,
    }
}

fn toolbox_with_index(pipeline: Arc<MockPipeline>, index: Arc<MockIndex>) -> ToolBox {
    let knowledge = Arc::new(KnowledgeBase::new(Arc::new(FixedEmbedder), index, 3));
    ToolBox::new(pipeline).with_knowledge_base(knowledge, credentials())
}

async fn call(toolbox: &ToolBox, name: &str, arguments: Value) -> Result<Value> {
    let (responder, response) = oneshot::channel();
    toolbox
        .invoke(ToolInvocation {
            name: name.to_string(),
            arguments,
            responder,
        })
        .await;
    Ok(response.await?)
}

#[tokio::test]
async fn test_end_call_requests_shutdown() -> Result<()> {
    let pipeline = Arc::new(MockPipeline::new());
    let toolbox = ToolBox::new(pipeline.clone());

    let output = call(&toolbox, END_CALL, json!({ "reason": "caller hung up" })).await?;

    assert_eq!(output, json!({ "status": "call_ended", "reason": "caller hung up" }));
    assert_eq!(pipeline.shutdown_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_kb_search_only_when_enabled() -> Result<()> {
    let pipeline = Arc::new(MockPipeline::new());
    let plain = ToolBox::new(pipeline.clone());

    let names: Vec<_> = plain.specs().into_iter().map(|spec| spec.name).collect();
    assert_eq!(names, vec![END_CALL.to_string()]);

    let output = call(&plain, KB_SEARCH, json!({ "query": "hours" })).await?;
    assert!(output.get("error").is_some());

    let enabled = toolbox_with_index(pipeline, Arc::new(MockIndex::default()));
    let names: Vec<_> = enabled.specs().into_iter().map(|spec| spec.name).collect();
    assert_eq!(names, vec![END_CALL.to_string(), KB_SEARCH.to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_kb_search_formats_results() -> Result<()> {
    let index = Arc::new(MockIndex {
        chunks: vec![KnowledgeChunk {
            content: "We open at 9am on weekdays.".to_string(),
            similarity_score: 0.87,
        }],
        ..MockIndex::default()
    });
    let toolbox = toolbox_with_index(Arc::new(MockPipeline::new()), index.clone());

    let output = call(&toolbox, KB_SEARCH, json!({ "query": "opening hours" })).await?;

    assert_eq!(
        output["result"],
        "Here's what I found:\n\nSource 1 (Score: 0.87):\nWe open at 9am on weekdays."
    );
    assert_eq!(
        *index.searches.lock().unwrap(),
        vec![("token-123".to_string(), 42, 3)]
    );
    Ok(())
}

#[tokio::test]
async fn test_kb_search_fallback_sentences() -> Result<()> {
    let empty = toolbox_with_index(Arc::new(MockPipeline::new()), Arc::new(MockIndex::default()));

    let output = call(&empty, KB_SEARCH, json!({ "query": "" })).await?;
    assert_eq!(output["result"], "Please provide a specific question or topic.");

    let output = call(&empty, KB_SEARCH, json!({ "query": "parking" })).await?;
    assert_eq!(
        output["result"],
        "I couldn't find specific information about that topic."
    );

    let failing = toolbox_with_index(
        Arc::new(MockPipeline::new()),
        Arc::new(MockIndex {
            fail: true,
            ..MockIndex::default()
        }),
    );
    let output = call(&failing, KB_SEARCH, json!({ "query": "parking" })).await?;
    assert_eq!(
        output["result"],
        "Sorry, I encountered an error searching the knowledge base."
    );
    Ok(())
}

#[tokio::test]
async fn test_unknown_tool() -> Result<()> {
    let toolbox = ToolBox::new(Arc::new(MockPipeline::new()));

    let output = call(&toolbox, "transfer_call", json!({})).await?;
    assert_eq!(output, json!({ "error": "unknown tool 'transfer_call'" }));
    Ok(())
}
