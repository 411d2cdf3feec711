//! Knowledge base search backing the `kb_search` tool

use crate::backend::{ChunkIndex, KnowledgeChunk};
use crate::inference::Embedder;
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Embeds caller questions and looks them up in the agent's documents
pub struct KnowledgeBase {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn ChunkIndex>,
    limit: usize,
}

impl KnowledgeBase {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn ChunkIndex>, limit: usize) -> Self {
        Self {
            embedder,
            index,
            limit,
        }
    }

    pub async fn search(
        &self,
        access_token: &str,
        agent_id: u64,
        query: &str,
    ) -> Result<Vec<KnowledgeChunk>> {
        let preview: String = query.chars().take(50).collect();
        info!("Knowledge base search: query='{}...' agent_id={}", preview, agent_id);

        if query.trim().is_empty() {
            bail!("Query cannot be empty");
        }
        if agent_id == 0 {
            bail!("Invalid agent_id");
        }

        let embedding = self
            .embedder
            .embed(query)
            .await
            .context("Embedding service failed")?;
        debug!("Generated embedding ({} dimensions)", embedding.len());

        let chunks = self
            .index
            .vector_search(access_token, &embedding, agent_id, self.limit)
            .await?;

        info!("Search returned {} results", chunks.len());
        Ok(chunks)
    }
}

/// Render search hits as the text the assistant reads back
pub fn format_results(chunks: &[KnowledgeChunk]) -> String {
    let sources = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "Source {} (Score: {:.2}):\n{}",
                i + 1,
                chunk.similarity_score,
                chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("Here's what I found:\n\n{}", sources)
}
