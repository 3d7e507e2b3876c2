use crate::config::{ProviderConfig, RetrievalConfig};
use crate::error::DeskError;
use async_openai::config::OpenAIConfig;
use async_openai::types::CreateEmbeddingRequestArgs;
use async_openai::Client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Embeds text into fixed-dimension vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DeskError>;
}

/// Embedder backed by an OpenAI-compatible /embeddings endpoint.
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(provider: &ProviderConfig, retrieval: &RetrievalConfig, api_key: &str) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_base(&provider.api_base)
            .with_api_key(api_key);
        Self {
            client: Client::with_config(openai_config),
            model: retrieval.embedding_model.clone(),
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DeskError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(texts.to_vec())
            .build()
            .map_err(|e| DeskError::Provider(e.to_string()))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| DeskError::Provider(e.to_string()))?;

        if response.data.len() != texts.len() {
            return Err(DeskError::Provider(format!(
                "Embedding count mismatch: sent {}, got {}",
                texts.len(),
                response.data.len()
            )));
        }

        Ok(response.data.into_iter().map(|e| e.embedding).collect())
    }
}

/// One indexed passage with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    text: String,
    embedding: Vec<f32>,
}

/// On-disk index format.
#[derive(Serialize, Deserialize)]
struct IndexFile {
    entries: Vec<IndexEntry>,
}

/// In-process vector index over document passages: embed once at ingest,
/// rank by cosine similarity at query time.
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl VectorIndex {
    /// An index with no passages. Every search returns no results.
    pub fn empty(embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            entries: Vec::new(),
            embedder,
            top_k,
        }
    }

    /// Embed the given passages and build an index over them.
    pub async fn build(
        embedder: Arc<dyn Embedder>,
        top_k: usize,
        passages: Vec<String>,
    ) -> Result<Self, DeskError> {
        let embeddings = embedder.embed(&passages).await?;
        let entries = passages
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| IndexEntry { text, embedding })
            .collect::<Vec<_>>();
        info!(passages = entries.len(), "built document index");
        Ok(Self {
            entries,
            embedder,
            top_k,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the top-K most similar passages for the query, best first.
    /// An empty index yields an empty vector.
    pub async fn search(&self, query: &str) -> Result<Vec<String>, DeskError> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DeskError::Provider("Empty embedding response".into()))?;

        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|e| (cosine_similarity(&query_embedding, &e.embedding), e))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        debug!(query, results = scored.len().min(self.top_k), "index search");
        Ok(scored
            .into_iter()
            .take(self.top_k)
            .map(|(_, e)| e.text.clone())
            .collect())
    }

    /// Persist the index as JSON.
    pub fn save_to(&self, path: &Path) -> Result<(), DeskError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = IndexFile {
            entries: self.entries.clone(),
        };
        std::fs::write(path, serde_json::to_string(&file)?)?;
        Ok(())
    }

    /// Load a previously persisted index.
    pub fn load_from(
        path: &Path,
        embedder: Arc<dyn Embedder>,
        top_k: usize,
    ) -> Result<Self, DeskError> {
        let json = std::fs::read_to_string(path)?;
        let file: IndexFile = serde_json::from_str(&json)?;
        info!(passages = file.entries.len(), "loaded document index");
        Ok(Self {
            entries: file.entries,
            embedder,
            top_k,
        })
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
