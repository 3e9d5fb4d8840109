//! Vector similarity search over embedded page records.
//!
//! [`VectorIndex`] is an in-process cosine-similarity index. Records are
//! loaded from a JSONL file written by the ingestion pipeline; text queries
//! are embedded through a [`Provider`] and normalized before scoring.

use async_trait::async_trait;
use folio_core::error::RetrievalError;
use folio_core::provider::{EmbeddingRequest, Provider};
use folio_core::retrieval::{validate_limit, Modality, RetrievalResult, Retriever, SearchQuery};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Scale a vector to unit length. Zero vectors are returned unchanged.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();
    if norm < 1e-10 {
        return v.to_vec();
    }
    v.iter().map(|x| (*x as f64 / norm) as f32).collect()
}

/// One embedded item in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Reference key (image path or URL)
    pub key: String,

    pub embedding: Vec<f32>,

    #[serde(default)]
    pub modality: Modality,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

/// Cosine-similarity index implementing [`Retriever`].
pub struct VectorIndex {
    records: Vec<IndexRecord>,
    embedder: Option<(Arc<dyn Provider>, String)>,
    min_score: f32,
}

impl VectorIndex {
    pub fn new(records: Vec<IndexRecord>) -> Self {
        Self {
            records,
            embedder: None,
            min_score: f32::NEG_INFINITY,
        }
    }

    /// Load records from a JSONL file, one record per line.
    ///
    /// Corrupted lines are skipped; an unreadable file means the backend
    /// is unavailable.
    pub async fn load(path: &Path) -> Result<Self, RetrievalError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            RetrievalError::Unavailable(format!("cannot read index {}: {e}", path.display()))
        })?;

        let records: Vec<IndexRecord> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<IndexRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted index record");
                    None
                }
            })
            .collect();

        info!(path = %path.display(), records = records.len(), "Vector index loaded");
        Ok(Self::new(records))
    }

    /// Embed text queries with `provider` using `model`.
    pub fn with_embedder(mut self, provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        self.embedder = Some((provider, model.into()));
        self
    }

    /// Drop matches scoring below `min_score`.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    async fn embed_query(&self, query: &SearchQuery) -> Result<Vec<f32>, RetrievalError> {
        let raw = match query {
            SearchQuery::Embedding(v) => v.clone(),
            SearchQuery::Text(text) => {
                let (provider, model) = self.embedder.as_ref().ok_or_else(|| {
                    RetrievalError::Unavailable("no embedder configured for text queries".into())
                })?;
                let response = provider
                    .embed(EmbeddingRequest {
                        model: model.clone(),
                        inputs: vec![text.clone()],
                    })
                    .await
                    .map_err(|e| RetrievalError::Unavailable(format!("embedding failed: {e}")))?;
                response.embeddings.into_iter().next().ok_or_else(|| {
                    RetrievalError::Unavailable("embedding response was empty".into())
                })?
            }
        };
        Ok(normalize(&raw))
    }

    /// Rank records against an embedded query.
    ///
    /// The sort is stable, so equal scores keep index order.
    fn rank(&self, query: &[f32], limit: usize) -> Vec<RetrievalResult> {
        let mut scored: Vec<RetrievalResult> = self
            .records
            .iter()
            .filter_map(|record| {
                if record.embedding.len() != query.len() {
                    debug!(key = %record.key, "Skipping record with mismatched dimension");
                    return None;
                }
                let score = cosine_similarity(&record.embedding, query);
                (score >= self.min_score).then(|| RetrievalResult {
                    reference_key: record.key.clone(),
                    relevance_score: score,
                    modality: record.modality,
                    page_number: record.page_number,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        scored.truncate(limit);
        scored
    }
}

#[async_trait]
impl Retriever for VectorIndex {
    fn name(&self) -> &str {
        "vector_index"
    }

    async fn search(
        &self,
        query: &SearchQuery,
        limit: usize,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        validate_limit(limit)?;
        query.validate()?;
        let embedding = self.embed_query(query).await?;
        let results = self.rank(&embedding, limit);
        debug!(limit, found = results.len(), "Vector search complete");
        Ok(results)
    }
}
