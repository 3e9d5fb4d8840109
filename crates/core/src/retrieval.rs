//! Retriever trait: similarity search over ingested pages.
//!
//! Pages are ingested and embedded elsewhere; a retriever only answers
//! "which references are closest to this query". Results are ranked by
//! relevance, highest first, and never exceed the requested limit.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::RetrievalError;

/// What kind of content a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    #[default]
    Image,
    Text,
}

/// A single ranked match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Key of the matched item (image path, URL or index key)
    pub reference_key: String,

    /// Similarity score; higher is more relevant
    pub relevance_score: f32,

    #[serde(default)]
    pub modality: Modality,

    /// Source page, when the index recorded one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

impl RetrievalResult {
    pub fn image(reference_key: impl Into<String>, relevance_score: f32) -> Self {
        Self {
            reference_key: reference_key.into(),
            relevance_score,
            modality: Modality::Image,
            page_number: None,
        }
    }

    pub fn with_page(mut self, page_number: u32) -> Self {
        self.page_number = Some(page_number);
        self
    }
}

/// A search query: raw text to be embedded, or an already embedded vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchQuery {
    Text(String),
    Embedding(Vec<f32>),
}

impl SearchQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Reject queries that can never match anything.
    pub fn validate(&self) -> std::result::Result<(), RetrievalError> {
        match self {
            Self::Text(t) if t.trim().is_empty() => Err(RetrievalError::EmptyQuery),
            Self::Embedding(v) if v.is_empty() => Err(RetrievalError::EmptyQuery),
            _ => Ok(()),
        }
    }
}

/// Check a caller-supplied result limit.
pub fn validate_limit(limit: usize) -> std::result::Result<(), RetrievalError> {
    if limit == 0 {
        return Err(RetrievalError::InvalidLimit(limit));
    }
    Ok(())
}

/// The similarity-search collaborator.
///
/// Implementations must return at most `limit` results ordered by
/// `relevance_score` descending, breaking ties by insertion order. An empty
/// vector means "no matches" and is not an error.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// A short name for logs.
    fn name(&self) -> &str;

    async fn search(
        &self,
        query: &SearchQuery,
        limit: usize,
    ) -> std::result::Result<Vec<RetrievalResult>, RetrievalError>;
}
