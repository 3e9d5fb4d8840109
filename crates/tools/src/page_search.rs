//! Page search tool: vector retrieval over ingested PDF pages.
//!
//! The model calls this with a reformulated question; the tool returns the
//! best-matching page images as an [`Observation::Results`].

use async_trait::async_trait;
use folio_core::error::{RetrievalError, ToolError};
use folio_core::retrieval::{Retriever, SearchQuery};
use folio_core::tool::{Observation, ParamKind, ParameterSpec, Tool, ToolCall, ToolDeclaration};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Registered name of the page search tool.
pub const PAGE_SEARCH_TOOL: &str = "get_information_for_question_answering";

/// The single parameter the tool takes.
pub const QUERY_PARAM: &str = "user_query";

pub struct PageSearchTool {
    declaration: ToolDeclaration,
    retriever: Arc<dyn Retriever>,
    limit: usize,
    timeout: Option<Duration>,
}

impl PageSearchTool {
    pub fn new(retriever: Arc<dyn Retriever>, limit: usize) -> Self {
        let declaration = ToolDeclaration::new(
            PAGE_SEARCH_TOOL,
            "Retrieve information using vector search to answer a user query.",
        )
        .param(ParameterSpec::required(
            QUERY_PARAM,
            ParamKind::String,
            "The user's query text.",
        ));

        Self {
            declaration,
            retriever,
            limit,
            timeout: None,
        }
    }

    /// Give up on the backend after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Tool for PageSearchTool {
    fn declaration(&self) -> &ToolDeclaration {
        &self.declaration
    }

    async fn execute(&self, call: &ToolCall) -> Result<Observation, ToolError> {
        let text = call
            .str_arg(QUERY_PARAM)
            .ok_or_else(|| ToolError::invalid(PAGE_SEARCH_TOOL, format!("missing '{QUERY_PARAM}'")))?;
        let query = SearchQuery::text(text);

        let search = self.retriever.search(&query, self.limit);
        let results = match self.timeout {
            Some(deadline) => match tokio::time::timeout(deadline, search).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        retriever = self.retriever.name(),
                        timeout_secs = deadline.as_secs_f64(),
                        "Retrieval timed out"
                    );
                    Err(RetrievalError::Unavailable(format!(
                        "retrieval timed out after {:.1}s",
                        deadline.as_secs_f64()
                    )))
                }
            },
            None => search.await,
        }?;

        debug!(query = text, found = results.len(), "Page search complete");
        Ok(Observation::Results(results))
    }
}
