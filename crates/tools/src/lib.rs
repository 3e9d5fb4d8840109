//! Built-in tool implementations for Folio.
//!
//! The agent has one capability out of the box: searching the ingested
//! pages for material that answers the user's question.

pub mod page_search;

use std::sync::Arc;
use std::time::Duration;
use folio_core::error::ToolError;
use folio_core::retrieval::Retriever;
use folio_core::tool::ToolRegistry;

pub use page_search::{PageSearchTool, PAGE_SEARCH_TOOL, QUERY_PARAM};

/// Create the default tool registry around a retriever.
///
/// The registry is complete when this returns; share it as
/// `Arc<ToolRegistry>` from here on.
pub fn default_registry(
    retriever: Arc<dyn Retriever>,
    limit: usize,
    timeout: Duration,
) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(PageSearchTool::new(retriever, limit).with_timeout(timeout)))?;
    Ok(registry)
}
