//! Tool selection: ask the model which tool, if any, serves the question.
//!
//! The model sees every registered declaration and the conversation so far.
//! It may propose at most one call per turn; whatever it proposes is checked
//! against the declared schema before anyone executes it.

use folio_core::error::ToolError;
use folio_core::message::Message;
use folio_core::provider::{PromptTurn, ProposedToolCall};
use folio_core::tool::{ToolCall, ToolRegistry};
use std::sync::Arc;
use tracing::{debug, info};

use crate::context::history;
use crate::model::ModelClient;

pub const SELECTOR_PROMPT: &str = "You're an AI assistant. Based on the given information, \
decide which tool to use. If the user is asking to explain an image, don't call any tools \
unless that would help you better explain the image. Here is the provided information:\n";

/// What the selector decides on.
#[derive(Debug, Clone, Copy)]
pub struct ConversationState<'a> {
    pub query: &'a str,
    pub history: &'a [Message],
}

impl<'a> ConversationState<'a> {
    pub fn new(query: &'a str, history: &'a [Message]) -> Self {
        Self { query, history }
    }
}

pub struct ToolSelector {
    model: ModelClient,
    registry: Arc<ToolRegistry>,
}

impl ToolSelector {
    pub fn new(model: ModelClient, registry: Arc<ToolRegistry>) -> Self {
        Self { model, registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Pick at most one validated tool call for `state`.
    pub async fn select(
        &self,
        state: &ConversationState<'_>,
    ) -> Result<Option<ToolCall>, folio_core::Error> {
        let mut turns = vec![PromptTurn::system(SELECTOR_PROMPT)];
        turns.extend(history::to_turns(state.history));
        turns.push(PromptTurn::user(state.query));

        let response = self
            .model
            .complete_at(turns, self.registry.definitions(), 0.0)
            .await?;

        let call = single_call(&self.registry, &response.tool_calls)?;
        match &call {
            Some(c) => info!(tool = %c.tool_name, "Selector chose a tool"),
            None => debug!("Selector chose no tool"),
        }
        Ok(call)
    }
}

/// Validate a round of proposed calls: none, or exactly one well-formed call.
pub fn single_call(
    registry: &ToolRegistry,
    proposed: &[ProposedToolCall],
) -> Result<Option<ToolCall>, ToolError> {
    match proposed {
        [] => Ok(None),
        [only] => registry.validate(only).map(Some),
        [first, ..] => Err(ToolError::invalid(
            &first.name,
            format!("expected at most one tool call per turn, got {}", proposed.len()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use folio_core::provider::PromptRole;
    use folio_core::retrieval::RetrievalResult;

    fn selector_with(
        responses: Vec<folio_core::provider::ProviderResponse>,
    ) -> (ToolSelector, Arc<SequentialMockProvider>) {
        let provider = Arc::new(SequentialMockProvider::new(responses));
        let registry = registry_with(Arc::new(StubRetriever::new(vec![RetrievalResult::image(
            "p3.png", 0.91,
        )])));
        let selector = ToolSelector::new(
            ModelClient::new(provider.clone(), "mock-model").with_temperature(0.7),
            registry,
        );
        (selector, provider)
    }

    #[tokio::test]
    async fn returns_validated_call() {
        let (selector, provider) = selector_with(vec![make_tool_call_response(
            vec![page_search_call("page 3 contents")],
            "",
        )]);
        let call = selector
            .select(&ConversationState::new("What is shown on page 3?", &[]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(call.tool_name, folio_tools::PAGE_SEARCH_TOOL);
        assert_eq!(call.str_arg(folio_tools::QUERY_PARAM), Some("page 3 contents"));

        let request = provider.last_request().unwrap();
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.tools.len(), 1);
        assert_eq!(request.turns[0].role, PromptRole::System);
        assert_eq!(request.turns.last().unwrap().text_content(), "What is shown on page 3?");
    }

    #[tokio::test]
    async fn no_call_is_none() {
        let (selector, _) = selector_with(vec![make_text_response("No tool needed.")]);
        let call = selector
            .select(&ConversationState::new("Explain this image", &[]))
            .await
            .unwrap();
        assert!(call.is_none());
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid() {
        let (selector, _) = selector_with(vec![make_tool_call_response(
            vec![make_tool_call("web_search", serde_json::json!({"q": "x"}))],
            "",
        )]);
        let err = selector
            .select(&ConversationState::new("q", &[]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            folio_core::Error::Tool(ToolError::InvalidToolCall { .. })
        ));
    }

    #[tokio::test]
    async fn schema_violation_is_invalid() {
        let (selector, _) = selector_with(vec![make_tool_call_response(
            vec![make_tool_call(
                folio_tools::PAGE_SEARCH_TOOL,
                serde_json::json!({"user_query": 42}),
            )],
            "",
        )]);
        let err = selector
            .select(&ConversationState::new("q", &[]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            folio_core::Error::Tool(ToolError::InvalidToolCall { .. })
        ));
    }

    #[test]
    fn more_than_one_call_is_rejected() {
        let registry = registry_with(Arc::new(StubRetriever::new(vec![])));
        let err = single_call(&registry, &[page_search_call("a"), page_search_call("b")])
            .unwrap_err();
        match err {
            ToolError::InvalidToolCall { reason, .. } => assert!(reason.contains("got 2")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
