//! Shared test helpers for agent tests.

use async_trait::async_trait;
use folio_core::error::{ProviderError, RetrievalError};
use folio_core::provider::{
    EmbeddingRequest, EmbeddingResponse, ProposedToolCall, Provider, ProviderRequest,
    ProviderResponse, Usage,
};
use folio_core::retrieval::{RetrievalResult, Retriever, SearchQuery};
use folio_core::tool::ToolRegistry;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue.
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    call_count: Mutex<usize>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut count = self.call_count.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        if *count >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                *count,
                responses.len()
            );
        }

        self.requests.lock().unwrap().push(request);
        let response = responses[*count].clone();
        *count += 1;
        Ok(response)
    }
}

/// A provider that always proposes the same tool call.
pub struct AlwaysToolProvider {
    call: ProposedToolCall,
    calls: AtomicUsize,
}

impl AlwaysToolProvider {
    pub fn new(call: ProposedToolCall) -> Self {
        Self {
            call,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for AlwaysToolProvider {
    fn name(&self) -> &str {
        "always_tool"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(make_tool_call_response(vec![self.call.clone()], "I should look this up."))
    }
}

/// A provider that never answers.
pub struct HangingProvider;

#[async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }
}

/// A provider whose every call fails.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection reset".into()))
    }

    async fn embed(&self, _request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Err(ProviderError::Network("connection reset".into()))
    }
}

/// A retriever that returns fixed results and counts its calls.
pub struct StubRetriever {
    results: Vec<RetrievalResult>,
    failure: Option<RetrievalError>,
    calls: AtomicUsize,
    queries: Mutex<Vec<SearchQuery>>,
}

impl StubRetriever {
    pub fn new(results: Vec<RetrievalResult>) -> Self {
        Self {
            results,
            failure: None,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: RetrievalError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new(vec![])
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for StubRetriever {
    fn name(&self) -> &str {
        "stub"
    }

    async fn search(
        &self,
        query: &SearchQuery,
        limit: usize,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self.results.iter().take(limit).cloned().collect())
    }
}

/// The default registry around `retriever`.
pub fn registry_with(retriever: Arc<dyn Retriever>) -> Arc<ToolRegistry> {
    Arc::new(
        folio_tools::default_registry(retriever, 2, std::time::Duration::from_secs(30)).unwrap(),
    )
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        content: text.into(),
        tool_calls: vec![],
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional thought content.
pub fn make_tool_call_response(tool_calls: Vec<ProposedToolCall>, thought: &str) -> ProviderResponse {
    ProviderResponse {
        content: thought.into(),
        tool_calls,
        ..make_text_response("")
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> ProposedToolCall {
    ProposedToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: args,
    }
}

/// A well-formed call of the page search tool.
pub fn page_search_call(query: &str) -> ProposedToolCall {
    make_tool_call(
        folio_tools::PAGE_SEARCH_TOOL,
        serde_json::json!({ folio_tools::QUERY_PARAM: query }),
    )
}
