//! Deadline-bounded access to the language model.
//!
//! Every LLM call in the agent goes through [`ModelClient`], so every call
//! carries the same model settings and the same deadline.

use folio_core::error::ProviderError;
use folio_core::provider::{PromptTurn, Provider, ProviderRequest, ProviderResponse, ToolDefinition};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct ModelClient {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Send a request at the configured temperature.
    pub async fn complete(
        &self,
        turns: Vec<PromptTurn>,
        tools: Vec<ToolDefinition>,
    ) -> Result<ProviderResponse, ProviderError> {
        self.complete_at(turns, tools, self.temperature).await
    }

    /// Send a request at an explicit temperature.
    pub async fn complete_at(
        &self,
        turns: Vec<PromptTurn>,
        tools: Vec<ToolDefinition>,
        temperature: f32,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            turns,
            temperature,
            max_tokens: self.max_tokens,
            tools,
        };

        debug!(
            provider = self.provider.name(),
            model = %self.model,
            turns = request.turns.len(),
            "Calling model"
        );

        match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    provider = self.provider.name(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Model call timed out"
                );
                Err(ProviderError::Timeout(format!(
                    "{} did not answer within {:.1}s",
                    self.provider.name(),
                    self.timeout.as_secs_f64()
                )))
            }
        }
    }
}
