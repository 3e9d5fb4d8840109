//! The agent facade: the two public entry points over one session store.
//!
//! - [`Agent::answer`]: single-pass retrieval and grounded generation.
//! - [`Agent::answer_with_images`]: the same, with page images attached by
//!   the user.
//! - [`Agent::reason`]: the multi-step ReAct loop.
//!
//! Both read the session history first and append the run's turns in one
//! batch once the run is over. A run that errors out writes nothing.

use folio_config::AppConfig;
use folio_core::error::RetrievalError;
use folio_core::memory::SessionStore;
use folio_core::message::{Message, NewMessage, SessionId};
use folio_core::provider::Provider;
use folio_core::tool::ToolRegistry;
use std::sync::Arc;
use tracing::{info, warn};

use crate::context::ContextAssembler;
use crate::generator::AnswerGenerator;
use crate::model::ModelClient;
use crate::patterns::react::{ReactController, ReactOutcome, ReasoningStep};
use crate::selector::ToolSelector;

pub struct Agent {
    generator: AnswerGenerator,
    controller: ReactController,
    store: Arc<dyn SessionStore>,
    /// Also persist tool calls and results of successful ReAct runs.
    persist_trace: bool,
}

impl Agent {
    pub fn new(
        model: ModelClient,
        registry: Arc<ToolRegistry>,
        retrieval_tool: impl Into<String>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let selector = ToolSelector::new(model.clone(), registry.clone());
        Self {
            generator: AnswerGenerator::new(selector, model.clone()),
            controller: ReactController::new(model, registry, retrieval_tool),
            store,
            persist_trace: false,
        }
    }

    /// Build an agent with every knob taken from `config`.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        registry: Arc<ToolRegistry>,
        retrieval_tool: impl Into<String>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let model = ModelClient::new(provider, &config.model)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_timeout(config.generation_timeout());

        let mut assembler = ContextAssembler::new();
        if let Some(max) = config.agent.max_references {
            assembler = assembler.with_max_references(max);
        }

        let mut agent = Self::new(model, registry, retrieval_tool, store)
            .with_max_steps(config.agent.max_steps)
            .with_persist_trace(config.agent.persist_trace);
        agent.generator = agent.generator.with_assembler(assembler);
        agent
    }

    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.controller = self.controller.with_max_steps(max);
        self
    }

    pub fn with_persist_trace(mut self, enabled: bool) -> Self {
        self.persist_trace = enabled;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Messages of `session_id`, oldest first.
    pub async fn history(&self, session_id: &SessionId) -> Result<Vec<Message>, folio_core::Error> {
        Ok(self.store.history(session_id).await?)
    }

    /// Answer `query` in one pass and record the exchange.
    pub async fn answer(&self, query: &str, session_id: &SessionId) -> Result<String, folio_core::Error> {
        self.answer_with_images(query, &[], session_id).await
    }

    /// Answer `query` with `images` attached to the question.
    ///
    /// The attachments are recorded as image references between the query
    /// and the answer. Blank keys are ignored.
    pub async fn answer_with_images(
        &self,
        query: &str,
        images: &[String],
        session_id: &SessionId,
    ) -> Result<String, folio_core::Error> {
        let query = checked_query(query)?;
        let images: Vec<String> = images
            .iter()
            .map(|key| key.trim())
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect();
        let history = self.store.history(session_id).await?;
        info!(
            session = %session_id,
            history = history.len(),
            attachments = images.len(),
            "Answering"
        );

        let generated = self
            .generator
            .generate_with_images(query, &images, &history)
            .await?;

        let mut messages = Vec::with_capacity(images.len() + 2);
        messages.push(NewMessage::user_text(query));
        messages.extend(images.iter().map(NewMessage::image_reference));
        messages.push(NewMessage::agent_text(&generated.text));
        self.store.append_all(session_id, messages).await?;
        Ok(generated.text)
    }

    /// Reason about `query` with the ReAct loop and record the run.
    ///
    /// A FAILED run is still a successful call: the outcome carries the
    /// partial trace, and what was learned is persisted.
    pub async fn reason(
        &self,
        query: &str,
        session_id: &SessionId,
    ) -> Result<ReactOutcome, folio_core::Error> {
        let query = checked_query(query)?;
        let history = self.store.history(session_id).await?;
        info!(session = %session_id, history = history.len(), "Reasoning");

        let outcome = self.controller.run(query, &history).await?;

        let mut messages = vec![NewMessage::user_text(query)];
        match &outcome {
            ReactOutcome::Done { answer, trace, .. } => {
                if self.persist_trace {
                    messages.extend(trace_messages(trace)?);
                }
                messages.push(NewMessage::agent_text(answer));
            }
            ReactOutcome::Failed(exhausted) => {
                warn!(session = %session_id, max_steps = exhausted.max_steps, "Reasoning exhausted");
                messages.extend(trace_messages(&exhausted.trace)?);
                messages.push(NewMessage::agent_text(outcome.reply()));
            }
        }
        self.store.append_all(session_id, messages).await?;
        Ok(outcome)
    }
}

fn checked_query(query: &str) -> Result<&str, folio_core::Error> {
    let query = query.trim();
    if query.is_empty() {
        return Err(RetrievalError::EmptyQuery.into());
    }
    Ok(query)
}

/// Call/result message pairs for every step that executed a tool.
fn trace_messages(trace: &[ReasoningStep]) -> Result<Vec<NewMessage>, folio_core::Error> {
    let mut messages = Vec::new();
    for step in trace {
        let Some(call) = &step.action else { continue };
        messages.push(NewMessage::tool_call(serde_json::to_string(call)?));
        if let Some(observation) = &step.observation {
            messages.push(NewMessage::tool_result(observation.render()));
        }
    }
    Ok(messages)
}
