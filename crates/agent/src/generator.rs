//! Single-pass grounded answering.
//!
//! 1. Ask the [`ToolSelector`] for an optional tool call.
//! 2. If there is one, execute it and assemble the retrieved pages.
//! 3. Answer from the (possibly empty) evidence, any images the user
//!    attached, and the session history.
//!
//! No retries: any failure is returned to the caller as is.

use folio_core::error::{ProviderError, ToolError};
use folio_core::message::Message;
use folio_core::tool::ToolCall;
use tracing::{debug, info};

use crate::context::{ContextAssembler, ContextPayload, history};
use crate::model::ModelClient;
use crate::selector::{ConversationState, ToolSelector};

/// The outcome of one answer pass.
#[derive(Debug, Clone)]
pub struct GeneratedAnswer {
    pub text: String,
    /// The tool call that was executed, if any.
    pub tool_call: Option<ToolCall>,
    /// The evidence the answer was conditioned on.
    pub context: ContextPayload,
}

pub struct AnswerGenerator {
    selector: ToolSelector,
    model: ModelClient,
    assembler: ContextAssembler,
}

impl AnswerGenerator {
    pub fn new(selector: ToolSelector, model: ModelClient) -> Self {
        Self {
            selector,
            model,
            assembler: ContextAssembler::new(),
        }
    }

    pub fn with_assembler(mut self, assembler: ContextAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Answer `query` given the prior turns of the session.
    pub async fn generate(
        &self,
        query: &str,
        session_history: &[Message],
    ) -> Result<GeneratedAnswer, folio_core::Error> {
        self.generate_with_images(query, &[], session_history).await
    }

    /// Like [`generate`](Self::generate), with user-supplied page images sent
    /// alongside the question. Tool selection sees only the text.
    pub async fn generate_with_images(
        &self,
        query: &str,
        images: &[String],
        session_history: &[Message],
    ) -> Result<GeneratedAnswer, folio_core::Error> {
        let state = ConversationState::new(query, session_history);
        let tool_call = self.selector.select(&state).await?;

        let results = match &tool_call {
            Some(call) => {
                let observation = self
                    .selector
                    .registry()
                    .execute(call)
                    .await
                    .map_err(|e| match e {
                        ToolError::Retrieval(inner) => folio_core::Error::Retrieval(inner),
                        other => folio_core::Error::Tool(other),
                    })?;
                debug!(tool = %call.tool_name, found = observation.results().len(), "Tool executed");
                observation.results().to_vec()
            }
            None => Vec::new(),
        };

        let context = self
            .assembler
            .assemble(query, &results)
            .with_attachments(images.to_vec());

        // Grounding instruction first, then the session so far, then the question.
        let mut turns = context.to_turns();
        turns.splice(1..1, history::to_turns(session_history));

        let response = self.model.complete(turns, vec![]).await?;
        let text = response.content.trim().to_string();
        if text.is_empty() {
            return Err(ProviderError::InvalidResponse("model returned an empty answer".into()).into());
        }

        info!(
            grounded = context.is_grounded(),
            references = context.references().len(),
            attachments = images.len(),
            "Answer generated"
        );

        Ok(GeneratedAnswer {
            text,
            tool_call,
            context,
        })
    }
}
