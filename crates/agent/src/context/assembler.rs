//! Evidence assembly for grounded answers.
//!
//! Turns a question plus ranked retrieval results into the prompt the
//! answer model sees. The payload always says whether it carries evidence:
//! an empty result set becomes [`Evidence::None`], never a missing field.
//!
//! # Rendered layout
//!
//! | Turn | Content |
//! |------|---------|
//! | system | grounding instruction |
//! | user | question, attached images, then one image part per result (relevance order) |
//! | user | no-evidence notice, only when there is no evidence |

use folio_core::provider::PromptTurn;
use folio_core::retrieval::RetrievalResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Instruction that keeps the answer model on the supplied pages.
pub const GROUNDING_INSTRUCTION: &str = "Answer the questions based on the provided context only. \
If the context is not sufficient, say I DON'T KNOW. \
DO NOT use any other information to answer the question.";

/// Sent in place of page images when retrieval found nothing.
pub const NO_EVIDENCE_NOTICE: &str = "No supporting evidence was retrieved for this question.";

/// What the answer is allowed to rest on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "results", rename_all = "snake_case")]
pub enum Evidence {
    /// Retrieved pages, most relevant first.
    Supported(Vec<RetrievalResult>),
    /// Nothing was retrieved.
    None,
}

/// The assembled, model-ready context for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPayload {
    pub question: String,
    pub evidence: Evidence,
    /// Results cut by the reference cap.
    pub dropped: usize,
    /// Images the user sent with the question.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

impl ContextPayload {
    /// Whether any evidence made it into the payload.
    pub fn is_grounded(&self) -> bool {
        matches!(self.evidence, Evidence::Supported(_))
    }

    /// Send `images` along with the question, ahead of any evidence.
    pub fn with_attachments(mut self, images: Vec<String>) -> Self {
        self.attachments = images;
        self
    }

    /// Reference keys in the order the model will see them.
    pub fn references(&self) -> Vec<&str> {
        match &self.evidence {
            Evidence::Supported(results) => {
                results.iter().map(|r| r.reference_key.as_str()).collect()
            }
            Evidence::None => Vec::new(),
        }
    }

    /// Render into prompt turns.
    pub fn to_turns(&self) -> Vec<PromptTurn> {
        let question = self
            .attachments
            .iter()
            .fold(PromptTurn::user(&self.question), |turn, key| turn.with_image(key));

        let mut turns = vec![PromptTurn::system(GROUNDING_INSTRUCTION)];
        match &self.evidence {
            Evidence::Supported(results) => {
                turns.push(
                    results
                        .iter()
                        .fold(question, |turn, r| turn.with_image(&r.reference_key)),
                );
            }
            Evidence::None => {
                turns.push(question);
                turns.push(PromptTurn::user(NO_EVIDENCE_NOTICE));
            }
        }
        turns
    }
}

/// Builds [`ContextPayload`]s.
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    max_references: Option<usize>,
}

impl ContextAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max` references; lower-ranked ones are dropped.
    pub fn with_max_references(mut self, max: usize) -> Self {
        self.max_references = Some(max);
        self
    }

    /// Assemble `results` for `question`. Input order is kept as given.
    pub fn assemble(&self, question: &str, results: &[RetrievalResult]) -> ContextPayload {
        let keep = self
            .max_references
            .map_or(results.len(), |max| max.min(results.len()));
        let dropped = results.len() - keep;

        let evidence = if keep == 0 {
            Evidence::None
        } else {
            Evidence::Supported(results[..keep].to_vec())
        };

        debug!(
            references = keep,
            dropped,
            grounded = keep > 0,
            "Context assembled"
        );

        ContextPayload {
            question: question.to_string(),
            evidence,
            dropped,
            attachments: Vec::new(),
        }
    }
}
