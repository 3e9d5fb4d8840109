//! The agent core: grounded answering over retrieved pages.
//!
//! Two ways to answer a question:
//!
//! 1. **Answer**: select a tool → retrieve pages → assemble evidence →
//!    generate one grounded answer
//! 2. **Reason**: a ReAct loop (Thought → Action → Observation) that may
//!    search several times before answering, bounded by a step budget
//!
//! Both read the session history before the run and append to it after.

pub mod agent;
pub mod context;
pub mod generator;
pub mod model;
pub mod patterns;
pub mod selector;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use agent::Agent;
pub use context::{ContextAssembler, ContextPayload, Evidence};
pub use generator::{AnswerGenerator, GeneratedAnswer};
pub use model::ModelClient;
pub use patterns::{
    ReactController, ReactOutcome, ReactState, ReasoningExhausted, ReasoningStep, Termination,
};
pub use selector::{ConversationState, ToolSelector};
