//! Agent patterns: structured reasoning strategies.
//!
//! Single-pass answering lives in [`crate::generator`]; this module holds the
//! multi-step one.
//!
//! - **ReAct**: Thought → Action → Observation loop with an inspectable trace

pub mod react;

pub use react::{
    ReactController, ReactOutcome, ReactState, ReasoningExhausted, ReasoningStep, Termination,
};
