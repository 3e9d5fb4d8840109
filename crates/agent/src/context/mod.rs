//! Prompt context: retrieved evidence and replayed session history.
//!
//! | Source | Module | Rendered as |
//! |--------|--------|-------------|
//! | Retrieval results | [`assembler`] | grounding instruction + question + page images |
//! | Session log | [`history`] | one turn per stored message |

pub mod assembler;
pub mod history;

pub use assembler::{
    ContextAssembler, ContextPayload, Evidence, GROUNDING_INSTRUCTION, NO_EVIDENCE_NOTICE,
};
