//! # Folio Core
//!
//! Domain types, collaborator traits, and error definitions for the Folio
//! multimodal retrieval agent. This crate has **no I/O of its own**: it
//! defines the model that the storage, provider, tool and agent crates
//! implement against.
//!
//! ## Collaborators
//!
//! The agent core talks to three external systems, each behind a narrow trait:
//! - [`Retriever`]: similarity search over ingested pages
//! - [`Provider`]: the language model (chat + embeddings)
//! - [`SessionStore`]: the append-only conversation log
//!
//! Test doubles implement the same traits, so every orchestration path can be
//! exercised without a network.

pub mod error;
pub mod memory;
pub mod message;
pub mod provider;
pub mod retrieval;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use memory::SessionStore;
pub use message::{Message, MessageKind, NewMessage, Role, SessionId};
pub use provider::{
    ContentPart, PromptRole, PromptTurn, ProposedToolCall, Provider, ProviderRequest,
    ProviderResponse, ToolDefinition,
};
pub use retrieval::{Modality, RetrievalResult, Retriever, SearchQuery};
pub use tool::{
    ArgValue, Observation, ParamKind, ParameterSpec, Tool, ToolCall, ToolDeclaration,
    ToolRegistry,
};
