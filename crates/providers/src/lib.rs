//! LLM Provider implementations for Folio.
//!
//! All providers implement the `folio_core::Provider` trait.
//! [`build_provider`] selects and configures one from `AppConfig`.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::build_provider;
