//! Session stores and the vector index retriever for Folio.
//!
//! Every store implements `folio_core::SessionStore`; [`VectorIndex`]
//! implements `folio_core::Retriever`.

mod locks;
pub mod in_memory;
pub mod file_backend;
pub mod vector;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemorySessionStore;
pub use file_backend::FileSessionStore;
pub use vector::{cosine_similarity, normalize, IndexRecord, VectorIndex};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSessionStore;
