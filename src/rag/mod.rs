//! RAG (Retrieval-Augmented Generation) module.
//!
//! This module provides:
//! - `Chunker`: splits documents into overlapping windows
//! - `VectorStore` / `SqliteVectorStore`: persistent, collection-keyed chunk storage
//! - `VectorIndex`: builds a collection from documents and answers similarity queries
//! - `ContextBuilder`: renders retrieval hits into a cited context string

mod chunker;
mod context_builder;
mod index;
mod sqlite;
mod store;

pub use chunker::{Chunker, TextChunk};
pub use context_builder::{ContextBuilder, RetrievalResult, NO_CONTEXT};
pub use index::{IndexStats, VectorIndex};
pub use sqlite::SqliteVectorStore;
pub use store::{ChunkSearchResult, Collection, StoredChunk, VectorStore};
