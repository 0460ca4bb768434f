//! VectorStore trait and the named `Collection` handle over it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;

/// A stored chunk with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Unique chunk identifier.
    pub chunk_id: String,
    /// The text content of the chunk.
    pub content: String,
    /// Source identifier (file path).
    pub source: String,
    /// Optional metadata (JSON).
    pub metadata: Option<serde_json::Value>,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: StoredChunk,
    /// Similarity score (higher = better).
    pub score: f32,
}

/// Persistent storage of embedded chunks, partitioned into named collections.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if missing. A collection remembers the embedder
    /// that filled it; opening it with a different one is a configuration error.
    async fn ensure_collection(&self, name: &str, embedder_id: &str) -> Result<(), RagError>;

    /// Insert multiple chunks atomically. Existing chunk ids are replaced.
    async fn insert_batch(
        &self,
        collection: &str,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), RagError>;

    /// Search for chunks similar to the query embedding.
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, RagError>;

    /// Number of chunks in the collection.
    async fn count(&self, collection: &str) -> Result<usize, RagError>;
}

/// Handle to one named collection.
#[derive(Clone)]
pub struct Collection {
    name: String,
    store: Arc<dyn VectorStore>,
}

impl Collection {
    pub async fn get_or_create(
        store: Arc<dyn VectorStore>,
        name: &str,
        embedder_id: &str,
    ) -> Result<Self, RagError> {
        store.ensure_collection(name, embedder_id).await?;
        Ok(Self {
            name: name.to_string(),
            store,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn count(&self) -> Result<usize, RagError> {
        self.store.count(&self.name).await
    }

    pub async fn add(&self, items: Vec<(StoredChunk, Vec<f32>)>) -> Result<(), RagError> {
        self.store.insert_batch(&self.name, items).await
    }

    pub async fn query(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, RagError> {
        self.store.search(&self.name, query_embedding, limit).await
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection").field("name", &self.name).finish()
    }
}
