//! Vector index: an embedder paired with a persistent collection.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::chunker::Chunker;
use super::context_builder::RetrievalResult;
use super::store::{Collection, StoredChunk};
use crate::core::errors::RagError;
use crate::documents::Document;
use crate::embeddings::Embedder;

const EMBED_BATCH_SIZE: usize = 64;

/// What a build wrote into the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
}

pub struct VectorIndex {
    collection: Collection,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl VectorIndex {
    /// Wraps a collection that already holds embedded chunks.
    pub fn from_collection(collection: Collection, embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            collection,
            embedder,
            top_k: top_k.max(1),
        }
    }

    /// Chunks and embeds `documents`, then writes every chunk into the
    /// collection in one transaction.
    pub async fn from_documents(
        documents: &[Document],
        collection: Collection,
        embedder: Arc<dyn Embedder>,
        chunker: &Chunker,
        top_k: usize,
    ) -> Result<(Self, IndexStats), RagError> {
        let mut chunks: Vec<StoredChunk> = Vec::new();
        for document in documents {
            let source = document.source.to_string_lossy().to_string();
            for piece in chunker.split(&document.text, &source) {
                let mut metadata = document.metadata.clone();
                if let Some(map) = metadata.as_object_mut() {
                    map.insert("document_id".into(), document.id.clone().into());
                    map.insert("start_offset".into(), piece.start_offset.into());
                    map.insert("chunk_index".into(), piece.chunk_index.into());
                }
                chunks.push(StoredChunk {
                    chunk_id: chunk_id(collection.name(), &source, piece.start_offset, &piece.text),
                    content: piece.text,
                    source: piece.source,
                    metadata: Some(metadata),
                });
            }
        }

        let mut items = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let inputs: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = embedder.embed(&inputs).await?;
            if vectors.len() != batch.len() {
                return Err(RagError::Protocol(format!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                )));
            }
            items.extend(batch.iter().cloned().zip(vectors));
        }

        let stats = IndexStats {
            documents: documents.len(),
            chunks: items.len(),
        };
        collection.add(items).await?;
        tracing::info!(
            collection = collection.name(),
            documents = stats.documents,
            chunks = stats.chunks,
            "Indexed documents"
        );

        Ok((Self::from_collection(collection, embedder, top_k), stats))
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Top-k chunks by cosine similarity; non-positive scores are dropped.
    pub async fn query(&self, text: &str) -> Result<RetrievalResult, RagError> {
        let embedding = self.embedder.embed_one(text).await?;
        let hits = self
            .collection
            .query(&embedding, self.top_k)
            .await?
            .into_iter()
            .filter(|hit| hit.score > 0.0)
            .collect::<Vec<_>>();

        tracing::debug!(hits = hits.len(), "Similarity query finished");
        Ok(RetrievalResult::new(hits))
    }
}

fn chunk_id(collection: &str, source: &str, start_offset: usize, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(collection.as_bytes());
    hasher.update([0u8]);
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(start_offset.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ChunkingConfig;
    use crate::documents::DocumentFormat;
    use crate::embeddings::HashingEmbedder;
    use crate::rag::sqlite::SqliteVectorStore;
    use crate::rag::store::VectorStore;
    use std::path::PathBuf;

    async fn collection(dir: &tempfile::TempDir, embedder: &dyn Embedder) -> Collection {
        let store: Arc<dyn VectorStore> = Arc::new(
            SqliteVectorStore::open(dir.path().join("rag.db"))
                .await
                .unwrap(),
        );
        Collection::get_or_create(store, "docs", &embedder.id())
            .await
            .unwrap()
    }

    fn chunker() -> Chunker {
        Chunker::new(ChunkingConfig {
            chunk_size: 200,
            chunk_overlap: 20,
        })
    }

    fn doc(path: &str, text: &str) -> Document {
        Document::new(PathBuf::from(path), text.to_string(), DocumentFormat::Text)
    }

    #[tokio::test]
    async fn build_then_query_finds_relevant_chunk() {
        let tmp = tempfile::tempdir().unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(384));
        let collection = collection(&tmp, embedder.as_ref()).await;
        let documents = vec![
            doc("documents/a.txt", "The sky is blue."),
            doc("documents/b.txt", "Grass grows green in spring meadows."),
        ];

        let (index, stats) =
            VectorIndex::from_documents(&documents, collection, embedder, &chunker(), 1)
                .await
                .unwrap();

        assert_eq!(stats, IndexStats { documents: 2, chunks: 2 });
        assert_eq!(index.collection().count().await.unwrap(), 2);

        let result = index.query("What color is the sky?").await.unwrap();
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].chunk.content, "The sky is blue.");
        assert_eq!(result.sources(), vec!["documents/a.txt"]);
        let metadata = result.hits[0].chunk.metadata.as_ref().unwrap();
        assert_eq!(metadata["file_name"], "a.txt");
        assert_eq!(metadata["chunk_index"], 0);
    }

    #[tokio::test]
    async fn rebuilding_same_documents_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(64));
        let collection = collection(&tmp, embedder.as_ref()).await;
        let documents = vec![doc("a.txt", "The sky is blue.")];

        for _ in 0..2 {
            VectorIndex::from_documents(
                &documents,
                collection.clone(),
                embedder.clone(),
                &chunker(),
                3,
            )
            .await
            .unwrap();
        }

        assert_eq!(collection.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn query_without_shared_terms_returns_no_hits() {
        let tmp = tempfile::tempdir().unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(384));
        let collection = collection(&tmp, embedder.as_ref()).await;
        let (index, _) = VectorIndex::from_documents(
            &[doc("a.txt", "The sky is blue.")],
            collection,
            embedder,
            &chunker(),
            3,
        )
        .await
        .unwrap();

        let result = index.query("what is the").await.unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn chunk_ids_depend_on_collection_and_offset() {
        let base = chunk_id("docs", "a.txt", 0, "text");
        assert_eq!(base, chunk_id("docs", "a.txt", 0, "text"));
        assert_ne!(base, chunk_id("other", "a.txt", 0, "text"));
        assert_ne!(base, chunk_id("docs", "a.txt", 10, "text"));
    }
}
