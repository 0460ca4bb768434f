//! SQLite-backed vector store.
//!
//! In-process store using SQLite for chunks and metadata and
//! brute-force cosine similarity for search.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{ChunkSearchResult, StoredChunk, VectorStore};
use crate::core::errors::RagError;

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    pub async fn open(db_path: impl Into<PathBuf>) -> Result<Self, RagError> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        tracing::debug!(path = %db_path.display(), "Opened vector store");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), RagError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_collections (
                name TEXT PRIMARY KEY,
                embedder TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_chunks (
                chunk_id TEXT PRIMARY KEY,
                collection TEXT NOT NULL REFERENCES rag_collections(name),
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                metadata TEXT DEFAULT '{}',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_rag_collection ON rag_chunks(collection)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
        let metadata_str: String = row.get("metadata");
        let metadata = serde_json::from_str::<Value>(&metadata_str).ok();

        StoredChunk {
            chunk_id: row.get("chunk_id"),
            content: row.get("content"),
            source: row.get("source"),
            metadata,
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn ensure_collection(&self, name: &str, embedder_id: &str) -> Result<(), RagError> {
        sqlx::query("INSERT OR IGNORE INTO rag_collections (name, embedder) VALUES (?1, ?2)")
            .bind(name)
            .bind(embedder_id)
            .execute(&self.pool)
            .await?;

        let stored: String =
            sqlx::query_scalar("SELECT embedder FROM rag_collections WHERE name = ?1")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;

        if stored != embedder_id {
            return Err(RagError::Configuration(format!(
                "collection '{}' was built with embedder '{}' but '{}' is configured",
                name, stored, embedder_id
            )));
        }
        Ok(())
    }

    async fn insert_batch(
        &self,
        collection: &str,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), RagError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            let metadata_str = chunk
                .metadata
                .as_ref()
                .map(|m| serde_json::to_string(m).unwrap_or_default())
                .unwrap_or_else(|| "{}".to_string());

            sqlx::query(
                "INSERT OR REPLACE INTO rag_chunks (chunk_id, collection, content, source, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&chunk.chunk_id)
            .bind(collection)
            .bind(&chunk.content)
            .bind(&chunk.source)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkSearchResult>, RagError> {
        let rows = sqlx::query(
            "SELECT chunk_id, content, source, metadata, embedding
             FROM rag_chunks
             WHERE collection = ?1",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<ChunkSearchResult> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored_emb = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query_embedding, &stored_emb);

                Some(ChunkSearchResult {
                    chunk: Self::row_to_chunk(row),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit.max(1));

        Ok(scored)
    }

    async fn count(&self, collection: &str) -> Result<usize, RagError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rag_chunks WHERE collection = ?1")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;

        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store(dir: &tempfile::TempDir) -> SqliteVectorStore {
        SqliteVectorStore::open(dir.path().join("db").join("rag.db"))
            .await
            .unwrap()
    }

    fn make_chunk(id: &str, content: &str, source: &str) -> StoredChunk {
        StoredChunk {
            chunk_id: id.to_string(),
            content: content.to_string(),
            source: source.to_string(),
            metadata: Some(serde_json::json!({ "start_offset": 0 })),
        }
    }

    #[tokio::test]
    async fn insert_and_search() {
        let tmp = tempfile::tempdir().unwrap();
        let store = test_store(&tmp).await;
        store.ensure_collection("docs", "test-embedder").await.unwrap();

        store
            .insert_batch(
                "docs",
                vec![
                    (make_chunk("c1", "Hello world", "a.txt"), vec![1.0, 0.0, 0.0]),
                    (make_chunk("c2", "Goodbye", "b.txt"), vec![0.0, 1.0, 0.0]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(store.count("docs").await.unwrap(), 2);

        let results = store.search("docs", &[0.9, 0.1, 0.0], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.chunk_id, "c1");
        assert_eq!(results[0].chunk.metadata.as_ref().unwrap()["start_offset"], 0);
        assert!(results[0].score > 0.9);
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let tmp = tempfile::tempdir().unwrap();
        let store = test_store(&tmp).await;
        store.ensure_collection("one", "e").await.unwrap();
        store.ensure_collection("two", "e").await.unwrap();

        store
            .insert_batch("one", vec![(make_chunk("c1", "data", "a"), vec![1.0])])
            .await
            .unwrap();

        assert_eq!(store.count("one").await.unwrap(), 1);
        assert_eq!(store.count("two").await.unwrap(), 0);
        assert!(store.search("two", &[1.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reinserting_same_chunk_id_does_not_duplicate() {
        let tmp = tempfile::tempdir().unwrap();
        let store = test_store(&tmp).await;
        store.ensure_collection("docs", "e").await.unwrap();

        for _ in 0..2 {
            store
                .insert_batch("docs", vec![(make_chunk("c1", "data", "a"), vec![1.0])])
                .await
                .unwrap();
        }

        assert_eq!(store.count("docs").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn embedder_mismatch_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = test_store(&tmp).await;
        store.ensure_collection("docs", "local-hashing-384").await.unwrap();
        store.ensure_collection("docs", "local-hashing-384").await.unwrap();

        let err = store
            .ensure_collection("docs", "groq:other")
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let store = test_store(&tmp).await;
            store.ensure_collection("docs", "e").await.unwrap();
            store
                .insert_batch("docs", vec![(make_chunk("c1", "kept", "a"), vec![1.0])])
                .await
                .unwrap();
            store.pool.close().await;
        }

        let reopened = test_store(&tmp).await;
        assert_eq!(reopened.count("docs").await.unwrap(), 1);
    }

    #[test]
    fn embedding_blob_round_trips() {
        let original = vec![0.5f32, -1.25, 3.0];
        let bytes = SqliteVectorStore::serialize_embedding(&original);
        assert_eq!(bytes.len(), 12);
        assert_eq!(SqliteVectorStore::deserialize_embedding(&bytes), original);
    }
}
