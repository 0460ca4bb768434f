//! Text embedding backends used by the vector index.

mod hashing;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::config::{EmbeddingConfig, EmbeddingProviderKind};
use crate::core::errors::RagError;
use crate::llm::provider::LlmProvider;

pub use hashing::HashingEmbedder;
pub use remote::RemoteEmbedder;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identity recorded with a collection; vectors from different ids
    /// are not comparable.
    fn id(&self) -> String;

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    async fn embed_one(&self, input: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.embed(&[input.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(RagError::Protocol(format!(
                "expected 1 embedding, got {}",
                vectors.len()
            )));
        }
        Ok(vectors.remove(0))
    }
}

/// Builds the configured embedder. `remote` reuses the OpenAI-compatible
/// client so it shares timeouts and error mapping with chat.
pub fn build_embedder<F>(
    config: &EmbeddingConfig,
    remote_provider: F,
) -> Result<Arc<dyn Embedder>, RagError>
where
    F: FnOnce() -> Result<Arc<dyn LlmProvider>, RagError>,
{
    Ok(match config.provider {
        EmbeddingProviderKind::Local => Arc::new(HashingEmbedder::new(config.dimension)),
        EmbeddingProviderKind::Remote => {
            Arc::new(RemoteEmbedder::new(remote_provider()?, config.model.clone()))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::defaults::default_config;
    use crate::core::config::AppConfig;

    fn embedding_config() -> EmbeddingConfig {
        AppConfig::from_value(default_config()).unwrap().embedding
    }

    #[test]
    fn local_provider_never_builds_a_client() {
        let embedder = build_embedder(&embedding_config(), || {
            panic!("remote provider requested for local embeddings")
        })
        .unwrap();

        assert_eq!(embedder.id(), "local-hashing-384");
    }

    #[test]
    fn remote_provider_errors_propagate() {
        let mut config = embedding_config();
        config.provider = EmbeddingProviderKind::Remote;

        let err = build_embedder(&config, || Err(RagError::Configuration("bad url".into())))
            .err()
            .unwrap();

        assert!(matches!(err, RagError::Configuration(_)));
    }
}
