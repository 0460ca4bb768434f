use std::sync::Arc;

use async_trait::async_trait;

use super::Embedder;
use crate::core::errors::RagError;
use crate::llm::provider::LlmProvider;

/// Embeddings from an OpenAI-compatible `/v1/embeddings` endpoint.
pub struct RemoteEmbedder {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl RemoteEmbedder {
    pub fn new(provider: Arc<dyn LlmProvider>, model: String) -> Self {
        Self { provider, model }
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn id(&self) -> String {
        format!("{}:{}", self.provider.name(), self.model)
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.provider.embed(inputs, &self.model).await?;
        if vectors.len() != inputs.len() {
            return Err(RagError::Protocol(format!(
                "embedding endpoint returned {} vectors for {} inputs",
                vectors.len(),
                inputs.len()
            )));
        }
        Ok(vectors)
    }
}
