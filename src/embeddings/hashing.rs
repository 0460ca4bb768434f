//! Local, deterministic embeddings via signed feature hashing.
//!
//! Each lowercase word (and each adjacent word pair) is hashed with SHA-256
//! into one of `dimension` buckets with a sign taken from the digest, weighted
//! by `1 + ln(tf)`, then the vector is L2-normalized. Texts sharing vocabulary
//! score high under cosine similarity; no model download or network is needed.

use std::collections::HashMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::Embedder;
use crate::core::errors::RagError;

const STOPWORDS: [&str; 32] = [
    "a", "an", "and", "are", "as", "at", "be", "by", "do", "does", "for", "from", "how", "in",
    "is", "it", "of", "on", "or", "that", "the", "this", "to", "was", "what", "when", "where",
    "which", "who", "why", "with", "you",
];

pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        let mut features: HashMap<String, u32> = HashMap::new();
        for token in &tokens {
            *features.entry(token.clone()).or_default() += 1;
        }
        for pair in tokens.windows(2) {
            *features.entry(format!("{} {}", pair[0], pair[1])).or_default() += 1;
        }

        let mut vector = vec![0.0f32; self.dimension];
        for (feature, tf) in features {
            let digest = Sha256::digest(feature.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign * (1.0 + (tf as f32).ln());
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn id(&self) -> String {
        format!("local-hashing-{}", self.dimension)
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(inputs.iter().map(|text| self.embed_text(text)).collect())
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty() && !STOPWORDS.contains(token))
        .map(str::to_string)
        .collect()
}
