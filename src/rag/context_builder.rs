//! Renders similarity hits into the context string handed to the prompt.

use serde::{Deserialize, Serialize};

use super::store::ChunkSearchResult;

pub const NO_CONTEXT: &str = "No relevant documents were found.";

/// Hits for one query, best first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub hits: Vec<ChunkSearchResult>,
}

impl RetrievalResult {
    pub fn new(hits: Vec<ChunkSearchResult>) -> Self {
        Self { hits }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Distinct sources, in rank order.
    pub fn sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = Vec::new();
        for hit in &self.hits {
            if !sources.contains(&hit.chunk.source) {
                sources.push(hit.chunk.source.clone());
            }
        }
        sources
    }
}

/// Formats retrieval hits with numbered source citations.
pub struct ContextBuilder {
    max_context_chars: usize,
}

impl ContextBuilder {
    pub fn new(max_context_chars: usize) -> Self {
        Self {
            max_context_chars: max_context_chars.max(1),
        }
    }

    pub fn build(&self, result: &RetrievalResult) -> String {
        if result.is_empty() {
            return NO_CONTEXT.to_string();
        }

        let mut context = String::new();
        let mut current_length = 0;

        for (i, hit) in result.hits.iter().enumerate() {
            let header = format!(
                "[{}] (Source: {}, relevance: {:.2})\n",
                i + 1,
                hit.chunk.source,
                hit.score
            );
            let header_len = header.chars().count();
            let text_len = hit.chunk.content.chars().count();

            if current_length + header_len + text_len > self.max_context_chars {
                // Always keep something from the best hit.
                if i == 0 {
                    let room = self.max_context_chars.saturating_sub(header_len);
                    let truncated: String = hit.chunk.content.chars().take(room).collect();
                    context.push_str(&header);
                    context.push_str(&truncated);
                }
                break;
            }

            context.push_str(&header);
            context.push_str(&hit.chunk.content);
            context.push_str("\n\n");
            current_length += header_len + text_len + 2;
        }

        context.trim().to_string()
    }
}
