use serde_json::{json, Value};

pub const DEFAULT_COLLECTION: &str = "my-docs-collection";
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Built-in configuration; `config.yml`, `secrets.yaml` and the environment
/// are merged on top of this.
pub fn default_config() -> Value {
    json!({
        "documents": {
            "dir": "documents",
            "max_file_bytes": 10_000_000u64
        },
        "store": {
            "path": "vector_db/rag.db",
            "collection": DEFAULT_COLLECTION
        },
        "chunking": {
            "chunk_size": 500,
            "chunk_overlap": 50
        },
        "retrieval": {
            "top_k": 3,
            "max_context_chars": 4000
        },
        "embedding": {
            "provider": "local",
            "dimension": 384,
            "model": "text-embedding-3-small",
            "base_url": "https://api.openai.com",
            "api_key_env": "OPENAI_API_KEY"
        },
        "llm": {
            "provider": "groq",
            "model": "llama-3.1-8b-instant",
            "base_url": "https://api.groq.com/openai",
            "api_key_env": DEFAULT_API_KEY_ENV,
            "request_timeout_secs": 30
        },
        // e.g. "system_message": "You are a RAG chatbot" adds a system turn
        // ahead of the prompt; unset keeps the request to one user message.
        "agent": {
            "name": "RAGbot"
        },
        "pipeline": {
            "timeout_secs": 10,
            "max_steps": 8
        }
    })
}
