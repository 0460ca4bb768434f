pub mod agent;
pub mod context;
pub mod core;
pub mod documents;
pub mod embeddings;
pub mod llm;
pub mod pipeline;
pub mod rag;
pub mod repl;
pub mod state;
