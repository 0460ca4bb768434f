//! Prompt construction for the reply generator.

pub mod prompt;

pub use prompt::compose;
