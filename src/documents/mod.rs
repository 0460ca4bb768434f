//! Document Store Reader.

mod reader;

pub use reader::{DirectoryReader, Document, DocumentFormat, DocumentLoader};
