//! Directory reader: every file under a root, recursively, as a `Document`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::core::errors::RagError;

/// File format, detected from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Text,
    Markdown,
    Html,
    Json,
    Csv,
    Other,
}

impl DocumentFormat {
    pub fn detect(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "txt" | "text" | "log" => DocumentFormat::Text,
            "md" | "markdown" => DocumentFormat::Markdown,
            "html" | "htm" | "xhtml" => DocumentFormat::Html,
            "json" | "jsonl" => DocumentFormat::Json,
            "csv" | "tsv" => DocumentFormat::Csv,
            _ => DocumentFormat::Other,
        }
    }
}

/// A file's text plus where it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub source: PathBuf,
    pub format: DocumentFormat,
    pub metadata: serde_json::Value,
}

impl Document {
    pub fn new(source: PathBuf, text: String, format: DocumentFormat) -> Self {
        let id = hex::encode(Sha256::digest(source.to_string_lossy().as_bytes()));
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let metadata = serde_json::json!({
            "file_path": source.to_string_lossy(),
            "file_name": file_name,
            "format": format,
            "chars": text.chars().count(),
        });

        Self {
            id,
            text,
            source,
            format,
            metadata,
        }
    }
}

/// Source of documents for index construction.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self) -> Result<Vec<Document>, RagError>;

    /// Human-readable location, used in logs and errors.
    fn location(&self) -> String;
}

pub struct DirectoryReader {
    root: PathBuf,
    max_file_bytes: u64,
}

impl DirectoryReader {
    pub fn new(root: impl Into<PathBuf>, max_file_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_file_bytes,
        }
    }

    async fn read_file(&self, path: &Path) -> Result<Option<Document>, RagError> {
        let bytes = tokio::fs::read(path).await?;
        if bytes.len() as u64 > self.max_file_bytes {
            tracing::warn!(
                path = %path.display(),
                bytes = bytes.len(),
                "Skipping file larger than max_file_bytes"
            );
            return Ok(None);
        }

        let Ok(raw) = String::from_utf8(bytes) else {
            tracing::warn!(path = %path.display(), "Skipping non UTF-8 file");
            return Ok(None);
        };

        let format = DocumentFormat::detect(path);
        let text = match format {
            DocumentFormat::Html => strip_html_tags(&raw),
            _ => raw,
        };

        if text.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Skipping empty file");
            return Ok(None);
        }

        Ok(Some(Document::new(path.to_path_buf(), text, format)))
    }
}

#[async_trait]
impl DocumentLoader for DirectoryReader {
    async fn load(&self) -> Result<Vec<Document>, RagError> {
        if !self.root.is_dir() {
            return Err(RagError::Io(format!(
                "documents directory not found: {}",
                self.root.display()
            )));
        }

        let mut documents = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

        for entry in walker {
            let entry = entry.map_err(RagError::io)?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(document) = self.read_file(entry.path()).await? {
                documents.push(document);
            }
        }

        tracing::info!(
            dir = %self.root.display(),
            count = documents.len(),
            "Loaded documents"
        );
        Ok(documents)
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Drops tags plus `<script>`/`<style>` bodies and blank lines.
fn strip_html_tags(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    let mut skip_until: Option<&str> = None;

    let chars: Vec<char> = html.chars().collect();
    let lower: Vec<char> = html.to_lowercase().chars().collect();
    // Lowercasing can change char counts for some scripts; fall back to the
    // original text for matching when it does.
    let lower = if lower.len() == chars.len() { lower } else { chars.clone() };

    let starts_with = |i: usize, needle: &str| -> bool {
        let needle: Vec<char> = needle.chars().collect();
        i + needle.len() <= lower.len() && lower[i..i + needle.len()] == needle[..]
    };

    let mut i = 0;
    while i < chars.len() {
        if let Some(end) = skip_until {
            if starts_with(i, end) {
                skip_until = None;
                i += end.chars().count();
            } else {
                i += 1;
            }
            continue;
        }

        if starts_with(i, "<script") {
            skip_until = Some("</script>");
            continue;
        }
        if starts_with(i, "<style") {
            skip_until = Some("</style>");
            continue;
        }

        let c = chars[i];
        if c == '<' {
            in_tag = true;
        } else if c == '>' {
            in_tag = false;
        } else if !in_tag {
            result.push(c);
        }
        i += 1;
    }

    result
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn detects_format_from_extension() {
        assert_eq!(DocumentFormat::detect(Path::new("a.txt")), DocumentFormat::Text);
        assert_eq!(DocumentFormat::detect(Path::new("b.MD")), DocumentFormat::Markdown);
        assert_eq!(DocumentFormat::detect(Path::new("c.htm")), DocumentFormat::Html);
        assert_eq!(DocumentFormat::detect(Path::new("d.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::detect(Path::new("e.csv")), DocumentFormat::Csv);
        assert_eq!(DocumentFormat::detect(Path::new("Makefile")), DocumentFormat::Other);
    }

    #[test]
    fn html_stripping_drops_tags_and_scripts() {
        let html = r#"
            <html>
            <head><script>var x = 1;</script><style>p { color: red; }</style></head>
            <body>
                <h1>Hello</h1>
                <p>World</p>
            </body>
            </html>
        "#;

        let text = strip_html_tags(html);
        assert_eq!(text, "Hello\nWorld");
    }

    #[tokio::test]
    async fn reads_directory_recursively_and_skips_hidden_and_binary() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join("a.txt"), "The sky is blue.").unwrap();
        fs::create_dir_all(root.join("nested/deeper")).unwrap();
        fs::write(root.join("nested/deeper/b.html"), "<p>Grass is green.</p>").unwrap();
        fs::write(root.join(".hidden.txt"), "secret").unwrap();
        fs::write(root.join("image.bin"), [0xff, 0xfe, 0x00, 0x81]).unwrap();
        fs::write(root.join("blank.md"), "   \n").unwrap();

        let reader = DirectoryReader::new(root, 1_000_000);
        let docs = reader.load().await.unwrap();

        let names: Vec<String> = docs
            .iter()
            .map(|d| d.metadata["file_name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.html"]);
        assert_eq!(docs[0].text, "The sky is blue.");
        assert_eq!(docs[1].text, "Grass is green.");
        assert_eq!(docs[1].format, DocumentFormat::Html);
    }

    #[tokio::test]
    async fn oversized_files_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("big.txt"), "x".repeat(64)).unwrap();

        let reader = DirectoryReader::new(tmp.path(), 16);
        assert!(reader.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_directory_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let reader = DirectoryReader::new(tmp.path().join("nope"), 1_000);

        assert!(matches!(reader.load().await, Err(RagError::Io(_))));
    }

    #[test]
    fn document_id_is_stable_per_path() {
        let a = Document::new(PathBuf::from("docs/a.txt"), "one".into(), DocumentFormat::Text);
        let b = Document::new(PathBuf::from("docs/a.txt"), "two".into(), DocumentFormat::Text);
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), 64);
    }
}
