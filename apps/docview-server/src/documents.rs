//! Trusted document store
//!
//! Source documents live in a single directory. Callers name a document by
//! its bare file name; anything that could step outside the store is
//! rejected before the filesystem is touched.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid document name: {0:?}")]
    InvalidName(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A document that resolved inside the store and was readable at resolve time
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

impl SourceDocument {
    /// Open the document as a byte stream for upload
    pub async fn open_stream(&self) -> Result<ReaderStream<File>, DocumentError> {
        let file = File::open(&self.path).await?;
        Ok(ReaderStream::new(file))
    }
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a document name to a readable file inside the store.
    pub async fn resolve(&self, name: &str) -> Result<SourceDocument, DocumentError> {
        validate_name(name)?;

        let root = canonicalize(&self.root, name).await?;
        let path = canonicalize(&root.join(name), name).await?;

        // Symlinks may still point outside the store
        if !path.starts_with(&root) {
            tracing::warn!(document = %name, "Document resolved outside the store");
            return Err(DocumentError::InvalidName(name.to_string()));
        }

        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(DocumentError::NotFound(name.to_string()));
        }

        // Fail here rather than after the session exists
        File::open(&path).await?;

        Ok(SourceDocument {
            name: name.to_string(),
            path,
            size: metadata.len(),
        })
    }
}

fn validate_name(name: &str) -> Result<(), DocumentError> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0']);

    if invalid {
        return Err(DocumentError::InvalidName(name.to_string()));
    }
    Ok(())
}

async fn canonicalize(path: &Path, name: &str) -> Result<PathBuf, DocumentError> {
    tokio::fs::canonicalize(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DocumentError::NotFound(name.to_string())
        } else {
            DocumentError::Io(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn store_with(files: &[(&str, &[u8])]) -> (tempfile::TempDir, DocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        for (name, contents) in files {
            std::fs::write(dir.path().join(name), contents).unwrap();
        }
        let store = DocumentStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_resolve_existing_document() {
        let (_dir, store) = store_with(&[("example.pdf", b"%PDF-1.7")]);

        let doc = store.resolve("example.pdf").await.unwrap();
        assert_eq!(doc.name, "example.pdf");
        assert_eq!(doc.size, 8);
    }

    #[tokio::test]
    async fn test_resolve_missing_document() {
        let (_dir, store) = store_with(&[]);
        let result = store.resolve("missing.pdf").await;
        assert!(matches!(result, Err(DocumentError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_double_dot_inside_name_is_allowed() {
        let (_dir, store) = store_with(&[("report..v2.pdf", b"%PDF-1.7")]);

        let doc = store.resolve("report..v2.pdf").await.unwrap();
        assert_eq!(doc.name, "report..v2.pdf");
    }

    #[tokio::test]
    async fn test_rejects_traversal_and_separators() {
        let (_dir, store) = store_with(&[("example.pdf", b"x")]);

        for name in ["", "../secret.pdf", "..", "a/b.pdf", "a\\b.pdf", ".env"] {
            let result = store.resolve(name).await;
            assert!(
                matches!(result, Err(DocumentError::InvalidName(_))),
                "accepted {:?}",
                name
            );
        }
    }

    #[tokio::test]
    async fn test_directory_is_not_a_document() {
        let (dir, store) = store_with(&[]);
        std::fs::create_dir(dir.path().join("folder")).unwrap();
        let result = store.resolve("folder").await;
        assert!(matches!(result, Err(DocumentError::NotFound(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_rejects_symlink_escaping_store() {
        let outside = tempfile::tempdir().unwrap();
        let target = outside.path().join("private.pdf");
        std::fs::write(&target, b"private").unwrap();

        let (dir, store) = store_with(&[]);
        std::os::unix::fs::symlink(&target, dir.path().join("link.pdf")).unwrap();

        let result = store.resolve("link.pdf").await;
        assert!(matches!(result, Err(DocumentError::InvalidName(_))));
    }

    #[tokio::test]
    async fn test_open_stream_yields_file_bytes() {
        let (_dir, store) = store_with(&[("example.pdf", b"%PDF-1.7 body")]);
        let doc = store.resolve("example.pdf").await.unwrap();

        let mut stream = doc.open_stream().await.unwrap();
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            bytes.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(bytes, b"%PDF-1.7 body");
    }
}
