//! Storage for card images.
//!
//! Files land in a single directory under generated names of the form
//! `<unix-millis>-<random suffix>.<ext>`. Files are always opened with
//! create-new semantics, so a stored image is never overwritten.

use crate::domain::error::DomainError;
use anyhow::Result;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, instrument, warn};

pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
pub const PUBLIC_PREFIX: &str = "/uploads";

const SUFFIX_LEN: usize = 8;
const MAX_NAME_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Generated name, which is what a card records.
    pub file_name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn public_url(file_name: &str) -> String {
        format!("{}/{}", PUBLIC_PREFIX, file_name)
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            error!(dir = %self.dir.display(), error = %e, "Failed to create upload directory");
            DomainError::Upload(format!("Cannot create upload directory: {}", e))
        })?;
        Ok(())
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn store(&self, bytes: &[u8], original_filename: &str) -> Result<StoredFile> {
        if bytes.len() > self.max_bytes {
            warn!(max_bytes = self.max_bytes, "Upload too large");
            return Err(DomainError::Upload(format!(
                "File exceeds the {} byte limit",
                self.max_bytes
            ))
            .into());
        }
        let extension = image_extension(original_filename)?;
        self.ensure_dir().await?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let file_name = generate_file_name(&extension);
            let path = self.dir.join(&file_name);

            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(file_name = %file_name, "Generated name taken, retrying");
                    continue;
                }
                Err(e) => return Err(upload_io_error(&path, e)),
            };

            let written = async {
                file.write_all(bytes).await?;
                file.flush().await
            }
            .await;
            if let Err(e) = written {
                if let Err(cleanup) = fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %cleanup, "Failed to remove partial upload");
                }
                return Err(upload_io_error(&path, e));
            }

            info!(file_name = %file_name, "Upload stored");
            return Ok(StoredFile { file_name, path });
        }

        Err(DomainError::Upload("Could not allocate a unique file name".to_string()).into())
    }
}

fn upload_io_error(path: &Path, e: std::io::Error) -> anyhow::Error {
    error!(path = %path.display(), error = %e, "Failed to write upload");
    DomainError::Upload(format!("Failed to write file: {}", e)).into()
}

/// Lower-cased extension of `original_filename`, if it is an accepted image type.
fn image_extension(original_filename: &str) -> Result<String> {
    let extension = Path::new(original_filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        warn!(filename = %original_filename, "Rejected upload type");
        Err(DomainError::Upload(format!(
            "Unsupported file type; allowed: {}",
            ALLOWED_EXTENSIONS.join(", ")
        ))
        .into())
    }
}

fn generate_file_name(extension: &str) -> String {
    let suffix: String = (0..SUFFIX_LEN).map(|_| fastrand::alphanumeric()).collect();
    format!("{}-{}.{}", Utc::now().timestamp_millis(), suffix, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_creates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let store = UploadStore::new(root.path().join("public").join("uploads"), 1024);

        let stored = store.store(b"png-bytes", "dragon.png").await.unwrap();

        assert!(stored.file_name.ends_with(".png"));
        assert_eq!(fs::read(&stored.path).await.unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn test_colliding_original_names_get_distinct_paths() {
        let root = tempfile::tempdir().unwrap();
        let store = UploadStore::new(root.path(), 1024);

        let (a, b) = tokio::join!(
            store.store(b"first", "card.png"),
            store.store(b"second", "card.png")
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.path, b.path);
        assert_eq!(fs::read(&a.path).await.unwrap(), b"first");
        assert_eq!(fs::read(&b.path).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_extension_is_lowercased() {
        let root = tempfile::tempdir().unwrap();
        let store = UploadStore::new(root.path(), 1024);

        let stored = store.store(b"x", "Photo.JPEG").await.unwrap();
        assert!(stored.file_name.ends_with(".jpeg"));
    }

    #[tokio::test]
    async fn test_rejects_unsupported_type() {
        let root = tempfile::tempdir().unwrap();
        let store = UploadStore::new(root.path(), 1024);

        for name in ["payload.html", "noextension", "archive.png.exe"] {
            let err = store.store(b"x", name).await.unwrap_err();
            assert!(matches!(
                err.downcast_ref::<DomainError>(),
                Some(DomainError::Upload(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_rejects_oversized_file() {
        let root = tempfile::tempdir().unwrap();
        let store = UploadStore::new(root.path(), 4);

        assert!(store.store(b"12345", "big.png").await.is_err());
        assert!(store.store(b"1234", "ok.png").await.is_ok());
    }

    #[test]
    fn test_public_url() {
        assert_eq!(UploadStore::public_url("1-abc.png"), "/uploads/1-abc.png");
    }
}
