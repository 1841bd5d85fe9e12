use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Upper bound on accepted upload payloads: 10 MiB.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// UploadError
///
/// Constraint violations and the single fatal condition of the upload gate.
/// `TooLarge` and `UnsupportedType` are expected, user-facing rejections;
/// `Io` is a persistence failure and surfaces as a generic server error.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file exceeds the 10 MiB upload limit")]
    TooLarge { size: usize },

    #[error("only image files are allowed")]
    UnsupportedType { content_type: String },

    #[error("failed to persist the uploaded file")]
    Io(#[from] std::io::Error),
}

/// StoredAsset
///
/// A persisted upload: the generated file name and the URL path under which
/// the static-file layer serves it. The URL is a plain string the caller may
/// embed in post content; the gate knows nothing about posts.
#[derive(Debug, Clone)]
pub struct StoredAsset {
    pub file_name: String,
    pub url: String,
}

// 1. UploadStore Contract

/// UploadStore
///
/// Abstract contract for the upload gate. The concrete implementation is
/// swapped between the real disk-backed store (`LocalUploadStore`) and the
/// in-memory mock (`MockUploadStore`) during testing without affecting the
/// calling handlers.
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Validates and persists one uploaded asset.
    ///
    /// Rejects payloads above [`MAX_UPLOAD_BYTES`] and any declared content
    /// type that does not begin with `image/`. On acceptance the asset is
    /// stored under a freshly generated name; no client-supplied name
    /// component is trusted or reused.
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> Result<StoredAsset, UploadError>;
}

/// UploadState
///
/// The concrete type used to share the upload gate across the application state.
pub type UploadState = Arc<dyn UploadStore>;

/// Applies the gate's acceptance rules. Shared by every implementation so the
/// mock rejects exactly what the real store rejects.
fn validate_upload(bytes: &[u8], content_type: &str) -> Result<(), UploadError> {
    if !content_type.starts_with("image/") {
        return Err(UploadError::UnsupportedType {
            content_type: content_type.to_string(),
        });
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge { size: bytes.len() });
    }
    Ok(())
}

/// Derives a collision-resistant file name for an accepted upload. The
/// extension comes from the MIME subtype, stripped to ASCII alphanumerics;
/// nothing from a client-provided filename is used.
fn generate_file_name(content_type: &str) -> String {
    let extension: String = content_type
        .split('/')
        .nth(1)
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    let extension = if extension.is_empty() {
        "bin".to_string()
    } else {
        extension
    };
    format!("{}.{}", Uuid::new_v4().simple(), extension)
}

// 2. The Real Implementation (Local Disk)

/// LocalUploadStore
///
/// Disk-backed upload gate. Accepted assets are written into a single flat
/// directory which the router exposes as static content under `/uploads`.
/// The write is the only blocking I/O in the core, bounded by the size cap.
#[derive(Clone)]
pub struct LocalUploadStore {
    root: PathBuf,
}

impl LocalUploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the upload directory if it is missing. Safe to call at every
    /// startup; an existing directory is left untouched.
    pub async fn ensure_root_exists(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> Result<StoredAsset, UploadError> {
        validate_upload(&bytes, content_type)?;

        let file_name = generate_file_name(content_type);
        tokio::fs::write(self.root.join(&file_name), &bytes).await?;

        let url = format!("/uploads/{file_name}");
        Ok(StoredAsset { file_name, url })
    }
}

// 3. The Mock Implementation (For Tests)

/// MockUploadStore
///
/// In-memory stand-in used by unit and handler tests. It applies the same
/// acceptance rules as the real store but never touches the filesystem.
#[derive(Clone)]
pub struct MockUploadStore {
    /// When true, accepted uploads fail with a simulated I/O error.
    pub should_fail: bool,
}

impl MockUploadStore {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

impl Default for MockUploadStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UploadStore for MockUploadStore {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> Result<StoredAsset, UploadError> {
        validate_upload(&bytes, content_type)?;

        if self.should_fail {
            return Err(UploadError::Io(std::io::Error::other(
                "mock storage failure: simulation requested",
            )));
        }

        let file_name = generate_file_name(content_type);
        let url = format!("/uploads/{file_name}");
        Ok(StoredAsset { file_name, url })
    }
}
