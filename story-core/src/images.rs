//! Image storage for page backgrounds.
//!
//! A page's `background` is an opaque reference: either the id of an image
//! held by an [`ImageStore`] or a full external URL. The story model never
//! looks inside the reference beyond telling those two apart.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Default upload limit: 5 MiB.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Route under which stored images are served.
pub const DEFAULT_IMAGE_URL_PREFIX: &str = "/api/images/";

/// Errors from image storage.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image not found: {0}")]
    NotFound(ImageId),

    #[error("Unsupported content type {0:?}: only images are accepted")]
    UnsupportedType(String),

    #[error("Image is {size} bytes; the limit is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("No image data")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Identifier of a stored image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(String);

impl ImageId {
    /// Mint a fresh id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is safe to use as a file name.
    fn is_plain(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a page background points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// An image held by the image store.
    Stored(ImageId),
    /// A full URL hosted elsewhere.
    External(String),
}

impl ImageRef {
    /// Interpret a page background. The empty string means no image.
    ///
    /// `http…` values are external URLs; values under `prefix` (for example
    /// `/api/images/<id>`) and bare values are stored image ids.
    pub fn parse(background: &str, prefix: &str) -> Option<Self> {
        let background = background.trim();
        if background.is_empty() {
            return None;
        }
        if background.starts_with("http") {
            return Some(ImageRef::External(background.to_string()));
        }
        let id = background.strip_prefix(prefix).unwrap_or(background);
        Some(ImageRef::Stored(ImageId::new(id)))
    }

    /// The URL a client should fetch.
    pub fn url(&self, prefix: &str) -> String {
        match self {
            ImageRef::Stored(id) => format!("{prefix}{id}"),
            ImageRef::External(url) => url.clone(),
        }
    }
}

/// Image bytes together with their content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Upload constraints shared by the image stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    pub max_bytes: usize,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl ImageLimits {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Accept non-empty `image/*` uploads within the size limit.
    pub fn check(&self, bytes: &[u8], content_type: &str) -> Result<(), ImageError> {
        if !content_type.trim().to_ascii_lowercase().starts_with("image/") {
            return Err(ImageError::UnsupportedType(content_type.to_string()));
        }
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(ImageError::TooLarge {
                size: bytes.len(),
                max: self.max_bytes,
            });
        }
        Ok(())
    }
}

/// Storage for uploaded images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store an image and return its new id.
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> Result<ImageId, ImageError>;

    /// Fetch an image and its content type.
    async fn retrieve(&self, id: &ImageId) -> Result<StoredImage, ImageError>;

    /// Remove an image.
    async fn delete(&self, id: &ImageId) -> Result<(), ImageError>;
}

// ============================================================================
// In-memory image store
// ============================================================================

/// Keeps images in process memory.
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    limits: ImageLimits,
    images: RwLock<HashMap<ImageId, StoredImage>>,
}

impl MemoryImageStore {
    pub fn new(limits: ImageLimits) -> Self {
        Self {
            limits,
            images: RwLock::default(),
        }
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> Result<ImageId, ImageError> {
        self.limits.check(&bytes, content_type)?;
        let id = ImageId::generate();
        let image = StoredImage {
            bytes,
            content_type: content_type.trim().to_string(),
        };
        self.images.write().await.insert(id.clone(), image);
        debug!(image_id = %id, "image stored");
        Ok(id)
    }

    async fn retrieve(&self, id: &ImageId) -> Result<StoredImage, ImageError> {
        self.images
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ImageError::NotFound(id.clone()))
    }

    async fn delete(&self, id: &ImageId) -> Result<(), ImageError> {
        if self.images.write().await.remove(id).is_none() {
            return Err(ImageError::NotFound(id.clone()));
        }
        debug!(image_id = %id, "image deleted");
        Ok(())
    }
}

// ============================================================================
// Directory-backed image store
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageMeta {
    content_type: String,
    length: usize,
}

/// Keeps each image as `<dir>/<id>.bin` with a `<dir>/<id>.meta.json` sidecar.
#[derive(Debug)]
pub struct DirImageStore {
    dir: PathBuf,
    limits: ImageLimits,
}

impl DirImageStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl AsRef<Path>, limits: ImageLimits) -> Result<Self, ImageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        info!(dir = %dir.display(), "opened image store");
        Ok(Self { dir, limits })
    }

    fn paths(&self, id: &ImageId) -> Result<(PathBuf, PathBuf), ImageError> {
        if !id.is_plain() {
            return Err(ImageError::NotFound(id.clone()));
        }
        Ok((
            self.dir.join(format!("{id}.bin")),
            self.dir.join(format!("{id}.meta.json")),
        ))
    }
}

fn not_found_as(id: &ImageId, e: std::io::Error) -> ImageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ImageError::NotFound(id.clone())
    } else {
        ImageError::Io(e)
    }
}

#[async_trait]
impl ImageStore for DirImageStore {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> Result<ImageId, ImageError> {
        self.limits.check(&bytes, content_type)?;
        let id = ImageId::generate();
        let (data_path, meta_path) = self.paths(&id)?;
        let meta = ImageMeta {
            content_type: content_type.trim().to_string(),
            length: bytes.len(),
        };
        let meta_json = serde_json::to_string(&meta)?;
        fs::write(&data_path, &bytes).await?;
        if let Err(e) = fs::write(&meta_path, meta_json).await {
            let _ = fs::remove_file(&data_path).await;
            return Err(e.into());
        }
        debug!(image_id = %id, bytes = meta.length, "image stored");
        Ok(id)
    }

    async fn retrieve(&self, id: &ImageId) -> Result<StoredImage, ImageError> {
        let (data_path, meta_path) = self.paths(id)?;
        let meta = fs::read_to_string(&meta_path)
            .await
            .map_err(|e| not_found_as(id, e))?;
        let meta: ImageMeta = serde_json::from_str(&meta)?;
        let bytes = fs::read(&data_path).await.map_err(|e| not_found_as(id, e))?;
        Ok(StoredImage {
            bytes,
            content_type: meta.content_type,
        })
    }

    async fn delete(&self, id: &ImageId) -> Result<(), ImageError> {
        let (data_path, meta_path) = self.paths(id)?;
        // Data goes first: without it the image already reads as missing.
        match fs::remove_file(&data_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::remove_file(&meta_path)
            .await
            .map_err(|e| not_found_as(id, e))?;
        debug!(image_id = %id, "image deleted");
        Ok(())
    }
}
