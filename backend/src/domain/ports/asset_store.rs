//! Driven port for uploaded asset storage.

use std::fmt;

use async_trait::async_trait;
use uuid::Uuid;

/// Failures surfaced by asset storage adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetStoreError {
    /// The asset does not exist.
    #[error("asset not found")]
    NotFound,
    /// An I/O failure in the backing store.
    #[error("asset store error: {message}")]
    Io {
        /// Adapter-provided context.
        message: String,
    },
}

impl AssetStoreError {
    /// Create an I/O error with the given message.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }
}

/// Stable asset identifier. Always a UUID, so adapters can derive file names
/// from it without any path-traversal surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId(Uuid);

impl AssetId {
    /// Generate a new random [`AssetId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an asset id from its string form.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored asset: bytes plus the content type recorded at upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    /// Raw bytes.
    pub bytes: Vec<u8>,
    /// Content type recorded at upload.
    pub content_type: String,
}

/// Driven port for asset storage.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store an asset and return its identifier.
    async fn store(&self, bytes: Vec<u8>, content_type: &str)
    -> Result<AssetId, AssetStoreError>;

    /// Load an asset by identifier.
    async fn load(&self, id: &AssetId) -> Result<StoredAsset, AssetStoreError>;
}

/// In-memory [`AssetStore`] used by tests and database-less runs.
#[derive(Debug, Default)]
pub struct InMemoryAssetStore {
    assets: std::sync::RwLock<std::collections::HashMap<AssetId, StoredAsset>>,
}

impl InMemoryAssetStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssetStore for InMemoryAssetStore {
    async fn store(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<AssetId, AssetStoreError> {
        let id = AssetId::random();
        let mut assets = self
            .assets
            .write()
            .map_err(|_| AssetStoreError::io("asset store lock poisoned"))?;
        assets.insert(
            id,
            StoredAsset {
                bytes,
                content_type: content_type.to_owned(),
            },
        );
        Ok(id)
    }

    async fn load(&self, id: &AssetId) -> Result<StoredAsset, AssetStoreError> {
        let assets = self
            .assets
            .read()
            .map_err(|_| AssetStoreError::io("asset store lock poisoned"))?;
        assets.get(id).cloned().ok_or(AssetStoreError::NotFound)
    }
}
