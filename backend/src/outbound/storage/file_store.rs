//! Capability-scoped filesystem implementation of the asset store.
//!
//! The adapter holds a [`cap_std::fs::Dir`] handle, so every path it can
//! touch is inside the storage root by construction. Asset ids are UUIDs and
//! file names are derived from them, leaving no path-traversal surface.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use tokio::task;

use crate::domain::ports::{AssetId, AssetStore, AssetStoreError, StoredAsset};

/// Filesystem-backed [`AssetStore`].
#[derive(Clone)]
pub struct CapFileStore {
    dir: Arc<Dir>,
}

impl CapFileStore {
    /// Open the storage root, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the directory cannot be created or opened.
    pub fn open(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        let dir = Dir::open_ambient_dir(root, ambient_authority())?;
        Ok(Self { dir: Arc::new(dir) })
    }

    fn data_name(id: &AssetId) -> String {
        format!("{id}.bin")
    }

    fn meta_name(id: &AssetId) -> String {
        format!("{id}.meta")
    }
}

fn map_io(error: std::io::Error) -> AssetStoreError {
    AssetStoreError::io(error.to_string())
}

#[async_trait]
impl AssetStore for CapFileStore {
    async fn store(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<AssetId, AssetStoreError> {
        let id = AssetId::random();
        let dir = self.dir.clone();
        // Content types are header values; keep the sidecar single-line.
        let content_type = content_type.replace(['\r', '\n'], " ");
        task::spawn_blocking(move || {
            dir.write(CapFileStore::data_name(&id), &bytes)?;
            dir.write(CapFileStore::meta_name(&id), content_type.as_bytes())?;
            Ok::<_, std::io::Error>(())
        })
        .await
        .map_err(|error| AssetStoreError::io(format!("storage task failed: {error}")))?
        .map_err(map_io)?;
        Ok(id)
    }

    async fn load(&self, id: &AssetId) -> Result<StoredAsset, AssetStoreError> {
        let dir = self.dir.clone();
        let id = *id;
        task::spawn_blocking(move || {
            let bytes = match dir.read(CapFileStore::data_name(&id)) {
                Ok(bytes) => bytes,
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                    return Err(AssetStoreError::NotFound);
                }
                Err(error) => return Err(map_io(error)),
            };
            let content_type = dir
                .read_to_string(CapFileStore::meta_name(&id))
                .unwrap_or_else(|_| "application/octet-stream".to_owned());
            Ok(StoredAsset {
                bytes,
                content_type,
            })
        })
        .await
        .map_err(|error| AssetStoreError::io(format!("storage task failed: {error}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_then_load_round_trips() {
        let root = tempfile::tempdir().expect("temp dir");
        let store = CapFileStore::open(root.path()).expect("store opens");

        let id = store
            .store(b"asset bytes".to_vec(), "image/webp")
            .await
            .expect("store succeeds");
        let asset = store.load(&id).await.expect("asset present");
        assert_eq!(asset.bytes, b"asset bytes");
        assert_eq!(asset.content_type, "image/webp");
    }

    #[tokio::test]
    async fn missing_assets_report_not_found() {
        let root = tempfile::tempdir().expect("temp dir");
        let store = CapFileStore::open(root.path()).expect("store opens");
        assert_eq!(
            store.load(&AssetId::random()).await,
            Err(AssetStoreError::NotFound)
        );
    }

    #[tokio::test]
    async fn header_newlines_are_flattened() {
        let root = tempfile::tempdir().expect("temp dir");
        let store = CapFileStore::open(root.path()).expect("store opens");
        let id = store
            .store(b"x".to_vec(), "image/png\r\nX-Sneaky: 1")
            .await
            .expect("store succeeds");
        let asset = store.load(&id).await.expect("asset present");
        assert!(!asset.content_type.contains('\n'));
    }
}
