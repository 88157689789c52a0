//! services/api/src/adapters/assets.rs
//!
//! This module contains the asset store adapter, a concrete implementation of the
//! `AssetStore` port that keeps uploaded images on local disk and serves them
//! under a public base URL.

use std::path::PathBuf;

use async_trait::async_trait;
use identity_core::domain::{AssetUpload, StoredAsset};
use identity_core::ports::{AssetStore, PortError, PortResult};
use tracing::{debug, warn};
use uuid::Uuid;

const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `AssetStore` port on top of a directory.
#[derive(Clone)]
pub struct LocalAssetStore {
    root: PathBuf,
    public_url: String,
}

impl LocalAssetStore {
    /// Creates a new `LocalAssetStore`, creating `root` if it does not exist.
    pub async fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> std::io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Asset ids are generated here, so anything else is refused before touching disk.
    fn is_valid_id(asset_id: &str) -> bool {
        !asset_id.is_empty() && asset_id.chars().all(|c| c.is_ascii_hexdigit())
    }

    fn extension_of(file_name: &str) -> Option<String> {
        let (_, ext) = file_name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
    }

    async fn find_file(&self, asset_id: &str) -> PortResult<Option<PathBuf>> {
        for ext in ALLOWED_EXTENSIONS {
            let candidate = self.root.join(format!("{}.{}", asset_id, ext));
            let exists = tokio::fs::try_exists(&candidate)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            if exists {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

//=========================================================================================
// `AssetStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn upload(&self, upload: &AssetUpload) -> PortResult<Option<StoredAsset>> {
        if upload.data.is_empty() {
            return Ok(None);
        }
        let Some(ext) = Self::extension_of(&upload.file_name) else {
            warn!(file_name = %upload.file_name, "Rejected upload with unsupported extension");
            return Ok(None);
        };

        let id = Uuid::new_v4().simple().to_string();
        let file_name = format!("{}.{}", id, ext);
        let path = self.root.join(&file_name);
        if let Err(e) = tokio::fs::write(&path, &upload.data).await {
            warn!(path = %path.display(), "Failed to store upload: {}", e);
            return Ok(None);
        }

        debug!(asset_id = %id, bytes = upload.data.len(), "Stored asset");
        Ok(Some(StoredAsset {
            url: format!("{}/{}", self.public_url, file_name),
            id,
        }))
    }

    async fn delete(&self, asset_id: &str) -> PortResult<bool> {
        if !Self::is_valid_id(asset_id) {
            return Ok(false);
        }
        let Some(path) = self.find_file(asset_id).await? else {
            return Ok(false);
        };
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        debug!(asset_id = %asset_id, "Deleted asset");
        Ok(true)
    }
}
