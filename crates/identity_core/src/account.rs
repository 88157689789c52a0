//! crates/identity_core/src/account.rs
//!
//! Profile maintenance for an authenticated user: reading the current account,
//! editing contact details and swapping the avatar or cover image.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{asset_id_from_url, AssetUpload, User, UserAccount};
use crate::error::{IdentityError, IdentityResult};
use crate::ports::{AssetStore, DatabaseService, PortResult};
use crate::session::{non_blank, normalize_email};

/// Which image slot of the profile an upload replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Avatar,
    CoverImage,
}

impl ImageSlot {
    fn label(self) -> &'static str {
        match self {
            Self::Avatar => "Avatar",
            Self::CoverImage => "Cover image",
        }
    }

    fn current_url(self, account: &UserAccount) -> Option<&str> {
        match self {
            Self::Avatar => Some(account.avatar_url.as_str()),
            Self::CoverImage => account.cover_image_url.as_deref(),
        }
    }
}

pub struct AccountManager {
    db: Arc<dyn DatabaseService>,
    assets: Arc<dyn AssetStore>,
}

impl AccountManager {
    pub fn new(db: Arc<dyn DatabaseService>, assets: Arc<dyn AssetStore>) -> Self {
        Self { db, assets }
    }

    pub async fn current_user(&self, user_id: Uuid) -> IdentityResult<User> {
        Ok(self.db.find_user_by_id(user_id).await?.sanitized())
    }

    /// Updates the full name and/or email. At least one must be given.
    pub async fn update_account_details(
        &self,
        user_id: Uuid,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> IdentityResult<User> {
        let full_name = full_name.and_then(non_blank);
        let email = email.and_then(non_blank).map(normalize_email);
        if full_name.is_none() && email.is_none() {
            return Err(IdentityError::validation(
                "Full name or email is required",
            ));
        }

        let account = self
            .db
            .update_account_details(user_id, full_name, email.as_deref())
            .await?;
        info!(user_id = %user_id, "Account details updated");
        Ok(account.sanitized())
    }

    pub async fn update_avatar(
        &self,
        user_id: Uuid,
        upload: Option<AssetUpload>,
    ) -> IdentityResult<User> {
        self.replace_image(user_id, upload, ImageSlot::Avatar).await
    }

    pub async fn update_cover_image(
        &self,
        user_id: Uuid,
        upload: Option<AssetUpload>,
    ) -> IdentityResult<User> {
        self.replace_image(user_id, upload, ImageSlot::CoverImage)
            .await
    }

    /// Upload first, persist the new URL, and only then delete the previous asset.
    async fn replace_image(
        &self,
        user_id: Uuid,
        upload: Option<AssetUpload>,
        slot: ImageSlot,
    ) -> IdentityResult<User> {
        let upload = upload.ok_or_else(|| {
            IdentityError::validation(format!("{} file is missing", slot.label()))
        })?;

        let current = self.db.find_user_by_id(user_id).await?;
        let previous_url = slot.current_url(&current).map(str::to_string);

        let stored = self.assets.upload(&upload).await?.ok_or_else(|| {
            IdentityError::validation(format!("Error while uploading {} file", slot.label()))
        })?;

        let updated = match self.persist_image(user_id, &stored.url, slot).await {
            Ok(account) => account,
            Err(e) => {
                if let Err(cleanup) = self.assets.delete(&stored.id).await {
                    warn!(asset_id = %stored.id, "Failed to release unused upload: {}", cleanup);
                }
                return Err(e.into());
            }
        };

        if let Some(old_id) = previous_url.as_deref().and_then(asset_id_from_url) {
            match self.assets.delete(old_id).await {
                Ok(true) => {}
                Ok(false) => warn!(asset_id = %old_id, "Previous asset was already gone"),
                Err(e) => warn!(asset_id = %old_id, "Failed to delete previous asset: {}", e),
            }
        }

        info!(user_id = %user_id, slot = ?slot, "Profile image replaced");
        Ok(updated.sanitized())
    }

    async fn persist_image(
        &self,
        user_id: Uuid,
        url: &str,
        slot: ImageSlot,
    ) -> PortResult<UserAccount> {
        match slot {
            ImageSlot::Avatar => self.db.update_avatar(user_id, url).await,
            ImageSlot::CoverImage => self.db.update_cover_image(user_id, url).await,
        }
    }
}
