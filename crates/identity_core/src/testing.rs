//! crates/identity_core/src/testing.rs
//!
//! Port doubles that wrap the in-memory adapters and fail on request, for the
//! error and cleanup paths of the managers.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{AssetUpload, NewUser, OwnerSummary, StoredAsset, UserAccount, Video};
use crate::memory::{InMemoryAssetStore, InMemoryStore};
use crate::ports::{AssetStore, DatabaseService, PortError, PortResult};

/// Which `DatabaseService` calls should misbehave.
#[derive(Debug, Default, Clone, Copy)]
pub struct Faults {
    /// `user_exists` always answers `false`, so a duplicate is only caught on insert.
    pub hide_existing_users: bool,
    pub fail_image_updates: bool,
    pub fail_password_updates: bool,
}

/// An `InMemoryStore` with injected failures.
pub struct FaultyStore {
    pub inner: InMemoryStore,
    faults: Faults,
}

impl FaultyStore {
    pub fn new(faults: Faults) -> Self {
        Self {
            inner: InMemoryStore::new(),
            faults,
        }
    }
}

fn injected(what: &str) -> PortError {
    PortError::Unexpected(format!("injected {} failure", what))
}

#[async_trait]
impl DatabaseService for FaultyStore {
    async fn insert_user(&self, new_user: NewUser) -> PortResult<UserAccount> {
        self.inner.insert_user(new_user).await
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> PortResult<UserAccount> {
        self.inner.find_user_by_id(user_id).await
    }

    async fn find_user_by_username(&self, username: &str) -> PortResult<UserAccount> {
        self.inner.find_user_by_username(username).await
    }

    async fn find_user_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> PortResult<UserAccount> {
        self.inner.find_user_by_login(username, email).await
    }

    async fn user_exists(&self, username: &str, email: &str) -> PortResult<bool> {
        if self.faults.hide_existing_users {
            return Ok(false);
        }
        self.inner.user_exists(username, email).await
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
        revoke_session: bool,
    ) -> PortResult<()> {
        if self.faults.fail_password_updates {
            return Err(injected("password update"));
        }
        self.inner
            .update_password_hash(user_id, password_hash, revoke_session)
            .await
    }

    async fn update_account_details(
        &self,
        user_id: Uuid,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> PortResult<UserAccount> {
        self.inner
            .update_account_details(user_id, full_name, email)
            .await
    }

    async fn update_avatar(&self, user_id: Uuid, avatar_url: &str) -> PortResult<UserAccount> {
        if self.faults.fail_image_updates {
            return Err(injected("avatar update"));
        }
        self.inner.update_avatar(user_id, avatar_url).await
    }

    async fn update_cover_image(
        &self,
        user_id: Uuid,
        cover_image_url: &str,
    ) -> PortResult<UserAccount> {
        if self.faults.fail_image_updates {
            return Err(injected("cover image update"));
        }
        self.inner.update_cover_image(user_id, cover_image_url).await
    }

    async fn set_refresh_token(&self, user_id: Uuid, refresh_token: &str) -> PortResult<()> {
        self.inner.set_refresh_token(user_id, refresh_token).await
    }

    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> PortResult<bool> {
        self.inner
            .rotate_refresh_token(user_id, expected, replacement)
            .await
    }

    async fn clear_refresh_token(&self, user_id: Uuid) -> PortResult<()> {
        self.inner.clear_refresh_token(user_id).await
    }

    async fn count_subscribers(&self, channel_id: Uuid) -> PortResult<u64> {
        self.inner.count_subscribers(channel_id).await
    }

    async fn count_subscriptions(&self, subscriber_id: Uuid) -> PortResult<u64> {
        self.inner.count_subscriptions(subscriber_id).await
    }

    async fn is_subscribed(&self, subscriber_id: Uuid, channel_id: Uuid) -> PortResult<bool> {
        self.inner.is_subscribed(subscriber_id, channel_id).await
    }

    async fn get_watch_history(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        self.inner.get_watch_history(user_id).await
    }

    async fn get_videos_by_ids(&self, video_ids: &[Uuid]) -> PortResult<Vec<Video>> {
        self.inner.get_videos_by_ids(video_ids).await
    }

    async fn get_owner_summaries(&self, user_ids: &[Uuid]) -> PortResult<Vec<OwnerSummary>> {
        self.inner.get_owner_summaries(user_ids).await
    }
}

/// An `InMemoryAssetStore` whose deletes always fail.
pub struct UndeletableAssets {
    pub inner: InMemoryAssetStore,
}

impl UndeletableAssets {
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: InMemoryAssetStore::new(base_url),
        }
    }
}

#[async_trait]
impl AssetStore for UndeletableAssets {
    async fn upload(&self, upload: &AssetUpload) -> PortResult<Option<StoredAsset>> {
        self.inner.upload(upload).await
    }

    async fn delete(&self, _asset_id: &str) -> PortResult<bool> {
        Err(injected("asset delete"))
    }
}
