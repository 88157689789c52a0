//! crates/identity_core/src/memory.rs
//!
//! In-process implementations of the `DatabaseService` and `AssetStore` ports.
//! They back the test suites and let the service run without Postgres.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    AssetUpload, NewUser, OwnerSummary, StoredAsset, Subscription, UserAccount, Video,
};
use crate::ports::{AssetStore, DatabaseService, PortError, PortResult};

//=========================================================================================
// Credential Store
//=========================================================================================

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserAccount>,
    subscriptions: Vec<Subscription>,
    videos: HashMap<Uuid, Video>,
}

impl Tables {
    fn user(&self, user_id: Uuid) -> PortResult<&UserAccount> {
        self.users
            .get(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    fn user_mut(&mut self, user_id: Uuid) -> PortResult<&mut UserAccount> {
        self.users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    fn email_taken_by_other(&self, email: &str, user_id: Uuid) -> bool {
        self.users
            .values()
            .any(|u| u.id != user_id && u.email == email)
    }
}

/// A `DatabaseService` that keeps every table in memory behind one lock.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a subscription edge. Duplicate pairs are ignored.
    pub async fn add_subscription(&self, subscriber: Uuid, channel: Uuid) {
        let edge = Subscription {
            subscriber,
            channel,
        };
        let mut tables = self.tables.write().await;
        if !tables.subscriptions.contains(&edge) {
            tables.subscriptions.push(edge);
        }
    }

    pub async fn add_video(&self, video: Video) {
        self.tables.write().await.videos.insert(video.id, video);
    }

    /// Appends `video_id` to the end of the user's watch history.
    pub async fn record_watch(&self, user_id: Uuid, video_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        tables.user_mut(user_id)?.watch_history.push(video_id);
        Ok(())
    }

    /// Removes a user outright, leaving dangling references behind.
    pub async fn remove_user(&self, user_id: Uuid) {
        self.tables.write().await.users.remove(&user_id);
    }
}

#[async_trait]
impl DatabaseService for InMemoryStore {
    async fn insert_user(&self, new_user: NewUser) -> PortResult<UserAccount> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .users
            .values()
            .any(|u| u.username == new_user.username || u.email == new_user.email);
        if taken {
            return Err(PortError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let account = UserAccount {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            full_name: new_user.full_name,
            avatar_url: new_user.avatar_url,
            cover_image_url: new_user.cover_image_url,
            password_hash: new_user.password_hash,
            refresh_token: None,
            watch_history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> PortResult<UserAccount> {
        self.tables.read().await.user(user_id).cloned()
    }

    async fn find_user_by_username(&self, username: &str) -> PortResult<UserAccount> {
        self.tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", username)))
    }

    async fn find_user_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> PortResult<UserAccount> {
        let tables = self.tables.read().await;
        let by_username =
            username.and_then(|name| tables.users.values().find(|u| u.username == name));
        by_username
            .or_else(|| email.and_then(|mail| tables.users.values().find(|u| u.email == mail)))
            .cloned()
            .ok_or_else(|| PortError::NotFound("User does not exist".to_string()))
    }

    async fn user_exists(&self, username: &str, email: &str) -> PortResult<bool> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .any(|u| u.username == username || u.email == email))
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
        revoke_session: bool,
    ) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables.user_mut(user_id)?;
        user.password_hash = password_hash.to_string();
        if revoke_session {
            user.refresh_token = None;
        }
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_account_details(
        &self,
        user_id: Uuid,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> PortResult<UserAccount> {
        let mut tables = self.tables.write().await;
        if let Some(email) = email {
            if tables.email_taken_by_other(email, user_id) {
                return Err(PortError::Conflict("Email is already in use".to_string()));
            }
        }
        let user = tables.user_mut(user_id)?;
        if let Some(full_name) = full_name {
            user.full_name = full_name.to_string();
        }
        if let Some(email) = email {
            user.email = email.to_string();
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_avatar(&self, user_id: Uuid, avatar_url: &str) -> PortResult<UserAccount> {
        let mut tables = self.tables.write().await;
        let user = tables.user_mut(user_id)?;
        user.avatar_url = avatar_url.to_string();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_cover_image(
        &self,
        user_id: Uuid,
        cover_image_url: &str,
    ) -> PortResult<UserAccount> {
        let mut tables = self.tables.write().await;
        let user = tables.user_mut(user_id)?;
        user.cover_image_url = Some(cover_image_url.to_string());
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_refresh_token(&self, user_id: Uuid, refresh_token: &str) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        tables.user_mut(user_id)?.refresh_token = Some(refresh_token.to_string());
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> PortResult<bool> {
        // Compare and write under the same write guard.
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&user_id) else {
            return Ok(false);
        };
        if user.refresh_token.as_deref() != Some(expected) {
            return Ok(false);
        }
        user.refresh_token = Some(replacement.to_string());
        Ok(true)
    }

    async fn clear_refresh_token(&self, user_id: Uuid) -> PortResult<()> {
        if let Some(user) = self.tables.write().await.users.get_mut(&user_id) {
            user.refresh_token = None;
        }
        Ok(())
    }

    async fn count_subscribers(&self, channel_id: Uuid) -> PortResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .subscriptions
            .iter()
            .filter(|s| s.channel == channel_id)
            .count() as u64)
    }

    async fn count_subscriptions(&self, subscriber_id: Uuid) -> PortResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .subscriptions
            .iter()
            .filter(|s| s.subscriber == subscriber_id)
            .count() as u64)
    }

    async fn is_subscribed(&self, subscriber_id: Uuid, channel_id: Uuid) -> PortResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .subscriptions
            .iter()
            .any(|s| s.subscriber == subscriber_id && s.channel == channel_id))
    }

    async fn get_watch_history(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        Ok(self.tables.read().await.user(user_id)?.watch_history.clone())
    }

    async fn get_videos_by_ids(&self, video_ids: &[Uuid]) -> PortResult<Vec<Video>> {
        let wanted: HashSet<&Uuid> = video_ids.iter().collect();
        let tables = self.tables.read().await;
        Ok(tables
            .videos
            .values()
            .filter(|v| wanted.contains(&v.id))
            .cloned()
            .collect())
    }

    async fn get_owner_summaries(&self, user_ids: &[Uuid]) -> PortResult<Vec<OwnerSummary>> {
        let tables = self.tables.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| tables.users.get(id))
            .map(|u| OwnerSummary {
                id: u.id,
                full_name: u.full_name.clone(),
                username: u.username.clone(),
                avatar_url: u.avatar_url.clone(),
            })
            .collect())
    }
}

//=========================================================================================
// Asset Store
//=========================================================================================

/// An `AssetStore` that remembers uploads in a map.
///
/// `reject_uploads` makes every upload come back unresolved, which is how tests
/// exercise the "asset store gave nothing back" paths.
pub struct InMemoryAssetStore {
    base_url: String,
    assets: RwLock<HashMap<String, AssetUpload>>,
    reject_uploads: bool,
}

impl InMemoryAssetStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            assets: RwLock::new(HashMap::new()),
            reject_uploads: false,
        }
    }

    pub fn rejecting(base_url: impl Into<String>) -> Self {
        Self {
            reject_uploads: true,
            ..Self::new(base_url)
        }
    }

    pub async fn contains(&self, asset_id: &str) -> bool {
        self.assets.read().await.contains_key(asset_id)
    }

    pub async fn len(&self) -> usize {
        self.assets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AssetStore for InMemoryAssetStore {
    async fn upload(&self, upload: &AssetUpload) -> PortResult<Option<StoredAsset>> {
        if self.reject_uploads || upload.data.is_empty() {
            return Ok(None);
        }
        let id = Uuid::new_v4().simple().to_string();
        let extension = upload
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or("bin");
        let url = format!("{}/{}.{}", self.base_url.trim_end_matches('/'), id, extension);
        self.assets.write().await.insert(id.clone(), upload.clone());
        Ok(Some(StoredAsset { id, url }))
    }

    async fn delete(&self, asset_id: &str) -> PortResult<bool> {
        Ok(self.assets.write().await.remove(asset_id).is_some())
    }
}
