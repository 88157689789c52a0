//! crates/identity_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the identity core.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete document store and asset storage.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{AssetUpload, NewUser, OwnerSummary, StoredAsset, UserAccount, Video};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, disk).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflicting record: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The credential store: users, subscriptions and the videos referenced by
/// watch histories.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Records ---

    /// Inserts a user. Fails with `Conflict` when the username or email is taken.
    async fn insert_user(&self, new_user: NewUser) -> PortResult<UserAccount>;

    async fn find_user_by_id(&self, user_id: Uuid) -> PortResult<UserAccount>;

    /// Looks a user up by lower-cased username.
    async fn find_user_by_username(&self, username: &str) -> PortResult<UserAccount>;

    /// Looks a user up by username or email; `None` arguments are ignored.
    async fn find_user_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> PortResult<UserAccount>;

    async fn user_exists(&self, username: &str, email: &str) -> PortResult<bool>;

    /// Stores a new password hash, clearing the refresh token in the same write
    /// when `revoke_session` is set.
    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
        revoke_session: bool,
    ) -> PortResult<()>;

    async fn update_account_details(
        &self,
        user_id: Uuid,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> PortResult<UserAccount>;

    async fn update_avatar(&self, user_id: Uuid, avatar_url: &str) -> PortResult<UserAccount>;

    async fn update_cover_image(
        &self,
        user_id: Uuid,
        cover_image_url: &str,
    ) -> PortResult<UserAccount>;

    // --- Refresh Token (written by the session manager only) ---

    /// Unconditionally stores `refresh_token` as the user's current credential.
    async fn set_refresh_token(&self, user_id: Uuid, refresh_token: &str) -> PortResult<()>;

    /// Atomically replaces the stored refresh token with `replacement` only if it
    /// currently equals `expected`. Returns `false` when nothing was swapped.
    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> PortResult<bool>;

    async fn clear_refresh_token(&self, user_id: Uuid) -> PortResult<()>;

    // --- Subscriptions ---

    /// Number of edges whose `channel` is `channel_id`.
    async fn count_subscribers(&self, channel_id: Uuid) -> PortResult<u64>;

    /// Number of edges whose `subscriber` is `subscriber_id`.
    async fn count_subscriptions(&self, subscriber_id: Uuid) -> PortResult<u64>;

    async fn is_subscribed(&self, subscriber_id: Uuid, channel_id: Uuid) -> PortResult<bool>;

    // --- Watch History ---

    /// The user's watch history in stored order.
    async fn get_watch_history(&self, user_id: Uuid) -> PortResult<Vec<Uuid>>;

    /// Fetches the videos that exist among `video_ids`. Order is unspecified.
    async fn get_videos_by_ids(&self, video_ids: &[Uuid]) -> PortResult<Vec<Video>>;

    /// Minimal owner projections for the users that exist among `user_ids`.
    async fn get_owner_summaries(&self, user_ids: &[Uuid]) -> PortResult<Vec<OwnerSummary>>;
}

/// Binary asset storage for avatars and cover images.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Stores the upload. `Ok(None)` means the store did not accept it.
    async fn upload(&self, upload: &AssetUpload) -> PortResult<Option<StoredAsset>>;

    /// Deletes an asset by id. Returns `false` when nothing was removed.
    async fn delete(&self, asset_id: &str) -> PortResult<bool>;
}
