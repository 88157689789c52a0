//! crates/identity_core/src/domain.rs
//!
//! Defines the pure, core data structures for the identity service.
//! These structs are independent of any database or serialization format.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The full stored user record, secrets included.
///
/// Only the core services and the credential store adapters see this type.
/// Anything that leaves the core goes through [`UserAccount::sanitized`].
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub password_hash: String,
    pub refresh_token: Option<String>,
    pub watch_history: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    /// Read projection with the password hash and refresh token dropped.
    pub fn sanitized(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            avatar_url: self.avatar_url.clone(),
            cover_image_url: self.cover_image_url.clone(),
            watch_history: self.watch_history.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Sanitized user projection - used throughout the app and returned to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub watch_history: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a new user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub password_hash: String,
}

/// A directed "subscriber follows channel" edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub subscriber: Uuid,
    pub channel: Uuid,
}

/// A published video, as referenced from a user's watch history.
#[derive(Debug, Clone, PartialEq)]
pub struct Video {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub duration_secs: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// Minimal owner fields attached to each watch-history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerSummary {
    pub id: Uuid,
    pub full_name: String,
    pub username: String,
    pub avatar_url: String,
}

/// One row of a user's watch history: the video plus who published it.
///
/// `owner` is `None` when the owning account no longer exists.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchHistoryEntry {
    pub video: Video,
    pub owner: Option<OwnerSummary>,
}

/// A user viewed as a channel, with its social-graph counters.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelProfile {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub subscriber_count: u64,
    pub channels_subscribed_to_count: u64,
    pub is_subscribed: bool,
}

/// An access/refresh token pair minted for one user.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Where a user's session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No refresh token is stored for the user.
    Anonymous,
    /// A refresh token is stored and may be exchanged.
    Authenticated,
    /// A rotation is between verification and the swap. The swap is a single
    /// conditional write, so `SessionManager::session_state` never reports this.
    RefreshPending,
}

/// A file handed to the asset store, already read into memory.
#[derive(Debug, Clone)]
pub struct AssetUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// What the asset store hands back once an upload is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub id: String,
    pub url: String,
}

/// Derives the deletable asset id from a stored asset URL: the final path
/// segment with its extension removed.
pub fn asset_id_from_url(url: &str) -> Option<&str> {
    let start = url.rfind('/').map_or(0, |i| i + 1);
    let segment = &url[start..];
    let id = match segment.rfind('.') {
        Some(dot) => &segment[..dot],
        None => segment,
    };
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_id_is_last_segment_without_extension() {
        assert_eq!(
            asset_id_from_url("http://cdn.local/assets/3f2a9c.png"),
            Some("3f2a9c")
        );
        assert_eq!(asset_id_from_url("http://cdn.local/assets/raw"), Some("raw"));
        assert_eq!(asset_id_from_url("http://cdn.local/assets/"), None);
    }

    #[test]
    fn sanitized_projection_keeps_public_fields() {
        let now = Utc::now();
        let account = UserAccount {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            full_name: "Alice".into(),
            avatar_url: "http://cdn.local/a.png".into(),
            cover_image_url: None,
            password_hash: "$argon2id$secret".into(),
            refresh_token: Some("token".into()),
            watch_history: vec![],
            created_at: now,
            updated_at: now,
        };
        let user = account.sanitized();
        assert_eq!(user.id, account.id);
        assert_eq!(user.username, "alice");
        assert_eq!(user.avatar_url, account.avatar_url);
    }
}
