//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use identity_core::domain::{NewUser, OwnerSummary, UserAccount, Video};
use identity_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, full_name, avatar_url, cover_image_url, \
     password_hash, refresh_token, created_at, updated_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn watch_history_of(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT video_id FROM watch_history WHERE user_id = $1 ORDER BY position ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)
    }

    /// Turns a fetched row into a full account, loading its watch history.
    async fn hydrate(&self, record: Option<UserRecord>, what: &str) -> PortResult<UserAccount> {
        let record = record.ok_or_else(|| PortError::NotFound(format!("User {} not found", what)))?;
        let watch_history = self.watch_history_of(record.id).await?;
        Ok(record.to_domain(watch_history))
    }

    async fn fetch_user(&self, sql: &str, user_id: Uuid) -> PortResult<Option<UserRecord>> {
        sqlx::query_as::<_, UserRecord>(sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Unique-constraint violations become `Conflict`, everything else `Unexpected`.
fn conflict_or_unexpected(e: sqlx::Error, conflict: &str) -> PortError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(conflict.to_string())
        }
        _ => unexpected(e),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    full_name: String,
    avatar_url: String,
    cover_image_url: Option<String>,
    password_hash: String,
    refresh_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self, watch_history: Vec<Uuid>) -> UserAccount {
        UserAccount {
            id: self.id,
            username: self.username,
            email: self.email,
            full_name: self.full_name,
            avatar_url: self.avatar_url,
            cover_image_url: self.cover_image_url,
            password_hash: self.password_hash,
            refresh_token: self.refresh_token,
            watch_history,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct VideoRecord {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    description: String,
    video_url: String,
    thumbnail_url: String,
    duration_secs: f64,
    views: i64,
    is_published: bool,
    created_at: DateTime<Utc>,
}
impl VideoRecord {
    fn to_domain(self) -> Video {
        Video {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            description: self.description,
            video_url: self.video_url,
            thumbnail_url: self.thumbnail_url,
            duration_secs: self.duration_secs,
            views: self.views,
            is_published: self.is_published,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct OwnerRecord {
    id: Uuid,
    full_name: String,
    username: String,
    avatar_url: String,
}
impl OwnerRecord {
    fn to_domain(self) -> OwnerSummary {
        OwnerSummary {
            id: self.id,
            full_name: self.full_name,
            username: self.username,
            avatar_url: self.avatar_url,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn insert_user(&self, new_user: NewUser) -> PortResult<UserAccount> {
        let sql = format!(
            "INSERT INTO users (id, username, email, full_name, avatar_url, cover_image_url, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.full_name)
            .bind(&new_user.avatar_url)
            .bind(&new_user.cover_image_url)
            .bind(&new_user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                conflict_or_unexpected(e, "User with email or username already exists")
            })?;
        Ok(record.to_domain(Vec::new()))
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> PortResult<UserAccount> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let record = self.fetch_user(&sql, user_id).await?;
        self.hydrate(record, &user_id.to_string()).await
    }

    async fn find_user_by_username(&self, username: &str) -> PortResult<UserAccount> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        self.hydrate(record, username).await
    }

    async fn find_user_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> PortResult<UserAccount> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE ($1::text IS NOT NULL AND username = $1) \
                OR ($2::text IS NOT NULL AND email = $2) \
             ORDER BY (username IS NOT DISTINCT FROM $1) DESC \
             LIMIT 1"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(username)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        self.hydrate(record, username.or(email).unwrap_or_default())
            .await
    }

    async fn user_exists(&self, username: &str, email: &str) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
        revoke_session: bool,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, \
                 refresh_token = CASE WHEN $3 THEN NULL ELSE refresh_token END, \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(password_hash)
        .bind(revoke_session)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn update_account_details(
        &self,
        user_id: Uuid,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> PortResult<UserAccount> {
        let sql = format!(
            "UPDATE users SET full_name = COALESCE($2, full_name), email = COALESCE($3, email), \
             updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .bind(full_name)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_or_unexpected(e, "Email is already in use"))?;
        self.hydrate(record, &user_id.to_string()).await
    }

    async fn update_avatar(&self, user_id: Uuid, avatar_url: &str) -> PortResult<UserAccount> {
        let sql = format!(
            "UPDATE users SET avatar_url = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .bind(avatar_url)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        self.hydrate(record, &user_id.to_string()).await
    }

    async fn update_cover_image(
        &self,
        user_id: Uuid,
        cover_image_url: &str,
    ) -> PortResult<UserAccount> {
        let sql = format!(
            "UPDATE users SET cover_image_url = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .bind(cover_image_url)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        self.hydrate(record, &user_id.to_string()).await
    }

    async fn set_refresh_token(&self, user_id: Uuid, refresh_token: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE users SET refresh_token = $2 WHERE id = $1")
            .bind(user_id)
            .bind(refresh_token)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> PortResult<bool> {
        // Single conditional UPDATE: the row-level lock serializes competing rotations.
        let result = sqlx::query(
            "UPDATE users SET refresh_token = $3 WHERE id = $1 AND refresh_token = $2",
        )
        .bind(user_id)
        .bind(expected)
        .bind(replacement)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected() == 1)
    }

    async fn clear_refresh_token(&self, user_id: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE users SET refresh_token = NULL WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn count_subscribers(&self, channel_id: Uuid) -> PortResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM subscriptions WHERE channel_id = $1",
        )
        .bind(channel_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(count.max(0) as u64)
    }

    async fn count_subscriptions(&self, subscriber_id: Uuid) -> PortResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1",
        )
        .bind(subscriber_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(count.max(0) as u64)
    }

    async fn is_subscribed(&self, subscriber_id: Uuid, channel_id: Uuid) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2)",
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn get_watch_history(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        if !exists {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        self.watch_history_of(user_id).await
    }

    async fn get_videos_by_ids(&self, video_ids: &[Uuid]) -> PortResult<Vec<Video>> {
        let records = sqlx::query_as::<_, VideoRecord>(
            "SELECT id, owner_id, title, description, video_url, thumbnail_url, duration_secs, \
             views, is_published, created_at FROM videos WHERE id = ANY($1)",
        )
        .bind(video_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_owner_summaries(&self, user_ids: &[Uuid]) -> PortResult<Vec<OwnerSummary>> {
        let records = sqlx::query_as::<_, OwnerRecord>(
            "SELECT id, full_name, username, avatar_url FROM users WHERE id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}
