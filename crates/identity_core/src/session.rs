//! crates/identity_core/src/session.rs
//!
//! The session manager: registration, login, refresh-token rotation, logout and
//! password changes. It is the only writer of a user's stored refresh token.

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{AssetUpload, NewUser, SessionState, TokenPair, User};
use crate::error::{IdentityError, IdentityResult};
use crate::password::PasswordVerifier;
use crate::ports::{AssetStore, DatabaseService, PortError};
use crate::tokens::TokenIssuer;

//=========================================================================================
// Request / Outcome Types
//=========================================================================================

/// Registration input. Uploads are optional here so that a missing avatar is
/// reported as a validation failure rather than a parse failure upstream.
#[derive(Debug, Clone, Default)]
pub struct RegisterUser {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub avatar: Option<AssetUpload>,
    pub cover_image: Option<AssetUpload>,
}

/// Login input: a username or an email (at least one), plus the password.
#[derive(Debug, Clone, Default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

/// Returned by a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub tokens: TokenPair,
}

/// Knobs that change session behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionPolicy {
    /// Clear the stored refresh token after a successful password change.
    pub revoke_sessions_on_password_change: bool,
}

//=========================================================================================
// Input Helpers
//=========================================================================================

/// Trims `value` and returns `None` when nothing is left.
pub(crate) fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

pub(crate) fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

//=========================================================================================
// Session Manager
//=========================================================================================

pub struct SessionManager {
    db: Arc<dyn DatabaseService>,
    assets: Arc<dyn AssetStore>,
    passwords: PasswordVerifier,
    tokens: Arc<TokenIssuer>,
    policy: SessionPolicy,
}

impl SessionManager {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        assets: Arc<dyn AssetStore>,
        passwords: PasswordVerifier,
        tokens: Arc<TokenIssuer>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            db,
            assets,
            passwords,
            tokens,
            policy,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Creates a user with a hashed password and uploaded avatar (and optional cover).
    pub async fn register(&self, input: RegisterUser) -> IdentityResult<User> {
        let fields = [
            &input.full_name,
            &input.email,
            &input.username,
            &input.password,
        ];
        if fields.iter().any(|f| non_blank(f).is_none()) {
            return Err(IdentityError::validation("All fields are required"));
        }

        let username = normalize_username(&input.username);
        let email = normalize_email(&input.email);
        if self.db.user_exists(&username, &email).await? {
            return Err(IdentityError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        let avatar_upload = input
            .avatar
            .as_ref()
            .ok_or_else(|| IdentityError::validation("Avatar file is required"))?;

        // Hash before touching the asset store so a hashing failure leaves nothing behind.
        let password_hash = self.hash_password(input.password.clone()).await?;

        let avatar = self
            .assets
            .upload(avatar_upload)
            .await?
            .ok_or_else(|| IdentityError::validation("Avatar file is required"))?;

        let cover_image = match &input.cover_image {
            Some(upload) => match self.assets.upload(upload).await {
                Ok(stored) => stored,
                Err(e) => {
                    warn!(username = %username, "Cover image upload failed: {}", e);
                    None
                }
            },
            None => None,
        };

        let new_user = NewUser {
            username,
            email,
            full_name: input.full_name.trim().to_string(),
            avatar_url: avatar.url.clone(),
            cover_image_url: cover_image.as_ref().map(|c| c.url.clone()),
            password_hash,
        };

        match self.db.insert_user(new_user).await {
            Ok(account) => {
                info!(user_id = %account.id, username = %account.username, "User registered");
                Ok(account.sanitized())
            }
            Err(e) => {
                self.release_asset(&avatar.id).await;
                if let Some(cover) = &cover_image {
                    self.release_asset(&cover.id).await;
                }
                Err(e.into())
            }
        }
    }

    /// Verifies credentials, then issues and stores a fresh token pair.
    pub async fn login(&self, request: LoginRequest) -> IdentityResult<LoginOutcome> {
        let username = request.username.as_deref().and_then(non_blank);
        let email = request.email.as_deref().and_then(non_blank);
        if username.is_none() && email.is_none() {
            return Err(IdentityError::validation("Username or email is required"));
        }
        if request.password.is_empty() {
            return Err(IdentityError::validation("Password is required"));
        }

        let username = username.map(normalize_username);
        let email = email.map(normalize_email);
        let account = match self
            .db
            .find_user_by_login(username.as_deref(), email.as_deref())
            .await
        {
            Ok(account) => account,
            Err(PortError::NotFound(_)) => {
                self.burn_decoy(request.password).await;
                return Err(IdentityError::NotFound("User does not exist".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let valid = self
            .verify_password(request.password, account.password_hash.clone())
            .await?;
        if !valid {
            warn!(user_id = %account.id, "Login failed: invalid credentials");
            return Err(IdentityError::unauthorized("Invalid user credentials"));
        }

        let tokens = self.tokens.issue_pair(&account)?;
        self.db
            .set_refresh_token(account.id, &tokens.refresh_token)
            .await?;

        info!(user_id = %account.id, "Login successful (refresh token issued)");
        Ok(LoginOutcome {
            user: account.sanitized(),
            tokens,
        })
    }

    /// Exchanges the current refresh token for a new pair, invalidating the old one.
    pub async fn refresh(&self, presented: Option<&str>) -> IdentityResult<TokenPair> {
        let presented = presented
            .and_then(non_blank)
            .ok_or_else(|| IdentityError::unauthorized("Unauthorized request"))?;

        let user_id = self.tokens.verify_refresh_token(presented)?;

        let account = match self.db.find_user_by_id(user_id).await {
            Ok(account) => account,
            Err(PortError::NotFound(_)) => {
                return Err(IdentityError::unauthorized("Invalid refresh token"));
            }
            Err(e) => return Err(e.into()),
        };

        if account.refresh_token.as_deref() != Some(presented) {
            warn!(user_id = %user_id, "Refresh rejected: token superseded or revoked");
            return Err(IdentityError::unauthorized(
                "Refresh token is expired or used",
            ));
        }

        let tokens = self.tokens.issue_pair(&account)?;
        let rotated = self
            .db
            .rotate_refresh_token(user_id, presented, &tokens.refresh_token)
            .await?;
        if !rotated {
            warn!(user_id = %user_id, "Refresh rejected: lost rotation race");
            return Err(IdentityError::unauthorized(
                "Refresh token is expired or used",
            ));
        }

        info!(user_id = %user_id, "Refresh token rotated");
        Ok(tokens)
    }

    /// Clears the stored refresh token. Safe to call repeatedly.
    pub async fn logout(&self, user_id: Uuid) -> IdentityResult<()> {
        self.db.clear_refresh_token(user_id).await?;
        info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> IdentityResult<()> {
        if non_blank(new_password).is_none() {
            return Err(IdentityError::validation("New password is required"));
        }

        let account = self.db.find_user_by_id(user_id).await?;
        let valid = self
            .verify_password(old_password.to_string(), account.password_hash)
            .await?;
        if !valid {
            warn!(user_id = %user_id, "Password change rejected: old password mismatch");
            return Err(IdentityError::unauthorized("Invalid old password"));
        }

        let password_hash = self.hash_password(new_password.to_string()).await?;
        let revoke = self.policy.revoke_sessions_on_password_change;
        self.db
            .update_password_hash(user_id, &password_hash, revoke)
            .await?;

        if revoke {
            info!(user_id = %user_id, "Password changed; session revoked");
        } else {
            info!(user_id = %user_id, "Password changed");
        }
        Ok(())
    }

    pub async fn session_state(&self, user_id: Uuid) -> IdentityResult<SessionState> {
        let account = self.db.find_user_by_id(user_id).await?;
        Ok(match account.refresh_token {
            Some(_) => SessionState::Authenticated,
            None => SessionState::Anonymous,
        })
    }

    //=====================================================================================
    // Blocking Work
    //=====================================================================================

    async fn hash_password(&self, plaintext: String) -> IdentityResult<String> {
        let passwords = self.passwords.clone();
        tokio::task::spawn_blocking(move || passwords.hash(&plaintext))
            .await
            .map_err(|e| IdentityError::Internal(format!("Hashing task failed: {}", e)))?
            .map_err(IdentityError::from)
    }

    async fn verify_password(&self, plaintext: String, digest: String) -> IdentityResult<bool> {
        let passwords = self.passwords.clone();
        tokio::task::spawn_blocking(move || passwords.verify(&plaintext, &digest))
            .await
            .map_err(|e| IdentityError::Internal(format!("Verification task failed: {}", e)))?
            .map_err(IdentityError::from)
    }

    async fn burn_decoy(&self, plaintext: String) {
        let passwords = self.passwords.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || passwords.verify_decoy(&plaintext)).await
        {
            error!("Decoy verification task failed: {}", e);
        }
    }

    async fn release_asset(&self, asset_id: &str) {
        match self.assets.delete(asset_id).await {
            Ok(true) => {}
            Ok(false) => warn!(asset_id = %asset_id, "Orphaned asset was already gone"),
            Err(e) => warn!(asset_id = %asset_id, "Failed to release orphaned asset: {}", e),
        }
    }
}
