//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use identity_core::{
    AccountManager, AssetStore, DatabaseService, PasswordVerifier, ProfileAggregator,
    SessionManager, SessionPolicy, TokenIssuer, TokenSettings,
};
use std::sync::Arc;

use crate::web::cookies::CookieSettings;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub sessions: Arc<SessionManager>,
    pub accounts: Arc<AccountManager>,
    pub profiles: Arc<ProfileAggregator>,
    pub tokens: Arc<TokenIssuer>,
    pub cookies: CookieSettings,
}

impl AppState {
    /// Wires the core services on top of the given ports.
    pub fn new(
        db: Arc<dyn DatabaseService>,
        assets: Arc<dyn AssetStore>,
        passwords: PasswordVerifier,
        token_settings: &TokenSettings,
        policy: SessionPolicy,
        cookies: CookieSettings,
    ) -> Self {
        let tokens = Arc::new(TokenIssuer::new(token_settings));
        let sessions = SessionManager::new(
            db.clone(),
            assets.clone(),
            passwords,
            tokens.clone(),
            policy,
        );
        Self {
            accounts: Arc::new(AccountManager::new(db.clone(), assets)),
            profiles: Arc::new(ProfileAggregator::new(db.clone())),
            sessions: Arc::new(sessions),
            tokens,
            db,
            cookies,
        }
    }
}
