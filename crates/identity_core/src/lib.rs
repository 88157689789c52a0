pub mod account;
pub mod domain;
pub mod error;
pub mod memory;
pub mod password;
pub mod ports;
pub mod profile;
pub mod session;
pub mod tokens;

#[cfg(test)]
mod testing;

pub use account::{AccountManager, ImageSlot};
pub use domain::{
    asset_id_from_url, AssetUpload, ChannelProfile, NewUser, OwnerSummary, SessionState,
    StoredAsset, Subscription, TokenPair, User, UserAccount, Video, WatchHistoryEntry,
};
pub use error::{IdentityError, IdentityResult};
pub use password::{PasswordError, PasswordSettings, PasswordVerifier};
pub use ports::{AssetStore, DatabaseService, PortError, PortResult};
pub use profile::ProfileAggregator;
pub use session::{LoginOutcome, LoginRequest, RegisterUser, SessionManager, SessionPolicy};
pub use tokens::{AccessClaims, ProfileClaims, TokenError, TokenIssuer, TokenSettings};
