pub mod assets;
pub mod db;

pub use assets::LocalAssetStore;
pub use db::DbAdapter;
