//! services/api/src/lib.rs
//!
//! The HTTP shell around `identity_core`: configuration, adapters and the axum router.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
