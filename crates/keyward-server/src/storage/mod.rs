//! `SQLite` storage for the Keyward license server.
//!
//! Provides persistence for the admin account, resellers, referral tokens,
//! license keys, and device registrations.

mod db;
mod models;
mod queries;
mod queries_keys;
mod repository;


pub use db::LicenseDatabase;
pub use keyward_core::db::DatabaseError;
pub use models::*;
