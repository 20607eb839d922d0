//! Keyward License Server Library
//!
//! Core functionality for the Keyward license server:
//! - SQLite storage for operators, referral tokens, keys, and device bindings
//! - Password hashing and JWT operator sessions
//! - Licensing rules: key issuance, credits, revocation, and verification
//! - The axum HTTP API

pub mod auth;
pub mod error;
pub mod licensing;
pub mod server;
pub mod storage;
