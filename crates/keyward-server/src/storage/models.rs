//! Data models for Keyward storage.
//!
//! Rows serialize with camelCase field names; they double as the JSON
//! representation on the management API. Password hashes never serialize.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reseller {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub credits: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReferralToken {
    pub id: i64,
    pub token: String,
    pub created_by: String,
    pub used: bool,
    pub used_by: Option<String>,
    pub created_at: i64,
    pub used_at: Option<i64>,
}

/// A license key joined with its owner's current username.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LicenseKey {
    pub id: i64,
    #[sqlx(rename = "key_value")]
    pub key: String,
    pub game: String,
    pub device_limit: i64,
    pub expiry_days: i64,
    /// `None` once the issuing reseller has been deleted.
    pub owner_id: Option<i64>,
    pub created_by: Option<String>,
    pub created_at: i64,
    pub expires_at: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration {
    pub id: i64,
    pub key_id: i64,
    pub device_id: String,
    pub registered_at: i64,
}

/// Parameters for issuing a license key.
pub struct NewKey<'a> {
    pub key: &'a str,
    pub game: &'a str,
    pub device_limit: i64,
    pub expiry_days: i64,
    pub owner_id: i64,
    pub created_at: i64,
    pub expires_at: i64,
}

/// Result of the combined credit debit and key insert.
#[derive(Debug)]
pub enum IssueOutcome {
    Issued { key: LicenseKey, credits_remaining: i64 },
    InsufficientCredits,
    DuplicateKey,
    UnknownReseller,
}

/// Result of the combined referral consumption and reseller insert.
#[derive(Debug)]
pub enum RegistrationOutcome {
    Created(Reseller),
    UsernameTaken,
    InvalidToken,
}

/// Result of an attempt to bind a device to a key.
#[derive(Debug)]
pub enum BindOutcome {
    /// A new slot was consumed.
    Bound(DeviceRegistration),
    /// The device already held a slot on this key.
    AlreadyBound(DeviceRegistration),
    LimitReached,
}
