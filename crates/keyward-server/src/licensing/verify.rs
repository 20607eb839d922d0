//! Device-bound key verification.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. the key exists
//! 2. the key is active
//! 3. the key has not expired
//! 4. the device already holds a slot, or a free slot can be claimed
//!
//! Only step 4 writes, and only on a device's first successful use. The
//! claim is a single conditional insert in the store, so concurrent calls
//! for the last slot cannot both succeed.

use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::LicenseService;
use crate::error::LicenseResult;
use crate::storage::{BindOutcome, LicenseKey};

/// Longest device identifier accepted.
const MAX_DEVICE_ID_LEN: usize = 256;

/// Stable, machine-checkable verification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyCode {
    Valid,
    DeviceRegistered,
    InvalidRequest,
    InvalidKey,
    Revoked,
    Expired,
    DeviceLimitReached,
    InternalError,
}

impl VerifyCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::DeviceRegistered => "device_registered",
            Self::InvalidRequest => "invalid_request",
            Self::InvalidKey => "invalid_key",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
            Self::DeviceLimitReached => "device_limit_reached",
            Self::InternalError => "internal_error",
        }
    }

    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Valid | Self::DeviceRegistered)
    }
}

impl std::fmt::Display for VerifyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a verification request. `game` and `expires_at` are only
/// present on acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub code: VerifyCode,
    pub message: String,
    pub game: Option<String>,
    pub expires_at: Option<i64>,
}

impl Verdict {
    pub fn reject(code: VerifyCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            game: None,
            expires_at: None,
        }
    }

    fn accept(code: VerifyCode, key: &LicenseKey) -> Self {
        let message = match code {
            VerifyCode::DeviceRegistered => "Key validated and device registered",
            _ => "Key validated successfully",
        };
        Self {
            code,
            message: message.to_string(),
            game: Some(key.game.clone()),
            expires_at: Some(key.expires_at),
        }
    }

    pub const fn accepted(&self) -> bool {
        self.code.is_accepted()
    }
}

/// Active and expiry checks for a key at time `now`.
pub fn check_key_state(key: &LicenseKey, now: i64) -> Result<(), VerifyCode> {
    if !key.is_active {
        return Err(VerifyCode::Revoked);
    }
    if now >= key.expires_at {
        return Err(VerifyCode::Expired);
    }
    Ok(())
}

fn state_message(code: VerifyCode) -> &'static str {
    match code {
        VerifyCode::Revoked => "Key has been revoked",
        VerifyCode::Expired => "Key has expired",
        _ => "Invalid key",
    }
}

impl LicenseService {
    /// Verify `key` for `device_id`, binding the device on first use.
    ///
    /// Never fails: storage errors become an `internal_error` verdict.
    #[instrument(skip_all, fields(op = "verify"))]
    pub async fn verify(&self, key: &str, device_id: &str) -> Verdict {
        let key = key.trim();
        let device_id = device_id.trim();
        if key.is_empty() || device_id.is_empty() {
            return Verdict::reject(VerifyCode::InvalidRequest, "Key and deviceId are required");
        }
        if device_id.len() > MAX_DEVICE_ID_LEN {
            return Verdict::reject(
                VerifyCode::InvalidRequest,
                format!("deviceId must be at most {MAX_DEVICE_ID_LEN} characters"),
            );
        }

        let verdict = match self.evaluate(key, device_id).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(error = %e, "Verification failed");
                Verdict::reject(
                    VerifyCode::InternalError,
                    "An error occurred during verification",
                )
            }
        };

        if !verdict.accepted() {
            debug!(code = %verdict.code, "Verification rejected");
        }
        verdict
    }

    async fn evaluate(&self, key: &str, device_id: &str) -> LicenseResult<Verdict> {
        let Some(license) = self.store.find_key_by_value(key).await? else {
            return Ok(Verdict::reject(VerifyCode::InvalidKey, "Invalid key"));
        };

        let now = self.now();
        if let Err(code) = check_key_state(&license, now) {
            return Ok(Verdict::reject(code, state_message(code)));
        }

        if self.store.find_binding(license.id, device_id).await?.is_some() {
            return Ok(Verdict::accept(VerifyCode::Valid, &license));
        }

        let outcome = self
            .store
            .bind_device(license.id, device_id, license.device_limit, now)
            .await?;

        Ok(match outcome {
            BindOutcome::Bound(_) => {
                debug!(key_id = license.id, "Device registered");
                Verdict::accept(VerifyCode::DeviceRegistered, &license)
            }
            BindOutcome::AlreadyBound(_) => Verdict::accept(VerifyCode::Valid, &license),
            BindOutcome::LimitReached => Verdict::reject(
                VerifyCode::DeviceLimitReached,
                format!("Device limit reached ({})", license.device_limit),
            ),
        })
    }
}
