//! Key registry: issuance, ownership checks, revocation, and reset.

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use tracing::{info, instrument};

use super::keygen::{generate_key, normalize_custom_key};
use super::{DEVICE_LIMITS, EXPIRY_DAYS, LicenseService, SECS_PER_DAY};
use crate::auth::Principal;
use crate::error::{LicenseError, LicenseResult};
use crate::storage::{DeviceRegistration, IssueOutcome, LicenseKey, NewKey};

/// What a reseller asks for when minting a key.
///
/// Form clients send the numeric fields as strings, so both `30` and `"30"`
/// are accepted.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySpec {
    #[serde(default)]
    pub game: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub device_limit: i64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub expiry_days: i64,
    /// Caller-chosen key string; generated when absent or blank.
    #[serde(default)]
    pub custom_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedKey {
    pub key: LicenseKey,
    pub credits_remaining: i64,
}

impl LicenseService {
    fn validate_spec(&self, spec: &KeySpec) -> LicenseResult<String> {
        let game = spec.game.trim();
        if game.is_empty() {
            return Err(LicenseError::Validation("Game is required".into()));
        }
        if !self.games.iter().any(|g| g == game) {
            return Err(LicenseError::Validation(format!("Unknown game: {game}")));
        }
        if !DEVICE_LIMITS.contains(&spec.device_limit) {
            return Err(LicenseError::Validation(
                "Device limit must be 1, 2, or 100".into(),
            ));
        }
        if !EXPIRY_DAYS.contains(&spec.expiry_days) {
            return Err(LicenseError::Validation(format!(
                "Expiry days must be between {} and {}",
                EXPIRY_DAYS.start(),
                EXPIRY_DAYS.end()
            )));
        }
        Ok(game.to_string())
    }

    /// Mint a key for `owner_id`, spending one of its credits.
    ///
    /// The debit and the insert commit together; a duplicate key string
    /// leaves the balance untouched.
    #[instrument(skip(self, spec), fields(op = "create_key"))]
    pub async fn create_key(&self, owner_id: i64, spec: &KeySpec) -> LicenseResult<IssuedKey> {
        let game = self.validate_spec(spec)?;

        let key = match spec.custom_key.as_deref().map(str::trim) {
            Some(custom) if !custom.is_empty() => normalize_custom_key(custom)?,
            _ => generate_key(&game),
        };

        let now = self.now();
        let outcome = self
            .store
            .issue_key(&NewKey {
                key: &key,
                game: &game,
                device_limit: spec.device_limit,
                expiry_days: spec.expiry_days,
                owner_id,
                created_at: now,
                expires_at: now + spec.expiry_days * SECS_PER_DAY,
            })
            .await?;

        match outcome {
            IssueOutcome::Issued {
                key,
                credits_remaining,
            } => {
                info!(
                    key_id = key.id,
                    owner_id,
                    game = %key.game,
                    device_limit = key.device_limit,
                    expiry_days = key.expiry_days,
                    credits_remaining,
                    "License key issued"
                );
                Ok(IssuedKey {
                    key,
                    credits_remaining,
                })
            }
            IssueOutcome::InsufficientCredits => Err(LicenseError::InsufficientCredits),
            IssueOutcome::DuplicateKey => Err(LicenseError::DuplicateKey),
            IssueOutcome::UnknownReseller => Err(LicenseError::NotFound("Reseller".into())),
        }
    }

    pub async fn get_key(&self, id: i64) -> LicenseResult<LicenseKey> {
        self.store
            .find_key(id)
            .await?
            .ok_or_else(|| LicenseError::NotFound("Key".into()))
    }

    pub async fn find_key(&self, value: &str) -> LicenseResult<LicenseKey> {
        self.store
            .find_key_by_value(value)
            .await?
            .ok_or_else(|| LicenseError::NotFound("Key".into()))
    }

    pub async fn list_keys_for(&self, owner_id: i64) -> LicenseResult<Vec<LicenseKey>> {
        Ok(self.store.list_keys_by_owner(owner_id).await?)
    }

    pub async fn list_all_keys(&self) -> LicenseResult<Vec<LicenseKey>> {
        Ok(self.store.list_keys().await?)
    }

    /// Fetch a key and check that `owner_id` issued it.
    async fn owned_key(&self, owner_id: i64, key_id: i64, action: &str) -> LicenseResult<LicenseKey> {
        let key = self.get_key(key_id).await?;
        if key.owner_id != Some(owner_id) {
            return Err(LicenseError::Forbidden(format!(
                "Not authorized to {action} this key"
            )));
        }
        Ok(key)
    }

    /// Permanently deactivate a key. Deactivating twice is harmless.
    pub async fn deactivate_key(&self, key_id: i64) -> LicenseResult<LicenseKey> {
        self.store
            .deactivate_key(key_id)
            .await?
            .ok_or_else(|| LicenseError::NotFound("Key".into()))
    }

    /// Revoke a key on behalf of the reseller that issued it.
    pub async fn revoke_key(&self, owner_id: i64, key_id: i64) -> LicenseResult<LicenseKey> {
        self.owned_key(owner_id, key_id, "revoke").await?;
        let key = self.deactivate_key(key_id).await?;
        info!(key_id, owner_id, "License key revoked");
        Ok(key)
    }

    /// Release every device slot of a key and restart its validity period
    /// from now. The creation time is kept.
    pub async fn reset_key(&self, owner_id: i64, key_id: i64) -> LicenseResult<LicenseKey> {
        let key = self.owned_key(owner_id, key_id, "reset").await?;
        if !key.is_active {
            return Err(LicenseError::Validation(
                "Revoked keys cannot be reset".into(),
            ));
        }

        let expires_at = self.now() + key.expiry_days * SECS_PER_DAY;
        let Some(key) = self.store.reset_key(key_id, expires_at).await? else {
            // Revoked between the check above and the write.
            return Err(LicenseError::Validation(
                "Revoked keys cannot be reset".into(),
            ));
        };

        info!(key_id, owner_id, expires_at, "License key reset");
        Ok(key)
    }

    /// Devices bound to a key. Admins see any key; resellers only their own.
    pub async fn list_devices(
        &self,
        principal: &Principal,
        key_id: i64,
    ) -> LicenseResult<Vec<DeviceRegistration>> {
        if principal.is_admin() {
            self.get_key(key_id).await?;
        } else {
            self.owned_key(principal.id, key_id, "view").await?;
        }
        Ok(self.store.list_bindings(key_id).await?)
    }
}
