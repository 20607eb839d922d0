//! Operator identities: the admin account, reseller accounts, and the
//! referral tokens that gate reseller registration.

use serde::Deserialize;
use tracing::{info, warn};

use super::LicenseService;
use super::keygen::generate_referral_token;
use crate::auth::password;
use crate::auth::{Principal, Role};
use crate::error::{LicenseError, LicenseResult};
use crate::storage::{ReferralToken, RegistrationOutcome, Reseller};

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=50;
const PASSWORD_MIN: usize = 6;
const REFERRAL_TOKEN_MIN: usize = 5;
const GENERATED_ADMIN_PASSWORD_LEN: usize = 24;

/// A reseller sign-up request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub referral_token: String,
}

impl Registration {
    fn validate(&self) -> LicenseResult<()> {
        if !USERNAME_LEN.contains(&self.username.chars().count()) {
            return Err(LicenseError::Validation(format!(
                "Username must be {} to {} characters",
                USERNAME_LEN.start(),
                USERNAME_LEN.end()
            )));
        }
        if self.username.trim() != self.username {
            return Err(LicenseError::Validation(
                "Username must not start or end with whitespace".into(),
            ));
        }
        if self.password.chars().count() < PASSWORD_MIN {
            return Err(LicenseError::Validation(format!(
                "Password must be at least {PASSWORD_MIN} characters"
            )));
        }
        if self.referral_token.chars().count() < REFERRAL_TOKEN_MIN {
            return Err(LicenseError::Validation(format!(
                "Referral token must be at least {REFERRAL_TOKEN_MIN} characters"
            )));
        }
        Ok(())
    }
}

fn hash(password: &str) -> LicenseResult<String> {
    password::hash_password(password)
        .map_err(|e| LicenseError::Internal(format!("Password hashing failed: {e}")))
}

fn matches(password: &str, stored_hash: &str) -> LicenseResult<bool> {
    password::verify_password(password, stored_hash)
        .map_err(|e| LicenseError::Internal(format!("Password verification failed: {e}")))
}

fn invalid_credentials() -> LicenseError {
    LicenseError::Unauthorized("Invalid credentials".into())
}

impl LicenseService {
    // =========================================================================
    // Admin account
    // =========================================================================

    /// Make sure the admin account exists.
    ///
    /// A supplied password always replaces the stored hash. Without one, an
    /// existing account is left alone and a missing account is created with
    /// a random password, which is returned so the caller can show it once.
    pub async fn ensure_admin(
        &self,
        username: &str,
        password: Option<&str>,
    ) -> LicenseResult<Option<String>> {
        if let Some(password) = password {
            self.store
                .upsert_admin(username, &hash(password)?, self.now())
                .await?;
            info!(username, "Admin credentials updated");
            return Ok(None);
        }

        if self.store.find_admin(username).await?.is_some() {
            return Ok(None);
        }

        let generated = password::generate_password(GENERATED_ADMIN_PASSWORD_LEN);
        self.store
            .upsert_admin(username, &hash(&generated)?, self.now())
            .await?;
        info!(username, "Admin account created");
        Ok(Some(generated))
    }

    pub async fn login_admin(&self, username: &str, password: &str) -> LicenseResult<Principal> {
        let Some(admin) = self.store.find_admin(username).await? else {
            warn!(username, "Failed admin login attempt");
            return Err(invalid_credentials());
        };
        if !matches(password, &admin.password_hash)? {
            warn!(username, "Failed admin login attempt");
            return Err(invalid_credentials());
        }

        info!(username, "Admin logged in");
        Ok(Principal {
            id: admin.id,
            username: admin.username,
            role: Role::Admin,
        })
    }

    // =========================================================================
    // Resellers
    // =========================================================================

    pub async fn login_reseller(&self, username: &str, password: &str) -> LicenseResult<Principal> {
        let Some(reseller) = self.store.find_reseller_by_username(username).await? else {
            warn!(username, "Failed reseller login attempt");
            return Err(invalid_credentials());
        };
        if !matches(password, &reseller.password_hash)? {
            warn!(username, "Failed reseller login attempt");
            return Err(invalid_credentials());
        }

        info!(reseller_id = reseller.id, username, "Reseller logged in");
        Ok(Principal {
            id: reseller.id,
            username: reseller.username,
            role: Role::Reseller,
        })
    }

    /// Create a reseller account by consuming a referral token.
    pub async fn register_reseller(&self, registration: &Registration) -> LicenseResult<Reseller> {
        registration.validate()?;

        if self
            .store
            .find_reseller_by_username(&registration.username)
            .await?
            .is_some()
        {
            return Err(LicenseError::UsernameTaken);
        }

        let password_hash = hash(&registration.password)?;
        let outcome = self
            .store
            .register_reseller(
                &registration.username,
                &password_hash,
                &registration.referral_token,
                self.now(),
            )
            .await?;

        match outcome {
            RegistrationOutcome::Created(reseller) => {
                info!(
                    reseller_id = reseller.id,
                    username = %reseller.username,
                    "Reseller registered"
                );
                Ok(reseller)
            }
            RegistrationOutcome::UsernameTaken => Err(LicenseError::UsernameTaken),
            RegistrationOutcome::InvalidToken => Err(LicenseError::InvalidToken),
        }
    }

    pub async fn list_resellers(&self) -> LicenseResult<Vec<Reseller>> {
        Ok(self.store.list_resellers().await?)
    }

    pub async fn reseller(&self, id: i64) -> LicenseResult<Reseller> {
        self.store
            .find_reseller(id)
            .await?
            .ok_or_else(|| LicenseError::NotFound("Reseller".into()))
    }

    /// Delete a reseller. Its keys stay in the registry, revoked and
    /// without an owner.
    pub async fn delete_reseller(&self, id: i64) -> LicenseResult<()> {
        if !self.store.delete_reseller(id).await? {
            return Err(LicenseError::NotFound("Reseller".into()));
        }
        info!(reseller_id = id, "Reseller deleted; keys revoked");
        Ok(())
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// End a session token before its expiry. Ending it twice is harmless.
    pub async fn end_session(&self, jti: &str, expires_at: i64) -> LicenseResult<()> {
        if self
            .store
            .revoke_session(jti, expires_at, self.now())
            .await?
        {
            info!(jti, "Session ended");
        }
        Ok(())
    }

    pub async fn session_ended(&self, jti: &str) -> LicenseResult<bool> {
        Ok(self.store.is_session_revoked(jti).await?)
    }

    // =========================================================================
    // Referral tokens
    // =========================================================================

    pub async fn issue_referral_token(&self, admin_username: &str) -> LicenseResult<ReferralToken> {
        let token = generate_referral_token(&self.referral_prefix);
        let stored = self
            .store
            .create_referral_token(&token, admin_username, self.now())
            .await?;
        info!(token_id = stored.id, created_by = admin_username, "Referral token issued");
        Ok(stored)
    }

    pub async fn list_referral_tokens(&self) -> LicenseResult<Vec<ReferralToken>> {
        Ok(self.store.list_referral_tokens().await?)
    }
}
