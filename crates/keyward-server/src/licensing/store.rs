//! Storage contract the licensing service runs against.
//!
//! Every method that changes more than one row is atomic in the
//! implementation: `register_reseller`, `delete_reseller`, `issue_key`,
//! `reset_key`, and `bind_device` either apply completely or not at all.

use async_trait::async_trait;

use crate::storage::{
    Admin, BindOutcome, DatabaseError, DeviceRegistration, IssueOutcome, LicenseKey, NewKey,
    ReferralToken, RegistrationOutcome, Reseller,
};

#[async_trait]
pub trait LicenseStore: Send + Sync {
    async fn find_admin(&self, username: &str) -> Result<Option<Admin>, DatabaseError>;

    async fn upsert_admin(
        &self,
        username: &str,
        password_hash: &str,
        now: i64,
    ) -> Result<Admin, DatabaseError>;

    async fn find_reseller(&self, id: i64) -> Result<Option<Reseller>, DatabaseError>;

    async fn find_reseller_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Reseller>, DatabaseError>;

    async fn list_resellers(&self) -> Result<Vec<Reseller>, DatabaseError>;

    async fn register_reseller(
        &self,
        username: &str,
        password_hash: &str,
        token: &str,
        now: i64,
    ) -> Result<RegistrationOutcome, DatabaseError>;

    async fn delete_reseller(&self, id: i64) -> Result<bool, DatabaseError>;

    async fn add_credits(&self, id: i64, amount: i64) -> Result<Option<Reseller>, DatabaseError>;

    async fn create_referral_token(
        &self,
        token: &str,
        created_by: &str,
        now: i64,
    ) -> Result<ReferralToken, DatabaseError>;

    async fn list_referral_tokens(&self) -> Result<Vec<ReferralToken>, DatabaseError>;

    async fn revoke_session(
        &self,
        jti: &str,
        expires_at: i64,
        now: i64,
    ) -> Result<bool, DatabaseError>;

    async fn is_session_revoked(&self, jti: &str) -> Result<bool, DatabaseError>;

    async fn issue_key(&self, new_key: &NewKey<'_>) -> Result<IssueOutcome, DatabaseError>;

    async fn find_key(&self, id: i64) -> Result<Option<LicenseKey>, DatabaseError>;

    async fn find_key_by_value(&self, value: &str) -> Result<Option<LicenseKey>, DatabaseError>;

    async fn list_keys_by_owner(&self, owner_id: i64) -> Result<Vec<LicenseKey>, DatabaseError>;

    async fn list_keys(&self) -> Result<Vec<LicenseKey>, DatabaseError>;

    async fn deactivate_key(&self, id: i64) -> Result<Option<LicenseKey>, DatabaseError>;

    async fn reset_key(&self, id: i64, expires_at: i64)
    -> Result<Option<LicenseKey>, DatabaseError>;

    async fn find_binding(
        &self,
        key_id: i64,
        device_id: &str,
    ) -> Result<Option<DeviceRegistration>, DatabaseError>;

    async fn list_bindings(&self, key_id: i64) -> Result<Vec<DeviceRegistration>, DatabaseError>;

    async fn bind_device(
        &self,
        key_id: i64,
        device_id: &str,
        device_limit: i64,
        now: i64,
    ) -> Result<BindOutcome, DatabaseError>;
}
