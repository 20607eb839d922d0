//! [`LicenseStore`] backed by [`LicenseDatabase`].

use async_trait::async_trait;

use super::db::LicenseDatabase;
use super::models::{
    Admin, BindOutcome, DeviceRegistration, IssueOutcome, LicenseKey, NewKey, ReferralToken,
    RegistrationOutcome, Reseller,
};
use crate::licensing::LicenseStore;
use keyward_core::db::DatabaseError;

#[async_trait]
impl LicenseStore for LicenseDatabase {
    async fn find_admin(&self, username: &str) -> Result<Option<Admin>, DatabaseError> {
        Self::find_admin(self, username).await
    }

    async fn upsert_admin(
        &self,
        username: &str,
        password_hash: &str,
        now: i64,
    ) -> Result<Admin, DatabaseError> {
        Self::upsert_admin(self, username, password_hash, now).await
    }

    async fn find_reseller(&self, id: i64) -> Result<Option<Reseller>, DatabaseError> {
        Self::find_reseller(self, id).await
    }

    async fn find_reseller_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Reseller>, DatabaseError> {
        Self::find_reseller_by_username(self, username).await
    }

    async fn list_resellers(&self) -> Result<Vec<Reseller>, DatabaseError> {
        Self::list_resellers(self).await
    }

    async fn register_reseller(
        &self,
        username: &str,
        password_hash: &str,
        token: &str,
        now: i64,
    ) -> Result<RegistrationOutcome, DatabaseError> {
        Self::register_reseller(self, username, password_hash, token, now).await
    }

    async fn delete_reseller(&self, id: i64) -> Result<bool, DatabaseError> {
        Self::delete_reseller(self, id).await
    }

    async fn add_credits(&self, id: i64, amount: i64) -> Result<Option<Reseller>, DatabaseError> {
        Self::add_credits(self, id, amount).await
    }

    async fn create_referral_token(
        &self,
        token: &str,
        created_by: &str,
        now: i64,
    ) -> Result<ReferralToken, DatabaseError> {
        Self::create_referral_token(self, token, created_by, now).await
    }

    async fn list_referral_tokens(&self) -> Result<Vec<ReferralToken>, DatabaseError> {
        Self::list_referral_tokens(self).await
    }

    async fn revoke_session(
        &self,
        jti: &str,
        expires_at: i64,
        now: i64,
    ) -> Result<bool, DatabaseError> {
        Self::revoke_session(self, jti, expires_at, now).await
    }

    async fn is_session_revoked(&self, jti: &str) -> Result<bool, DatabaseError> {
        Self::is_session_revoked(self, jti).await
    }

    async fn issue_key(&self, new_key: &NewKey<'_>) -> Result<IssueOutcome, DatabaseError> {
        Self::issue_key(self, new_key).await
    }

    async fn find_key(&self, id: i64) -> Result<Option<LicenseKey>, DatabaseError> {
        Self::find_key(self, id).await
    }

    async fn find_key_by_value(&self, value: &str) -> Result<Option<LicenseKey>, DatabaseError> {
        Self::find_key_by_value(self, value).await
    }

    async fn list_keys_by_owner(&self, owner_id: i64) -> Result<Vec<LicenseKey>, DatabaseError> {
        Self::list_keys_by_owner(self, owner_id).await
    }

    async fn list_keys(&self) -> Result<Vec<LicenseKey>, DatabaseError> {
        Self::list_keys(self).await
    }

    async fn deactivate_key(&self, id: i64) -> Result<Option<LicenseKey>, DatabaseError> {
        Self::deactivate_key(self, id).await
    }

    async fn reset_key(
        &self,
        id: i64,
        expires_at: i64,
    ) -> Result<Option<LicenseKey>, DatabaseError> {
        Self::reset_key(self, id, expires_at).await
    }

    async fn find_binding(
        &self,
        key_id: i64,
        device_id: &str,
    ) -> Result<Option<DeviceRegistration>, DatabaseError> {
        Self::find_binding(self, key_id, device_id).await
    }

    async fn list_bindings(&self, key_id: i64) -> Result<Vec<DeviceRegistration>, DatabaseError> {
        Self::list_bindings(self, key_id).await
    }

    async fn bind_device(
        &self,
        key_id: i64,
        device_id: &str,
        device_limit: i64,
        now: i64,
    ) -> Result<BindOutcome, DatabaseError> {
        Self::bind_device(self, key_id, device_id, device_limit, now).await
    }
}
