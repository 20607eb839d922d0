//! License key and device registration queries.

use super::db::LicenseDatabase;
use super::models::{BindOutcome, DeviceRegistration, IssueOutcome, LicenseKey, NewKey};
use super::queries::debit_credits;
use keyward_core::db::DatabaseError;

/// Key columns joined with the owner's current username.
const KEY_SELECT: &str = "SELECT k.id, k.key_value, k.game, k.device_limit, k.expiry_days, \
     k.owner_id, r.username AS created_by, k.created_at, k.expires_at, k.is_active \
     FROM license_keys k LEFT JOIN resellers r ON r.id = k.owner_id";

/// Insert a registration only while the key has a free slot. A single
/// statement, so the count check and the insert cannot interleave with a
/// concurrent bind for the same key.
const BIND_DEVICE_SQL: &str = "INSERT INTO device_registrations (key_id, device_id, registered_at) \
     SELECT ?1, ?2, ?3 \
     WHERE (SELECT COUNT(*) FROM device_registrations WHERE key_id = ?1) < ?4 \
     ON CONFLICT(key_id, device_id) DO NOTHING";

impl LicenseDatabase {
    // =========================================================================
    // Key queries
    // =========================================================================

    /// Debit one credit from the owner and insert the key, atomically.
    ///
    /// The debit runs first so the transaction takes the write lock before
    /// reading anything. A duplicate key string rolls the debit back.
    pub async fn issue_key(&self, new_key: &NewKey<'_>) -> Result<IssueOutcome, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        if !debit_credits(&mut *tx, new_key.owner_id, 1).await? {
            let known: Option<i64> = sqlx::query_scalar("SELECT id FROM resellers WHERE id = ?")
                .bind(new_key.owner_id)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;
            return Ok(if known.is_some() {
                IssueOutcome::InsufficientCredits
            } else {
                IssueOutcome::UnknownReseller
            });
        }

        let inserted = sqlx::query(
            "INSERT INTO license_keys \
             (key_value, game, device_limit, expiry_days, owner_id, created_at, expires_at, is_active) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(new_key.key)
        .bind(new_key.game)
        .bind(new_key.device_limit)
        .bind(new_key.expiry_days)
        .bind(new_key.owner_id)
        .bind(new_key.created_at)
        .bind(new_key.expires_at)
        .execute(&mut *tx)
        .await;

        let id = match inserted.map_err(DatabaseError::from) {
            Ok(result) => result.last_insert_rowid(),
            Err(DatabaseError::Conflict(_)) => {
                tx.rollback().await?;
                return Ok(IssueOutcome::DuplicateKey);
            }
            Err(e) => return Err(e),
        };

        let credits_remaining: i64 = sqlx::query_scalar("SELECT credits FROM resellers WHERE id = ?")
            .bind(new_key.owner_id)
            .fetch_one(&mut *tx)
            .await?;

        let key = sqlx::query_as::<_, LicenseKey>(&format!("{KEY_SELECT} WHERE k.id = ?"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(IssueOutcome::Issued {
            key,
            credits_remaining,
        })
    }

    /// Get a key by its numeric ID.
    pub async fn find_key(&self, id: i64) -> Result<Option<LicenseKey>, DatabaseError> {
        let key = sqlx::query_as::<_, LicenseKey>(&format!("{KEY_SELECT} WHERE k.id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(key)
    }

    /// Get a key by its credential string.
    pub async fn find_key_by_value(&self, value: &str) -> Result<Option<LicenseKey>, DatabaseError> {
        let key = sqlx::query_as::<_, LicenseKey>(&format!("{KEY_SELECT} WHERE k.key_value = ?"))
            .bind(value)
            .fetch_optional(self.pool())
            .await?;

        Ok(key)
    }

    /// List keys issued by a reseller, newest first.
    pub async fn list_keys_by_owner(&self, owner_id: i64) -> Result<Vec<LicenseKey>, DatabaseError> {
        let keys = sqlx::query_as::<_, LicenseKey>(&format!(
            "{KEY_SELECT} WHERE k.owner_id = ? ORDER BY k.id DESC"
        ))
        .bind(owner_id)
        .fetch_all(self.pool())
        .await?;

        Ok(keys)
    }

    /// List every key in the registry, newest first.
    pub async fn list_keys(&self) -> Result<Vec<LicenseKey>, DatabaseError> {
        let keys = sqlx::query_as::<_, LicenseKey>(&format!("{KEY_SELECT} ORDER BY k.id DESC"))
            .fetch_all(self.pool())
            .await?;

        Ok(keys)
    }

    /// Mark a key inactive. Returns `None` for an unknown ID.
    pub async fn deactivate_key(&self, id: i64) -> Result<Option<LicenseKey>, DatabaseError> {
        let result = sqlx::query("UPDATE license_keys SET is_active = 0 WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_key(id).await
    }

    /// Move an active key's expiry and release all of its device slots.
    ///
    /// Returns `None` when the key is unknown or inactive; a revoke that
    /// commits first leaves the key untouched.
    pub async fn reset_key(
        &self,
        id: i64,
        expires_at: i64,
    ) -> Result<Option<LicenseKey>, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let result =
            sqlx::query("UPDATE license_keys SET expires_at = ? WHERE id = ? AND is_active = 1")
                .bind(expires_at)
                .bind(id)
                .execute(&mut *tx)
                .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query("DELETE FROM device_registrations WHERE key_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.find_key(id).await
    }

    // =========================================================================
    // Device registration queries
    // =========================================================================

    /// Get the registration of a device on a key, if any.
    pub async fn find_binding(
        &self,
        key_id: i64,
        device_id: &str,
    ) -> Result<Option<DeviceRegistration>, DatabaseError> {
        let registration = sqlx::query_as::<_, DeviceRegistration>(
            "SELECT * FROM device_registrations WHERE key_id = ? AND device_id = ?",
        )
        .bind(key_id)
        .bind(device_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(registration)
    }

    /// List the devices bound to a key, oldest first.
    pub async fn list_bindings(&self, key_id: i64) -> Result<Vec<DeviceRegistration>, DatabaseError> {
        let registrations = sqlx::query_as::<_, DeviceRegistration>(
            "SELECT * FROM device_registrations WHERE key_id = ? ORDER BY id",
        )
        .bind(key_id)
        .fetch_all(self.pool())
        .await?;

        Ok(registrations)
    }

    /// Bind a device to a key if it is already bound or a slot is free.
    pub async fn bind_device(
        &self,
        key_id: i64,
        device_id: &str,
        device_limit: i64,
        now: i64,
    ) -> Result<BindOutcome, DatabaseError> {
        let result = sqlx::query(BIND_DEVICE_SQL)
            .bind(key_id)
            .bind(device_id)
            .bind(now)
            .bind(device_limit)
            .execute(self.pool())
            .await?;

        let existing = self.find_binding(key_id, device_id).await?;

        Ok(match existing {
            Some(registration) if result.rows_affected() == 1 => BindOutcome::Bound(registration),
            Some(registration) => BindOutcome::AlreadyBound(registration),
            None => BindOutcome::LimitReached,
        })
    }
}
