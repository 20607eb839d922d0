//! Identity and credit queries for the Keyward license server.

use sqlx::SqliteConnection;

use super::db::LicenseDatabase;
use super::models::{Admin, ReferralToken, RegistrationOutcome, Reseller};
use keyward_core::db::DatabaseError;

impl LicenseDatabase {
    // =========================================================================
    // Admin queries
    // =========================================================================

    /// Get the admin account with the given username.
    pub async fn find_admin(&self, username: &str) -> Result<Option<Admin>, DatabaseError> {
        let admin = sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE username = ?")
            .bind(username)
            .fetch_optional(self.pool())
            .await?;

        Ok(admin)
    }

    /// Create the admin account, or replace its password hash if it exists.
    pub async fn upsert_admin(
        &self,
        username: &str,
        password_hash: &str,
        now: i64,
    ) -> Result<Admin, DatabaseError> {
        sqlx::query(
            "INSERT INTO admins (username, password_hash, created_at) VALUES (?, ?, ?) \
             ON CONFLICT(username) DO UPDATE SET password_hash = excluded.password_hash",
        )
        .bind(username)
        .bind(password_hash)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.find_admin(username)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Admin {username}")))
    }

    // =========================================================================
    // Reseller queries
    // =========================================================================

    /// Get a reseller by ID.
    pub async fn find_reseller(&self, id: i64) -> Result<Option<Reseller>, DatabaseError> {
        let reseller = sqlx::query_as::<_, Reseller>("SELECT * FROM resellers WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(reseller)
    }

    /// Get a reseller by username.
    pub async fn find_reseller_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Reseller>, DatabaseError> {
        let reseller = sqlx::query_as::<_, Reseller>("SELECT * FROM resellers WHERE username = ?")
            .bind(username)
            .fetch_optional(self.pool())
            .await?;

        Ok(reseller)
    }

    /// List all resellers in registration order.
    pub async fn list_resellers(&self) -> Result<Vec<Reseller>, DatabaseError> {
        let resellers = sqlx::query_as::<_, Reseller>("SELECT * FROM resellers ORDER BY id")
            .fetch_all(self.pool())
            .await?;

        Ok(resellers)
    }

    /// Consume a referral token and create the reseller it admits.
    ///
    /// Both writes share one transaction: the token is never marked used
    /// without the reseller row existing, and vice versa.
    pub async fn register_reseller(
        &self,
        username: &str,
        password_hash: &str,
        token: &str,
        now: i64,
    ) -> Result<RegistrationOutcome, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let consumed = sqlx::query(
            "UPDATE referral_tokens SET used = 1, used_by = ?, used_at = ? \
             WHERE token = ? AND used = 0",
        )
        .bind(username)
        .bind(now)
        .bind(token)
        .execute(&mut *tx)
        .await?;

        if consumed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(RegistrationOutcome::InvalidToken);
        }

        let inserted = sqlx::query(
            "INSERT INTO resellers (username, password_hash, credits, created_at) VALUES (?, ?, 0, ?)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(now)
        .execute(&mut *tx)
        .await;

        let id = match inserted.map_err(DatabaseError::from) {
            Ok(result) => result.last_insert_rowid(),
            Err(DatabaseError::Conflict(_)) => {
                tx.rollback().await?;
                return Ok(RegistrationOutcome::UsernameTaken);
            }
            Err(e) => return Err(e),
        };

        let reseller = sqlx::query_as::<_, Reseller>("SELECT * FROM resellers WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(RegistrationOutcome::Created(reseller))
    }

    /// Delete a reseller, revoking and orphaning every key it issued.
    pub async fn delete_reseller(&self, id: i64) -> Result<bool, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("UPDATE license_keys SET is_active = 0, owner_id = NULL WHERE owner_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM resellers WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Credit ledger
    // =========================================================================

    /// Increment a reseller's balance. Returns `None` for an unknown reseller.
    pub async fn add_credits(
        &self,
        id: i64,
        amount: i64,
    ) -> Result<Option<Reseller>, DatabaseError> {
        let result = sqlx::query("UPDATE resellers SET credits = credits + ? WHERE id = ?")
            .bind(amount)
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_reseller(id).await
    }

    // =========================================================================
    // Referral token queries
    // =========================================================================

    /// Store a freshly issued referral token.
    pub async fn create_referral_token(
        &self,
        token: &str,
        created_by: &str,
        now: i64,
    ) -> Result<ReferralToken, DatabaseError> {
        sqlx::query("INSERT INTO referral_tokens (token, created_by, created_at) VALUES (?, ?, ?)")
            .bind(token)
            .bind(created_by)
            .bind(now)
            .execute(self.pool())
            .await?;

        self.find_referral_token(token)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Referral token {token}")))
    }

    /// Get a referral token by its value.
    pub async fn find_referral_token(
        &self,
        token: &str,
    ) -> Result<Option<ReferralToken>, DatabaseError> {
        let found =
            sqlx::query_as::<_, ReferralToken>("SELECT * FROM referral_tokens WHERE token = ?")
                .bind(token)
                .fetch_optional(self.pool())
                .await?;

        Ok(found)
    }

    /// List all referral tokens, newest first.
    pub async fn list_referral_tokens(&self) -> Result<Vec<ReferralToken>, DatabaseError> {
        let tokens =
            sqlx::query_as::<_, ReferralToken>("SELECT * FROM referral_tokens ORDER BY id DESC")
                .fetch_all(self.pool())
                .await?;

        Ok(tokens)
    }

    // =========================================================================
    // Session revocation queries
    // =========================================================================

    /// Record a session token as revoked until its own expiry.
    ///
    /// Rows whose token has already expired are pruned on the way in.
    /// Returns `false` if the token was revoked before.
    pub async fn revoke_session(
        &self,
        jti: &str,
        expires_at: i64,
        now: i64,
    ) -> Result<bool, DatabaseError> {
        sqlx::query("DELETE FROM revoked_sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(self.pool())
            .await?;

        let result = sqlx::query(
            "INSERT INTO revoked_sessions (jti, expires_at, revoked_at) VALUES (?, ?, ?) \
             ON CONFLICT(jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether a session token has been revoked.
    pub async fn is_session_revoked(&self, jti: &str) -> Result<bool, DatabaseError> {
        let found: Option<String> =
            sqlx::query_scalar("SELECT jti FROM revoked_sessions WHERE jti = ?")
                .bind(jti)
                .fetch_optional(self.pool())
                .await?;

        Ok(found.is_some())
    }
}

/// Decrement a reseller's balance by `amount` if it holds at least that much.
///
/// Runs on the caller's connection so it can share a transaction with the
/// write it pays for. Returns `false` when the balance was insufficient or
/// the reseller does not exist.
pub(super) async fn debit_credits(
    conn: &mut SqliteConnection,
    reseller_id: i64,
    amount: i64,
) -> Result<bool, DatabaseError> {
    let result =
        sqlx::query("UPDATE resellers SET credits = credits - ? WHERE id = ? AND credits >= ?")
            .bind(amount)
            .bind(reseller_id)
            .bind(amount)
            .execute(conn)
            .await?;

    Ok(result.rows_affected() == 1)
}
