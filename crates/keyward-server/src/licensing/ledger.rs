//! Reseller credit balances. Credits are granted by the admin and spent one
//! per issued key; the debit side lives with key issuance in the store.

use tracing::info;

use super::LicenseService;
use crate::error::{LicenseError, LicenseResult};
use crate::storage::Reseller;

/// Largest number of credits a single grant may add.
pub const MAX_CREDIT_GRANT: i64 = 1_000_000;

impl LicenseService {
    /// Add `amount` credits to a reseller's balance.
    pub async fn add_credits(&self, reseller_id: i64, amount: i64) -> LicenseResult<Reseller> {
        if !(1..=MAX_CREDIT_GRANT).contains(&amount) {
            return Err(LicenseError::InvalidAmount);
        }

        let reseller = self
            .store
            .add_credits(reseller_id, amount)
            .await?
            .ok_or_else(|| LicenseError::NotFound("Reseller".into()))?;

        info!(
            reseller_id,
            amount,
            balance = reseller.credits,
            "Credits granted"
        );
        Ok(reseller)
    }

    /// Current balance of a reseller.
    pub async fn credits(&self, reseller_id: i64) -> LicenseResult<i64> {
        Ok(self.reseller(reseller_id).await?.credits)
    }
}
