//! License lifecycle: issuance, revocation, credit accounting, reseller
//! onboarding, and device-bound verification.
//!
//! [`LicenseService`] holds the rules; persistence goes through the
//! [`LicenseStore`] trait so the same logic runs against any backend that
//! provides the atomic operations it declares.

mod clock;
mod identity;
mod keygen;
mod ledger;
mod registry;
mod store;
mod verify;


use std::sync::Arc;

use keyward_core::config::LicensingConfig;

pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::Registration;
pub use keygen::{generate_key, generate_referral_token, key_prefix};
pub use ledger::MAX_CREDIT_GRANT;
pub use registry::{IssuedKey, KeySpec};
pub use store::LicenseStore;
pub use verify::{Verdict, VerifyCode, check_key_state};

/// Seconds in one day of key validity.
pub const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Device limits a key may be issued with.
pub const DEVICE_LIMITS: [i64; 3] = [1, 2, 100];

/// Inclusive range of key validity periods, in days.
pub const EXPIRY_DAYS: std::ops::RangeInclusive<i64> = 1..=365;

pub struct LicenseService {
    store: Arc<dyn LicenseStore>,
    clock: Arc<dyn Clock>,
    games: Vec<String>,
    referral_prefix: String,
}

impl LicenseService {
    pub fn new(
        store: Arc<dyn LicenseStore>,
        clock: Arc<dyn Clock>,
        config: &LicensingConfig,
    ) -> Self {
        Self {
            store,
            clock,
            games: config.games.clone(),
            referral_prefix: config.referral_prefix.clone(),
        }
    }

    /// Game names keys may be issued for.
    pub fn games(&self) -> &[String] {
        &self.games
    }

    fn now(&self) -> i64 {
        self.clock.now()
    }
}
