//! License key and referral token generation.
//!
//! Generated keys look like `FREEFIRE-3FA9C1-07BD2E`: the game name
//! uppercased with whitespace removed, then two groups of six hex digits
//! drawn from the OS random source.

use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::LicenseError;

const CUSTOM_KEY_MIN: usize = 4;
const CUSTOM_KEY_MAX: usize = 64;

/// Key prefix for a game: uppercase, whitespace stripped.
pub fn key_prefix(game: &str) -> String {
    game.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Generate a fresh key string for `game`.
pub fn generate_key(game: &str) -> String {
    let mut bytes = [0u8; 8];
    OsRng.fill_bytes(&mut bytes);
    let body = hex::encode_upper(bytes);
    format!("{}-{}-{}", key_prefix(game), &body[..6], &body[6..12])
}

/// Generate a referral token: `prefix` followed by 24 uppercase hex digits.
pub fn generate_referral_token(prefix: &str) -> String {
    let mut bytes = [0u8; 12];
    OsRng.fill_bytes(&mut bytes);
    format!("{prefix}{}", hex::encode_upper(bytes))
}

/// Validate a caller-supplied key string and return it trimmed.
pub fn normalize_custom_key(raw: &str) -> Result<String, LicenseError> {
    let key = raw.trim();
    if !(CUSTOM_KEY_MIN..=CUSTOM_KEY_MAX).contains(&key.len()) {
        return Err(LicenseError::Validation(format!(
            "Custom key must be {CUSTOM_KEY_MIN} to {CUSTOM_KEY_MAX} characters"
        )));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(LicenseError::Validation(
            "Custom key may only contain letters, digits, '-' and '_'".into(),
        ));
    }
    Ok(key.to_string())
}
