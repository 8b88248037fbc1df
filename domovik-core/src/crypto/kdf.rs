//! PBKDF2 derivations from the user's password.
//!
//! Two independent derivations:
//! - the API password, sent to the relay in place of the real password
//!   (PBKDF2-HMAC-SHA512, 8 zero bytes of salt, 1000 rounds, base64)
//! - the field key, which never leaves the node
//!   (PBKDF2-HMAC-SHA256 with the salt and rounds from [`KdfParams`])

use crate::crypto::cipher::FieldKey;
use crate::crypto::{CryptoError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha512};
use zeroize::Zeroize;

const API_PASSWORD_SALT: [u8; 8] = [0u8; 8];
const API_PASSWORD_ROUNDS: u32 = 1000;

/// Parameters for the field key derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    pub salt: String,
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            salt: String::new(),
            iterations: 15_000,
        }
    }
}

/// Derive the password the relay sees for this account.
pub fn derive_api_password(password: &str) -> Result<String> {
    if password.is_empty() {
        return Err(CryptoError::KdfFailed("Password must not be empty".to_string()));
    }

    let mut out = [0u8; 32];
    pbkdf2_hmac::<Sha512>(
        password.as_bytes(),
        &API_PASSWORD_SALT,
        API_PASSWORD_ROUNDS,
        &mut out,
    );
    let encoded = STANDARD.encode(out);
    out.zeroize();

    Ok(encoded)
}

/// Derive the AES-256-GCM key used for title/url/favicon fields.
pub fn derive_field_key(password: &str, params: &KdfParams) -> Result<FieldKey> {
    if password.is_empty() {
        return Err(CryptoError::KdfFailed("Password must not be empty".to_string()));
    }
    if params.iterations == 0 {
        return Err(CryptoError::KdfFailed("Iteration count must be positive".to_string()));
    }

    let mut out = [0u8; 32];
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        params.salt.as_bytes(),
        params.iterations,
        &mut out,
    );
    let key = FieldKey::from_bytes(out);
    out.zeroize();

    Ok(key)
}
