//! AES-256-GCM sealing of individual fields.
//!
//! Every sealed value carries its own random 96-bit nonce. The wire format is
//! `nonce(12) || ciphertext || auth_tag(16)`.

use crate::crypto::{CryptoError, Result};
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// The symmetric key protecting title/url/favicon fields.
#[derive(Clone)]
pub struct FieldKey {
    key: [u8; 32],
}

impl FieldKey {
    /// Generate a new random key
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(&mut OsRng);
        Self { key: key.into() }
    }

    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// Export as a JSON Web Key, the form kept in the local store.
    pub fn to_jwk(&self) -> Jwk {
        Jwk {
            kty: "oct".to_string(),
            k: URL_SAFE_NO_PAD.encode(self.key),
            alg: "A256GCM".to_string(),
            ext: true,
            key_ops: vec!["encrypt".to_string(), "decrypt".to_string()],
        }
    }

    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        if jwk.kty != "oct" {
            return Err(CryptoError::InvalidKey(format!("Unsupported key type {}", jwk.kty)));
        }
        let mut bytes = URL_SAFE_NO_PAD
            .decode(&jwk.k)
            .map_err(|e| CryptoError::InvalidKey(format!("Bad key encoding: {}", e)))?;
        if bytes.len() != 32 {
            let got = bytes.len();
            bytes.zeroize();
            return Err(CryptoError::InvalidKey(format!(
                "Expected a 256-bit key, got {} bytes",
                got
            )));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self { key })
    }
}

impl Drop for FieldKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl PartialEq for FieldKey {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

/// Symmetric JSON Web Key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub k: String,
    #[serde(default)]
    pub alg: String,
    #[serde(default)]
    pub ext: bool,
    #[serde(default)]
    pub key_ops: Vec<String>,
}

/// Encrypt `plaintext` under `key`.
///
/// Returns `nonce(12) || ciphertext || auth_tag(16)`.
pub fn seal(key: &FieldKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    if plaintext.is_empty() {
        return Err(CryptoError::EncryptionFailed(
            "Cannot encrypt empty data".to_string(),
        ));
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext_with_tag = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext_with_tag.len());
    sealed.extend_from_slice(nonce.as_slice());
    sealed.extend_from_slice(&ciphertext_with_tag);
    Ok(sealed)
}

/// Decrypt a value produced by [`seal`].
pub fn open(key: &FieldKey, sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() <= NONCE_LEN + TAG_LEN {
        return Err(CryptoError::DecryptionFailed(
            "Sealed value too short".to_string(),
        ));
    }

    let (nonce_bytes, ciphertext_with_tag) = sealed.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext_with_tag)
        .map_err(|_| CryptoError::AuthenticationFailed)
}
