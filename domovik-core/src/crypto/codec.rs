//! String field codec over the stored field key.

use crate::crypto::cipher::{open, seal, FieldKey, Jwk};
use crate::crypto::kdf::{derive_field_key, KdfParams};
use crate::crypto::CryptoError;
use crate::store::{keys, StateStore};
use crate::{DomovikError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::sync::Arc;

/// Encodes and decodes individual string fields.
///
/// The key is read from the store on every call, so a key replaced by a
/// re-link takes effect immediately. Absent or empty input maps to an empty
/// string without touching the cipher.
#[derive(Clone)]
pub struct CryptoBox {
    store: Arc<dyn StateStore>,
}

impl CryptoBox {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Derive the field key from `password` and store it.
    ///
    /// Returns `true` when a different key was stored before, meaning every
    /// value encrypted under the old key is now unreadable.
    pub fn set_key(&self, password: &str, params: &KdfParams) -> Result<bool> {
        let key = derive_field_key(password, params)?;
        let previous = self.stored_key()?;
        self.store.save(keys::EK, &key.to_jwk())?;
        Ok(previous.is_some_and(|old| old != key))
    }

    pub fn has_key(&self) -> Result<bool> {
        Ok(self.stored_key()?.is_some())
    }

    pub fn encode(&self, plaintext: Option<&str>) -> Result<String> {
        match plaintext {
            Some(text) if !text.is_empty() => {
                let key = self.key()?;
                let sealed = seal(&key, text.as_bytes())?;
                Ok(STANDARD.encode(sealed))
            }
            _ => Ok(String::new()),
        }
    }

    /// Like [`encode`](Self::encode), but a plaintext longer than `max_len`
    /// bytes is dropped to an empty string instead of being sent.
    pub fn encode_bounded(&self, plaintext: Option<&str>, max_len: usize) -> Result<String> {
        match plaintext {
            Some(text) if text.len() > max_len => Ok(String::new()),
            other => self.encode(other),
        }
    }

    pub fn decode(&self, ciphertext: Option<&str>) -> Result<String> {
        match ciphertext {
            Some(text) if !text.is_empty() => {
                let key = self.key()?;
                let sealed = STANDARD.decode(text).map_err(|e| {
                    CryptoError::DecryptionFailed(format!("Invalid base64: {}", e))
                })?;
                let plain = open(&key, &sealed)?;
                String::from_utf8(plain).map_err(|_| {
                    DomovikError::Crypto(CryptoError::DecryptionFailed("Invalid UTF-8".to_string()))
                })
            }
            _ => Ok(String::new()),
        }
    }

    fn key(&self) -> Result<FieldKey> {
        self.stored_key()?
            .ok_or(DomovikError::Crypto(CryptoError::MissingKey))
    }

    fn stored_key(&self) -> Result<Option<FieldKey>> {
        match self.store.load::<Jwk>(keys::EK)? {
            Some(jwk) => Ok(Some(FieldKey::from_jwk(&jwk)?)),
            None => Ok(None),
        }
    }
}
