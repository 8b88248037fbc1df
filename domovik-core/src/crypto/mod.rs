//! Cryptographic primitives for field-level encryption.
//!
//! This module provides:
//! - PBKDF2 derivation of the API password and of the field key
//! - AES-256-GCM sealing with a fresh random nonce per value
//! - [`CryptoBox`], the string codec used by every sync flow

pub mod cipher;
pub mod codec;
pub mod kdf;

pub use cipher::{open, seal, FieldKey, Jwk};
pub use codec::CryptoBox;
pub use kdf::{derive_api_password, derive_field_key, KdfParams};

use thiserror::Error;

/// Errors that can occur in cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Key derivation failed: {0}")]
    KdfFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Authentication failed - data may have been tampered with")]
    AuthenticationFailed,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("No encryption key stored; link this browser first")]
    MissingKey,
}

/// Result type for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;
