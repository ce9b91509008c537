//! Vault error types.
//!
//! Expected verification conditions (wrong PIN, lockout, missing session,
//! corrupted payload) are not errors — they are [`VerifyOutcome`] variants.
//! `VaultError` covers infrastructure failure only: the secure store being
//! inaccessible or unreadable, and cipher-level faults.
//!
//! [`VerifyOutcome`]: crate::VerifyOutcome

use thiserror::Error;

/// Errors that can occur during vault operations.
#[derive(Error, Debug)]
pub enum VaultError {
    /// AES-GCM tag verification failed: wrong key or tampered ciphertext.
    /// The orchestrator decides how to present this.
    #[error("Payload authentication failed")]
    Authentication,

    /// An error occurred in the encryption layer (cipher setup, sealing).
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// The secure store could not be accessed or its document is unreadable.
    #[error("Secure store error: {0}")]
    Store(String),

    /// An I/O error occurred (file access, permissions, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
