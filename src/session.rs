//! Data model: the session payload, the three persisted record shapes, and
//! the verification outcome sum type.

use serde::{Deserialize, Serialize};

/// Sensitive session material protected by the vault.
///
/// Never stored unencrypted. The refresh token is opaque to the vault — it
/// is issued and consumed by the remote backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    pub refresh_token: String,
    pub user_id: String,
    pub company_id: Option<String>,
    pub branch_id: Option<String>,
    pub email: String,
    /// Epoch milliseconds of the last save.
    pub saved_at: i64,
}

impl std::fmt::Debug for SessionPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log the refresh token
        f.debug_struct("SessionPayload")
            .field("refresh_token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("company_id", &self.company_id)
            .field("branch_id", &self.branch_id)
            .field("email", &self.email)
            .field("saved_at", &self.saved_at)
            .finish()
    }
}

/// Stored `pin` record: salted one-way digest of the PIN.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PinRecord {
    pub pin_hash: String,
}

/// Stored `payload` record: AES-256-GCM sealed session payload.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PayloadRecord {
    #[serde(with = "hex")]
    pub iv: Vec<u8>,
    #[serde(with = "hex")]
    pub ciphertext: Vec<u8>,
}

/// Stored `meta` record: failure counter and lockout expiry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct MetaRecord {
    pub pin_attempts: u32,
    /// Epoch milliseconds; 0 = not locked.
    pub pin_locked_until: i64,
}

/// Outcome of one PIN verification attempt.
///
/// Every `verify` call resolves to exactly one of these — expected
/// conditions never surface as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Correct PIN; the decrypted session payload.
    Unlocked(SessionPayload),
    /// Wrong PIN; how many attempts remain before lockout.
    WrongPin { attempts_left: u32 },
    /// Too many failures; locked until the given epoch-millisecond instant.
    LockedOut { until: i64 },
    /// No session saved (or vault cleared).
    NoSession,
    /// Saved session exceeded the configured max age; vault was cleared.
    Expired,
    /// PIN hash matched but the payload failed authentication or did not
    /// deserialize. The session cannot be recovered; the shell should offer
    /// clear-and-re-login.
    CorruptedVault,
}
