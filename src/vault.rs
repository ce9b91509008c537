//! Vault protocol: save, verify/unlock, lockout bookkeeping, and clear.
//!
//! The vault holds no in-memory session state between calls — every verify
//! re-reads the records and re-derives the key from the candidate PIN, so a
//! stale key can never outlive a `clear()`. Lockout is evaluated lazily on
//! the next verify call, not by a background timer.
//!
//! Callers are expected to serialize `save`/`verify`/`clear` (one in flight
//! at a time); the shell disables PIN entry while a verify is pending.

use chrono::Utc;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::crypto;
use crate::error::{Result, VaultError};
use crate::session::{MetaRecord, PayloadRecord, PinRecord, SessionPayload, VerifyOutcome};
use crate::store::{RecordId, SecureStore};

/// Session max age used by the ERP mobile shell when it opts into expiry:
/// sessions not refreshed within 7 days are cleared on the next unlock.
pub const SESSION_MAX_AGE_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Lockout and expiry policy.
///
/// Policy, not protocol: these can be tuned per deployment without breaking
/// stored vault data.
#[derive(Debug, Clone)]
pub struct VaultPolicy {
    /// Failed attempts tolerated before the vault locks.
    pub max_pin_attempts: u32,
    /// How long a lockout lasts, in milliseconds.
    pub lock_duration_ms: i64,
    /// When set, sessions whose last save is older than this are cleared on
    /// unlock, and each successful unlock refreshes the save timestamp.
    pub session_max_age_ms: Option<i64>,
}

impl Default for VaultPolicy {
    fn default() -> Self {
        Self {
            max_pin_attempts: 5,
            lock_duration_ms: 15 * 60 * 1000,
            session_max_age_ms: None,
        }
    }
}

/// The encrypted session vault.
///
/// Owns its store handle; construct isolated instances for tests by rooting
/// the [`SecureStore`] in a temp directory.
pub struct SessionVault {
    store: SecureStore,
    policy: VaultPolicy,
}

impl SessionVault {
    /// Create a vault with the default policy (5 attempts, 15 min lockout).
    pub fn new(store: SecureStore) -> Self {
        Self::with_policy(store, VaultPolicy::default())
    }

    pub fn with_policy(store: SecureStore, policy: VaultPolicy) -> Self {
        Self { store, policy }
    }

    /// Whether a session payload has been saved.
    ///
    /// A convenience probe, not a security boundary: any store error reads
    /// as `false`.
    pub async fn has_secure_payload(&self) -> bool {
        matches!(self.store.get(RecordId::Payload).await, Ok(Some(_)))
    }

    /// Epoch-millisecond instant until which the vault is locked.
    ///
    /// Returns 0 when not locked, when the lockout window has lapsed, when
    /// no meta record exists, or on any store error.
    pub async fn locked_until(&self) -> i64 {
        let meta = match self.read_meta().await {
            Ok(meta) => meta,
            Err(_) => return 0,
        };

        if meta.pin_locked_until > now_ms() {
            meta.pin_locked_until
        } else {
            0
        }
    }

    /// Seal a session payload under the given PIN.
    ///
    /// Writes the PIN hash, the encrypted payload, and a reset meta record
    /// in one transaction. Unconditionally overwrites any prior vault —
    /// there is exactly one vault slot per installation.
    pub async fn save(&self, pin: &str, payload: &SessionPayload) -> Result<()> {
        let pin_hash = crypto::hash_pin(pin);
        let key = crypto::derive_key(pin);
        let (iv, ciphertext) = crypto::encrypt(&serde_json::to_vec(payload)?, &key)?;

        self.store
            .put_many(vec![
                (RecordId::Pin, serde_json::to_value(PinRecord { pin_hash })?),
                (
                    RecordId::Payload,
                    serde_json::to_value(PayloadRecord {
                        iv: iv.to_vec(),
                        ciphertext,
                    })?,
                ),
                (RecordId::Meta, serde_json::to_value(MetaRecord::default())?),
            ])
            .await?;

        info!("Session payload sealed and saved");
        Ok(())
    }

    /// Verify a candidate PIN and, if correct, unlock the session payload.
    ///
    /// Resolves to exactly one [`VerifyOutcome`]; only infrastructure
    /// failure (store inaccessible) propagates as `Err`.
    pub async fn verify(&self, pin: &str) -> Result<VerifyOutcome> {
        let now = now_ms();
        let meta = self.read_meta().await?;

        // Lockout check precedes any hashing; the counter is not touched
        // while a valid lockout is in effect.
        if meta.pin_locked_until > 0 && now < meta.pin_locked_until {
            debug!("Verify refused: vault locked");
            return Ok(VerifyOutcome::LockedOut {
                until: meta.pin_locked_until,
            });
        }

        let Some(pin_record) = self.read_pin().await? else {
            return Ok(VerifyOutcome::NoSession);
        };

        let candidate = crypto::hash_pin(pin);
        let hash_matches: bool = candidate
            .as_bytes()
            .ct_eq(pin_record.pin_hash.as_bytes())
            .into();

        if !hash_matches {
            let attempts = meta.pin_attempts + 1;

            if attempts >= self.policy.max_pin_attempts {
                let until = now + self.policy.lock_duration_ms;
                self.write_meta(MetaRecord {
                    pin_attempts: attempts,
                    pin_locked_until: until,
                })
                .await?;
                warn!("PIN attempt limit reached, vault locked");
                return Ok(VerifyOutcome::LockedOut { until });
            }

            self.write_meta(MetaRecord {
                pin_attempts: attempts,
                pin_locked_until: 0,
            })
            .await?;
            return Ok(VerifyOutcome::WrongPin {
                attempts_left: self.policy.max_pin_attempts - attempts,
            });
        }

        let Some(payload_record) = self.read_payload().await? else {
            // Hash exists but payload is missing: inconsistent state,
            // treated as nothing to restore.
            return Ok(VerifyOutcome::NoSession);
        };

        let key = crypto::derive_key(pin);
        let plaintext = match crypto::decrypt(&payload_record.iv, &payload_record.ciphertext, &key)
        {
            Ok(plaintext) => plaintext,
            Err(VaultError::Authentication) => {
                // The hash matched, so the PIN was objectively correct; the
                // stored ciphertext must be damaged. Counter stays untouched.
                warn!("Payload failed authentication despite matching PIN hash");
                return Ok(VerifyOutcome::CorruptedVault);
            }
            Err(e) => return Err(e),
        };

        let mut payload: SessionPayload = match serde_json::from_slice(&plaintext) {
            Ok(payload) => payload,
            Err(_) => {
                warn!("Decrypted payload did not deserialize");
                return Ok(VerifyOutcome::CorruptedVault);
            }
        };

        if let Some(max_age) = self.policy.session_max_age_ms {
            if payload.saved_at > 0 && now - payload.saved_at > max_age {
                info!("Saved session exceeded max age, clearing vault");
                self.clear().await?;
                return Ok(VerifyOutcome::Expired);
            }

            // Sliding expiry: refresh the save timestamp under the same key
            // so an actively used session does not expire.
            payload.saved_at = now;
            let (iv, ciphertext) = crypto::encrypt(&serde_json::to_vec(&payload)?, &key)?;
            self.store
                .put_many(vec![
                    (
                        RecordId::Payload,
                        serde_json::to_value(PayloadRecord {
                            iv: iv.to_vec(),
                            ciphertext,
                        })?,
                    ),
                    (RecordId::Meta, serde_json::to_value(MetaRecord::default())?),
                ])
                .await?;

            debug!("Vault unlocked, save timestamp refreshed");
            return Ok(VerifyOutcome::Unlocked(payload));
        }

        self.write_meta(MetaRecord::default()).await?;
        debug!("Vault unlocked");
        Ok(VerifyOutcome::Unlocked(payload))
    }

    /// Remove all three records in one transaction.
    ///
    /// Idempotent — clearing an already-empty vault is not an error. Also
    /// invoked by the shell when the backend reports session invalidation.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear_all().await?;
        info!("Vault cleared");
        Ok(())
    }

    // =========================================================================
    // Record access
    // =========================================================================

    async fn read_meta(&self) -> Result<MetaRecord> {
        match self.store.get(RecordId::Meta).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(MetaRecord::default()),
        }
    }

    async fn write_meta(&self, meta: MetaRecord) -> Result<()> {
        self.store
            .put(RecordId::Meta, serde_json::to_value(meta)?)
            .await
    }

    async fn read_pin(&self) -> Result<Option<PinRecord>> {
        match self.store.get(RecordId::Pin).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn read_payload(&self) -> Result<Option<PayloadRecord>> {
        match self.store.get(RecordId::Payload).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
