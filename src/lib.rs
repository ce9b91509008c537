//! PIN-gated encrypted session vault for the ERP mobile client.
//!
//! Protects the user's long-lived authentication material (refresh token,
//! account identifiers) at rest on the device:
//! - the PIN is persisted only as a salted one-way hash;
//! - the session payload is sealed with AES-256-GCM under a PIN-derived key
//!   that is never persisted;
//! - repeated failures engage a persistent lockout.
//!
//! The application shell decides *when* to call the vault (app start, PIN
//! entry, sign-out, backend session-invalidation events); the vault itself
//! performs no network I/O.
//!
//! ```no_run
//! use erp_mobile_vault::{SecureStore, SessionVault, VerifyOutcome};
//!
//! # async fn example(data_dir: std::path::PathBuf) -> erp_mobile_vault::Result<()> {
//! let vault = SessionVault::new(SecureStore::new(data_dir));
//!
//! match vault.verify("1234").await? {
//!     VerifyOutcome::Unlocked(session) => { /* restore session */ }
//!     VerifyOutcome::WrongPin { attempts_left } => { /* show remaining */ }
//!     VerifyOutcome::LockedOut { until } => { /* show countdown */ }
//!     VerifyOutcome::NoSession | VerifyOutcome::Expired => { /* to login */ }
//!     VerifyOutcome::CorruptedVault => { vault.clear().await?; }
//! }
//! # Ok(())
//! # }
//! ```

mod crypto;
mod error;
mod session;
mod store;
mod vault;

pub use error::{Result, VaultError};
pub use session::{SessionPayload, VerifyOutcome};
pub use store::SecureStore;
pub use vault::{SessionVault, VaultPolicy, SESSION_MAX_AGE_MS};
