//! Facade crate for FieldCrypt.
//! Re-exports the shared and feature crates and wires them together at startup.
//! Keep this crate thin: it composes other crates, it does not implement encryption logic.
//!
//! ## Usage
//! 1. Load [`FieldCryptConfig`](domain::config::FieldCryptConfig) (or build an
//!    [`EncryptionConfig`](domain::config::EncryptionConfig) by hand).
//! 2. Build an [`Encryption`] with [`Encryption::from_config`]; remote mode needs a
//!    [`KeyManagementService`](vault::KeyManagementService) handle.
//! 3. Ask it for [`hooks_for`](Encryption::hooks_for) each schema and install them in the
//!    document store.
//! 4. Expose [`Encryption::status`] and [`Encryption::health_check`] to operators.
//!
//! Features: `derive` re-exports `#[encrypted_model]`, `storage` re-exports the in-memory
//! reference collection.

mod encryption;
mod error;

pub use crate::encryption::Encryption;
pub use crate::error::{FcryptError, FcryptErrorExt};
pub use fcrypt_cryptor as cryptor;
pub use fcrypt_domain as domain;
pub use fcrypt_kernel as kernel;
pub use fcrypt_logger as logger;
#[cfg(feature = "storage")]
pub use fcrypt_storage as storage;
pub use fcrypt_vault as vault;

use fcrypt_domain::config::LoggingConfig;
use fcrypt_logger::Logger;

/// Initializes the global tracing subscriber from the `logging` section.
///
/// Keep the returned [`Logger`] alive until shutdown.
///
/// # Errors
/// [`FcryptError::Logger`] if the section is invalid or a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<Logger, FcryptError> {
    Ok(Logger::from_config(config)?)
}

pub mod prelude {
    pub use crate::encryption::Encryption;
    pub use crate::error::{FcryptError, FcryptErrorExt};
    #[cfg(feature = "derive")]
    pub use fcrypt_cryptor::encrypted_model;
    pub use fcrypt_cryptor::{
        CryptorError, EncryptedModel, FieldCryptor, LifecycleHooks, Query, Schema, UpdateClause,
    };
    pub use fcrypt_domain::document::{Document, Value, into_document, json};
    pub use fcrypt_domain::mode::{EncryptionHealth, EncryptionMode, EncryptionStatus, HealthStatus};
    pub use fcrypt_vault::{KeyManagementService, VaultError};
}
