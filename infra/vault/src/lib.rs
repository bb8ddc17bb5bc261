//! Envelope encryption of single values for data-at-rest field protection.
//!
//! This crate provides the cipher, the stored token format and the key sources behind
//! FieldCrypt. It knows nothing about documents; `fcrypt-cryptor` decides which values to seal.
//!
//! ## Token format
//!
//! Every sealed value is a colon-delimited string:
//!
//! ```text
//! direct:   base64(key_id):hex(iv):hex(ciphertext)
//! envelope: base64(key_id):hex(iv):hex(ciphertext):base64(wrapped_data_key)
//! ```
//!
//! The format is persisted and must stay stable across versions. Tokens written under a key
//! id that has since been rotated out keep decrypting as long as that id remains registered
//! as deprecated.
//!
//! ## Cipher
//!
//! AES-256 in CTR mode with a random 16-byte IV per call. Counter mode is not authenticated:
//! tampering yields garbage plaintext (usually rejected as invalid UTF-8), never the original.
//!
//! ## Key sources
//!
//! * [`LocalKeyring`]: keys from configuration, one active id plus deprecated ids. By default
//!   each value gets a fresh data key wrapped under the active key.
//! * [`RemoteKeyring`]: each value gets a fresh data key wrapped by a [`KeyManagementService`].
//!   The service call is the only suspension point in the crate.
//!
//! ## Examples
//!
//! ```rust
//! use fcrypt_vault::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), VaultError> {
//! let old = LocalKeyring::builder().active("2023", &"01".repeat(32))?.build()?;
//! let token = Vault::new(old).seal("refresh-token").await?;
//!
//! // Rotate: new active key, old one kept as deprecated.
//! let rotated = LocalKeyring::builder()
//!     .active("2024", &"02".repeat(32))?
//!     .deprecated("2023", &"01".repeat(32))?
//!     .build()?;
//! assert_eq!(Vault::new(rotated).open(&token).await?, "refresh-token");
//! # Ok(())
//! # }
//! ```

mod builder;
pub mod cipher;
mod engine;
mod error;
mod local;
mod remote;
mod secret;
mod source;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
mod token;

pub use builder::{LocalKeyringBuilder, NoActive, WithActive};
pub use engine::Vault;
pub use error::{VaultError, VaultErrorExt};
pub use local::LocalKeyring;
pub use remote::{KeyManagementService, RemoteKeyring, WrappedKey};
pub use secret::{KEY_LEN, SecretKey};
pub use source::{DataKey, KeySource, KeyStrategy};
pub use token::EncryptedToken;

pub mod prelude {
    pub use crate::engine::Vault;
    pub use crate::error::{VaultError, VaultErrorExt};
    pub use crate::local::LocalKeyring;
    pub use crate::remote::{KeyManagementService, RemoteKeyring, WrappedKey};
    pub use crate::source::{KeySource, KeyStrategy};
    pub use crate::token::EncryptedToken;
}
