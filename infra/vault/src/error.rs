//! # Vault Errors
//!
//! This module defines the [`VaultError`] enum used throughout the vault crate for reporting
//! key lookup, token parsing, remote key service and configuration failures.

use std::borrow::Cow;

/// A specialized [`VaultError`] enum for vault-related failures.
///
/// None of these are retried internally; every variant aborts the triggering operation.
#[fcrypt_derive::fcrypt_error]
pub enum VaultError {
    /// Key sources were configured inconsistently (blank ids, bad key material, duplicates).
    #[error("Invalid configuration{}: {message}", format_context(.context))]
    Configuration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A token references a key id this source does not know.
    #[error("No encryption key found with ID \"{key_id}\"{}", format_context(.context))]
    KeyNotFound { key_id: String, context: Option<Cow<'static, str>> },

    /// A stored value does not parse as a ciphertext token.
    #[error("Malformed token{}: {message}", format_context(.context))]
    MalformedToken { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The remote key-management call failed or timed out.
    #[error("Remote key service error{}: {message}", format_context(.context))]
    RemoteKeyService { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The token parsed but did not decrypt to valid plaintext (wrong key or tampering).
    #[error("Decryption error{}: {message}", format_context(.context))]
    Decryption { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal vault error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl VaultError {
    pub(crate) fn malformed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::MalformedToken { message: message.into(), context: None }
    }

    pub(crate) fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Configuration { message: message.into(), context: None }
    }

    /// Shorthand for implementors of [`crate::KeyManagementService`].
    pub fn remote(message: impl Into<Cow<'static, str>>) -> Self {
        Self::RemoteKeyService { message: message.into(), context: None }
    }
}
