use crate::cipher;
use crate::error::{VaultError, VaultErrorExt};
use crate::local::LocalKeyring;
use crate::remote::RemoteKeyring;
use crate::source::{KeySource, KeyStrategy};
use crate::token::EncryptedToken;
use std::sync::Arc;

/// Seals and opens single values.
///
/// `Vault` wraps its [`KeySource`] in an [`Arc`], so it is cheap to clone and safe to share
/// across tasks. Every [`Vault::seal`] uses a fresh IV (and, for envelope sources, a fresh
/// data key); [`Vault::open`] never returns a token as if it were plaintext.
///
/// ### Example
/// ```rust
/// use fcrypt_vault::prelude::*;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), VaultError> {
/// let keyring = LocalKeyring::builder()
///     .active("2024-01", &"11".repeat(32))?
///     .build()?;
/// let vault = Vault::new(keyring);
///
/// let token = vault.seal("abc123").await?;
/// assert_ne!(token, "abc123");
/// assert_eq!(vault.open(&token).await?, "abc123");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Vault {
    source: Arc<dyn KeySource>,
}

impl Vault {
    pub fn new(source: impl KeySource + 'static) -> Self {
        Self { source: Arc::new(source) }
    }

    #[must_use]
    pub fn from_source(source: Arc<dyn KeySource>) -> Self {
        Self { source }
    }

    /// Shorthand for a vault over a [`LocalKeyring`].
    #[must_use]
    pub fn local(keyring: LocalKeyring) -> Self {
        Self::new(keyring)
    }

    /// Shorthand for a vault over a [`RemoteKeyring`].
    #[must_use]
    pub fn remote(keyring: RemoteKeyring) -> Self {
        Self::new(keyring)
    }

    #[must_use]
    pub fn key_source(&self) -> &dyn KeySource {
        self.source.as_ref()
    }

    #[must_use]
    pub fn strategy(&self) -> KeyStrategy {
        self.source.strategy()
    }

    #[must_use]
    pub fn current_key_id(&self) -> &str {
        self.source.current_key_id()
    }

    /// Encrypts a value into a serialized [`EncryptedToken`].
    ///
    /// # Results
    /// A direct token for sources that encrypt under a registered key, an envelope token
    /// when the source hands out wrapped data keys.
    ///
    /// # Errors
    /// * [`VaultError::RemoteKeyService`] if wrapping the data key fails.
    /// * [`VaultError::KeyNotFound`] if the active key is missing from a local keyring.
    pub async fn seal(&self, plaintext: &str) -> Result<String, VaultError> {
        let data_key = self.source.data_key().await?;
        let sealed = cipher::seal(plaintext.as_bytes(), &data_key.key)?;
        Ok(EncryptedToken::new(data_key.key_id, sealed, data_key.wrapped).to_string())
    }

    /// Decrypts a serialized token.
    ///
    /// Parsing happens before any key is requested, so a malformed value never reaches the
    /// key source.
    ///
    /// # Errors
    /// * [`VaultError::MalformedToken`] if the token does not parse.
    /// * [`VaultError::KeyNotFound`] if the token's key id is unknown.
    /// * [`VaultError::RemoteKeyService`] if unwrapping the data key fails.
    /// * [`VaultError::Decryption`] if the plaintext is not valid UTF-8.
    pub async fn open(&self, token: &str) -> Result<String, VaultError> {
        let token = EncryptedToken::parse(token)?;
        let key = self
            .source
            .unwrap_key(&token.key_id, token.wrapped_key.as_deref())
            .await
            .context(format!("key id \"{}\"", token.key_id))?;
        cipher::utf8(cipher::open(&token.sealed(), &key)?)
    }
}
