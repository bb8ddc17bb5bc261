use crate::builder::LocalKeyringBuilder;
use crate::cipher::{self, Sealed};
use crate::error::{VaultError, VaultErrorExt};
use crate::secret::SecretKey;
use crate::source::{DataKey, KeySource, KeyStrategy};
use async_trait::async_trait;
use fcrypt_domain::config::LocalKeysConfig;
use fcrypt_domain::constants::AUDIT_TARGET;
use fxhash::FxHashMap;
use std::fmt;
use tracing::info;
use zeroize::Zeroizing;

/// Keys held by the process: one active id plus deprecated ids kept so tokens written before
/// a rotation keep decrypting.
///
/// With `wrap_data_keys` on (the default) every value gets a fresh data key, and the token
/// carries that key encrypted under the active key as `hex(iv):hex(ciphertext)`.
pub struct LocalKeyring {
    active_id: String,
    keys: FxHashMap<String, SecretKey>,
    wrap_data_keys: bool,
}

impl LocalKeyring {
    pub(crate) fn new(
        active_id: String,
        keys: FxHashMap<String, SecretKey>,
        wrap_data_keys: bool,
    ) -> Self {
        Self { active_id, keys, wrap_data_keys }
    }

    #[must_use]
    pub fn builder() -> LocalKeyringBuilder {
        LocalKeyringBuilder::new()
    }

    /// Builds the keyring from configuration.
    ///
    /// # Errors
    /// Returns [`VaultError::Configuration`] for undecodable material, blank or duplicate ids.
    pub fn from_config(config: &LocalKeysConfig) -> Result<Self, VaultError> {
        let mut builder = Self::builder()
            .active(config.active.id.as_str(), &config.active.key)?
            .wrap_data_keys(config.wrap_data_keys);
        for deprecated in &config.deprecated {
            builder = builder.deprecated(deprecated.id.as_str(), &deprecated.key)?;
        }
        builder.build()
    }

    #[must_use]
    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    #[must_use]
    pub fn is_deprecated(&self, key_id: &str) -> bool {
        key_id != self.active_id && self.keys.contains_key(key_id)
    }

    #[must_use]
    pub const fn wraps_data_keys(&self) -> bool {
        self.wrap_data_keys
    }

    /// Raw key registered under `key_id`.
    ///
    /// # Errors
    /// Returns [`VaultError::KeyNotFound`] for unknown ids.
    pub fn raw_key_for(&self, key_id: &str) -> Result<&SecretKey, VaultError> {
        self.keys
            .get(key_id)
            .ok_or_else(|| VaultError::KeyNotFound { key_id: key_id.to_owned(), context: None })
    }

    fn active_key(&self) -> Result<&SecretKey, VaultError> {
        self.raw_key_for(&self.active_id)
    }
}

#[async_trait]
impl KeySource for LocalKeyring {
    fn strategy(&self) -> KeyStrategy {
        KeyStrategy::Local
    }

    fn current_key_id(&self) -> &str {
        &self.active_id
    }

    async fn data_key(&self) -> Result<DataKey, VaultError> {
        let master = self.active_key()?;
        if !self.wrap_data_keys {
            return Ok(DataKey { key_id: self.active_id.clone(), key: master.clone(), wrapped: None });
        }

        let key = SecretKey::generate();
        let wrapped = cipher::seal(key.expose(), master).context("Wrapping data key")?;
        Ok(DataKey {
            key_id: self.active_id.clone(),
            key,
            wrapped: Some(wrapped.to_hex_pair().into_bytes()),
        })
    }

    async fn unwrap_key(
        &self,
        key_id: &str,
        wrapped: Option<&[u8]>,
    ) -> Result<SecretKey, VaultError> {
        let master = self.raw_key_for(key_id)?;
        if self.is_deprecated(key_id) {
            info!(target: AUDIT_TARGET, key_id, "Decrypting with deprecated key");
        }

        let Some(wrapped) = wrapped else {
            return Ok(master.clone());
        };
        let pair = std::str::from_utf8(wrapped)
            .map_err(|_| VaultError::malformed("Wrapped data key is not `iv:ciphertext` text"))?;
        let sealed = Sealed::from_hex_pair(pair).context("wrapped data key")?;
        let plain = Zeroizing::new(cipher::open(&sealed, master)?);
        SecretKey::from_slice(&plain)
            .map_err(|_| VaultError::malformed("Wrapped data key has the wrong length"))
    }
}

impl fmt::Debug for LocalKeyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("LocalKeyring")
            .field("active_id", &self.active_id)
            .field("key_ids", &ids)
            .field("wrap_data_keys", &self.wrap_data_keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcrypt_domain::config::KeyMaterialConfig;

    fn config(wrap: bool) -> LocalKeysConfig {
        LocalKeysConfig {
            active: KeyMaterialConfig::new("k2", hex::encode([2u8; 32])),
            deprecated: vec![KeyMaterialConfig::new("k1", hex::encode([1u8; 32]))],
            wrap_data_keys: wrap,
        }
    }

    #[tokio::test]
    async fn test_envelope_data_key_unwraps() {
        let keyring = LocalKeyring::from_config(&config(true)).unwrap();
        let data_key = keyring.data_key().await.unwrap();
        assert_eq!(data_key.key_id, "k2");

        let wrapped = data_key.wrapped.as_deref().unwrap();
        assert_eq!(wrapped.len(), 32 + 1 + 64, "hex(iv):hex(32-byte key)");

        let unwrapped = keyring.unwrap_key("k2", Some(wrapped)).await.unwrap();
        assert_eq!(unwrapped.expose(), data_key.key.expose());
    }

    #[tokio::test]
    async fn test_direct_data_key_is_active_key() {
        let keyring = LocalKeyring::from_config(&config(false)).unwrap();
        let data_key = keyring.data_key().await.unwrap();
        assert!(data_key.wrapped.is_none());
        assert_eq!(data_key.key.expose(), &[2u8; 32]);
    }

    #[tokio::test]
    async fn test_unknown_key_id() {
        let keyring = LocalKeyring::from_config(&config(true)).unwrap();
        let err = keyring.unwrap_key("k9", None).await.unwrap_err();
        assert!(matches!(err, VaultError::KeyNotFound { ref key_id, .. } if key_id == "k9"));
        assert_eq!(err.to_string(), "No encryption key found with ID \"k9\"");
    }

    #[test]
    fn test_debug_lists_ids_only() {
        let keyring = LocalKeyring::from_config(&config(true)).unwrap();
        let rendered = format!("{keyring:?}");
        assert!(rendered.contains("\"k1\""));
        assert!(!rendered.contains(&hex::encode([1u8; 32])));
    }
}
