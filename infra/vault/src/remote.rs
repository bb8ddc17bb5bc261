use crate::error::{VaultError, VaultErrorExt};
use crate::secret::SecretKey;
use crate::source::{DataKey, KeySource, KeyStrategy};
use async_trait::async_trait;
use fcrypt_domain::config::RemoteKeyConfig;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

/// A data key encrypted by the key-management service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKey {
    /// Identifier of the master key that wrapped the data key, as reported by the service.
    pub key_id: String,
    pub ciphertext: Vec<u8>,
}

/// Remote key-management service (for example a cloud KMS).
///
/// Each call is a single request/response. Timeouts and retries belong to the implementation's
/// transport, not to this crate; failures should be reported as [`VaultError::RemoteKeyService`].
#[async_trait]
pub trait KeyManagementService: Send + Sync + fmt::Debug {
    /// Encrypts `data_key` under the master key `master_key_id`.
    async fn encrypt_key(&self, master_key_id: &str, data_key: &[u8])
    -> Result<WrappedKey, VaultError>;

    /// Decrypts a wrapped data key.
    async fn decrypt_key(&self, key_id: &str, wrapped: &[u8]) -> Result<Vec<u8>, VaultError>;
}

/// Key source that generates a data key per value and has the remote service wrap it.
#[derive(Debug)]
pub struct RemoteKeyring {
    master_key_id: String,
    service: Arc<dyn KeyManagementService>,
}

impl RemoteKeyring {
    /// # Errors
    /// Returns [`VaultError::Configuration`] if `master_key_id` is blank.
    pub fn new(
        master_key_id: impl Into<String>,
        service: Arc<dyn KeyManagementService>,
    ) -> Result<Self, VaultError> {
        let master_key_id = master_key_id.into().trim().to_owned();
        if master_key_id.is_empty() {
            return Err(VaultError::configuration("Remote master key id must not be blank"));
        }
        Ok(Self { master_key_id, service })
    }

    /// # Errors
    /// Returns [`VaultError::Configuration`] if the configured master key id is blank.
    pub fn from_config(
        config: &RemoteKeyConfig,
        service: Arc<dyn KeyManagementService>,
    ) -> Result<Self, VaultError> {
        Self::new(config.master_key_id.as_str(), service)
    }

    #[must_use]
    pub fn master_key_id(&self) -> &str {
        &self.master_key_id
    }
}

#[async_trait]
impl KeySource for RemoteKeyring {
    fn strategy(&self) -> KeyStrategy {
        KeyStrategy::Remote
    }

    fn current_key_id(&self) -> &str {
        &self.master_key_id
    }

    #[instrument(skip(self), fields(master_key_id = %self.master_key_id))]
    async fn data_key(&self) -> Result<DataKey, VaultError> {
        let key = SecretKey::generate();
        let wrapped = self
            .service
            .encrypt_key(&self.master_key_id, key.expose())
            .await
            .context("Wrapping data key")?;
        if wrapped.key_id.is_empty() || wrapped.ciphertext.is_empty() {
            return Err(VaultError::remote("Key service returned an empty wrapped key"));
        }
        debug!(key_id = %wrapped.key_id, "Data key wrapped");

        Ok(DataKey { key_id: wrapped.key_id, key, wrapped: Some(wrapped.ciphertext) })
    }

    #[instrument(skip(self, wrapped))]
    async fn unwrap_key(
        &self,
        key_id: &str,
        wrapped: Option<&[u8]>,
    ) -> Result<SecretKey, VaultError> {
        let Some(wrapped) = wrapped else {
            return Err(VaultError::malformed(
                "Token has no wrapped data key; remote keys only read envelope tokens",
            ));
        };
        let plain = Zeroizing::new(
            self.service.decrypt_key(key_id, wrapped).await.context("Unwrapping data key")?,
        );
        SecretKey::from_slice(&plain)
            .map_err(|_| VaultError::remote("Key service returned a data key of the wrong length"))
    }
}
