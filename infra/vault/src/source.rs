use crate::error::VaultError;
use crate::secret::SecretKey;
use async_trait::async_trait;
use std::fmt;

/// Which strategy a [`KeySource`] implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    Local,
    Remote,
}

/// Key material for encrypting one value.
///
/// `wrapped` is the data key encrypted under the master key; `None` means the value is
/// encrypted directly under the key named by `key_id`.
pub struct DataKey {
    pub key_id: String,
    pub key: SecretKey,
    pub wrapped: Option<Vec<u8>>,
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataKey")
            .field("key_id", &self.key_id)
            .field("key", &self.key)
            .field("wrapped_len", &self.wrapped.as_ref().map(Vec::len))
            .finish()
    }
}

/// Supplies symmetric keys for sealing and opening tokens.
///
/// Key material is read-only after construction, so one source is shared by every
/// in-flight operation. Only the remote strategy suspends.
#[async_trait]
pub trait KeySource: Send + Sync + fmt::Debug {
    fn strategy(&self) -> KeyStrategy;

    /// Id stamped into tokens written now.
    fn current_key_id(&self) -> &str;

    /// Key for encrypting one new value.
    async fn data_key(&self) -> Result<DataKey, VaultError>;

    /// Recovers the key a token was written with.
    ///
    /// # Errors
    /// * [`VaultError::KeyNotFound`] if `key_id` is unknown.
    /// * [`VaultError::RemoteKeyService`] if the unwrap call fails.
    async fn unwrap_key(&self, key_id: &str, wrapped: Option<&[u8]>)
    -> Result<SecretKey, VaultError>;
}
