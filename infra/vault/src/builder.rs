use crate::error::{VaultError, VaultErrorExt};
use crate::local::LocalKeyring;
use crate::secret::SecretKey;
use fxhash::FxHashMap;
use private::Sealed;

#[derive(Debug, Default)]
pub struct NoActive;

#[derive(Debug)]
pub struct WithActive {
    id: String,
    key: SecretKey,
}

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoActive {}
impl Sealed for WithActive {}

/// A builder for a [`LocalKeyring`].
///
/// The active key is mandatory and enforced by the type state; deprecated keys are optional.
/// Keys are held in [`SecretKey`] containers, so nothing is left behind in memory when the
/// builder is dropped.
#[allow(private_bounds)]
#[derive(Debug)]
pub struct LocalKeyringBuilder<S: Sealed = NoActive> {
    state: S,
    deprecated: Vec<(String, SecretKey)>,
    wrap_data_keys: bool,
}

impl Default for LocalKeyringBuilder {
    fn default() -> Self {
        Self { state: NoActive, deprecated: Vec::new(), wrap_data_keys: true }
    }
}

impl LocalKeyringBuilder {
    /// Creates an empty builder producing envelope tokens.
    #[must_use = "Builder must be given an active key before use"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the active key from configured material (64 hex chars or base64).
    ///
    /// # Errors
    /// Returns [`VaultError::Configuration`] if the material does not decode to 32 bytes.
    pub fn active(
        self,
        id: impl Into<String>,
        material: &str,
    ) -> Result<LocalKeyringBuilder<WithActive>, VaultError> {
        let key = SecretKey::parse(material).context("active key")?;
        Ok(self.active_key(id, key))
    }

    /// Sets the active key from raw key bytes.
    pub fn active_key(self, id: impl Into<String>, key: SecretKey) -> LocalKeyringBuilder<WithActive> {
        LocalKeyringBuilder {
            state: WithActive { id: id.into(), key },
            deprecated: self.deprecated,
            wrap_data_keys: self.wrap_data_keys,
        }
    }
}

#[allow(private_bounds)]
impl<S: Sealed> LocalKeyringBuilder<S> {
    /// Registers a retired key that may still decrypt older tokens.
    ///
    /// # Errors
    /// Returns [`VaultError::Configuration`] if the material does not decode to 32 bytes.
    pub fn deprecated(mut self, id: impl Into<String>, material: &str) -> Result<Self, VaultError> {
        let id = id.into();
        let key = SecretKey::parse(material).context(format!("deprecated key \"{id}\""))?;
        self.deprecated.push((id, key));
        Ok(self)
    }

    #[must_use]
    pub fn deprecated_key(mut self, id: impl Into<String>, key: SecretKey) -> Self {
        self.deprecated.push((id.into(), key));
        self
    }

    /// Chooses between envelope tokens (a fresh data key per value, wrapped by the active key)
    /// and direct tokens (values encrypted under the active key itself).
    #[must_use]
    pub const fn wrap_data_keys(mut self, enabled: bool) -> Self {
        self.wrap_data_keys = enabled;
        self
    }
}

impl LocalKeyringBuilder<WithActive> {
    /// Finalizes the keyring.
    ///
    /// # Errors
    /// Returns [`VaultError::Configuration`] for blank or duplicate key ids.
    pub fn build(self) -> Result<LocalKeyring, VaultError> {
        let WithActive { id: active_id, key } = self.state;
        let active_id = active_id.trim().to_owned();

        let mut keys = FxHashMap::default();
        for (id, key) in std::iter::once((active_id.clone(), key)).chain(self.deprecated) {
            let id = id.trim().to_owned();
            if id.is_empty() {
                return Err(VaultError::configuration("Key id must not be blank"));
            }
            if keys.insert(id.clone(), key).is_some() {
                return Err(VaultError::configuration(format!("Duplicate key id \"{id}\"")));
            }
        }

        Ok(LocalKeyring::new(active_id, keys, self.wrap_data_keys))
    }
}
