use serde::Deserialize;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level configuration of a process embedding FieldCrypt.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldCryptConfigInner {
    pub encryption: EncryptionConfig,
    pub logging: LoggingConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct FieldCryptConfig {
    #[serde(flatten, default)]
    inner: Arc<FieldCryptConfigInner>,
}

impl Deref for FieldCryptConfig {
    type Target = FieldCryptConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for FieldCryptConfig {
    fn deref_mut(&mut self) -> &mut FieldCryptConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Key strategy and stage switches.
///
/// `local` and `remote` are mutually exclusive; having both is rejected at startup.
/// `bypass_stages` is empty unless listed explicitly.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    pub stage: Option<String>,
    pub bypass_stages: Vec<String>,
    pub local: Option<LocalKeysConfig>,
    pub remote: Option<RemoteKeyConfig>,
}

impl EncryptionConfig {
    /// The stage name, with blank values treated as unset.
    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Local keys, when configured with a non-blank active id.
    #[must_use]
    pub fn local_keys(&self) -> Option<&LocalKeysConfig> {
        self.local.as_ref().filter(|local| !local.active.id.trim().is_empty())
    }

    /// Remote key settings, when configured with a non-blank master key id.
    #[must_use]
    pub fn remote_key(&self) -> Option<&RemoteKeyConfig> {
        self.remote.as_ref().filter(|remote| !remote.master_key_id.trim().is_empty())
    }
}

/// Local key material: the active key plus keys kept for decrypting older tokens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalKeysConfig {
    pub active: KeyMaterialConfig,
    pub deprecated: Vec<KeyMaterialConfig>,
    /// Encrypt each value under a fresh data key wrapped by the active key (envelope tokens).
    /// When off, values are encrypted directly under the active key.
    pub wrap_data_keys: bool,
}

impl Default for LocalKeysConfig {
    fn default() -> Self {
        Self { active: KeyMaterialConfig::default(), deprecated: Vec::new(), wrap_data_keys: true }
    }
}

/// One symmetric key: 32 bytes as 64 hex chars or base64.
#[derive(Default, Clone, Deserialize)]
#[serde(default)]
pub struct KeyMaterialConfig {
    pub id: String,
    pub key: String,
}

impl KeyMaterialConfig {
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self { id: id.into(), key: key.into() }
    }
}

impl fmt::Debug for KeyMaterialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterialConfig").field("id", &self.id).field("key", &"<redacted>").finish()
    }
}

/// Remote key-management settings.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteKeyConfig {
    /// Master key identifier (ARN or alias) used to wrap data keys.
    pub master_key_id: String,
}

/// Log output settings consumed by `fcrypt-logger`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub name: String,
    pub level: String,
    pub console: bool,
    pub json: bool,
    pub directory: Option<PathBuf>,
    pub audit_directory: Option<PathBuf>,
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            name: "fcrypt".to_owned(),
            level: "info".to_owned(),
            console: true,
            json: false,
            directory: None,
            audit_directory: None,
            max_files: 7,
        }
    }
}
