use crate::error::{FcryptError, FcryptErrorExt};
use fcrypt_cryptor::{
    FieldCryptor, LifecycleAdapter, LifecycleHooks, PassthroughHooks, Schema, SchemaRegistry,
};
use fcrypt_domain::config::{EncryptionConfig, FieldCryptConfig};
use fcrypt_domain::constants::AUDIT_TARGET;
use fcrypt_domain::document::{Document, Value, into_document, json};
use fcrypt_domain::mode::{EncryptionHealth, EncryptionMode, EncryptionStatus, HealthStatus};
use fcrypt_kernel::config::load_config;
use fcrypt_kernel::mode::resolve_mode;
use fcrypt_vault::{
    EncryptedToken, KeyManagementService, KeyStrategy, LocalKeyring, RemoteKeyring, Vault,
    VaultError,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const PROBE_SCHEMA: &str = "__fcrypt_health";
const PROBE_FIELDS: [&str; 2] = ["secret", "nested.secret"];

#[derive(Debug)]
struct Active {
    vault: Vault,
    registry: SchemaRegistry,
}

#[derive(Debug)]
struct EncryptionInner {
    stage: Option<String>,
    mode: EncryptionMode,
    active: Option<Active>,
}

/// Process-wide field encryption, resolved once at startup.
///
/// Holds the key source and the schema registry for the resolved [`EncryptionMode`]. A bypassed
/// stage holds neither; its hooks store documents unchanged.
///
/// ### Example
/// ```rust
/// use fcrypt::prelude::*;
/// use fcrypt::domain::config::{EncryptionConfig, KeyMaterialConfig, LocalKeysConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), FcryptError> {
/// let config = EncryptionConfig {
///     local: Some(LocalKeysConfig {
///         active: KeyMaterialConfig::new("2024", "11".repeat(32)),
///         ..LocalKeysConfig::default()
///     }),
///     ..EncryptionConfig::default()
/// };
/// let encryption = Encryption::from_config(&config, None)?;
/// assert_eq!(encryption.health_check().await.status, HealthStatus::Enabled);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Encryption {
    inner: Arc<EncryptionInner>,
}

impl Encryption {
    /// Resolves the mode and builds the matching key source.
    ///
    /// `kms` is only consulted in remote mode, where it is required.
    ///
    /// # Errors
    /// * [`FcryptError::Config`] if local and remote keys are both set, or neither is set for a
    ///   stage that is not bypassed.
    /// * [`FcryptError::Vault`] if key material is invalid or remote mode has no service handle.
    #[instrument(skip_all, fields(stage = config.stage()))]
    pub fn from_config(
        config: &EncryptionConfig,
        kms: Option<Arc<dyn KeyManagementService>>,
    ) -> Result<Self, FcryptError> {
        let mode = resolve_mode(config)?;
        let vault = match &mode {
            EncryptionMode::Bypass { .. } => None,
            EncryptionMode::Local => {
                let keys = config.local_keys().ok_or("Local mode resolved without local keys")?;
                Some(Vault::local(LocalKeyring::from_config(keys).context("local keys")?))
            },
            EncryptionMode::Remote => {
                let remote = config.remote_key().ok_or("Remote mode resolved without a key id")?;
                let service = kms.ok_or_else(|| VaultError::Configuration {
                    message: "Remote key mode requires a key management service".into(),
                    context: None,
                })?;
                Some(Vault::remote(RemoteKeyring::from_config(remote, service)?))
            },
        };

        info!(mode = mode.as_str(), "Field encryption initialized");
        Ok(Self::assemble(config.stage().map(str::to_owned), mode, vault))
    }

    /// Loads [`FieldCryptConfig`] from `path` (plus `FCRYPT__` overrides) and builds from its
    /// `encryption` section.
    ///
    /// # Errors
    /// Everything [`Encryption::from_config`] returns, plus [`FcryptError::Config`] when the
    /// file is missing or does not deserialize.
    pub fn load(
        path: Option<impl AsRef<Path>>,
        kms: Option<Arc<dyn KeyManagementService>>,
    ) -> Result<Self, FcryptError> {
        let config: FieldCryptConfig = load_config(path)?;
        Self::from_config(&config.encryption, kms)
    }

    /// Wraps an already built vault, skipping configuration.
    #[must_use]
    pub fn with_vault(stage: Option<String>, vault: Vault) -> Self {
        let mode = match vault.strategy() {
            KeyStrategy::Local => EncryptionMode::Local,
            KeyStrategy::Remote => EncryptionMode::Remote,
        };
        Self::assemble(stage, mode, Some(vault))
    }

    /// Explicitly bypassed encryption for `stage`.
    #[must_use]
    pub fn bypassed(stage: impl Into<String>) -> Self {
        let stage = stage.into();
        warn!(target: AUDIT_TARGET, stage = %stage, "Field encryption bypassed");
        Self::assemble(Some(stage.clone()), EncryptionMode::Bypass { stage }, None)
    }

    fn assemble(stage: Option<String>, mode: EncryptionMode, vault: Option<Vault>) -> Self {
        let active =
            vault.map(|vault| Active { registry: SchemaRegistry::new(vault.clone()), vault });
        Self { inner: Arc::new(EncryptionInner { stage, mode, active }) }
    }

    #[must_use]
    pub fn mode(&self) -> &EncryptionMode {
        &self.inner.mode
    }

    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        self.inner.stage.as_deref()
    }

    #[must_use]
    pub fn is_bypassed(&self) -> bool {
        self.inner.mode.is_bypass()
    }

    /// The vault, unless bypassed.
    #[must_use]
    pub fn vault(&self) -> Option<&Vault> {
        self.inner.active.as_ref().map(|active| &active.vault)
    }

    /// The schema registry, unless bypassed.
    #[must_use]
    pub fn registry(&self) -> Option<&SchemaRegistry> {
        self.inner.active.as_ref().map(|active| &active.registry)
    }

    /// Registers `schema` and returns the cryptor for it; `None` when bypassed.
    ///
    /// # Errors
    /// [`FcryptError::Cryptor`] if a schema of the same name was registered with other fields.
    pub fn cryptor_for(&self, schema: &Schema) -> Result<Option<FieldCryptor>, FcryptError> {
        let Some(active) = &self.inner.active else { return Ok(None) };
        Ok(Some(active.registry.register(schema.clone())?))
    }

    /// The hooks a document store installs for `schema`.
    ///
    /// # Results
    /// A [`LifecycleAdapter`] over the registered cryptor, or [`PassthroughHooks`] when the
    /// stage is bypassed.
    ///
    /// # Errors
    /// Same as [`Encryption::cryptor_for`].
    pub fn hooks_for(&self, schema: &Schema) -> Result<Arc<dyn LifecycleHooks>, FcryptError> {
        match self.cryptor_for(schema)? {
            Some(cryptor) => Ok(LifecycleAdapter::shared(cryptor)),
            None => Ok(Arc::new(PassthroughHooks::new(self.stage().unwrap_or_default()))),
        }
    }

    #[must_use]
    pub fn status(&self) -> EncryptionStatus {
        EncryptionStatus {
            stage: self.inner.stage.clone(),
            mode: self.inner.mode.clone(),
            bypassed: self.is_bypassed(),
        }
    }

    /// Round-trips a probe document through the configured keys.
    ///
    /// Never fails: problems are reported as [`HealthStatus::Unhealthy`] with a `detail`.
    #[instrument(skip_all, fields(mode = self.inner.mode.as_str()))]
    pub async fn health_check(&self) -> EncryptionHealth {
        let mut health = EncryptionHealth {
            status: HealthStatus::Disabled,
            mode: self.inner.mode.clone(),
            bypassed: self.is_bypassed(),
            stage: self.inner.stage.clone(),
            detail: None,
            encryption_works: false,
        };

        let Some(active) = &self.inner.active else {
            health.detail = Some("Field encryption is bypassed for this stage".to_owned());
            return health;
        };

        match probe(&active.vault).await {
            Ok(()) => {
                debug!("Health probe round-tripped");
                health.status = HealthStatus::Enabled;
                health.encryption_works = true;
            },
            Err(e) => {
                warn!(error = %e, "Health probe failed");
                health.status = HealthStatus::Unhealthy;
                health.detail = Some(e.to_string());
            },
        }
        health
    }
}

async fn probe(vault: &Vault) -> Result<(), FcryptError> {
    let schema = Schema::builder(PROBE_SCHEMA).fields(PROBE_FIELDS).build()?;
    let cryptor = FieldCryptor::new(schema, vault.clone());

    let original = into_document(json!({
        "secret": "probe-top-level",
        "nested": { "secret": "probe-nested" },
        "plain": "probe-plain",
    }))
    .ok_or("Probe document is not an object")?;

    let mut docs = [original.clone()];
    cryptor.encrypt_fields_in_documents(&mut docs).await.context("encrypting probe")?;
    let [encrypted] = &docs;

    for path in PROBE_FIELDS {
        let value = lookup(encrypted, path).and_then(Value::as_str).unwrap_or_default();
        if !EncryptedToken::is_token(value) {
            return Err(format!("Sensitive field \"{path}\" was not encrypted").into());
        }
    }
    if encrypted.get("plain") != original.get("plain") {
        return Err("Plain field was modified by encryption".into());
    }

    cryptor.decrypt_fields_in_documents(&mut docs).await.context("decrypting probe")?;
    let [decrypted] = docs;
    if decrypted != original {
        return Err("Decrypted probe does not match the original".into());
    }
    Ok(())
}

fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = doc.get(segments.next()?)?;
    segments.try_fold(first, |value, segment| value.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcrypt_domain::config::{KeyMaterialConfig, LocalKeysConfig, RemoteKeyConfig};
    use fcrypt_vault::testing::InMemoryKms;

    const MASTER: &str = "arn:aws:kms:eu-west-1:000000000000:key/health";

    fn local() -> Option<LocalKeysConfig> {
        Some(LocalKeysConfig {
            active: KeyMaterialConfig::new("2024", "ab".repeat(32)),
            ..LocalKeysConfig::default()
        })
    }

    #[tokio::test]
    async fn test_local_health_is_enabled() {
        let config = EncryptionConfig { local: local(), ..EncryptionConfig::default() };
        let encryption = Encryption::from_config(&config, None).unwrap();

        let health = encryption.health_check().await;
        assert_eq!(health.status, HealthStatus::Enabled);
        assert!(health.encryption_works);
        assert_eq!(health.mode, EncryptionMode::Local);
        assert!(health.detail.is_none());
    }

    #[tokio::test]
    async fn test_remote_without_service_is_a_configuration_error() {
        let config = EncryptionConfig {
            remote: Some(RemoteKeyConfig { master_key_id: MASTER.to_owned() }),
            ..EncryptionConfig::default()
        };
        let err = Encryption::from_config(&config, None).unwrap_err();
        assert!(matches!(err, FcryptError::Vault { source: VaultError::Configuration { .. }, .. }));
    }

    #[tokio::test]
    async fn test_unavailable_service_is_unhealthy_not_an_error() {
        let kms = Arc::new(InMemoryKms::new().with_master_key(MASTER));
        let config = EncryptionConfig {
            remote: Some(RemoteKeyConfig { master_key_id: MASTER.to_owned() }),
            ..EncryptionConfig::default()
        };
        let service: Arc<dyn KeyManagementService> = kms.clone();
        let encryption = Encryption::from_config(&config, Some(service)).unwrap();
        assert_eq!(encryption.health_check().await.status, HealthStatus::Enabled);

        kms.set_unavailable(true);
        let health = encryption.health_check().await;
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert!(!health.encryption_works);
        assert!(health.detail.unwrap().contains("unavailable"));
    }

    #[tokio::test]
    async fn test_bypass_is_disabled() {
        let config = EncryptionConfig {
            stage: Some("dev".to_owned()),
            bypass_stages: vec!["dev".to_owned()],
            local: local(),
            ..EncryptionConfig::default()
        };
        let encryption = Encryption::from_config(&config, None).unwrap();
        assert!(encryption.vault().is_none());
        assert!(encryption.registry().is_none());

        let health = encryption.health_check().await;
        assert_eq!(health.status, HealthStatus::Disabled);
        assert!(health.bypassed);
        assert_eq!(health.stage.as_deref(), Some("dev"));
    }

    #[test]
    fn test_status_reports_stage_and_mode() {
        let config = EncryptionConfig {
            stage: Some("prod".to_owned()),
            local: local(),
            ..EncryptionConfig::default()
        };
        let status = Encryption::from_config(&config, None).unwrap().status();
        assert_eq!(status.stage.as_deref(), Some("prod"));
        assert_eq!(status.mode, EncryptionMode::Local);
        assert!(!status.bypassed);
    }

    #[tokio::test]
    async fn test_prebuilt_vault_and_explicit_bypass() {
        let keyring =
            LocalKeyring::builder().active("k1", &"0f".repeat(32)).unwrap().build().unwrap();
        let encryption = Encryption::with_vault(None, Vault::local(keyring));
        assert_eq!(encryption.mode(), &EncryptionMode::Local);
        assert_eq!(encryption.health_check().await.status, HealthStatus::Enabled);

        let bypassed = Encryption::bypassed("qa");
        assert!(bypassed.is_bypassed());
        let schema = Schema::builder("probe").sensitive("secret").build().unwrap();
        assert!(bypassed.cryptor_for(&schema).unwrap().is_none());

        let hooks = bypassed.hooks_for(&schema).unwrap();
        let mut doc = into_document(json!({ "secret": "plain" })).unwrap();
        hooks.before_save(&mut doc).await.unwrap();
        assert_eq!(doc["secret"], "plain");
    }

    #[test]
    fn test_lookup_follows_nested_objects() {
        let doc = into_document(json!({ "a": { "b": "c" }, "x": "y" })).unwrap();
        assert_eq!(lookup(&doc, "a.b"), Some(&json!("c")));
        assert_eq!(lookup(&doc, "x"), Some(&json!("y")));
        assert_eq!(lookup(&doc, "a.z"), None);
    }
}
