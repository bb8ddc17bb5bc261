use crate::cryptor::FieldCryptor;
use crate::error::CryptorError;
use crate::schema::Schema;
use fcrypt_vault::Vault;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Caches one [`FieldCryptor`] per schema name, so permutations are computed once per process.
///
/// Reads vastly outnumber registrations; lookups take a shared lock and clone two `Arc`s.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    vault: Vault,
    cryptors: Arc<RwLock<FxHashMap<Arc<str>, FieldCryptor>>>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new(vault: Vault) -> Self {
        Self { vault, cryptors: Arc::default() }
    }

    /// Registers `schema`, or returns the cryptor already registered under its name.
    ///
    /// # Errors
    /// Returns [`CryptorError::SchemaConflict`] if the name is taken by a schema with different
    /// sensitive fields.
    pub fn register(&self, schema: Schema) -> Result<FieldCryptor, CryptorError> {
        if let Some(existing) = self.cryptors.read().get(schema.name()) {
            return Self::reuse(existing, &schema);
        }

        let mut cryptors = self.cryptors.write();
        if let Some(existing) = cryptors.get(schema.name()) {
            return Self::reuse(existing, &schema);
        }
        debug!(schema = schema.name(), fields = schema.fields().len(), "Schema registered");
        let name: Arc<str> = Arc::from(schema.name());
        let cryptor = FieldCryptor::new(schema, self.vault.clone());
        cryptors.insert(name, cryptor.clone());
        Ok(cryptor)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<FieldCryptor> {
        self.cryptors.read().get(name).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cryptors.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cryptors.read().is_empty()
    }

    /// Registered schema names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cryptors.read().keys().map(|k| k.to_string()).collect();
        names.sort_unstable();
        names
    }

    fn reuse(existing: &FieldCryptor, schema: &Schema) -> Result<FieldCryptor, CryptorError> {
        if existing.schema() == schema {
            Ok(existing.clone())
        } else {
            Err(CryptorError::SchemaConflict { schema: schema.name().to_owned(), context: None })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcrypt_vault::{LocalKeyring, SecretKey};

    fn registry() -> SchemaRegistry {
        let keyring =
            LocalKeyring::builder().active_key("k1", SecretKey::from_bytes([5; 32])).build().unwrap();
        SchemaRegistry::new(Vault::local(keyring))
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = registry();
        let schema = Schema::builder("users").sensitive("token").build().unwrap();
        let first = registry.register(schema.clone()).unwrap();
        let second = registry.register(schema).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(std::ptr::eq(first.schema().fields(), second.schema().fields()));
        assert_eq!(registry.names(), ["users"]);
        assert!(registry.get("users").is_some());
        assert!(registry.get("other").is_none());
    }

    #[test]
    fn test_conflicting_registration() {
        let registry = registry();
        registry.register(Schema::builder("users").sensitive("a").build().unwrap()).unwrap();
        let err = registry
            .register(Schema::builder("users").sensitive("b").build().unwrap())
            .unwrap_err();
        assert!(matches!(err, CryptorError::SchemaConflict { .. }));
    }
}
