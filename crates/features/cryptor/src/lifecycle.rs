//! # Lifecycle Hooks
//!
//! The storage engine calls these hooks around its own persistence calls: encryption strictly
//! before a write reaches storage, decryption strictly after a read returns. A hook error must
//! abort the triggering operation before anything is written or returned.
//!
//! | Storage event                      | Hook                   |
//! |------------------------------------|------------------------|
//! | insert or save of one document     | `before_save`          |
//! | insert of many documents           | `before_insert_many`   |
//! | update / upsert of one document    | `before_update_one`    |
//! | update of every matching document  | `before_update_many`   |
//! | read of one document               | `after_read`           |
//! | read of many documents             | `after_read_many`      |

use crate::cryptor::FieldCryptor;
use crate::error::CryptorError;
use crate::query::{Query, UpdateClause};
use async_trait::async_trait;
use fcrypt_domain::document::Document;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Hooks a document store invokes around persistence. Object safe, so stores hold
/// `Arc<dyn LifecycleHooks>` and never know whether encryption is active.
#[async_trait]
pub trait LifecycleHooks: Send + Sync + fmt::Debug {
    async fn before_save(&self, doc: &mut Document) -> Result<(), CryptorError>;

    async fn before_insert_many(&self, docs: &mut [Document]) -> Result<(), CryptorError>;

    async fn before_update_one(&self, query: &mut Query) -> Result<(), CryptorError>;

    /// Must reject the update rather than rewrite it.
    async fn before_update_many(&self, update: &UpdateClause) -> Result<(), CryptorError>;

    async fn after_read(&self, doc: &mut Document) -> Result<(), CryptorError>;

    async fn after_read_many(&self, docs: &mut [Document]) -> Result<(), CryptorError>;
}

/// Routes every hook to a [`FieldCryptor`].
#[derive(Debug, Clone)]
pub struct LifecycleAdapter {
    cryptor: FieldCryptor,
}

impl LifecycleAdapter {
    #[must_use]
    pub const fn new(cryptor: FieldCryptor) -> Self {
        Self { cryptor }
    }

    #[must_use]
    pub fn shared(cryptor: FieldCryptor) -> Arc<dyn LifecycleHooks> {
        Arc::new(Self::new(cryptor))
    }

    #[must_use]
    pub const fn cryptor(&self) -> &FieldCryptor {
        &self.cryptor
    }
}

#[async_trait]
impl LifecycleHooks for LifecycleAdapter {
    async fn before_save(&self, doc: &mut Document) -> Result<(), CryptorError> {
        self.cryptor.encrypt_fields_in_documents(std::slice::from_mut(doc)).await
    }

    async fn before_insert_many(&self, docs: &mut [Document]) -> Result<(), CryptorError> {
        self.cryptor.encrypt_fields_in_documents(docs).await
    }

    async fn before_update_one(&self, query: &mut Query) -> Result<(), CryptorError> {
        self.cryptor.encrypt_fields_in_query(query).await
    }

    async fn before_update_many(&self, update: &UpdateClause) -> Result<(), CryptorError> {
        self.cryptor.expect_not_to_update_many_encrypted(update)
    }

    async fn after_read(&self, doc: &mut Document) -> Result<(), CryptorError> {
        self.cryptor.decrypt_fields_in_documents(std::slice::from_mut(doc)).await
    }

    async fn after_read_many(&self, docs: &mut [Document]) -> Result<(), CryptorError> {
        self.cryptor.decrypt_fields_in_documents(docs).await
    }
}

/// Hooks for a bypassed stage: documents are stored and returned exactly as given.
///
/// Only ever installed when the configuration names the current stage as bypassed.
#[derive(Debug, Clone)]
pub struct PassthroughHooks {
    stage: Arc<str>,
}

impl PassthroughHooks {
    #[must_use]
    pub fn new(stage: impl AsRef<str>) -> Self {
        Self { stage: Arc::from(stage.as_ref()) }
    }

    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }
}

#[async_trait]
impl LifecycleHooks for PassthroughHooks {
    async fn before_save(&self, _doc: &mut Document) -> Result<(), CryptorError> {
        trace!(stage = %self.stage, "Encryption bypassed");
        Ok(())
    }

    async fn before_insert_many(&self, docs: &mut [Document]) -> Result<(), CryptorError> {
        trace!(stage = %self.stage, documents = docs.len(), "Encryption bypassed");
        Ok(())
    }

    async fn before_update_one(&self, _query: &mut Query) -> Result<(), CryptorError> {
        Ok(())
    }

    async fn before_update_many(&self, _update: &UpdateClause) -> Result<(), CryptorError> {
        Ok(())
    }

    async fn after_read(&self, _doc: &mut Document) -> Result<(), CryptorError> {
        Ok(())
    }

    async fn after_read_many(&self, _docs: &mut [Document]) -> Result<(), CryptorError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use fcrypt_domain::document::{into_document, json};
    use fcrypt_vault::{EncryptedToken, LocalKeyring, SecretKey, Vault};

    fn adapter() -> Arc<dyn LifecycleHooks> {
        let schema = Schema::builder("test").sensitive("secret").build().unwrap();
        let keyring =
            LocalKeyring::builder().active_key("k1", SecretKey::from_bytes([8; 32])).build().unwrap();
        LifecycleAdapter::shared(FieldCryptor::new(schema, Vault::local(keyring)))
    }

    #[tokio::test]
    async fn test_save_then_read() {
        let hooks = adapter();
        let mut doc = into_document(json!({ "secret": "abc123", "plain": "x" })).unwrap();
        hooks.before_save(&mut doc).await.unwrap();
        assert!(EncryptedToken::is_token(doc["secret"].as_str().unwrap()));

        hooks.after_read(&mut doc).await.unwrap();
        assert_eq!(doc["secret"], "abc123");
        assert_eq!(doc["plain"], "x");
    }

    #[tokio::test]
    async fn test_update_many_is_rejected() {
        let hooks = adapter();
        let update = UpdateClause::new(into_document(json!({ "$set": { "secret": "x" } })).unwrap());
        let err = hooks.before_update_many(&update).await.unwrap_err();
        assert!(matches!(err, CryptorError::UnsupportedBulkMutation { .. }));
    }

    #[tokio::test]
    async fn test_passthrough_leaves_documents_alone() {
        let hooks: Arc<dyn LifecycleHooks> = Arc::new(PassthroughHooks::new("local"));
        let mut doc = into_document(json!({ "secret": "abc123" })).unwrap();
        hooks.before_save(&mut doc).await.unwrap();
        assert_eq!(doc["secret"], "abc123");

        let update = UpdateClause::new(into_document(json!({ "$set": { "secret": "x" } })).unwrap());
        hooks.before_update_many(&update).await.unwrap();
    }
}
