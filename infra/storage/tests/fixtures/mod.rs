#![allow(dead_code)]

use fcrypt_cryptor::{FieldCryptor, LifecycleAdapter, PassthroughHooks, Schema};
use fcrypt_domain::document::{Document, Value, into_document};
use fcrypt_storage::Collection;
use fcrypt_vault::{EncryptedToken, LocalKeyring, Vault};
use std::sync::Arc;

#[must_use]
pub fn material(byte: u8) -> String {
    format!("{byte:02x}").repeat(32)
}

/// `secret` and `deeply.nested.secret` are sensitive; `notSecret` is not.
///
/// # Panics
/// * If the schema is invalid.
#[must_use]
pub fn schema() -> Schema {
    Schema::builder("test").sensitive("secret").sensitive("deeply.nested.secret").build().unwrap()
}

/// # Panics
/// * If the keyring cannot be built.
#[must_use]
pub fn vault(active: &str, byte: u8) -> Vault {
    Vault::local(LocalKeyring::builder().active(active, &material(byte)).unwrap().build().unwrap())
}

#[must_use]
pub fn encrypted_collection(vault: Vault) -> Collection {
    Collection::builder("test")
        .hooks(LifecycleAdapter::shared(FieldCryptor::new(schema(), vault)))
        .build()
}

#[must_use]
pub fn bypassed_collection() -> Collection {
    Collection::builder("test").hooks(Arc::new(PassthroughHooks::new("not-encryption-test"))).build()
}

/// # Panics
/// * If the value is not a JSON object.
#[must_use]
pub fn doc(value: Value) -> Document {
    into_document(value).unwrap()
}

/// # Panics
/// * If the value is not a string.
pub fn assert_token(value: &Value) {
    let text = value.as_str().expect("stored value should be a string");
    assert!(EncryptedToken::is_token(text), "{text} is not a token");
}
