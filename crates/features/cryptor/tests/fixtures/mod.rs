#![allow(dead_code)]

use fcrypt_cryptor::prelude::*;
use fcrypt_domain::document::{Document, Value, into_document};
use fcrypt_vault::testing::InMemoryKms;
use fcrypt_vault::{EncryptedToken, KeyManagementService, LocalKeyring, RemoteKeyring, Vault};
use std::sync::Arc;

pub const MASTER_ARN: &str = "arn:aws:kms:eu-west-1:000000000000:key/cryptor";

/// 32 bytes of `byte`, hex encoded.
#[must_use]
pub fn material(byte: u8) -> String {
    format!("{byte:02x}").repeat(32)
}

/// # Panics
/// * If the keyring cannot be built.
#[must_use]
pub fn local_vault(active: &str, byte: u8) -> Vault {
    Vault::local(LocalKeyring::builder().active(active, &material(byte)).unwrap().build().unwrap())
}

/// # Panics
/// * If the remote keyring cannot be built.
#[must_use]
pub fn remote_vault(kms: Arc<InMemoryKms>) -> Vault {
    let service: Arc<dyn KeyManagementService> = kms;
    Vault::remote(RemoteKeyring::new(MASTER_ARN, service).unwrap())
}

#[must_use]
pub fn kms() -> Arc<InMemoryKms> {
    Arc::new(InMemoryKms::new().with_master_key(MASTER_ARN))
}

/// `secret` at the top level and `deeply.nested.secret` below.
///
/// # Panics
/// * If the schema is invalid.
#[must_use]
pub fn credentials_schema() -> Schema {
    Schema::builder("credentials")
        .sensitive("secret")
        .sensitive("deeply.nested.secret")
        .build()
        .unwrap()
}

/// # Panics
/// * If the value is not a JSON object.
#[must_use]
pub fn doc(value: Value) -> Document {
    into_document(value).unwrap()
}

#[must_use]
pub fn is_token(value: &Value) -> bool {
    value.as_str().is_some_and(EncryptedToken::is_token)
}
