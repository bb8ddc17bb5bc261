pub mod fixtures;

use fcrypt_cryptor::prelude::*;
use fcrypt_domain::document::json;
use fcrypt_vault::{LocalKeyring, Vault, VaultError};
use fixtures::*;

#[tokio::test]
async fn encrypts_and_decrypts_batch() {
    let cryptor = FieldCryptor::new(credentials_schema(), local_vault("2024", 1));
    let mut docs = vec![
        doc(json!({ "secret": "abc123", "plain": "x" })),
        doc(json!({ "deeply": { "nested": { "secret": "n1" } } })),
        doc(json!({ "deeply.nested": { "secret": "n2" } })),
        doc(json!({ "plain": "only" })),
    ];
    let original = docs.clone();

    cryptor.encrypt_fields_in_documents(&mut docs).await.unwrap();
    assert!(is_token(&docs[0]["secret"]));
    assert_ne!(docs[0]["secret"], "abc123");
    assert_eq!(docs[0]["plain"], "x");
    assert!(is_token(&docs[1]["deeply"]["nested"]["secret"]));
    assert!(is_token(&docs[2]["deeply.nested"]["secret"]));
    assert_eq!(docs[3], original[3]);

    cryptor.decrypt_fields_in_documents(&mut docs).await.unwrap();
    assert_eq!(docs, original);
}

#[tokio::test]
async fn same_plaintext_yields_distinct_tokens() {
    let cryptor = FieldCryptor::new(credentials_schema(), local_vault("2024", 1));
    let mut docs = vec![doc(json!({ "secret": "same" })), doc(json!({ "secret": "same" }))];
    cryptor.encrypt_fields_in_documents(&mut docs).await.unwrap();
    assert_ne!(docs[0]["secret"], docs[1]["secret"]);
}

#[tokio::test]
async fn rotation_keeps_old_documents_readable() {
    let schema = credentials_schema();
    let before = FieldCryptor::new(schema.clone(), local_vault("2023", 1));
    let mut docs = vec![doc(json!({ "secret": "old" }))];
    before.encrypt_fields_in_documents(&mut docs).await.unwrap();

    let rotated = Vault::local(
        LocalKeyring::builder()
            .active("2024", &material(2))
            .unwrap()
            .deprecated("2023", &material(1))
            .unwrap()
            .build()
            .unwrap(),
    );
    let after = FieldCryptor::new(schema, rotated);
    after.decrypt_fields_in_documents(&mut docs).await.unwrap();
    assert_eq!(docs[0]["secret"], "old");
}

#[tokio::test]
async fn unknown_key_id_is_surfaced() {
    let schema = credentials_schema();
    let writer = FieldCryptor::new(schema.clone(), local_vault("2023", 1));
    let mut docs = vec![doc(json!({ "secret": "old" }))];
    writer.encrypt_fields_in_documents(&mut docs).await.unwrap();
    let stored = docs.clone();

    let reader = FieldCryptor::new(schema, local_vault("2024", 2));
    let err = reader.decrypt_fields_in_documents(&mut docs).await.unwrap_err();
    assert!(matches!(err, CryptorError::Vault { source: VaultError::KeyNotFound { .. }, .. }));
    assert_eq!(docs, stored, "ciphertext is never handed back as plaintext");
}

#[tokio::test]
async fn remote_wrap_round_trip() {
    let kms = kms();
    let cryptor = FieldCryptor::new(credentials_schema(), remote_vault(kms.clone()));
    let mut docs = vec![doc(json!({ "secret": "abc123" }))];
    cryptor.encrypt_fields_in_documents(&mut docs).await.unwrap();

    let token = docs[0]["secret"].as_str().unwrap().to_owned();
    assert_eq!(token.split(':').count(), 4);
    cryptor.decrypt_fields_in_documents(&mut docs).await.unwrap();
    assert_eq!(docs[0]["secret"], "abc123");
    assert_eq!(kms.calls(), 2);
}

#[tokio::test]
async fn remote_failure_aborts_without_plaintext_fallback() {
    let kms = kms();
    let cryptor = FieldCryptor::new(credentials_schema(), remote_vault(kms.clone()));
    kms.set_unavailable(true);

    let mut docs = vec![doc(json!({ "secret": "abc123" }))];
    let err = cryptor.encrypt_fields_in_documents(&mut docs).await.unwrap_err();
    assert!(matches!(err, CryptorError::Vault { source: VaultError::RemoteKeyService { .. }, .. }));
    assert_eq!(docs[0]["secret"], "abc123");
}

#[tokio::test]
async fn bulk_guard_property() {
    let cryptor = FieldCryptor::new(credentials_schema(), local_vault("2024", 1));

    let touching = UpdateClause::new(doc(json!({ "$set": { "deeply.nested.secret": "x" } })));
    let err = cryptor.expect_not_to_update_many_encrypted(&touching).unwrap_err();
    assert!(matches!(err, CryptorError::UnsupportedBulkMutation { ref field, .. } if field == "deeply.nested.secret"));

    let harmless = UpdateClause::new(doc(json!({ "$set": { "plain": "x" }, "$inc": { "n": 1 } })));
    cryptor.expect_not_to_update_many_encrypted(&harmless).unwrap();

    for update in [
        json!({ "$push": { "secret": "plain" } }),
        json!({ "$addToSet": { "secret": "plain" } }),
        json!({ "$inc": { "deeply": { "nested.secret": 1 } } }),
        json!({ "$rename": { "plain": "secret" } }),
        json!({ "$rename": { "plain": "deeply" } }),
    ] {
        let update = UpdateClause::new(doc(update));
        let err = cryptor.expect_not_to_update_many_encrypted(&update).unwrap_err();
        assert!(matches!(err, CryptorError::UnsupportedBulkMutation { .. }));
    }
}

#[tokio::test]
async fn single_update_never_passes_plaintext_through() {
    let cryptor = FieldCryptor::new(credentials_schema(), local_vault("2024", 1));

    let mut query = Query::new(doc(json!({ "name": "n" })))
        .with_update(doc(json!({ "$push": { "secret": "plain" } })));
    let err = cryptor.encrypt_fields_in_query(&mut query).await.unwrap_err();
    assert!(matches!(err, CryptorError::UnsupportedUpdate { ref field, .. } if field == "secret"));
    assert_eq!(query.update.unwrap().as_document()["$push"]["secret"], "plain");

    let mut query = Query::new(doc(json!({ "secret": { "$eq": "abc" } })))
        .with_update(doc(json!({ "$set": { "deeply.nested.secret": "new" } })));
    cryptor.encrypt_fields_in_query(&mut query).await.unwrap();
    assert!(is_token(&query.filter["secret"]["$eq"]));
    assert!(is_token(&query.update.unwrap().set().unwrap()["deeply.nested.secret"]));
}

#[tokio::test]
async fn registry_shares_cryptors() {
    let registry = SchemaRegistry::new(local_vault("2024", 1));
    let cryptor = registry.register(credentials_schema()).unwrap();
    let again = registry.register(credentials_schema()).unwrap();

    let mut docs = vec![doc(json!({ "secret": "abc" }))];
    cryptor.encrypt_fields_in_documents(&mut docs).await.unwrap();
    again.decrypt_fields_in_documents(&mut docs).await.unwrap();
    assert_eq!(docs[0]["secret"], "abc");
}

#[tokio::test]
async fn concurrent_operations_share_one_cryptor() {
    let cryptor = FieldCryptor::new(credentials_schema(), local_vault("2024", 1));
    let mut tasks = Vec::new();
    for i in 0..8 {
        let cryptor = cryptor.clone();
        tasks.push(tokio::spawn(async move {
            let plaintext = format!("value-{i}");
            let mut docs = vec![doc(json!({ "secret": plaintext.clone() }))];
            cryptor.encrypt_fields_in_documents(&mut docs).await.unwrap();
            cryptor.decrypt_fields_in_documents(&mut docs).await.unwrap();
            assert_eq!(docs[0]["secret"], plaintext.as_str());
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
}
