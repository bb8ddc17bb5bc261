//! An in-memory document collection that runs encryption hooks around every operation.
//!
//! It plays the part of the host document store: encryption runs strictly before a write
//! reaches the collection, decryption strictly after a read leaves it. Callers always get
//! decrypted copies while stored documents stay encrypted; the `raw_*` reads bypass the hooks
//! so tests can inspect what is actually at rest.
//!
//! # Core Features
//!
//! - **Ordered documents** keyed by `_id`, with optional sequential id generation.
//! - **Equality filters** over dotted paths, plus `$and`, `$or`, `$nor` and `$eq`.
//! - **Update operators** `$set`, `$setOnInsert`, `$unset`, `$inc` and implicit set.
//! - **Abort on hook failure**: a failing pre-write hook leaves the collection untouched.
//!
//! # Examples
//!
//! ```rust
//! use fcrypt_cryptor::{LifecycleAdapter, FieldCryptor, Schema};
//! use fcrypt_domain::document::{into_document, json};
//! use fcrypt_storage::Collection;
//! use fcrypt_vault::{LocalKeyring, Vault};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Schema::builder("credentials").sensitive("secret").build()?;
//! let vault = Vault::local(LocalKeyring::builder().active("k1", &"07".repeat(32))?.build()?);
//! let credentials = Collection::builder("credentials")
//!     .hooks(LifecycleAdapter::shared(FieldCryptor::new(schema, vault)))
//!     .build();
//!
//! let id = credentials.insert_one(into_document(json!({ "secret": "abc123" })).unwrap()).await?;
//! let filter = into_document(json!({ "_id": id })).unwrap();
//!
//! let raw = credentials.raw_find_one(&filter)?.unwrap();
//! assert_ne!(raw["secret"], "abc123");
//!
//! let doc = credentials.find_one(&filter).await?.unwrap();
//! assert_eq!(doc["secret"], "abc123");
//! # Ok(())
//! # }
//! ```

mod builder;
mod engine;
mod error;
mod filter;
mod options;
mod update;

pub use builder::{CollectionBuilder, NoHooks, WithHooks};
pub use engine::Collection;
pub use error::{StorageError, StorageErrorExt};
pub use options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions, UpdateResult};
