//! # Field Encryption
//!
//! This crate decides *which* values of a document are sensitive and hands them to
//! [`fcrypt_vault::Vault`] for sealing or opening. It is the layer a document store talks to.
//!
//! ## Architecture
//!
//! 1.  **Paths ([`permutations_for`], [`FieldSpec`]):** a logical dotted path may be stored as
//!     nested objects, literal dotted keys, or any mix of both. Every split is computed once,
//!     nested-first.
//! 2.  **Schemas ([`Schema`], [`SchemaRegistry`]):** the sensitive paths of one collection,
//!     declared at runtime or with `#[encrypted_model]` (feature `derive`).
//! 3.  **Orchestration ([`FieldCryptor`]):** encrypts and decrypts documents, encrypts the
//!     values of single-document queries and updates, and rejects bulk updates that write a
//!     sensitive field.
//! 4.  **Hooks ([`LifecycleHooks`]):** the interface a store calls around persistence,
//!     implemented by [`LifecycleAdapter`] and, for bypassed stages, [`PassthroughHooks`].
//!
//! ## Value semantics
//!
//! * `null`, the empty string and absent fields are left alone.
//! * Only strings are encrypted; any other value at a sensitive path is an error.
//! * Decrypting a value that is not a token is an error, never a pass-through.

mod cryptor;
mod error;
mod field;
pub mod lifecycle;
mod path;
mod permutation;
mod query;
mod registry;
mod schema;

pub use crate::cryptor::FieldCryptor;
pub use crate::error::{CryptorError, CryptorErrorExt};
pub use crate::field::FieldSpec;
pub use crate::lifecycle::{LifecycleAdapter, LifecycleHooks, PassthroughHooks};
pub use crate::permutation::{MAX_PATH_TOKENS, Permutation, permutations_for};
pub use crate::query::{Query, UpdateClause};
pub use crate::registry::SchemaRegistry;
pub use crate::schema::{EncryptedModel, Schema, SchemaBuilder};
#[cfg(feature = "derive")]
pub use fcrypt_derive::encrypted_model;

pub mod prelude {
    pub use crate::cryptor::FieldCryptor;
    pub use crate::error::{CryptorError, CryptorErrorExt};
    pub use crate::lifecycle::{LifecycleAdapter, LifecycleHooks, PassthroughHooks};
    pub use crate::query::{Query, UpdateClause};
    pub use crate::registry::SchemaRegistry;
    pub use crate::schema::{EncryptedModel, Schema};
    #[cfg(feature = "derive")]
    pub use fcrypt_derive::encrypted_model;
}
