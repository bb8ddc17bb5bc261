#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared across the FieldCrypt workspace.
//!
//! * [`fcrypt_error`] wires a domain error enum into the context/`From` conventions
//!   every crate in the workspace follows.
//! * [`encrypted_model`] declares the sensitive fields of a document type at compile time.
//!
//! ## Usage
//! Crates reach these macros through their own re-exports (`fcrypt_cryptor::encrypted_model`)
//! or directly:
//! ```toml
//! [dependencies]
//! fcrypt-derive = { path = "../infra/derive" }
//! ```
//!
//! Examples below are `ignore`d since they need the consuming crates in scope.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemStruct, parse_macro_input};

/// Attribute macro for domain-specific error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` unless already present.
/// * **Context Support**: Generates a companion `...Ext` trait that adds `.context()`
///   to the enum's own `Result` and to results of every wrapped source error.
/// * **Standard Conversions**: Implements `From<T>` for variants holding a `source` field,
///   so `?` works on upstream errors.
/// * **Internal Fallback**: Provides `From<&'static str>` and `From<String>` when an
///   `Internal` variant exists.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** whose variants all have named fields.
/// 2. Variants that support context carry a `context: Option<Cow<'static, str>>` field.
/// 3. Variants wrapping a source error must also carry the `context` field.
///
/// # Example
///
/// ```rust,ignore
/// use fcrypt_derive::fcrypt_error;
/// use std::borrow::Cow;
///
/// #[fcrypt_error]
/// pub enum KeyringError {
///     #[error("IO error{}: {source}", format_context(.context))]
///     Io {
///         #[source]
///         source: std::io::Error,
///         context: Option<Cow<'static, str>>,
///     },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn read_key(path: &Path) -> Result<Vec<u8>, KeyringError> {
///     let bytes = std::fs::read(path).context("Reading master key")?;
///     if bytes.len() != 32 {
///         return Err("Master key must be 32 bytes".into());
///     }
///     Ok(bytes)
/// }
/// ```
#[proc_macro_attribute]
pub fn fcrypt_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}

/// Declares which fields of a document type are stored encrypted.
///
/// Fields marked `#[encrypted]` contribute their serialized name (a `#[serde(rename)]`
/// or the container's `rename_all` policy is honoured). Nested paths that do not map
/// to a direct field are listed through `fields("a.b", ...)`.
///
/// # Results
/// Keeps the struct as written (minus the `#[encrypted]` markers) and implements
/// `EncryptedModel` with `NAME` and `SENSITIVE_FIELDS`.
///
/// # Arguments
///
/// * `name = "..."` - Schema name; defaults to the struct name.
/// * `fields("a.b", "c")` - Extra dotted paths.
/// * `crate = "path"` - Where `EncryptedModel` lives; defaults to `::fcrypt_cryptor`.
///
/// # Errors
/// Emits a compile-time error for non-structs, tuple structs, empty or duplicate
/// paths, paths with empty segments, and models that declare no sensitive field.
///
/// # Example
/// ```rust,ignore
/// use fcrypt_cryptor::encrypted_model;
///
/// #[encrypted_model(name = "credential", fields("provider.secret"))]
/// #[derive(Serialize, Deserialize)]
/// pub struct Credential {
///     #[encrypted]
///     #[serde(rename = "accessToken")]
///     pub access_token: String,
///     pub user_id: String,
///     pub provider: Provider,
/// }
/// ```
#[proc_macro_attribute]
pub fn encrypted_model(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::model::expand_model(args.into(), input).into()
}
