use crate::error::CryptorError;
use crate::field::FieldSpec;
use std::sync::Arc;

/// A model whose sensitive fields are declared at compile time.
///
/// Usually generated by `#[encrypted_model]` (feature `derive`), but a manual impl is just as
/// valid:
///
/// ```rust
/// use fcrypt_cryptor::{EncryptedModel, Schema};
///
/// struct Integration;
///
/// impl EncryptedModel for Integration {
///     const NAME: &'static str = "integrations";
///     const SENSITIVE_FIELDS: &'static [&'static str] = &["token", "oauth.refresh"];
/// }
///
/// let schema = Schema::of::<Integration>().unwrap();
/// assert!(schema.is_sensitive("oauth.refresh"));
/// ```
pub trait EncryptedModel {
    /// Schema (collection) name.
    const NAME: &'static str;
    /// Logical dotted paths, as stored.
    const SENSITIVE_FIELDS: &'static [&'static str];
}

/// The set of sensitive fields of one schema. Immutable once built; clones share storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: Arc<str>,
    fields: Arc<[FieldSpec]>,
}

impl Schema {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder { name: name.into(), paths: Vec::new() }
    }

    /// Builds the schema declared by `T`.
    ///
    /// # Errors
    /// Same as [`SchemaBuilder::build`].
    pub fn of<T: EncryptedModel>() -> Result<Self, CryptorError> {
        Self::builder(T::NAME).fields(T::SENSITIVE_FIELDS.iter().copied()).build()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, path: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.path() == path)
    }

    #[must_use]
    pub fn is_sensitive(&self, path: &str) -> bool {
        self.field(path).is_some()
    }

    /// Top-level storage keys that may hold an encrypted value, across every permutation.
    #[must_use]
    pub fn top_level_fields(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for key in self.fields.iter().flat_map(FieldSpec::top_level_keys) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    paths: Vec<String>,
}

impl SchemaBuilder {
    /// Marks a logical dotted path as sensitive.
    #[must_use]
    pub fn sensitive(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    #[must_use]
    pub fn fields<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Validates every path and precomputes its permutations.
    ///
    /// # Errors
    /// * [`CryptorError::InvalidFieldPath`] for malformed or duplicate paths.
    /// * [`CryptorError::Internal`] if the schema name is blank.
    pub fn build(self) -> Result<Schema, CryptorError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CryptorError::from("Schema name must not be blank"));
        }

        let mut fields: Vec<FieldSpec> = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            if fields.iter().any(|field| field.path() == path) {
                return Err(CryptorError::invalid_path(path, "declared twice"));
            }
            fields.push(FieldSpec::new(path)?);
        }

        Ok(Schema { name: Arc::from(name), fields: fields.into() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_fields() {
        let schema = Schema::builder("integrations")
            .sensitive("secret")
            .sensitive("deeply.nested.secret")
            .build()
            .unwrap();
        assert_eq!(schema.name(), "integrations");
        assert_eq!(schema.fields().len(), 2);
        assert!(schema.is_sensitive("secret"));
        assert!(!schema.is_sensitive("deeply"));
        assert_eq!(
            schema.top_level_fields(),
            ["secret", "deeply", "deeply.nested", "deeply.nested.secret"]
        );
    }

    #[test]
    fn test_builder_rejects_duplicates_and_blank_name() {
        let duplicate = Schema::builder("s").sensitive("a").sensitive("a").build();
        assert!(matches!(duplicate, Err(CryptorError::InvalidFieldPath { .. })));

        let blank = Schema::builder(" ").sensitive("a").build();
        assert!(matches!(blank, Err(CryptorError::Internal { .. })));

        let invalid = Schema::builder("s").sensitive("a..b").build();
        assert!(matches!(invalid, Err(CryptorError::InvalidFieldPath { .. })));
    }
}
