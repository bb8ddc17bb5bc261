use crate::error::{CryptorError, CryptorErrorExt};
use crate::field::FieldSpec;
use crate::path;
use crate::query::{Query, UpdateClause, WRITE_OPERATORS, is_sealed};
use crate::schema::Schema;
use fcrypt_domain::constants::{AUDIT_TARGET, RENAME};
use fcrypt_domain::document::{Document, Value, has_value};
use fcrypt_vault::{EncryptedToken, Vault};
use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, instrument, warn};

/// Logical filter operators whose clauses are filters themselves.
const LOGICAL_OPERATORS: [&str; 3] = ["$and", "$or", "$nor"];

const EQ: &str = "$eq";

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// Locates the sensitive fields of one [`Schema`] in documents, filters and update clauses,
/// and seals or opens them through a [`Vault`].
///
/// Holds only shared, read-only state (the precomputed permutations and the key source), so
/// clones can serve concurrent operations.
///
/// Every operation works on a staged copy and commits only on success: a failing field leaves
/// the caller's documents exactly as they were.
#[derive(Debug, Clone)]
pub struct FieldCryptor {
    schema: Schema,
    vault: Vault,
}

impl FieldCryptor {
    #[must_use]
    pub const fn new(schema: Schema, vault: Vault) -> Self {
        Self { schema, vault }
    }

    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub const fn vault(&self) -> &Vault {
        &self.vault
    }

    /// Encrypts every sensitive field of every document in place.
    ///
    /// For each field, permutations are tried nested-first and the first one resolving to a
    /// value wins. A field that resolves nowhere is absent, not an error.
    ///
    /// # Errors
    /// * [`CryptorError::UnsupportedValue`] if a sensitive path holds a non-string value.
    /// * [`CryptorError::Vault`] if sealing fails (for example the key service is down).
    #[instrument(skip_all, fields(schema = %self.schema.name(), documents = docs.len()))]
    pub async fn encrypt_fields_in_documents(
        &self,
        docs: &mut [Document],
    ) -> Result<(), CryptorError> {
        self.transform_documents(docs, Direction::Encrypt).await
    }

    /// Decrypts every sensitive field of every document in place, resolving fields the same
    /// way [`FieldCryptor::encrypt_fields_in_documents`] does.
    ///
    /// # Errors
    /// * [`CryptorError::Vault`] wrapping `MalformedToken`, `KeyNotFound`, `RemoteKeyService`
    ///   or `Decryption`. A stored value that is not a token is never returned as plaintext.
    /// * [`CryptorError::UnsupportedValue`] if a sensitive path holds a non-string value.
    #[instrument(skip_all, fields(schema = %self.schema.name(), documents = docs.len()))]
    pub async fn decrypt_fields_in_documents(
        &self,
        docs: &mut [Document],
    ) -> Result<(), CryptorError> {
        self.transform_documents(docs, Direction::Decrypt).await
    }

    /// Encrypts the values an update clause writes: the implicit part, `$set` and
    /// `$setOnInsert`.
    ///
    /// Unlike documents, every permutation holding a value is sealed, so a clause naming the
    /// same logical field twice never writes one of them in plaintext. `$unset` is left alone;
    /// any other operator reaching a sensitive field is rejected, as is a `$rename` onto one.
    ///
    /// # Errors
    /// * [`CryptorError::UnsupportedUpdate`] if an operator other than the above writes a
    ///   sensitive field.
    /// * Same as [`FieldCryptor::encrypt_fields_in_documents`].
    #[instrument(skip_all, fields(schema = %self.schema.name()))]
    pub async fn encrypt_fields_in_update(
        &self,
        update: &mut UpdateClause,
    ) -> Result<(), CryptorError> {
        if let Some((field, operator)) = self.written_field(update, false) {
            return Err(CryptorError::UnsupportedUpdate {
                field: field.path().to_owned(),
                operator: operator.unwrap_or("update").to_owned(),
                context: None,
            });
        }

        let mut staged = update.clone();
        let mut sealed = 0usize;
        for operator in WRITE_OPERATORS {
            let Some(target) = staged.target_mut(operator) else {
                continue;
            };
            for field in self.schema.fields() {
                sealed += self.encrypt_all_matches(target, field).await?;
            }
        }
        *update = staged;
        debug!(fields = sealed, "Update clause encrypted");
        Ok(())
    }

    /// Prepares a single-document query: encrypts equality conditions on sensitive fields in
    /// the filter (including inside `$and`, `$or` and `$nor`) and the values the update writes.
    ///
    /// Ciphertext is not deterministic, so an equality condition on a sensitive field only
    /// matches when it carries the stored token itself. `{"$eq": value}` is treated as `value`.
    /// Conditions that already parse as a
    /// token are left untouched for that reason; any other string is encrypted and will
    /// generally match nothing.
    ///
    /// # Errors
    /// * [`CryptorError::UnsupportedFilter`] for operator conditions other than a lone `$eq`
    ///   (`$gt`, `$regex`, ...) on a sensitive field.
    /// * Same as [`FieldCryptor::encrypt_fields_in_update`].
    #[instrument(skip_all, fields(schema = %self.schema.name()))]
    pub async fn encrypt_fields_in_query(&self, query: &mut Query) -> Result<(), CryptorError> {
        let mut filter = query.filter.clone();
        self.encrypt_filter(&mut filter).await?;

        let mut update = query.update.clone();
        if let Some(update) = update.as_mut() {
            self.encrypt_fields_in_update(update).await?;
        }

        query.filter = filter;
        query.update = update;
        Ok(())
    }

    /// Guard for updates matching many documents: rejects any clause that writes a sensitive
    /// field, since one pass cannot seal a value per matched document.
    ///
    /// Every operator except `$unset` counts as a write, and so does a `$rename` whose
    /// destination is a sensitive field or one of its ancestors.
    ///
    /// # Errors
    /// Returns [`CryptorError::UnsupportedBulkMutation`] naming the first offending field.
    pub fn expect_not_to_update_many_encrypted(
        &self,
        update: &UpdateClause,
    ) -> Result<(), CryptorError> {
        let Some((field, operator)) = self.written_field(update, true) else {
            return Ok(());
        };
        warn!(
            target: AUDIT_TARGET,
            schema = %self.schema.name(),
            field = field.path(),
            operator = operator.unwrap_or("update"),
            "Rejected bulk update of encrypted field"
        );
        Err(CryptorError::UnsupportedBulkMutation {
            field: field.path().to_owned(),
            context: operator.map(|operator| Cow::Owned(operator.to_owned())),
        })
    }

    /// First sensitive field the clause writes, with the operator writing it (`None` for the
    /// implicit part). Operands are resolved with the field's permutations; a present key
    /// counts even when its value is null. Without `sealed`, the parts
    /// [`FieldCryptor::encrypt_fields_in_update`] seals are skipped.
    fn written_field<'a>(
        &'a self,
        update: &'a UpdateClause,
        sealed: bool,
    ) -> Option<(&'a FieldSpec, Option<&'a str>)> {
        for (operator, operand) in update.field_operands() {
            if !sealed && is_sealed(operator) {
                continue;
            }
            let written = self.schema.fields().iter().find(|field| {
                field.permutations().iter().any(|segments| path::get(operand, segments).is_some())
            });
            if let Some(field) = written {
                return Some((field, operator));
            }
        }

        update.rename_destinations().find_map(|destination| {
            let field =
                self.schema.fields().iter().find(|field| field.is_overwritten_at(destination))?;
            Some((field, Some(RENAME)))
        })
    }

    async fn transform_documents(
        &self,
        docs: &mut [Document],
        direction: Direction,
    ) -> Result<(), CryptorError> {
        let mut staged = docs.to_vec();
        let mut transformed = 0usize;
        for doc in &mut staged {
            for field in self.schema.fields() {
                if self.transform_first_match(doc, field, direction).await? {
                    transformed += 1;
                }
            }
        }

        for (slot, doc) in docs.iter_mut().zip(staged) {
            *slot = doc;
        }
        debug!(?direction, fields = transformed, "Documents transformed");
        Ok(())
    }

    async fn transform_first_match(
        &self,
        doc: &mut Document,
        field: &FieldSpec,
        direction: Direction,
    ) -> Result<bool, CryptorError> {
        for permutation in field.permutations() {
            let Some(slot) = path::get_mut(doc, permutation) else {
                continue;
            };
            if !has_value(slot) {
                continue;
            }
            self.transform_value(slot, field, direction).await?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn encrypt_all_matches(
        &self,
        doc: &mut Document,
        field: &FieldSpec,
    ) -> Result<usize, CryptorError> {
        let mut sealed = 0;
        for permutation in field.permutations() {
            if let Some(slot) = path::get_mut(doc, permutation) {
                if has_value(slot) {
                    self.transform_value(slot, field, Direction::Encrypt).await?;
                    sealed += 1;
                }
            }
        }
        Ok(sealed)
    }

    fn encrypt_filter<'a>(
        &'a self,
        filter: &'a mut Document,
    ) -> BoxFuture<'a, Result<(), CryptorError>> {
        Box::pin(async move {
            for field in self.schema.fields() {
                for permutation in field.permutations() {
                    let Some(slot) = path::get_mut(filter, permutation) else {
                        continue;
                    };
                    if !has_value(slot) {
                        continue;
                    }
                    let is_eq = matches!(
                        &*slot,
                        Value::Object(condition) if condition.len() == 1 && condition.contains_key(EQ)
                    );
                    let slot = if is_eq {
                        let Some(operand) = slot.get_mut(EQ).filter(|operand| has_value(operand))
                        else {
                            continue;
                        };
                        operand
                    } else {
                        slot
                    };
                    let is_operator = matches!(
                        &*slot,
                        Value::Object(condition) if condition.keys().any(|key| key.starts_with('$'))
                    );
                    if is_operator {
                        return Err(CryptorError::UnsupportedFilter {
                            field: field.path().to_owned(),
                            context: None,
                        });
                    }
                    if slot.as_str().is_some_and(EncryptedToken::is_token) {
                        continue;
                    }
                    self.transform_value(slot, field, Direction::Encrypt).await?;
                }
            }

            for operator in LOGICAL_OPERATORS {
                let Some(Value::Array(clauses)) = filter.get_mut(operator) else {
                    continue;
                };
                for clause in clauses {
                    if let Value::Object(clause) = clause {
                        self.encrypt_filter(clause).await.context(operator)?;
                    }
                }
            }
            Ok(())
        })
    }

    async fn transform_value(
        &self,
        slot: &mut Value,
        field: &FieldSpec,
        direction: Direction,
    ) -> Result<(), CryptorError> {
        let Value::String(text) = slot else {
            return Err(CryptorError::UnsupportedValue {
                field: field.path().to_owned(),
                kind: kind_of(slot),
                context: None,
            });
        };

        let transformed = match direction {
            Direction::Encrypt => self.vault.seal(text).await,
            Direction::Decrypt => self.vault.open(text).await,
        }
        .context(format!("field \"{}\"", field.path()))?;

        *slot = Value::String(transformed);
        Ok(())
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
