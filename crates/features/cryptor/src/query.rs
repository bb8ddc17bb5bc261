use fcrypt_domain::constants::{RENAME, SET, SET_ON_INSERT, UNSET};
use fcrypt_domain::document::{Document, Value};

/// Parts of an update clause whose values are sealed, in the order they are visited.
pub(crate) const WRITE_OPERATORS: [Option<&str>; 3] = [None, Some(SET), Some(SET_ON_INSERT)];

/// Whether `operator` is one of [`WRITE_OPERATORS`].
pub(crate) fn is_sealed(operator: Option<&str>) -> bool {
    matches!(operator, None | Some(SET | SET_ON_INSERT))
}

/// A document-store update.
///
/// Top-level keys without a `$` prefix are an implicit set. `$set` and `$setOnInsert` carry
/// explicit sets. `$unset` only removes fields. Every other operator (`$inc`, `$push`,
/// `$rename`, ...) writes a value derived from its operand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateClause(Document);

impl UpdateClause {
    #[must_use]
    pub const fn new(update: Document) -> Self {
        Self(update)
    }

    /// Wraps a JSON object; anything else yields `None`.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_document(&self) -> &Document {
        &self.0
    }

    pub const fn as_document_mut(&mut self) -> &mut Document {
        &mut self.0
    }

    #[must_use]
    pub fn into_document(self) -> Document {
        self.0
    }

    /// Whether the clause uses any `$` operator. Stores apply an operator-free clause as an
    /// implicit `$set`.
    #[must_use]
    pub fn has_operators(&self) -> bool {
        self.0.keys().any(|key| key.starts_with('$'))
    }

    #[must_use]
    pub fn set(&self) -> Option<&Document> {
        self.0.get(SET).and_then(Value::as_object)
    }

    #[must_use]
    pub fn set_on_insert(&self) -> Option<&Document> {
        self.0.get(SET_ON_INSERT).and_then(Value::as_object)
    }

    /// Top-level fields written without an operator.
    pub fn implicit_fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter().filter(|(key, _)| !key.starts_with('$'))
    }

    /// Every operand keyed by field path: the implicit part (`None`), then each operator
    /// other than `$unset` whose operand is an object, in clause order.
    pub(crate) fn field_operands(&self) -> impl Iterator<Item = (Option<&str>, &Document)> {
        let operators = self.0.iter().filter_map(|(key, value)| {
            let operand = value.as_object()?;
            (key.starts_with('$') && key != UNSET).then_some((Some(key.as_str()), operand))
        });
        std::iter::once((None, &self.0)).chain(operators)
    }

    /// Destination paths of `$rename`.
    pub(crate) fn rename_destinations(&self) -> impl Iterator<Item = &str> {
        self.0
            .get(RENAME)
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|operand| operand.values().filter_map(Value::as_str))
    }

    /// Mutable sub-document written by `operator` (`None` for the implicit part).
    pub(crate) fn target_mut(&mut self, operator: Option<&str>) -> Option<&mut Document> {
        match operator {
            None => Some(&mut self.0),
            Some(operator) => self.0.get_mut(operator).and_then(Value::as_object_mut),
        }
    }
}

impl From<Document> for UpdateClause {
    fn from(update: Document) -> Self {
        Self(update)
    }
}

/// A single-document filter with an optional update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Document,
    pub update: Option<UpdateClause>,
}

impl Query {
    #[must_use]
    pub const fn new(filter: Document) -> Self {
        Self { filter, update: None }
    }

    #[must_use]
    pub fn with_update(mut self, update: impl Into<UpdateClause>) -> Self {
        self.update = Some(update.into());
        self
    }
}
