use fcrypt_cryptor::CryptorError;
use std::borrow::Cow;

/// A specialized [`StorageError`] enum of this crate.
#[fcrypt_derive::fcrypt_error]
pub enum StorageError {
    /// A lifecycle hook refused the operation; nothing was written.
    #[error("Lifecycle hook failed{}: {source}", format_context(.context))]
    Hook { source: CryptorError, context: Option<Cow<'static, str>> },

    #[error("Duplicate key{}: {id}", format_context(.context))]
    DuplicateKey { id: String, context: Option<Cow<'static, str>> },

    #[error("Unsupported operator{}: {operator}", format_context(.context))]
    UnsupportedOperator { operator: String, context: Option<Cow<'static, str>> },

    #[error("Invalid document{}: {message}", format_context(.context))]
    InvalidDocument { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid update{}: {message}", format_context(.context))]
    InvalidUpdate { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl StorageError {
    pub(crate) fn unsupported(operator: &str) -> Self {
        Self::UnsupportedOperator { operator: operator.to_owned(), context: None }
    }

    pub(crate) fn invalid_update(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidUpdate { message: message.into(), context: None }
    }

    pub(crate) fn invalid_document(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidDocument { message: message.into(), context: None }
    }
}
