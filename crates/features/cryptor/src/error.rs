use fcrypt_vault::VaultError;
use std::borrow::Cow;

/// Failures raised while locating and transforming sensitive fields.
///
/// Every variant aborts the triggering document operation; nothing is retried and no
/// partially transformed document is handed back.
#[fcrypt_derive::fcrypt_error]
pub enum CryptorError {
    /// A bulk update writes a sensitive field.
    #[error(
        "Attempted to update encrypted field of multiple documents{}: {field}",
        format_context(.context)
    )]
    UnsupportedBulkMutation { field: String, context: Option<Cow<'static, str>> },

    /// An update writes a sensitive field through an operator whose value cannot be sealed
    /// (`$push`, `$inc`, `$rename`, ...).
    #[error(
        "Unsupported update operator {operator} on encrypted field{}: {field}",
        format_context(.context)
    )]
    UnsupportedUpdate { field: String, operator: String, context: Option<Cow<'static, str>> },

    /// A declared field path is empty or has an empty segment.
    #[error("Invalid field path \"{path}\"{}: {message}", format_context(.context))]
    InvalidFieldPath {
        path: String,
        message: Cow<'static, str>,
        context: Option<Cow<'static, str>>,
    },

    /// A sensitive path holds something other than a string.
    #[error("Unsupported {kind} value at encrypted field{}: {field}", format_context(.context))]
    UnsupportedValue { field: String, kind: &'static str, context: Option<Cow<'static, str>> },

    /// A filter uses an operator other than equality on a sensitive field.
    #[error(
        "Only equality filters are supported on encrypted field{}: {field}",
        format_context(.context)
    )]
    UnsupportedFilter { field: String, context: Option<Cow<'static, str>> },

    /// A schema name was registered twice with different sensitive fields.
    #[error("Schema \"{schema}\" is already registered with different fields{}", format_context(.context))]
    SchemaConflict { schema: String, context: Option<Cow<'static, str>> },

    #[error("Vault error{}: {source}", format_context(.context))]
    Vault { source: VaultError, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal cryptor error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl CryptorError {
    pub(crate) fn invalid_path(path: &str, message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidFieldPath { path: path.to_owned(), message: message.into(), context: None }
    }
}
