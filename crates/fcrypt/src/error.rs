use fcrypt_cryptor::CryptorError;
use fcrypt_kernel::ConfigError;
use fcrypt_logger::LoggerError;
use fcrypt_vault::VaultError;
use std::borrow::Cow;

/// Startup and wiring failures surfaced by the facade.
///
/// Errors raised while documents flow through the hooks stay [`CryptorError`]s; this enum only
/// covers building an [`crate::Encryption`] and initializing the host's logging.
#[fcrypt_derive::fcrypt_error]
pub enum FcryptError {
    #[error("Configuration error{}: {source}", format_context(.context))]
    Config { source: ConfigError, context: Option<Cow<'static, str>> },

    #[error("Key source error{}: {source}", format_context(.context))]
    Vault { source: VaultError, context: Option<Cow<'static, str>> },

    #[error("Field encryption error{}: {source}", format_context(.context))]
    Cryptor { source: CryptorError, context: Option<Cow<'static, str>> },

    #[error("Logger error{}: {source}", format_context(.context))]
    Logger { source: LoggerError, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
