use config::{Config, Environment, File};
use fcrypt_domain::constants::ENV_PREFIX;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

/// Errors raised while loading configuration or deciding the encryption mode at startup.
#[fcrypt_derive::fcrypt_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },

    /// Local and remote key configuration are both present.
    #[error("Local and remote encryption keys are both configured{}", format_context(.context))]
    Conflict { context: Option<Cow<'static, str>> },

    /// Neither key configuration is present and the stage is not bypassed.
    #[error(
        "No encryption keys configured and stage is not bypassed{}",
        format_context(.context)
    )]
    Missing { context: Option<Cow<'static, str>> },
}

/// A reusable configuration loader that combines file-based settings with environment overrides.
///
/// This function implements a layered configuration strategy:
/// 1. **Base File**: Loads settings from a file (TOML, JSON or YAML by extension). If no path is
///    provided, it defaults to `fcrypt` in the working directory.
/// 2. **Environment Overrides**: Overlays values from environment variables prefixed with `FCRYPT__`.
///    Nested structures are accessed using double underscores
///    (e.g. `FCRYPT__ENCRYPTION__REMOTE__MASTER_KEY_ID` maps to `encryption.remote.master_key_id`).
///    `FCRYPT__ENCRYPTION__BYPASS_STAGES` takes a comma-separated list.
///
/// # Type Parameters
/// * `T`: The target configuration structure. Must implement [`serde::Deserialize`].
///
/// # Errors
/// This function will return an error if:
/// * The specified (or default) configuration file cannot be found.
/// * The content of the file does not match the structure of type `T`.
///
/// # Example
/// ```rust,no_run
/// use fcrypt_kernel::config::load_config;
/// use fcrypt_kernel::domain::config::FieldCryptConfig;
///
/// let cfg: FieldCryptConfig = load_config(Some("config/fcrypt.toml")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let effective_path = path.map_or_else(|| PathBuf::from("fcrypt"), |p| p.as_ref().to_path_buf());

    let builder = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .convert_case(config::Case::Snake)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("encryption.bypass_stages"),
        );

    info!("Loading config from {}", effective_path.display());

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
