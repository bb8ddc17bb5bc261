//! Kernel utilities shared by the facade and host applications.
//! Keep this crate lightweight: configuration loading and the startup decision of which
//! encryption mode the process runs in.
//!
//! ## Config loading
//! ```rust,ignore
//! use fcrypt_kernel::config::load_config;
//! use fcrypt_kernel::domain::config::FieldCryptConfig;
//!
//! let cfg: FieldCryptConfig = load_config(Some("config/fcrypt.toml"))?;
//! let mode = fcrypt_kernel::mode::resolve_mode(&cfg.encryption)?;
//! ```
pub mod config;
pub mod mode;

pub use config::{ConfigError, ConfigErrorExt};
pub use fcrypt_domain as domain;
