//! Startup decision of which encryption mode the process runs in.

use crate::config::ConfigError;
use fcrypt_domain::config::EncryptionConfig;
use fcrypt_domain::constants::AUDIT_TARGET;
use fcrypt_domain::mode::EncryptionMode;
use tracing::{info, warn};

/// Resolves the encryption mode from configuration.
///
/// Order of checks:
/// 1. the stage is listed in `bypass_stages` → [`EncryptionMode::Bypass`], even if keys are present;
/// 2. local and remote keys both present → [`ConfigError::Conflict`];
/// 3. local → [`EncryptionMode::Local`], remote → [`EncryptionMode::Remote`];
/// 4. neither → [`ConfigError::Missing`].
///
/// Blank ids and blank stage names count as unset. Stage names compare case-insensitively.
/// Every outcome is recorded on the audit target.
///
/// # Errors
/// [`ConfigError::Conflict`] or [`ConfigError::Missing`] as described above.
pub fn resolve_mode(config: &EncryptionConfig) -> Result<EncryptionMode, ConfigError> {
    let stage = config.stage();

    if let Some(stage) = stage.filter(|stage| is_bypass_stage(config, stage)) {
        warn!(
            target: AUDIT_TARGET,
            stage,
            "Field encryption bypassed; sensitive values are stored in plaintext"
        );
        return Ok(EncryptionMode::Bypass { stage: stage.to_owned() });
    }

    let mode = match (config.local_keys(), config.remote_key()) {
        (Some(_), Some(_)) => {
            warn!(target: AUDIT_TARGET, stage, "Refusing to start: local and remote keys both set");
            return Err(ConfigError::Conflict { context: None });
        },
        (Some(_), None) => EncryptionMode::Local,
        (None, Some(_)) => EncryptionMode::Remote,
        (None, None) => {
            warn!(target: AUDIT_TARGET, stage, "Refusing to start: no encryption keys configured");
            return Err(ConfigError::Missing { context: stage.map(|s| format!("stage {s}").into()) });
        },
    };

    info!(target: AUDIT_TARGET, stage, mode = mode.as_str(), "Field encryption enabled");
    Ok(mode)
}

fn is_bypass_stage(config: &EncryptionConfig, stage: &str) -> bool {
    config.bypass_stages.iter().map(|s| s.trim()).any(|s| !s.is_empty() && s.eq_ignore_ascii_case(stage))
}
