use serde::Serialize;
use std::fmt;

/// Which key strategy (if any) protects sensitive fields in this process.
///
/// Resolved once at startup; see `fcrypt_kernel::mode::resolve_mode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EncryptionMode {
    /// Keys come from local configuration (active plus deprecated ids).
    Local,
    /// Data keys are wrapped by a remote key-management service.
    Remote,
    /// Plaintext passes through unchanged. Only ever the result of an explicit stage switch.
    Bypass { stage: String },
}

impl EncryptionMode {
    #[must_use]
    pub const fn is_bypass(&self) -> bool {
        matches!(self, Self::Bypass { .. })
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Bypass { .. } => "bypass",
        }
    }
}

impl fmt::Display for EncryptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bypass { stage } => write!(f, "bypass (stage {stage})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Static configuration report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptionStatus {
    pub stage: Option<String>,
    pub mode: EncryptionMode,
    pub bypassed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Probe document round-tripped correctly.
    Enabled,
    /// Bypass is active; nothing is encrypted.
    Disabled,
    /// Configuration or the probe failed.
    Unhealthy,
}

/// Result of running a probe document through encrypt/decrypt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptionHealth {
    pub status: HealthStatus,
    pub mode: EncryptionMode,
    pub bypassed: bool,
    pub stage: Option<String>,
    pub detail: Option<String>,
    pub encryption_works: bool,
}
