//! Names shared across crates.

/// `tracing` target for security-relevant decisions (bypass, mode resolution, key rotation use,
/// rejected bulk updates). Routed to a dedicated file by `fcrypt-logger` when configured.
pub const AUDIT_TARGET: &str = "fcrypt::audit";

/// Prefix for environment overrides, e.g. `FCRYPT__ENCRYPTION__STAGE`.
pub const ENV_PREFIX: &str = "FCRYPT";

/// Update operators whose payload is written to the matched document.
pub const SET: &str = "$set";
pub const SET_ON_INSERT: &str = "$setOnInsert";

/// Removes fields; the only update operator that never writes a value.
pub const UNSET: &str = "$unset";

/// Moves fields; its operand maps source paths to destination paths.
pub const RENAME: &str = "$rename";

/// Document primary key used by the reference store.
pub const ID_FIELD: &str = "_id";
