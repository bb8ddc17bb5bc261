use crate::error::VaultError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use getrandom::fill;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// 256-bit symmetric key, wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Generates a fresh random key from the system RNG.
    ///
    /// # Panics
    /// If the system RNG is unavailable.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        fill(&mut bytes).expect("System RNG unavailable for key generation");
        Self(bytes)
    }

    /// Builds a key from exactly [`KEY_LEN`] bytes.
    ///
    /// # Errors
    /// Returns [`VaultError::Configuration`] on any other length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, VaultError> {
        let array: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            VaultError::configuration(format!(
                "Invalid key length {}, must be {KEY_LEN} bytes",
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Parses configured key material: 64 hex chars, or base64 of 32 bytes.
    ///
    /// # Errors
    /// Returns [`VaultError::Configuration`] if the text is neither or has the wrong length.
    pub fn parse(material: &str) -> Result<Self, VaultError> {
        let material = material.trim();
        let decoded = if material.len() == KEY_LEN * 2
            && material.bytes().all(|b| b.is_ascii_hexdigit())
        {
            hex::decode(material).map(Zeroizing::new).map_err(|_| {
                VaultError::configuration("Key material is not valid hex")
            })?
        } else {
            STANDARD.decode(material).map(Zeroizing::new).map_err(|_| {
                VaultError::configuration("Key material must be 64 hex chars or base64")
            })?
        };
        Self::from_slice(&decoded)
    }

    #[must_use]
    pub const fn expose(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_and_base64() {
        let hex_key = SecretKey::parse(&"ab".repeat(32)).unwrap();
        assert_eq!(hex_key.expose(), &[0xab; 32]);

        let b64 = STANDARD.encode([7u8; 32]);
        let b64_key = SecretKey::parse(&b64).unwrap();
        assert_eq!(b64_key.expose(), &[7u8; 32]);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        let short = STANDARD.encode([1u8; 16]);
        assert!(matches!(SecretKey::parse(&short), Err(VaultError::Configuration { .. })));
        assert!(matches!(SecretKey::parse("not a key!"), Err(VaultError::Configuration { .. })));
        assert!(SecretKey::parse("").is_err());
    }

    #[test]
    fn test_generate_is_random() {
        assert_ne!(SecretKey::generate().expose(), SecretKey::generate().expose());
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = SecretKey::from_bytes([0x42; KEY_LEN]);
        assert_eq!(format!("{key:?}"), "SecretKey(<redacted>)");
    }
}
