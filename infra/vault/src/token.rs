use crate::cipher::{IV_LEN, Sealed, decode_hex, decode_iv};
use crate::error::VaultError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::str::FromStr;

/// The string stored in place of a plaintext field value.
///
/// ```text
/// direct:   base64(key_id):hex(iv):hex(ciphertext)
/// envelope: base64(key_id):hex(iv):hex(ciphertext):base64(wrapped_data_key)
/// ```
///
/// Parsing is positional on `:`. Hex and base64 never contain a colon, so every other
/// part count is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedToken {
    pub key_id: String,
    pub iv: [u8; IV_LEN],
    pub ciphertext: Vec<u8>,
    pub wrapped_key: Option<Vec<u8>>,
}

impl EncryptedToken {
    #[must_use]
    pub fn new(key_id: impl Into<String>, sealed: Sealed, wrapped_key: Option<Vec<u8>>) -> Self {
        Self { key_id: key_id.into(), iv: sealed.iv, ciphertext: sealed.ciphertext, wrapped_key }
    }

    /// Parses a stored token.
    ///
    /// # Errors
    /// Returns [`VaultError::MalformedToken`] for a wrong part count, an empty or non-UTF-8
    /// key id, an IV that is not 32 hex chars, or invalid hex/base64 anywhere.
    pub fn parse(token: &str) -> Result<Self, VaultError> {
        let parts: Vec<&str> = token.split(':').collect();
        let (key_id, iv, ciphertext, wrapped) = match parts.as_slice() {
            [key_id, iv, ciphertext] => (*key_id, *iv, *ciphertext, None),
            [key_id, iv, ciphertext, wrapped] => (*key_id, *iv, *ciphertext, Some(*wrapped)),
            _ => {
                return Err(VaultError::malformed(format!(
                    "Expected 3 or 4 colon-separated parts, found {}",
                    parts.len()
                )));
            },
        };

        let key_id = String::from_utf8(decode_base64(key_id, "key id")?)
            .map_err(|_| VaultError::malformed("Key id is not valid UTF-8"))?;
        if key_id.is_empty() {
            return Err(VaultError::malformed("Key id is empty"));
        }
        let wrapped_key = match wrapped {
            Some(text) if text.is_empty() => {
                return Err(VaultError::malformed("Wrapped data key is empty"));
            },
            Some(text) => Some(decode_base64(text, "wrapped data key")?),
            None => None,
        };

        Ok(Self {
            key_id,
            iv: decode_iv(iv)?,
            ciphertext: decode_hex(ciphertext, "ciphertext")?,
            wrapped_key,
        })
    }

    /// Cheap check used to recognise values that are already encrypted.
    #[must_use]
    pub fn is_token(value: &str) -> bool {
        Self::parse(value).is_ok()
    }

    #[must_use]
    pub const fn is_envelope(&self) -> bool {
        self.wrapped_key.is_some()
    }

    #[must_use]
    pub fn sealed(&self) -> Sealed {
        Sealed { iv: self.iv, ciphertext: self.ciphertext.clone() }
    }
}

impl fmt::Display for EncryptedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            STANDARD.encode(self.key_id.as_bytes()),
            hex::encode(self.iv),
            hex::encode(&self.ciphertext)
        )?;
        if let Some(wrapped) = &self.wrapped_key {
            write!(f, ":{}", STANDARD.encode(wrapped))?;
        }
        Ok(())
    }
}

impl FromStr for EncryptedToken {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn decode_base64(text: &str, what: &'static str) -> Result<Vec<u8>, VaultError> {
    STANDARD.decode(text).map_err(|err| VaultError::MalformedToken {
        message: format!("Invalid base64: {err}").into(),
        context: Some(what.into()),
    })
}
