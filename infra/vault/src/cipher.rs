//! AES-256 in counter mode with a fresh random IV per call.
//!
//! The serialized form of a sealed value is `hex(IV):hex(ciphertext)`. Counter mode keeps the
//! ciphertext the same length as the plaintext.

use crate::error::VaultError;
use crate::secret::SecretKey;
use aes::Aes256;
use ctr::Ctr128BE;
use ctr::cipher::{KeyIvInit, StreamCipher};
use getrandom::fill;

/// IV length in bytes (one AES block).
pub const IV_LEN: usize = 16;

/// IV length once hex encoded.
pub const IV_HEX_LEN: usize = IV_LEN * 2;

type Aes256Ctr = Ctr128BE<Aes256>;

/// IV and ciphertext produced by one [`seal`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub iv: [u8; IV_LEN],
    pub ciphertext: Vec<u8>,
}

impl Sealed {
    /// `hex(IV):hex(ciphertext)`.
    #[must_use]
    pub fn to_hex_pair(&self) -> String {
        format!("{}:{}", hex::encode(self.iv), hex::encode(&self.ciphertext))
    }

    /// Parses `hex(IV):hex(ciphertext)`.
    ///
    /// # Errors
    /// Returns [`VaultError::MalformedToken`] for a wrong part count, non-hex input or a bad IV length.
    pub fn from_hex_pair(pair: &str) -> Result<Self, VaultError> {
        let mut parts = pair.split(':');
        let (Some(iv), Some(ciphertext), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(VaultError::malformed("Expected `iv:ciphertext`"));
        };
        Ok(Self { iv: decode_iv(iv)?, ciphertext: decode_hex(ciphertext, "ciphertext")? })
    }
}

/// Generates a fresh random IV.
///
/// # Panics
/// If the system RNG is unavailable.
#[must_use]
pub fn random_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    fill(&mut iv).expect("System RNG unavailable for IV generation");
    iv
}

/// Encrypts bytes under `key` with a new IV.
///
/// # Errors
/// Returns [`VaultError::Internal`] if the cipher cannot be initialised.
pub fn seal(plaintext: &[u8], key: &SecretKey) -> Result<Sealed, VaultError> {
    let iv = random_iv();
    let mut ciphertext = plaintext.to_vec();
    apply_keystream(key, &iv, &mut ciphertext)?;
    Ok(Sealed { iv, ciphertext })
}

/// Decrypts a [`Sealed`] value into raw bytes.
///
/// Counter mode is unauthenticated: a wrong key yields garbage bytes, not an error.
///
/// # Errors
/// Returns [`VaultError::Internal`] if the cipher cannot be initialised.
pub fn open(sealed: &Sealed, key: &SecretKey) -> Result<Vec<u8>, VaultError> {
    let mut plaintext = sealed.ciphertext.clone();
    apply_keystream(key, &sealed.iv, &mut plaintext)?;
    Ok(plaintext)
}

/// Encrypts a string into `hex(IV):hex(ciphertext)`.
///
/// # Errors
/// Returns [`VaultError::Internal`] if the cipher cannot be initialised.
pub fn encrypt(plaintext: &str, key: &SecretKey) -> Result<String, VaultError> {
    seal(plaintext.as_bytes(), key).map(|sealed| sealed.to_hex_pair())
}

/// Decrypts `hex(IV):hex(ciphertext)` back into a string.
///
/// # Errors
/// * [`VaultError::MalformedToken`] if the pair does not parse.
/// * [`VaultError::Decryption`] if the result is not valid UTF-8.
pub fn decrypt(pair: &str, key: &SecretKey) -> Result<String, VaultError> {
    let sealed = Sealed::from_hex_pair(pair)?;
    utf8(open(&sealed, key)?)
}

pub(crate) fn utf8(bytes: Vec<u8>) -> Result<String, VaultError> {
    String::from_utf8(bytes).map_err(|_| VaultError::Decryption {
        message: "Decrypted bytes are not valid UTF-8".into(),
        context: Some("wrong key or tampered ciphertext".into()),
    })
}

pub(crate) fn decode_iv(text: &str) -> Result<[u8; IV_LEN], VaultError> {
    if text.len() != IV_HEX_LEN {
        return Err(VaultError::malformed(format!(
            "IV must be {IV_HEX_LEN} hex chars, got {}",
            text.len()
        )));
    }
    let bytes = decode_hex(text, "IV")?;
    bytes.try_into().map_err(|_| VaultError::malformed("IV has the wrong length"))
}

pub(crate) fn decode_hex(text: &str, what: &'static str) -> Result<Vec<u8>, VaultError> {
    hex::decode(text).map_err(|err| VaultError::MalformedToken {
        message: format!("Invalid hex: {err}").into(),
        context: Some(what.into()),
    })
}

fn apply_keystream(key: &SecretKey, iv: &[u8; IV_LEN], buf: &mut [u8]) -> Result<(), VaultError> {
    let mut cipher = Aes256Ctr::new_from_slices(key.expose(), iv)
        .map_err(|_| VaultError::from("AES-256-CTR rejected key or IV length"))?;
    cipher.apply_keystream(buf);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn key() -> SecretKey {
        SecretKey::from_bytes([0x11; 32])
    }

    #[test]
    fn test_roundtrip() {
        let token = encrypt("hello world", &key()).unwrap();
        assert_eq!(decrypt(&token, &key()).unwrap(), "hello world");
    }

    #[test]
    fn test_ciphertext_length_matches_plaintext() {
        let token = encrypt("abc1234", &key()).unwrap();
        let (iv, ct) = token.split_once(':').unwrap();
        assert_eq!(iv.len(), IV_HEX_LEN);
        assert_eq!(ct.len(), 14);
    }

    #[test]
    fn test_fresh_iv_per_call() {
        let a = encrypt("same", &key()).unwrap();
        let b = encrypt("same", &key()).unwrap();
        assert_ne!(a, b);
        assert_eq!(decrypt(&a, &key()).unwrap(), decrypt(&b, &key()).unwrap());
    }

    #[test]
    fn test_nist_ctr_vector() {
        // NIST SP 800-38A F.5.5 (CTR-AES256.Encrypt), first block.
        let key = SecretKey::from_bytes(hex!(
            "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4"
        ));
        let sealed = Sealed {
            iv: hex!("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff"),
            ciphertext: hex!("601ec313775789a5b7a7f504bbf3d228").to_vec(),
        };
        assert_eq!(open(&sealed, &key).unwrap(), hex!("6bc1bee22e409f96e93d7e117393172a"));
    }

    #[test]
    fn test_malformed_pairs() {
        let k = key();
        assert!(matches!(decrypt("nocolon", &k), Err(VaultError::MalformedToken { .. })));
        assert!(matches!(decrypt("abcd:00", &k), Err(VaultError::MalformedToken { .. })));
        assert!(matches!(
            decrypt(&format!("{}:zz", "0".repeat(32)), &k),
            Err(VaultError::MalformedToken { .. })
        ));
        assert!(matches!(
            decrypt(&format!("{}:00:00", "0".repeat(32)), &k),
            Err(VaultError::MalformedToken { .. })
        ));
    }
}
