use async_trait::async_trait;
use fcrypt_vault::cipher::{self, IV_LEN, Sealed};
use fcrypt_vault::prelude::*;
use fcrypt_vault::SecretKey;
use std::sync::atomic::{AtomicBool, Ordering};

pub const MASTER_ARN: &str = "arn:aws:kms:eu-west-1:000000000000:key/test";

#[must_use]
pub fn material(byte: u8) -> String {
    hex::encode([byte; 32])
}

/// Local vault with one active key.
/// # Panics
/// * If the keyring cannot be built.
#[must_use]
pub fn local_vault(active: &str, byte: u8) -> Vault {
    Vault::new(LocalKeyring::builder().active(active, &material(byte)).unwrap().build().unwrap())
}

/// Fake key service wrapping keys under one in-memory master key.
#[derive(Debug)]
pub struct FakeKms {
    master: SecretKey,
    pub down: AtomicBool,
}

impl FakeKms {
    #[must_use]
    pub fn new() -> Self {
        Self { master: SecretKey::from_bytes([0x5a; 32]), down: AtomicBool::new(false) }
    }
}

#[async_trait]
impl KeyManagementService for FakeKms {
    async fn encrypt_key(&self, master_key_id: &str, data_key: &[u8]) -> Result<WrappedKey, VaultError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(VaultError::remote("timeout"));
        }
        let sealed = cipher::seal(data_key, &self.master)?;
        Ok(WrappedKey {
            key_id: master_key_id.to_owned(),
            ciphertext: [sealed.iv.as_slice(), sealed.ciphertext.as_slice()].concat(),
        })
    }

    async fn decrypt_key(&self, _key_id: &str, wrapped: &[u8]) -> Result<Vec<u8>, VaultError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(VaultError::remote("timeout"));
        }
        let (iv, ciphertext) = wrapped.split_at(IV_LEN);
        let sealed = Sealed { iv: iv.try_into().unwrap(), ciphertext: ciphertext.to_vec() };
        cipher::open(&sealed, &self.master)
    }
}
