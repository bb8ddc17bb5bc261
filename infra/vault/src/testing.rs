//! In-process stand-in for a remote key-management service.

use crate::cipher::{self, IV_LEN, Sealed};
use crate::error::VaultError;
use crate::remote::{KeyManagementService, WrappedKey};
use crate::secret::SecretKey;
use async_trait::async_trait;
use fxhash::FxHashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Wraps data keys with AES-256-CTR under master keys held in memory.
///
/// Wrapped blobs are `iv || ciphertext`. [`InMemoryKms::set_unavailable`] makes every call
/// fail with [`VaultError::RemoteKeyService`].
#[derive(Debug, Default)]
pub struct InMemoryKms {
    masters: FxHashMap<String, SecretKey>,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

impl InMemoryKms {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a master key under `key_id` (an ARN in real deployments).
    #[must_use]
    pub fn with_master_key(mut self, key_id: impl Into<String>) -> Self {
        self.masters.insert(key_id.into(), SecretKey::generate());
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of wrap and unwrap requests served or refused.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn master(&self, key_id: &str) -> Result<&SecretKey, VaultError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(VaultError::remote("Key service unavailable"));
        }
        self.masters
            .get(key_id)
            .ok_or_else(|| VaultError::remote(format!("Key service does not know \"{key_id}\"")))
    }
}

#[async_trait]
impl KeyManagementService for InMemoryKms {
    async fn encrypt_key(
        &self,
        master_key_id: &str,
        data_key: &[u8],
    ) -> Result<WrappedKey, VaultError> {
        let master = self.master(master_key_id)?;
        let sealed = cipher::seal(data_key, master)?;
        let mut ciphertext = sealed.iv.to_vec();
        ciphertext.extend_from_slice(&sealed.ciphertext);
        Ok(WrappedKey { key_id: master_key_id.to_owned(), ciphertext })
    }

    async fn decrypt_key(&self, key_id: &str, wrapped: &[u8]) -> Result<Vec<u8>, VaultError> {
        let master = self.master(key_id)?;
        if wrapped.len() <= IV_LEN {
            return Err(VaultError::remote("Wrapped key blob is too short"));
        }
        let (iv, ciphertext) = wrapped.split_at(IV_LEN);
        let sealed = Sealed {
            iv: iv.try_into().map_err(|_| VaultError::remote("Wrapped key blob is too short"))?,
            ciphertext: ciphertext.to_vec(),
        };
        cipher::open(&sealed, master)
    }
}
