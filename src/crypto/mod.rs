//! Encryption seam for audit details.
//!
//! The audit logger is the only caller. Implementations must return an error
//! when encryption cannot be performed; handing back the plaintext is never
//! acceptable, an unencrypted record must not reach the ledger.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Result, WardenError};

/// Encrypts audit details before they are persisted.
pub trait EncryptionService: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;
}

const DEFAULT_KEY: &[u8] = b"warden-stub-key";

/// Reversible XOR envelope for tests.
///
/// Not a cipher; it exists so tests can decrypt what the audit logger wrote
/// and verify the embedded checksum. Production embeddings supply their own
/// service.
#[derive(Debug)]
pub struct StubCipher {
    key: Vec<u8>,
    fail_encrypts: AtomicU32,
}

impl StubCipher {
    pub fn new() -> Self {
        Self::with_key(DEFAULT_KEY)
    }

    /// Use a specific key; an empty key falls back to the default.
    pub fn with_key(key: &[u8]) -> Self {
        let key = if key.is_empty() { DEFAULT_KEY } else { key };
        Self {
            key: key.to_vec(),
            fail_encrypts: AtomicU32::new(0),
        }
    }

    /// Fail the next `times` encrypt calls.
    pub fn fail_next(&self, times: u32) {
        self.fail_encrypts.store(times, Ordering::SeqCst);
    }

    /// XOR is symmetric; decryption re-applies the keystream.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Vec<u8> {
        self.apply(ciphertext)
    }

    fn apply(&self, data: &[u8]) -> Vec<u8> {
        data.iter()
            .enumerate()
            .map(|(i, byte)| byte ^ self.key[i % self.key.len()])
            .collect()
    }
}

impl Default for StubCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl EncryptionService for StubCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let remaining = self.fail_encrypts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_encrypts.store(remaining - 1, Ordering::SeqCst);
            return Err(WardenError::Encryption("encrypt failed (injected)".to_string()));
        }
        Ok(self.apply(plaintext))
    }
}
