//! Credential vault: authenticated encryption for OAuth tokens at rest.
//!
//! Tokens are sealed with AES-256-GCM and stored as an opaque JSON blob of
//! hex-encoded ciphertext and nonce. Decryption tolerates records produced
//! by the older base64 encoding, but that path is reported distinctly so
//! callers can surface a data-integrity warning instead of treating it as
//! normal.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng, Payload},
    Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroizing;

/// Size of the encryption key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Additional authenticated data binding ciphertexts to this use.
const TOKEN_AAD: &[u8] = b"gitlab-integration";

#[derive(Debug, Error)]
pub enum VaultError {
    /// Encryption failure on write is fatal; plaintext must never be
    /// silently stored.
    #[error("token encryption failed: {0}")]
    Encryption(String),
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Stored form of an encrypted token.
#[derive(Debug, Serialize, Deserialize)]
struct EncryptedBlob {
    ciphertext: String,
    nonce: String,
}

/// Outcome of decrypting a stored token blob.
#[derive(Debug)]
pub enum Decrypted {
    /// Authenticated decryption succeeded.
    Clean(Zeroizing<String>),
    /// A legacy or best-effort decode path was used. Callers must record
    /// this as a data-integrity warning; it must never be relied upon for
    /// new writes.
    Fallback {
        value: Zeroizing<String>,
        reason: &'static str,
    },
}

impl Decrypted {
    /// The recovered plaintext.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Decrypted::Clean(v) => v,
            Decrypted::Fallback { value, .. } => value,
        }
    }

    /// Whether the fallback decode path was taken.
    #[must_use]
    pub fn used_fallback(&self) -> bool {
        matches!(self, Decrypted::Fallback { .. })
    }

    /// Why the fallback was taken, if it was.
    #[must_use]
    pub fn fallback_reason(&self) -> Option<&'static str> {
        match self {
            Decrypted::Clean(_) => None,
            Decrypted::Fallback { reason, .. } => Some(reason),
        }
    }

    /// Consume the outcome, keeping the plaintext zeroized on drop.
    #[must_use]
    pub fn into_value(self) -> Zeroizing<String> {
        match self {
            Decrypted::Clean(v) => v,
            Decrypted::Fallback { value, .. } => value,
        }
    }
}

/// AES-256-GCM vault keyed from a server-held secret.
#[derive(Clone)]
pub struct Vault {
    key: [u8; KEY_SIZE],
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material must never appear in logs.
        f.debug_struct("Vault").finish_non_exhaustive()
    }
}

impl Vault {
    /// Create a vault from raw key bytes.
    #[must_use]
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Derive the vault key from a configured secret string.
    #[must_use]
    pub fn from_secret(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&digest);
        Self { key }
    }

    /// Encrypt a token, returning the opaque blob to store.
    ///
    /// # Errors
    /// Returns `VaultError::Encryption` if sealing fails; the caller must
    /// treat this as fatal for the write.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: TOKEN_AAD,
                },
            )
            .map_err(|e| VaultError::Encryption(e.to_string()))?;

        let blob = EncryptedBlob {
            ciphertext: hex::encode(ciphertext),
            nonce: hex::encode(nonce_bytes),
        };
        serde_json::to_string(&blob).map_err(|e| VaultError::Encryption(e.to_string()))
    }

    /// Decrypt a stored blob.
    ///
    /// Never fails: blobs that do not verify fall through a best-effort
    /// legacy decode (plain base64, then the raw value). The outcome flags
    /// which path was taken so the sync loop can log a warning without
    /// crashing.
    #[must_use]
    pub fn decrypt(&self, stored: &str) -> Decrypted {
        if let Ok(blob) = serde_json::from_str::<EncryptedBlob>(stored) {
            match self.open(&blob) {
                Ok(plaintext) => return Decrypted::Clean(plaintext),
                Err(reason) => return Self::legacy_decode(stored, reason),
            }
        }
        Self::legacy_decode(stored, "token blob is not in the sealed format")
    }

    fn open(&self, blob: &EncryptedBlob) -> std::result::Result<Zeroizing<String>, &'static str> {
        let ciphertext = hex::decode(&blob.ciphertext).map_err(|_| "ciphertext is not hex")?;
        let nonce_bytes = hex::decode(&blob.nonce).map_err(|_| "nonce is not hex")?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err("nonce has the wrong length");
        }

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: ciphertext.as_slice(),
                    aad: TOKEN_AAD,
                },
            )
            .map_err(|_| "token authentication failed")?;

        String::from_utf8(plaintext)
            .map(Zeroizing::new)
            .map_err(|_| "decrypted token is not valid UTF-8")
    }

    fn legacy_decode(stored: &str, reason: &'static str) -> Decrypted {
        use base64::Engine;
        if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(stored) {
            if let Ok(value) = String::from_utf8(bytes) {
                return Decrypted::Fallback {
                    value: Zeroizing::new(value),
                    reason,
                };
            }
        }
        Decrypted::Fallback {
            value: Zeroizing::new(stored.to_string()),
            reason,
        }
    }
}
