//! Concrete AEAD constructions backing the cipher capability.
//!
//! Each supported cipher fixes `nonce_size = 12` and `tag_overhead = 16`
//! per the protocol's external interface; what differs between them is
//! only the underlying primitive and its key size.
//!
//! Sealing/opening work in place on a caller-owned `Vec<u8>` (mirroring
//! the teacher's `encrypt_in_place`/`decrypt_in_place` helpers) so the
//! framed reader/writer can reuse one scratch buffer per direction
//! instead of allocating a fresh ciphertext buffer per record.

use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce as AesNonce};
use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    ChaCha20Poly1305, Nonce as ChaChaNonce,
};

use crate::core::{AEAD_TAG_SIZE, CipherError};

/// A constructed AEAD primitive, bound to one derived session sub-key.
///
/// Stateless per call: the caller supplies the nonce for every `seal`/
/// `open` and is responsible for advancing it (see [`crate::nonce`]).
pub trait Aead: Send + Sync {
    /// Seal `buffer` in place under `nonce` with no associated data: on
    /// success `buffer` holds `ciphertext || tag`.
    fn seal_in_place(&self, nonce: &[u8], buffer: &mut Vec<u8>) -> Result<(), CipherError>;

    /// Open `buffer` in place under `nonce`: on success the trailing tag
    /// is removed and `buffer` holds the plaintext. On authentication
    /// failure `buffer`'s contents are unspecified; the session is
    /// terminal regardless.
    fn open_in_place(&self, nonce: &[u8], buffer: &mut Vec<u8>) -> Result<(), CipherError>;

    /// Authentication tag size in bytes (16 for every supported cipher).
    fn tag_overhead(&self) -> usize {
        AEAD_TAG_SIZE
    }
}

/// ChaCha20-Poly1305 with a 256-bit key ("chacha20-ietf-poly1305").
pub struct ChaCha20IetfPoly1305(ChaCha20Poly1305);

impl ChaCha20IetfPoly1305 {
    /// Construct from a 32-byte derived session sub-key.
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        let cipher =
            ChaCha20Poly1305::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength {
                expected: 32,
                actual: key.len(),
            })?;
        Ok(Self(cipher))
    }
}

impl Aead for ChaCha20IetfPoly1305 {
    fn seal_in_place(&self, nonce: &[u8], buffer: &mut Vec<u8>) -> Result<(), CipherError> {
        let nonce = ChaChaNonce::from_slice(nonce);
        self.0
            .encrypt_in_place(nonce, &[], buffer)
            .map_err(|_| CipherError::EncryptionFailed)
    }

    fn open_in_place(&self, nonce: &[u8], buffer: &mut Vec<u8>) -> Result<(), CipherError> {
        let nonce = ChaChaNonce::from_slice(nonce);
        self.0
            .decrypt_in_place(nonce, &[], buffer)
            .map_err(|_| CipherError::DecryptionFailed)
    }
}

/// AES-128-GCM.
pub struct Aes128GcmCipher(Aes128Gcm);

impl Aes128GcmCipher {
    /// Construct from a 16-byte derived session sub-key.
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        let cipher = Aes128Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength {
            expected: 16,
            actual: key.len(),
        })?;
        Ok(Self(cipher))
    }
}

impl Aead for Aes128GcmCipher {
    fn seal_in_place(&self, nonce: &[u8], buffer: &mut Vec<u8>) -> Result<(), CipherError> {
        let nonce = AesNonce::from_slice(nonce);
        self.0
            .encrypt_in_place(nonce, &[], buffer)
            .map_err(|_| CipherError::EncryptionFailed)
    }

    fn open_in_place(&self, nonce: &[u8], buffer: &mut Vec<u8>) -> Result<(), CipherError> {
        let nonce = AesNonce::from_slice(nonce);
        self.0
            .decrypt_in_place(nonce, &[], buffer)
            .map_err(|_| CipherError::DecryptionFailed)
    }
}

/// AES-256-GCM.
pub struct Aes256GcmCipher(Aes256Gcm);

impl Aes256GcmCipher {
    /// Construct from a 32-byte derived session sub-key.
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength {
            expected: 32,
            actual: key.len(),
        })?;
        Ok(Self(cipher))
    }
}

impl Aead for Aes256GcmCipher {
    fn seal_in_place(&self, nonce: &[u8], buffer: &mut Vec<u8>) -> Result<(), CipherError> {
        let nonce = AesNonce::from_slice(nonce);
        self.0
            .encrypt_in_place(nonce, &[], buffer)
            .map_err(|_| CipherError::EncryptionFailed)
    }

    fn open_in_place(&self, nonce: &[u8], buffer: &mut Vec<u8>) -> Result<(), CipherError> {
        let nonce = AesNonce::from_slice(nonce);
        self.0
            .decrypt_in_place(nonce, &[], buffer)
            .map_err(|_| CipherError::DecryptionFailed)
    }
}
