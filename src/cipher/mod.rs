//! Cipher capability: the configured symmetric scheme a session is built
//! on top of.
//!
//! A [`Cipher`] is constructed once from a master key and a [`CipherKind`],
//! then used to derive a fresh AEAD primitive per direction from that
//! direction's salt (see [`Cipher::derive_encrypter`] /
//! [`Cipher::derive_decrypter`]).

mod aead;
mod kdf;

pub use aead::{Aead, Aes128GcmCipher, Aes256GcmCipher, ChaCha20IetfPoly1305};

use crate::core::CipherError;
use std::sync::Arc;
use zeroize::Zeroize;

/// One of the three concrete AEAD schemes this protocol recognizes.
///
/// Each fixes `salt_size = key_size`, `tag_overhead = 16`, `nonce_size =
/// 12`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CipherKind {
    /// `aes-128-gcm`
    Aes128Gcm,
    /// `aes-256-gcm`
    Aes256Gcm,
    /// `chacha20-ietf-poly1305`
    ChaCha20IetfPoly1305,
}

impl CipherKind {
    /// Parse a cipher identifier as used on the wire/in configuration.
    pub fn from_identifier(id: &str) -> Result<Self, CipherError> {
        match id {
            "aes-128-gcm" => Ok(Self::Aes128Gcm),
            "aes-256-gcm" => Ok(Self::Aes256Gcm),
            "chacha20-ietf-poly1305" => Ok(Self::ChaCha20IetfPoly1305),
            other => Err(CipherError::UnsupportedCipher(other.to_string())),
        }
    }

    /// The wire/configuration identifier for this cipher.
    pub fn identifier(self) -> &'static str {
        match self {
            Self::Aes128Gcm => "aes-128-gcm",
            Self::Aes256Gcm => "aes-256-gcm",
            Self::ChaCha20IetfPoly1305 => "chacha20-ietf-poly1305",
        }
    }

    /// Master/session key size in bytes. Equal to the salt size for every
    /// supported cipher.
    pub fn key_size(self) -> usize {
        match self {
            Self::Aes128Gcm => 16,
            Self::Aes256Gcm | Self::ChaCha20IetfPoly1305 => 32,
        }
    }

    /// Salt size in bytes, equal to [`CipherKind::key_size`].
    pub fn salt_size(self) -> usize {
        self.key_size()
    }

    fn construct(self, key: &[u8]) -> Result<Arc<dyn Aead>, CipherError> {
        Ok(match self {
            Self::Aes128Gcm => Arc::new(Aes128GcmCipher::new(key)?),
            Self::Aes256Gcm => Arc::new(Aes256GcmCipher::new(key)?),
            Self::ChaCha20IetfPoly1305 => Arc::new(ChaCha20IetfPoly1305::new(key)?),
        })
    }
}

/// A configured cipher: a [`CipherKind`] bound to a master key.
///
/// Deriving an encrypter/decrypter for a direction mixes the master key
/// with that direction's salt via HKDF-SHA1 (see [`kdf::derive_subkey`]),
/// so every session gets independent sub-keys even when the master key is
/// reused across sessions.
pub struct Cipher {
    kind: CipherKind,
    master_key: Vec<u8>,
}

impl Cipher {
    /// Construct a cipher capability from an already-sized master key.
    ///
    /// Deriving that key from a password or other config material is the
    /// surrounding proxy/config layer's responsibility, not this crate's.
    pub fn new(kind: CipherKind, master_key: impl Into<Vec<u8>>) -> Result<Self, CipherError> {
        let master_key = master_key.into();
        if master_key.len() != kind.key_size() {
            return Err(CipherError::InvalidKeyLength {
                expected: kind.key_size(),
                actual: master_key.len(),
            });
        }
        Ok(Self { kind, master_key })
    }

    /// Which concrete scheme this cipher uses.
    pub fn kind(&self) -> CipherKind {
        self.kind
    }

    /// Bytes of random salt a session must exchange before using this
    /// cipher in either direction.
    pub fn salt_size(&self) -> usize {
        self.kind.salt_size()
    }

    /// Derive the AEAD used to encrypt records sent under `salt`.
    pub fn derive_encrypter(&self, salt: &[u8]) -> Result<Arc<dyn Aead>, CipherError> {
        let subkey = kdf::derive_subkey(&self.master_key, salt, self.kind.key_size())?;
        self.kind.construct(&subkey)
    }

    /// Derive the AEAD used to decrypt records received under `salt`.
    ///
    /// Encryption and decryption derive identically: the direction is
    /// implied by which salt was exchanged on which side, not by any
    /// asymmetry in the KDF itself.
    pub fn derive_decrypter(&self, salt: &[u8]) -> Result<Arc<dyn Aead>, CipherError> {
        self.derive_encrypter(salt)
    }
}

impl Drop for Cipher {
    fn drop(&mut self) {
        self.master_key.zeroize();
    }
}
