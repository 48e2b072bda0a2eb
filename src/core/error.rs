//! Error types for the Snell core framing layer.

use thiserror::Error;

/// Errors in the cipher/AEAD layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// AEAD encryption failed.
    #[error("AEAD encryption failed")]
    EncryptionFailed,

    /// AEAD decryption failed (invalid tag or corrupted ciphertext).
    #[error("AEAD decryption failed (invalid tag or corrupted)")]
    DecryptionFailed,

    /// Key derivation failed.
    #[error("key derivation failed")]
    KeyDerivationFailed,

    /// The supplied master key does not match the cipher's required size.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes.
        expected: usize,
        /// Actual key length supplied.
        actual: usize,
    },

    /// Unrecognized cipher identifier.
    #[error("unsupported cipher: {0}")]
    UnsupportedCipher(String),
}

/// Errors surfaced by the record codec, framed reader/writer, and session.
///
/// A zero chunk is a first-class signal, not an exceptional condition: see
/// [`SnellError::ZeroChunk`]. Every other variant renders the session
/// terminal per the framing layer's no-self-healing design.
#[derive(Debug, Error)]
pub enum SnellError {
    /// Underlying transport I/O failed or returned short of a record
    /// boundary.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// AEAD authentication failed and no fallback cipher applied (or the
    /// fallback also failed). The session is permanently desynchronized.
    #[error("authentication failure: session desynchronized")]
    Authentication,

    /// The decoded record's length field was zero: a zero-chunk record.
    /// Not an error in the pejorative sense — callers decide whether to
    /// treat it as end-of-stream, keepalive, or an error of their own.
    #[error("zero-chunk record")]
    ZeroChunk,

    /// A non-EOF error from the caller-supplied source in `read_from`.
    #[error("error reading from source: {0}")]
    SourceRead(std::io::Error),

    /// Cipher construction or key derivation failed.
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),

    /// An operation was attempted on a session already made terminal by a
    /// prior error. The nonce/cipher state of the two peers can no longer
    /// be assumed in sync, so the session does not retry internally.
    #[error("session is terminal after a prior unrecoverable error")]
    SessionTerminated,
}
