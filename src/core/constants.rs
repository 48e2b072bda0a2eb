//! Protocol constants fixed by the framing layer.
//!
//! These values are fixed by the wire format and MUST NOT be changed.

// =============================================================================
// CRYPTOGRAPHIC CONSTANTS
// =============================================================================

/// Poly1305 / GCM authentication tag size, shared by all supported ciphers.
pub const AEAD_TAG_SIZE: usize = 16;

/// AEAD nonce size, shared by all supported ciphers (96-bit).
pub const AEAD_NONCE_SIZE: usize = 12;

/// HKDF info string used to derive the per-session sub-key from the salt
/// and the configured master key ("ss-subkey", as used by the
/// shadowsocks-compatible AEAD schemes this protocol's ciphers borrow
/// from).
pub const SUBKEY_INFO: &[u8] = b"ss-subkey";

// =============================================================================
// RECORD FRAMING CONSTANTS
// =============================================================================

/// Mask applied to a decoded length field; also the maximum plaintext
/// payload size of a single data record.
pub const PAYLOAD_MASK: u16 = 0x3FFF;

/// Maximum plaintext payload size of a single data record (16383 bytes).
pub const MAX_PAYLOAD_SIZE: usize = PAYLOAD_MASK as usize;

/// Size of the on-wire encrypted length header, before the tag.
pub const LENGTH_HEADER_SIZE: usize = 2;

/// Size of the scratch buffer each direction needs: header + tag +
/// max payload + tag.
pub const MAX_RECORD_SIZE: usize =
    LENGTH_HEADER_SIZE + AEAD_TAG_SIZE + MAX_PAYLOAD_SIZE + AEAD_TAG_SIZE;
