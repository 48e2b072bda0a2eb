//! Stateless per-record AEAD framing.
//!
//! On the wire, one record is:
//!
//! ```text
//! encrypted_length (2 bytes plaintext, big-endian) || tag
//! encrypted_payload (N bytes)                      || tag      (N > 0 only)
//! ```
//!
//! where `N = length & PAYLOAD_MASK` and `N` is in `1..=16383` for data
//! records; `N == 0` is the zero chunk, a length-only record with no
//! payload body.
//!
//! Every function here works in place on a caller-owned `Vec<u8>`: the
//! buffer holds plaintext on the way in and ciphertext on the way out
//! (or vice versa), so [`crate::framed`] can reuse one scratch buffer
//! per direction across an entire session instead of allocating a
//! fresh `Vec` per record.

use crate::cipher::Aead;
use crate::core::{CipherError, PAYLOAD_MASK};
use crate::nonce::NonceCounter;

/// Seal one record's length header in place: `buf` must start out
/// holding exactly the 2-byte big-endian `payload_len`, and ends up
/// holding `2 + tag_overhead` bytes of ciphertext. Advances `nonce` by
/// one.
///
/// `payload_len` must be in `0..=PAYLOAD_MASK`; the caller
/// ([`crate::framed::writer`]) is responsible for chunking larger input.
pub fn seal_length(
    aead: &dyn Aead,
    nonce: &mut NonceCounter,
    payload_len: u16,
    buf: &mut Vec<u8>,
) -> Result<(), CipherError> {
    debug_assert!(payload_len <= PAYLOAD_MASK);
    buf.clear();
    buf.extend_from_slice(&payload_len.to_be_bytes());
    aead.seal_in_place(nonce.as_bytes(), buf)?;
    nonce.increment();
    Ok(())
}

/// Seal one record's payload body in place: `buf` holds the plaintext
/// on entry and the sealed ciphertext (`plaintext.len() +
/// tag_overhead` bytes) on success. Advances `nonce` by one. Must only
/// be called with a non-empty buffer: an empty payload has no body on
/// the wire (the zero chunk is the length header alone).
pub fn seal_payload(
    aead: &dyn Aead,
    nonce: &mut NonceCounter,
    buf: &mut Vec<u8>,
) -> Result<(), CipherError> {
    debug_assert!(!buf.is_empty());
    aead.seal_in_place(nonce.as_bytes(), buf)?;
    nonce.increment();
    Ok(())
}

/// Open one record's length header in place: `buf` must hold exactly
/// `2 + tag_overhead` ciphertext bytes on entry and holds the 2
/// plaintext bytes on success. Returns the masked effective length
/// (`0` denotes a zero chunk). Advances `nonce` by one only on
/// success: an authentication failure here makes the session terminal
/// and the nonce is left where it was so callers don't fold a no-op
/// into a desynchronized counter.
pub fn open_length(
    aead: &dyn Aead,
    nonce: &mut NonceCounter,
    buf: &mut Vec<u8>,
) -> Result<u16, CipherError> {
    aead.open_in_place(nonce.as_bytes(), buf)?;
    nonce.increment();
    let raw = u16::from_be_bytes([buf[0], buf[1]]);
    Ok(raw & PAYLOAD_MASK)
}

/// Open one record's payload body in place: `buf` holds `size +
/// tag_overhead` ciphertext bytes on entry and the plaintext on
/// success. Advances `nonce` by one on success.
pub fn open_payload(
    aead: &dyn Aead,
    nonce: &mut NonceCounter,
    buf: &mut Vec<u8>,
) -> Result<(), CipherError> {
    aead.open_in_place(nonce.as_bytes(), buf)?;
    nonce.increment();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::ChaCha20IetfPoly1305;
    use crate::core::AEAD_TAG_SIZE;

    fn test_aead() -> ChaCha20IetfPoly1305 {
        ChaCha20IetfPoly1305::new(&[0x42; 32]).unwrap()
    }

    #[test]
    fn zero_length_record_is_length_header_only() {
        let aead = test_aead();
        let mut nonce = NonceCounter::new();
        let mut buf = Vec::new();
        seal_length(&aead, &mut nonce, 0, &mut buf).unwrap();
        assert_eq!(buf.len(), 2 + AEAD_TAG_SIZE);
    }

    #[test]
    fn data_record_roundtrips() {
        let aead = test_aead();
        let mut send_nonce = NonceCounter::new();
        let mut len_wire = Vec::new();
        seal_length(&aead, &mut send_nonce, 4, &mut len_wire).unwrap();
        let mut payload_wire = b"ping".to_vec();
        seal_payload(&aead, &mut send_nonce, &mut payload_wire).unwrap();

        let mut recv_nonce = NonceCounter::new();
        let size = open_length(&aead, &mut recv_nonce, &mut len_wire).unwrap();
        assert_eq!(size, 4);
        open_payload(&aead, &mut recv_nonce, &mut payload_wire).unwrap();
        assert_eq!(payload_wire, b"ping");
    }

    #[test]
    fn nonce_advances_once_per_seal_or_open() {
        let aead = test_aead();
        let mut nonce = NonceCounter::new();
        let mut len_wire = Vec::new();
        seal_length(&aead, &mut nonce, 2, &mut len_wire).unwrap();
        let mut payload_wire = b"ab".to_vec();
        seal_payload(&aead, &mut nonce, &mut payload_wire).unwrap();
        let mut expected = [0u8; 12];
        expected[0] = 2; // one for the header, one for the payload
        assert_eq!(nonce.as_bytes(), &expected);
    }

    #[test]
    fn length_mask_strips_reserved_bits() {
        let aead = test_aead();
        let mut nonce = NonceCounter::new();
        // Seal a length header with a reserved high bit set; decode must mask it off.
        let raw = 0x4005u16; // reserved bit (0x4000) set, effective length 5
        let mut buf = raw.to_be_bytes().to_vec();
        aead.seal_in_place(nonce.as_bytes(), &mut buf).unwrap();
        let mut recv_nonce = NonceCounter::new();
        let size = open_length(&aead, &mut recv_nonce, &mut buf).unwrap();
        assert_eq!(size, 5);
    }

    #[test]
    fn tampered_length_header_fails_to_decode() {
        let aead = test_aead();
        let mut nonce = NonceCounter::new();
        let mut buf = Vec::new();
        seal_length(&aead, &mut nonce, 4, &mut buf).unwrap();
        buf[0] ^= 0xFF;
        let mut recv_nonce = NonceCounter::new();
        assert!(open_length(&aead, &mut recv_nonce, &mut buf).is_err());
    }
}
