//! HKDF-SHA1 session sub-key derivation.
//!
//! Per the external interface, the key fed into the AEAD is derived from
//! the session master key and the salt via `HKDF-SHA1(salt, master_key,
//! info="ss-subkey")`, the scheme used by the shadowsocks-compatible AEAD
//! ciphers this protocol's cipher suite borrows from.

use hkdf::Hkdf;
use sha1::Sha1;

use crate::core::{CipherError, SUBKEY_INFO};

/// Derive a `key_size`-byte session sub-key from `master_key` and `salt`.
pub fn derive_subkey(master_key: &[u8], salt: &[u8], key_size: usize) -> Result<Vec<u8>, CipherError> {
    let hk = Hkdf::<Sha1>::new(Some(salt), master_key);
    let mut out = vec![0u8; key_size];
    hk.expand(SUBKEY_INFO, &mut out)
        .map_err(|_| CipherError::KeyDerivationFailed)?;
    Ok(out)
}
