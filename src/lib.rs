//! # Snell Core
//!
//! AEAD stream framing for a lightweight encrypted TCP tunnel protocol.
//!
//! This crate implements the core of a Snell-style proxy: the
//! bidirectional transformation between a plaintext byte stream and a
//! sequence of authenticated ciphertext records exchanged over an
//! underlying reliable duplex transport, including the per-direction
//! salt handshake and the in-band cipher-fallback probe used during
//! protocol upgrades. It does not implement a proxy server, address
//! parsing, configuration loading, or the higher-level Snell
//! request/response message formats — those are external collaborators
//! that consume this crate's duplex byte-stream abstraction.
//!
//! ## Feature flags
//!
//! - `crypto` (default): AEAD ciphers, nonce counter, HKDF key derivation.
//! - `transport` (default): the async framed reader/writer and session
//!   connection built on [`tokio`].
//!
//! ## Modules
//!
//! - [`core`]: constants and error types (always included).
//! - [`nonce`], [`cipher`], [`codec`]: the synchronous, transport-free
//!   building blocks (require `crypto`).
//! - [`framed`], [`session`]: the stateful async layer driving the
//!   codec across a transport (require `transport`).
//!
//! ## Example
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use snell_core::cipher::{Cipher, CipherKind};
//! use snell_core::session::SnellConnection;
//! use tokio::net::TcpStream;
//!
//! let cipher = Arc::new(Cipher::new(CipherKind::ChaCha20IetfPoly1305, vec![0u8; 32])?);
//! let transport = TcpStream::connect("127.0.0.1:8388").await?;
//! let (mut read, mut write) = SnellConnection::new(transport, cipher, None);
//!
//! write.write(b"hello").await?;
//! let mut buf = [0u8; 64];
//! let n = read.read(&mut buf).await?;
//! # let _ = n;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included): constants and error types.
pub mod core;

// Crypto layer: nonce counter, record codec, AEAD/KDF (feature-gated).
#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod nonce;

#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod cipher;

#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod codec;

// Transport layer: framed reader/writer and session connection (feature-gated).
#[cfg(all(feature = "transport", feature = "crypto"))]
#[cfg_attr(docsrs, doc(cfg(all(feature = "transport", feature = "crypto"))))]
pub mod framed;

#[cfg(all(feature = "transport", feature = "crypto"))]
#[cfg_attr(docsrs, doc(cfg(all(feature = "transport", feature = "crypto"))))]
pub mod session;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    #[cfg(feature = "crypto")]
    pub use crate::cipher::{Cipher, CipherKind};

    #[cfg(feature = "crypto")]
    pub use crate::nonce::NonceCounter;

    #[cfg(all(feature = "transport", feature = "crypto"))]
    pub use crate::framed::{FramedReader, FramedWriter};

    #[cfg(all(feature = "transport", feature = "crypto"))]
    pub use crate::session::{SnellConnection, SnellHalfRead, SnellHalfWrite};
}
