//! Stateful half-duplex wrappers that drive the record codec across an
//! underlying transport.
//!
//! A [`FramedWriter`] and a [`FramedReader`] each own one reusable scratch
//! buffer and advance one [`NonceCounter`](crate::nonce::NonceCounter); they
//! never share mutable state with each other, which is what lets a full
//! duplex session split them across two independent execution contexts
//! (see [`crate::session`]).

mod reader;
mod writer;

pub use reader::FramedReader;
pub use writer::FramedWriter;
