//! Core constants and error types shared by every layer of the crate.

mod constants;
mod error;

pub use constants::*;
pub use error::{CipherError, SnellError};
