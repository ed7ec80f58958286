//! # multilane-primitives
//!
//! Synchronous symmetric-cipher and MAC block primitives consumed by the
//! multilane job manager. Everything here is a thin, slice-oriented wrapper
//! over the RustCrypto crates; the scheduling layer above decides when and
//! in what interleaving these run.

#![deny(unsafe_code)]

pub mod aes;
pub mod des;
pub mod gcm;
pub mod mac;

use thiserror::Error;

/// Rejection of key or IV material whose length no primitive variant accepts.
///
/// The job validator normally screens these out before a primitive is
/// reached; the error still propagates so the scheduling layer can report an
/// internal error instead of panicking on a bypassed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PrimitiveError {
    #[error("unsupported key length: {0} bytes")]
    KeyLength(usize),
    #[error("unsupported IV length: {0} bytes")]
    IvLength(usize),
}
