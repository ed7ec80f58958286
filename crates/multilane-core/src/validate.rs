//! Pre-dispatch job validation.
//!
//! Every job passes through here (unless submitted via the nocheck entry
//! point) before any engine sees it. A rejection sets `INVALID_ARGS` on the
//! job and records which constraint failed; no primitive runs and no output
//! buffer is touched.

use crate::job::{
    AES_BLOCK_SIZE, ChainOrder, CipherDirection, CipherMode, DES_BLOCK_SIZE, HashAlg, Job,
};
use thiserror::Error;

/// The CCM scratch area holds three AAD blocks minus the two-byte length
/// prefix.
pub const CCM_MAX_AAD_LEN: usize = 3 * AES_BLOCK_SIZE - 2;

/// Which constraint a rejected job violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{mode:?}: unsupported key length {len}")]
    CipherKeyLength { mode: CipherMode, len: usize },
    #[error("{mode:?}: unsupported IV length {len}")]
    IvLength { mode: CipherMode, len: usize },
    #[error("{mode:?}: empty cipher region")]
    EmptyCipherLength { mode: CipherMode },
    #[error("{mode:?}: cipher length {len} not a multiple of the block size")]
    UnalignedCipherLength { mode: CipherMode, len: usize },
    #[error("cipher region exceeds the src or dst buffer")]
    CipherRange,
    #[error("hash region exceeds its source buffer")]
    HashRange,
    #[error("NULL cipher is only valid in hash-then-cipher chains")]
    NullCipherChainOrder,
    #[error("custom cipher selected without a cipher callback")]
    MissingCipherFunc,
    #[error("custom hash selected without a hash callback")]
    MissingHashFunc,
    #[error("{alg:?}: unsupported auth tag length {len}")]
    TagLength { alg: HashAlg, len: usize },
    #[error("{alg:?}: empty hash region")]
    EmptyHashLength { alg: HashAlg },
    #[error("GCM and AES-GMAC must be selected together")]
    GmacPairing,
    #[error("CCM and AES-CCM must be selected together")]
    CcmPairing,
    #[error("CCM additional data exceeds {CCM_MAX_AAD_LEN} bytes")]
    AadTooLong,
    #[error("CCM cipher and hash must cover the same region")]
    CcmRegionMismatch,
    #[error("CCM message exceeds the 16-bit length field")]
    CcmMessageTooLong,
    #[error("chain order conflicts with cipher direction")]
    ChainOrderDirection,
}

fn aes_key_len(mode: CipherMode, len: usize) -> Result<(), ValidationError> {
    match len {
        16 | 24 | 32 => Ok(()),
        _ => Err(ValidationError::CipherKeyLength { mode, len }),
    }
}

fn cipher_in_bounds(job: &Job) -> Result<(), ValidationError> {
    let end = job
        .cipher_start_src_offset
        .checked_add(job.msg_len_to_cipher)
        .ok_or(ValidationError::CipherRange)?;
    if end > job.src.len() || job.msg_len_to_cipher > job.dst.len() {
        return Err(ValidationError::CipherRange);
    }
    Ok(())
}

fn hash_in_bounds(job: &Job) -> Result<(), ValidationError> {
    // Mirrors Job::hash_input: encrypt-then-MAC chains read ciphertext from
    // dst, everything else reads src.
    let dst_side = job.chain_order == ChainOrder::CipherHash
        && !matches!(
            job.cipher_mode,
            CipherMode::NullCipher | CipherMode::CustomCipher | CipherMode::Ccm | CipherMode::Gcm
        );
    let (start, buf_len) = if dst_side {
        if job.hash_start_src_offset < job.cipher_start_src_offset {
            return Err(ValidationError::HashRange);
        }
        (
            job.hash_start_src_offset - job.cipher_start_src_offset,
            job.dst.len(),
        )
    } else {
        (job.hash_start_src_offset, job.src.len())
    };
    let end = start
        .checked_add(job.msg_len_to_hash)
        .ok_or(ValidationError::HashRange)?;
    if end > buf_len {
        return Err(ValidationError::HashRange);
    }
    Ok(())
}

fn check_cipher(job: &Job) -> Result<(), ValidationError> {
    let mode = job.cipher_mode;
    match mode {
        CipherMode::Cbc => {
            aes_key_len(mode, job.cipher_key.len())?;
            if job.msg_len_to_cipher == 0 {
                return Err(ValidationError::EmptyCipherLength { mode });
            }
            if job.msg_len_to_cipher % AES_BLOCK_SIZE != 0 {
                return Err(ValidationError::UnalignedCipherLength {
                    mode,
                    len: job.msg_len_to_cipher,
                });
            }
            if job.iv.len() != AES_BLOCK_SIZE {
                return Err(ValidationError::IvLength { mode, len: job.iv.len() });
            }
            cipher_in_bounds(job)
        }
        CipherMode::Cntr => {
            aes_key_len(mode, job.cipher_key.len())?;
            if job.iv.len() != 12 && job.iv.len() != 16 {
                return Err(ValidationError::IvLength { mode, len: job.iv.len() });
            }
            if job.msg_len_to_cipher == 0 {
                return Err(ValidationError::EmptyCipherLength { mode });
            }
            cipher_in_bounds(job)
        }
        CipherMode::NullCipher => {
            if job.chain_order != ChainOrder::HashCipher {
                return Err(ValidationError::NullCipherChainOrder);
            }
            Ok(())
        }
        CipherMode::DocsisSecBpi => {
            if job.cipher_key.len() != 16 {
                return Err(ValidationError::CipherKeyLength {
                    mode,
                    len: job.cipher_key.len(),
                });
            }
            if job.iv.len() != AES_BLOCK_SIZE {
                return Err(ValidationError::IvLength { mode, len: job.iv.len() });
            }
            if job.msg_len_to_cipher == 0 {
                return Err(ValidationError::EmptyCipherLength { mode });
            }
            cipher_in_bounds(job)
        }
        CipherMode::Gcm => {
            aes_key_len(mode, job.cipher_key.len())?;
            if job.iv.len() != 12 {
                return Err(ValidationError::IvLength { mode, len: job.iv.len() });
            }
            if job.hash_alg != HashAlg::AesGmac {
                return Err(ValidationError::GmacPairing);
            }
            if job.msg_len_to_cipher == 0 {
                return Err(ValidationError::EmptyCipherLength { mode });
            }
            cipher_in_bounds(job)
        }
        CipherMode::CustomCipher => {
            if job.cipher_func.is_none() {
                return Err(ValidationError::MissingCipherFunc);
            }
            Ok(())
        }
        CipherMode::Des | CipherMode::DocsisDes => {
            if job.cipher_key.len() != DES_BLOCK_SIZE {
                return Err(ValidationError::CipherKeyLength {
                    mode,
                    len: job.cipher_key.len(),
                });
            }
            if job.msg_len_to_cipher == 0 {
                return Err(ValidationError::EmptyCipherLength { mode });
            }
            if mode == CipherMode::Des && job.msg_len_to_cipher % DES_BLOCK_SIZE != 0 {
                return Err(ValidationError::UnalignedCipherLength {
                    mode,
                    len: job.msg_len_to_cipher,
                });
            }
            if job.iv.len() != DES_BLOCK_SIZE {
                return Err(ValidationError::IvLength { mode, len: job.iv.len() });
            }
            cipher_in_bounds(job)
        }
        CipherMode::Ccm => {
            if job.cipher_key.len() != 16 {
                return Err(ValidationError::CipherKeyLength {
                    mode,
                    len: job.cipher_key.len(),
                });
            }
            // RFC 3610: nonce length is 15 - L with L in 2..=8.
            if !(7..=13).contains(&job.iv.len()) {
                return Err(ValidationError::IvLength { mode, len: job.iv.len() });
            }
            if job.msg_len_to_cipher == 0 {
                return Err(ValidationError::EmptyCipherLength { mode });
            }
            if job.hash_alg != HashAlg::AesCcm {
                return Err(ValidationError::CcmPairing);
            }
            cipher_in_bounds(job)
        }
    }
}

fn check_hash(job: &Job) -> Result<(), ValidationError> {
    let alg = job.hash_alg;
    match alg {
        HashAlg::Sha1
        | HashAlg::Sha224
        | HashAlg::Sha256
        | HashAlg::Sha384
        | HashAlg::Sha512
        | HashAlg::AesXcbc
        | HashAlg::Md5 => {
            let fixed = match alg {
                HashAlg::Sha1 | HashAlg::AesXcbc | HashAlg::Md5 => 12,
                HashAlg::Sha224 => 14,
                HashAlg::Sha256 => 16,
                HashAlg::Sha384 => 24,
                HashAlg::Sha512 => 32,
                _ => unreachable!(),
            };
            if job.auth_tag_len != fixed {
                return Err(ValidationError::TagLength {
                    alg,
                    len: job.auth_tag_len,
                });
            }
            if job.msg_len_to_hash == 0 {
                return Err(ValidationError::EmptyHashLength { alg });
            }
            hash_in_bounds(job)
        }
        HashAlg::NullHash => Ok(()),
        HashAlg::AesGmac => {
            if !matches!(job.auth_tag_len, 8 | 12 | 16) {
                return Err(ValidationError::TagLength {
                    alg,
                    len: job.auth_tag_len,
                });
            }
            if job.cipher_mode != CipherMode::Gcm {
                return Err(ValidationError::GmacPairing);
            }
            // msg_len_to_hash is deliberately unchecked: GMAC authenticates
            // through the AAD and cipher regions instead.
            Ok(())
        }
        HashAlg::CustomHash => {
            if job.hash_func.is_none() {
                return Err(ValidationError::MissingHashFunc);
            }
            Ok(())
        }
        HashAlg::AesCcm => {
            if job.aad.len() > CCM_MAX_AAD_LEN {
                return Err(ValidationError::AadTooLong);
            }
            if job.auth_tag_len < 4 || job.auth_tag_len > 16 || job.auth_tag_len % 2 != 0 {
                return Err(ValidationError::TagLength {
                    alg,
                    len: job.auth_tag_len,
                });
            }
            if job.cipher_mode != CipherMode::Ccm {
                return Err(ValidationError::CcmPairing);
            }
            if job.msg_len_to_cipher != job.msg_len_to_hash {
                return Err(ValidationError::CcmRegionMismatch);
            }
            if job.cipher_start_src_offset != job.hash_start_src_offset {
                return Err(ValidationError::CcmRegionMismatch);
            }
            if job.msg_len_to_hash > u16::MAX as usize {
                return Err(ValidationError::CcmMessageTooLong);
            }
            Ok(())
        }
    }
}

fn check_chain_order(job: &Job) -> Result<(), ValidationError> {
    match job.chain_order {
        ChainOrder::CipherHash => {
            if job.cipher_direction != CipherDirection::Encrypt {
                return Err(ValidationError::ChainOrderDirection);
            }
        }
        ChainOrder::HashCipher => {
            if job.cipher_mode != CipherMode::NullCipher
                && job.cipher_direction != CipherDirection::Decrypt
            {
                return Err(ValidationError::ChainOrderDirection);
            }
        }
    }
    Ok(())
}

/// Runs the full constraint table against a job.
pub fn check_job(job: &Job) -> Result<(), ValidationError> {
    check_cipher(job)?;
    check_hash(job)?;
    check_chain_order(job)
}
