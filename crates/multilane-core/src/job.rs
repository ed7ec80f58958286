//! The job descriptor: one record per ring slot, filled in by the caller
//! between `get_next_job` and `submit_job`, mutated by the engines while the
//! manager owns it, and handed back once complete.

use crate::validate::ValidationError;
use thiserror::Error;

pub const AES_BLOCK_SIZE: usize = 16;
pub const DES_BLOCK_SIZE: usize = 8;

/// Cipher selection for the confidentiality half of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CipherMode {
    Cbc,
    Cntr,
    #[default]
    NullCipher,
    DocsisSecBpi,
    Gcm,
    CustomCipher,
    Des,
    DocsisDes,
    Ccm,
}

/// Authentication selection for the integrity half of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlg {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    AesXcbc,
    Md5,
    #[default]
    NullHash,
    AesGmac,
    CustomHash,
    AesCcm,
}

/// Which of the two halves runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainOrder {
    #[default]
    CipherHash,
    HashCipher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CipherDirection {
    #[default]
    Encrypt,
    Decrypt,
}

/// Job processing status, an ordered bitmask.
///
/// The ordering matters: a job counts as finished once its bits reach
/// [`JobStatus::COMPLETED`], which is also true of the rejection and error
/// encodings, so the drain loops treat all three uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct JobStatus(u32);

impl JobStatus {
    pub const NONE: Self = Self(0);
    pub const BEING_PROCESSED: Self = Self(0x01);
    pub const COMPLETED_AES: Self = Self(0x02);
    pub const COMPLETED_HMAC: Self = Self(0x04);
    pub const COMPLETED: Self = Self(0x02 | 0x04);
    pub const INVALID_ARGS: Self = Self(0x08);
    pub const INTERNAL_ERROR: Self = Self(0x10);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True once the job no longer needs any engine work: both halves done,
    /// rejected by the validator, or failed internally.
    pub const fn is_complete(self) -> bool {
        self.0 >= Self::COMPLETED.0
    }
}

/// Failure of a custom cipher or hash callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("custom operation failed")]
pub struct CustomOpError;

/// Caller-supplied stage for [`CipherMode::CustomCipher`] /
/// [`HashAlg::CustomHash`]: invoked exactly once; an error maps to
/// [`JobStatus::INTERNAL_ERROR`].
pub type CustomOpFn = fn(&mut Job) -> Result<(), CustomOpError>;

/// One crypto request. All fields are caller-set except `status`,
/// `invalid_reason`, `dst` and `auth_tag_output`, which the manager and its
/// engines write.
///
/// Buffers are owned so parked jobs stay self-contained while their lane
/// engine waits for peers. The cipher reads
/// `src[cipher_start_src_offset..][..msg_len_to_cipher]` and writes
/// `dst[..msg_len_to_cipher]`; the hash half reads the region resolved by
/// [`Job::hash_input`].
#[derive(Default)]
pub struct Job {
    pub cipher_mode: CipherMode,
    pub hash_alg: HashAlg,
    pub chain_order: ChainOrder,
    pub cipher_direction: CipherDirection,

    pub src: Vec<u8>,
    pub dst: Vec<u8>,
    pub cipher_start_src_offset: usize,
    pub hash_start_src_offset: usize,
    pub msg_len_to_cipher: usize,
    pub msg_len_to_hash: usize,

    pub iv: Vec<u8>,
    pub cipher_key: Vec<u8>,
    pub hash_key: Vec<u8>,
    pub aad: Vec<u8>,

    /// Desired tag length; the engines size `auth_tag_output` to match.
    pub auth_tag_len: usize,
    pub auth_tag_output: Vec<u8>,

    pub cipher_func: Option<CustomOpFn>,
    pub hash_func: Option<CustomOpFn>,

    /// Opaque caller tag, untouched by the manager.
    pub user_data: u64,

    pub status: JobStatus,
    /// Why the validator rejected this job, when `status` is `INVALID_ARGS`.
    pub invalid_reason: Option<ValidationError>,
}

impl Job {
    /// Clears a reused ring slot back to an empty descriptor.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn cipher_src_range(&self) -> core::ops::Range<usize> {
        self.cipher_start_src_offset..self.cipher_start_src_offset + self.msg_len_to_cipher
    }

    /// The bytes the hash half authenticates.
    ///
    /// Encrypt-then-MAC chains authenticate ciphertext, which lives in `dst`
    /// (at the hash offset rebased against the cipher offset); every other
    /// combination authenticates `src` directly. The CCM engine has its own
    /// rule and does not use this.
    pub(crate) fn hash_input(&self) -> &[u8] {
        let ciphers_into_dst = !matches!(
            self.cipher_mode,
            CipherMode::NullCipher | CipherMode::CustomCipher | CipherMode::Ccm | CipherMode::Gcm
        );
        if self.chain_order == ChainOrder::CipherHash && ciphers_into_dst {
            let start = self.hash_start_src_offset.saturating_sub(self.cipher_start_src_offset);
            &self.dst[start..start + self.msg_len_to_hash]
        } else {
            &self.src[self.hash_start_src_offset..self.hash_start_src_offset + self.msg_len_to_hash]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering_treats_errors_as_complete() {
        let mut s = JobStatus::BEING_PROCESSED;
        assert!(!s.is_complete());
        s.insert(JobStatus::COMPLETED_AES);
        assert!(!s.is_complete());
        s.insert(JobStatus::COMPLETED_HMAC);
        assert!(s.is_complete());

        assert!(JobStatus::INVALID_ARGS.is_complete());
        let mut partial = JobStatus::COMPLETED_AES;
        partial.insert(JobStatus::INTERNAL_ERROR);
        assert!(partial.is_complete());
        assert!(partial.contains(JobStatus::COMPLETED_AES));
    }

    #[test]
    fn test_hash_input_selects_ciphertext_for_encrypt_then_mac() {
        let mut job = Job::default();
        job.cipher_mode = CipherMode::Cbc;
        job.chain_order = ChainOrder::CipherHash;
        job.src = vec![1u8; 32];
        job.dst = vec![2u8; 32];
        job.msg_len_to_hash = 32;
        assert_eq!(job.hash_input(), &job.dst[..]);

        job.chain_order = ChainOrder::HashCipher;
        assert_eq!(job.hash_input(), &job.src[..]);
    }
}
