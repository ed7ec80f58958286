//! Cipher and hash dispatch: routes a job to the right primitive or lane
//! engine by `(cipher_mode, key length)` or `hash_alg`.
//!
//! Every function takes the full slot array plus a job index, because a lane
//! engine is free to return a *different*, previously parked job.

use multilane_primitives::aes::{AES_BLOCK_SIZE, cbc_decrypt, cfb128_partial_block, ctr_transform};
use multilane_primitives::des::{
    des_cbc_decrypt, des_cbc_encrypt, docsis_des_decrypt, docsis_des_encrypt,
};
use multilane_primitives::gcm::{gcm_decrypt, gcm_encrypt};
use multilane_primitives::mac::MacAlg;

use crate::config::MgrConfig;
use crate::engine::cbc::AesCbcOoo;
use crate::engine::ccm::CcmOoo;
use crate::engine::mac::MacOoo;
use crate::job::{CipherDirection, CipherMode, HashAlg, Job, JobStatus};

pub(crate) struct Engines {
    aes128_enc: AesCbcOoo,
    aes192_enc: AesCbcOoo,
    aes256_enc: AesCbcOoo,
    docsis_sec: AesCbcOoo,
    hmac_sha1: MacOoo,
    hmac_sha224: MacOoo,
    hmac_sha256: MacOoo,
    hmac_sha384: MacOoo,
    hmac_sha512: MacOoo,
    hmac_md5: MacOoo,
    aes_xcbc: MacOoo,
    aes_ccm: CcmOoo,
}

impl Engines {
    pub fn new(cfg: &MgrConfig) -> Self {
        Self {
            aes128_enc: AesCbcOoo::new(cfg.cbc_lanes),
            aes192_enc: AesCbcOoo::new(cfg.cbc_lanes),
            aes256_enc: AesCbcOoo::new(cfg.cbc_lanes),
            docsis_sec: AesCbcOoo::new(cfg.cbc_lanes),
            hmac_sha1: MacOoo::new(MacAlg::HmacSha1, cfg.mac_lanes),
            hmac_sha224: MacOoo::new(MacAlg::HmacSha224, cfg.mac_lanes),
            hmac_sha256: MacOoo::new(MacAlg::HmacSha256, cfg.mac_lanes),
            hmac_sha384: MacOoo::new(MacAlg::HmacSha384, cfg.mac_lanes),
            hmac_sha512: MacOoo::new(MacAlg::HmacSha512, cfg.mac_lanes),
            hmac_md5: MacOoo::new(MacAlg::HmacMd5, cfg.mac_lanes),
            aes_xcbc: MacOoo::new(MacAlg::AesXcbc, cfg.mac_lanes),
            aes_ccm: CcmOoo::new(cfg.ccm_lanes),
        }
    }

    /// Encrypt-side cipher submission.
    pub fn submit_cipher_enc(&mut self, jobs: &mut [Job], idx: usize) -> Option<usize> {
        match jobs[idx].cipher_mode {
            CipherMode::Cbc => match jobs[idx].cipher_key.len() {
                16 => self.aes128_enc.submit(jobs, idx),
                24 => self.aes192_enc.submit(jobs, idx),
                _ => self.aes256_enc.submit(jobs, idx),
            },
            CipherMode::Cntr => {
                run_ctr(&mut jobs[idx]);
                Some(idx)
            }
            CipherMode::DocsisSecBpi => {
                if jobs[idx].msg_len_to_cipher >= AES_BLOCK_SIZE {
                    let done = self.docsis_sec.submit(jobs, idx)?;
                    docsis_last_block(&mut jobs[done]);
                    Some(done)
                } else {
                    docsis_first_block(&mut jobs[idx]);
                    Some(idx)
                }
            }
            CipherMode::Gcm => {
                run_gcm(&mut jobs[idx]);
                Some(idx)
            }
            CipherMode::CustomCipher => {
                run_custom_cipher(&mut jobs[idx]);
                Some(idx)
            }
            CipherMode::Des => {
                run_des(&mut jobs[idx]);
                Some(idx)
            }
            CipherMode::DocsisDes => {
                run_docsis_des(&mut jobs[idx]);
                Some(idx)
            }
            // The CCM cipher runs inside the CCM authentication engine.
            CipherMode::NullCipher | CipherMode::Ccm => {
                jobs[idx].status.insert(JobStatus::COMPLETED_AES);
                Some(idx)
            }
        }
    }

    /// Decrypt-side cipher submission: every mode here is synchronous.
    pub fn submit_cipher_dec(&mut self, jobs: &mut [Job], idx: usize) -> Option<usize> {
        let job = &mut jobs[idx];
        match job.cipher_mode {
            CipherMode::Cbc => {
                let range = job.cipher_src_range();
                let n = job.msg_len_to_cipher & !15;
                let res = cbc_decrypt(&job.cipher_key, &job.iv, &job.src[range], &mut job.dst[..n]);
                finish_cipher_step(job, res.is_err());
                Some(idx)
            }
            CipherMode::Cntr => {
                run_ctr(job);
                Some(idx)
            }
            CipherMode::DocsisSecBpi => {
                if job.msg_len_to_cipher >= AES_BLOCK_SIZE {
                    docsis_last_block(job);
                    let n = job.msg_len_to_cipher & !15;
                    let start = job.cipher_start_src_offset;
                    let res = cbc_decrypt(
                        &job.cipher_key,
                        &job.iv,
                        &job.src[start..start + n],
                        &mut job.dst[..n],
                    );
                    finish_cipher_step(job, res.is_err());
                } else {
                    docsis_first_block(job);
                }
                Some(idx)
            }
            CipherMode::Gcm => {
                run_gcm(job);
                Some(idx)
            }
            CipherMode::Des => {
                run_des(job);
                Some(idx)
            }
            CipherMode::DocsisDes => {
                run_docsis_des(job);
                Some(idx)
            }
            CipherMode::CustomCipher => {
                run_custom_cipher(job);
                Some(idx)
            }
            CipherMode::NullCipher | CipherMode::Ccm => {
                job.status.insert(JobStatus::COMPLETED_AES);
                Some(idx)
            }
        }
    }

    /// Encrypt-side cipher flush; only lane-engine-backed modes can have
    /// anything parked.
    pub fn flush_cipher_enc(&mut self, jobs: &mut [Job], idx: usize) -> Option<usize> {
        match jobs[idx].cipher_mode {
            CipherMode::Cbc => match jobs[idx].cipher_key.len() {
                16 => self.aes128_enc.flush(jobs),
                24 => self.aes192_enc.flush(jobs),
                _ => self.aes256_enc.flush(jobs),
            },
            CipherMode::DocsisSecBpi => {
                let done = self.docsis_sec.flush(jobs)?;
                docsis_last_block(&mut jobs[done]);
                Some(done)
            }
            CipherMode::CustomCipher => {
                run_custom_cipher(&mut jobs[idx]);
                Some(idx)
            }
            _ => None,
        }
    }

    /// Decrypt-side cipher flush: the decrypt paths are synchronous, so this
    /// degenerates to a submission.
    pub fn flush_cipher_dec(&mut self, jobs: &mut [Job], idx: usize) -> Option<usize> {
        self.submit_cipher_dec(jobs, idx)
    }

    pub fn submit_hash(&mut self, jobs: &mut [Job], idx: usize) -> Option<usize> {
        match jobs[idx].hash_alg {
            HashAlg::Sha1 => self.hmac_sha1.submit(jobs, idx),
            HashAlg::Sha224 => self.hmac_sha224.submit(jobs, idx),
            HashAlg::Sha256 => self.hmac_sha256.submit(jobs, idx),
            HashAlg::Sha384 => self.hmac_sha384.submit(jobs, idx),
            HashAlg::Sha512 => self.hmac_sha512.submit(jobs, idx),
            HashAlg::Md5 => self.hmac_md5.submit(jobs, idx),
            HashAlg::AesXcbc => self.aes_xcbc.submit(jobs, idx),
            HashAlg::AesCcm => self.aes_ccm.submit(jobs, idx),
            HashAlg::CustomHash => {
                run_custom_hash(&mut jobs[idx]);
                Some(idx)
            }
            // GMAC is produced by the GCM cipher call itself.
            HashAlg::NullHash | HashAlg::AesGmac => {
                jobs[idx].status.insert(JobStatus::COMPLETED_HMAC);
                Some(idx)
            }
        }
    }

    pub fn flush_hash(&mut self, jobs: &mut [Job], idx: usize) -> Option<usize> {
        match jobs[idx].hash_alg {
            HashAlg::Sha1 => self.hmac_sha1.flush(jobs),
            HashAlg::Sha224 => self.hmac_sha224.flush(jobs),
            HashAlg::Sha256 => self.hmac_sha256.flush(jobs),
            HashAlg::Sha384 => self.hmac_sha384.flush(jobs),
            HashAlg::Sha512 => self.hmac_sha512.flush(jobs),
            HashAlg::Md5 => self.hmac_md5.flush(jobs),
            HashAlg::AesXcbc => self.aes_xcbc.flush(jobs),
            HashAlg::AesCcm => self.aes_ccm.flush(jobs),
            HashAlg::CustomHash => {
                run_custom_hash(&mut jobs[idx]);
                Some(idx)
            }
            HashAlg::NullHash | HashAlg::AesGmac => {
                if !jobs[idx].status.contains(JobStatus::COMPLETED_HMAC) {
                    jobs[idx].status.insert(JobStatus::COMPLETED_HMAC);
                    Some(idx)
                } else {
                    None
                }
            }
        }
    }
}

fn finish_cipher_step(job: &mut Job, failed: bool) {
    if failed {
        job.status.insert(JobStatus::INTERNAL_ERROR);
    } else {
        job.status.insert(JobStatus::COMPLETED_AES);
    }
}

fn run_ctr(job: &mut Job) {
    let range = job.cipher_src_range();
    let n = job.msg_len_to_cipher;
    let res = ctr_transform(&job.cipher_key, &job.iv, &job.src[range], &mut job.dst[..n]);
    finish_cipher_step(job, res.is_err());
}

fn run_des(job: &mut Job) {
    let range = job.cipher_src_range();
    let n = job.msg_len_to_cipher;
    let res = match job.cipher_direction {
        CipherDirection::Encrypt => {
            des_cbc_encrypt(&job.cipher_key, &job.iv, &job.src[range], &mut job.dst[..n])
        }
        CipherDirection::Decrypt => {
            des_cbc_decrypt(&job.cipher_key, &job.iv, &job.src[range], &mut job.dst[..n])
        }
    };
    finish_cipher_step(job, res.is_err());
}

fn run_docsis_des(job: &mut Job) {
    let range = job.cipher_src_range();
    let n = job.msg_len_to_cipher;
    let res = match job.cipher_direction {
        CipherDirection::Encrypt => {
            docsis_des_encrypt(&job.cipher_key, &job.iv, &job.src[range], &mut job.dst[..n])
        }
        CipherDirection::Decrypt => {
            docsis_des_decrypt(&job.cipher_key, &job.iv, &job.src[range], &mut job.dst[..n])
        }
    };
    finish_cipher_step(job, res.is_err());
}

/// GCM does cipher and authentication in one pass, so it completes both
/// halves of the status at once.
fn run_gcm(job: &mut Job) {
    job.auth_tag_output.clear();
    job.auth_tag_output.resize(job.auth_tag_len, 0);
    let range = job.cipher_src_range();
    let n = job.msg_len_to_cipher;
    let res = match job.cipher_direction {
        CipherDirection::Encrypt => gcm_encrypt(
            &job.cipher_key,
            &job.iv,
            &job.aad,
            &job.src[range],
            &mut job.dst[..n],
            &mut job.auth_tag_output,
        ),
        CipherDirection::Decrypt => gcm_decrypt(
            &job.cipher_key,
            &job.iv,
            &job.aad,
            &job.src[range],
            &mut job.dst[..n],
            &mut job.auth_tag_output,
        ),
    };
    if res.is_err() {
        job.status.insert(JobStatus::INTERNAL_ERROR);
    } else {
        job.status = JobStatus::COMPLETED;
    }
}

/// CFB transform of the residual partial block for DOCSIS; the IV is the
/// next-to-last ciphered block, which lives in `dst` when encrypting and in
/// `src` when decrypting.
fn docsis_last_block(job: &mut Job) {
    let partial = job.msg_len_to_cipher & (AES_BLOCK_SIZE - 1);
    if partial == 0 {
        return;
    }
    let offset = job.msg_len_to_cipher & !(AES_BLOCK_SIZE - 1);
    let mut iv = [0u8; AES_BLOCK_SIZE];
    match job.cipher_direction {
        CipherDirection::Encrypt => {
            iv.copy_from_slice(&job.dst[offset - AES_BLOCK_SIZE..offset]);
        }
        CipherDirection::Decrypt => {
            let start = job.cipher_start_src_offset + offset - AES_BLOCK_SIZE;
            iv.copy_from_slice(&job.src[start..start + AES_BLOCK_SIZE]);
        }
    }
    let start = job.cipher_start_src_offset + offset;
    let res = cfb128_partial_block(
        &job.cipher_key,
        &iv,
        &job.src[start..start + partial],
        &mut job.dst[offset..offset + partial],
    );
    if res.is_err() {
        job.status.insert(JobStatus::INTERNAL_ERROR);
    }
}

/// Single CFB block for DOCSIS messages shorter than one AES block.
fn docsis_first_block(job: &mut Job) {
    let mut iv = [0u8; AES_BLOCK_SIZE];
    let n = job.iv.len().min(AES_BLOCK_SIZE);
    iv[..n].copy_from_slice(&job.iv[..n]);
    let range = job.cipher_src_range();
    let len = job.msg_len_to_cipher;
    let res = cfb128_partial_block(&job.cipher_key, &iv, &job.src[range], &mut job.dst[..len]);
    finish_cipher_step(job, res.is_err());
}

fn run_custom_cipher(job: &mut Job) {
    if job.status.contains(JobStatus::COMPLETED_AES) {
        return;
    }
    let Some(f) = job.cipher_func else {
        job.status.insert(JobStatus::INTERNAL_ERROR);
        return;
    };
    let failed = f(job).is_err();
    finish_cipher_step(job, failed);
}

fn run_custom_hash(job: &mut Job) {
    if job.status.contains(JobStatus::COMPLETED_HMAC) {
        return;
    }
    let Some(f) = job.hash_func else {
        job.status.insert(JobStatus::INTERNAL_ERROR);
        return;
    };
    if f(job).is_err() {
        job.status.insert(JobStatus::INTERNAL_ERROR);
    } else {
        job.status.insert(JobStatus::COMPLETED_HMAC);
    }
}
