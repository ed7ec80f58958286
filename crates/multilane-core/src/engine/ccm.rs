//! AES-CCM authentication engine: a state machine driving multi-lane
//! CBC-MAC-128, with the counter-mode primitive reused for both the payload
//! cipher and the tag masking.
//!
//! Per-lane phases:
//!   0: B₀ plus up to three AAD blocks pending (lane scratch),
//!   1: whole payload blocks running,
//!   2: zero-padded partial tail block pending (lane scratch).
//! After the last phase the final CBC-MAC state is XORed against
//! E_K(A₀) via counter mode, truncated, and written as the tag. Decrypt
//! jobs run their counter-mode cipher before authentication, encrypt jobs
//! after it.

use multilane_primitives::aes::{AES_BLOCK_SIZE, Aes128Block, ctr_transform};

use crate::engine::LaneStack;
use crate::job::{CipherDirection, Job, JobStatus};

const INIT_BLOCKS_LEN: usize = 4 * AES_BLOCK_SIZE;
const PARKED: u16 = u16::MAX;

/// Where a lane's next CBC-MAC bytes come from.
#[derive(Debug, Clone, Copy)]
enum LaneInput {
    /// Offset into the lane's `init_blocks` scratch.
    Scratch(usize),
    /// Offset into the job's payload (src on encrypt, dst on decrypt).
    Payload(usize),
}

pub(crate) struct CcmOoo {
    lanes: usize,
    unused_lanes: LaneStack,
    job_in_lane: Vec<Option<usize>>,
    lens: Vec<u16>,
    init_done: Vec<u8>,
    init_blocks: Vec<[u8; INIT_BLOCKS_LEN]>,
    /// Running CBC-MAC state per lane.
    mac_state: Vec<[u8; AES_BLOCK_SIZE]>,
    ciphers: Vec<Option<Aes128Block>>,
    input: Vec<LaneInput>,
}

/// Builds a CCM counter block: flags byte carrying L-1, the nonce, zero
/// padding, and the counter in the last byte.
fn ctr_block(out: &mut [u8; AES_BLOCK_SIZE], nonce: &[u8], counter: u8) {
    let l = AES_BLOCK_SIZE - 1 - nonce.len();
    out[0] = (l - 1) as u8;
    out[1..1 + nonce.len()].copy_from_slice(nonce);
    for b in &mut out[1 + nonce.len()..AES_BLOCK_SIZE - 1] {
        *b = 0;
    }
    out[AES_BLOCK_SIZE - 1] = counter;
}

/// Counter-mode pass over the payload with the block counter starting at 1.
fn ccm_ctr_cipher(job: &mut Job) {
    let mut a1 = [0u8; AES_BLOCK_SIZE];
    ctr_block(&mut a1, &job.iv, 1);
    let range = job.cipher_src_range();
    let n = job.msg_len_to_cipher;
    if ctr_transform(&job.cipher_key, &a1, &job.src[range], &mut job.dst[..n]).is_err() {
        job.status.insert(JobStatus::INTERNAL_ERROR);
        return;
    }
    job.status.insert(JobStatus::COMPLETED_AES);
}

fn payload_region(job: &Job) -> &[u8] {
    match job.cipher_direction {
        CipherDirection::Encrypt => {
            &job.src[job.hash_start_src_offset..job.hash_start_src_offset + job.msg_len_to_hash]
        }
        CipherDirection::Decrypt => &job.dst[..job.msg_len_to_hash],
    }
}

impl CcmOoo {
    pub fn new(lanes: usize) -> Self {
        Self {
            lanes,
            unused_lanes: LaneStack::new(lanes),
            job_in_lane: vec![None; lanes],
            lens: vec![0; lanes],
            init_done: vec![0; lanes],
            init_blocks: vec![[0u8; INIT_BLOCKS_LEN]; lanes],
            mac_state: vec![[0u8; AES_BLOCK_SIZE]; lanes],
            ciphers: (0..lanes).map(|_| None).collect(),
            input: vec![LaneInput::Scratch(0); lanes],
        }
    }

    pub fn submit(&mut self, jobs: &mut [Job], idx: usize) -> Option<usize> {
        let lane = self.unused_lanes.pop();

        // Decrypt jobs cipher first so authentication sees plaintext.
        if jobs[idx].cipher_direction == CipherDirection::Decrypt {
            ccm_ctr_cipher(&mut jobs[idx]);
        }

        let job = &jobs[idx];
        let cipher = match Aes128Block::new(&job.cipher_key) {
            Ok(cipher) => cipher,
            Err(_) => {
                self.unused_lanes.push(lane);
                jobs[idx].status.insert(JobStatus::INTERNAL_ERROR);
                return Some(idx);
            }
        };

        let aad_len = job.aad.len();
        let pb = &mut self.init_blocks[lane];

        // B₀: the A₀ layout plus tag-size and AAD flags and the trailing
        // big-endian message length.
        let mut b0 = [0u8; AES_BLOCK_SIZE];
        ctr_block(&mut b0, &job.iv, 0);
        if aad_len != 0 {
            b0[0] |= 0x40;
        }
        b0[0] |= (((job.auth_tag_len - 2) >> 1) as u8) << 3;
        b0[14] = (job.msg_len_to_hash >> 8) as u8;
        b0[15] = job.msg_len_to_hash as u8;
        pb[..AES_BLOCK_SIZE].copy_from_slice(&b0);

        if aad_len != 0 {
            pb[AES_BLOCK_SIZE..].fill(0);
            pb[AES_BLOCK_SIZE] = (aad_len >> 8) as u8;
            pb[AES_BLOCK_SIZE + 1] = aad_len as u8;
            pb[AES_BLOCK_SIZE + 2..AES_BLOCK_SIZE + 2 + aad_len].copy_from_slice(&job.aad);
            self.lens[lane] = (AES_BLOCK_SIZE + ((aad_len + 2 + 15) & !15)) as u16;
        } else {
            self.lens[lane] = AES_BLOCK_SIZE as u16;
        }

        self.job_in_lane[lane] = Some(idx);
        self.init_done[lane] = 0;
        self.input[lane] = LaneInput::Scratch(0);
        self.mac_state[lane] = [0u8; AES_BLOCK_SIZE];
        self.ciphers[lane] = Some(cipher);

        // The first round only begins once every lane is occupied.
        if !self.unused_lanes.is_exhausted() {
            return None;
        }
        Some(self.run_rounds(jobs, false))
    }

    pub fn flush(&mut self, jobs: &mut [Job]) -> Option<usize> {
        if self.job_in_lane.iter().all(Option::is_none) {
            return None;
        }
        Some(self.run_rounds(jobs, true))
    }

    fn run_rounds(&mut self, jobs: &mut [Job], flushing: bool) -> usize {
        loop {
            if flushing {
                // Park idle lanes behind a length no live lane can reach so
                // they never win the min selection.
                for lane in 0..self.lanes {
                    if self.job_in_lane[lane].is_none() {
                        self.lens[lane] = PARKED;
                    }
                }
            }

            let mut min_idx = 0;
            let mut min_len = u16::MAX;
            for lane in 0..self.lanes {
                if self.job_in_lane[lane].is_some() && self.lens[lane] < min_len {
                    min_len = self.lens[lane];
                    min_idx = lane;
                }
            }

            for lane in 0..self.lanes {
                if self.job_in_lane[lane].is_some() {
                    self.lens[lane] -= min_len;
                }
            }
            if min_len > 0 {
                for lane in 0..self.lanes {
                    self.advance_mac(jobs, lane, min_len as usize);
                }
            }

            let Some(idx) = self.job_in_lane[min_idx] else {
                return 0;
            };

            if self.init_done[min_idx] == 0 {
                // Prefix done; switch the lane input to the payload.
                self.input[min_idx] = LaneInput::Payload(0);
                self.init_done[min_idx] = 1;
                let whole = jobs[idx].msg_len_to_hash & !15;
                if whole > 0 {
                    self.lens[min_idx] = whole as u16;
                    continue;
                }
            }

            if self.init_done[min_idx] == 1 && jobs[idx].msg_len_to_hash % AES_BLOCK_SIZE != 0 {
                // Whole blocks done; stage the zero-padded tail in scratch.
                let tail_len = jobs[idx].msg_len_to_hash % AES_BLOCK_SIZE;
                let mut tail = [0u8; AES_BLOCK_SIZE];
                if let LaneInput::Payload(off) = self.input[min_idx] {
                    tail[..tail_len]
                        .copy_from_slice(&payload_region(&jobs[idx])[off..off + tail_len]);
                }
                self.init_blocks[min_idx][..AES_BLOCK_SIZE].copy_from_slice(&tail);
                self.input[min_idx] = LaneInput::Scratch(0);
                self.lens[min_idx] = AES_BLOCK_SIZE as u16;
                self.init_done[min_idx] = 2;
                continue;
            }

            return self.finalize_lane(jobs, min_idx, idx);
        }
    }

    fn advance_mac(&mut self, jobs: &[Job], lane: usize, n: usize) {
        let Some(idx) = self.job_in_lane[lane] else {
            return;
        };
        let Some(cipher) = self.ciphers[lane].as_ref() else {
            return;
        };
        match self.input[lane] {
            LaneInput::Scratch(off) => {
                cipher.cbc_mac_update(
                    &mut self.mac_state[lane],
                    &self.init_blocks[lane][off..off + n],
                );
                self.input[lane] = LaneInput::Scratch(off + n);
            }
            LaneInput::Payload(off) => {
                cipher.cbc_mac_update(
                    &mut self.mac_state[lane],
                    &payload_region(&jobs[idx])[off..off + n],
                );
                self.input[lane] = LaneInput::Payload(off + n);
            }
        }
    }

    fn finalize_lane(&mut self, jobs: &mut [Job], lane: usize, idx: usize) -> usize {
        // Tag masking: counter mode over A₀ encrypts exactly one keystream
        // block, which XORed with the CBC-MAC state and truncated is the tag.
        let mut a0 = [0u8; AES_BLOCK_SIZE];
        ctr_block(&mut a0, &jobs[idx].iv, 0);
        let mac = self.mac_state[lane];

        let job = &mut jobs[idx];
        job.auth_tag_output.clear();
        job.auth_tag_output.resize(job.auth_tag_len, 0);
        let tag_len = job.auth_tag_len;
        if ctr_transform(&job.cipher_key, &a0, &mac[..tag_len], &mut job.auth_tag_output).is_err() {
            job.status.insert(JobStatus::INTERNAL_ERROR);
        }

        if job.cipher_direction == CipherDirection::Encrypt {
            ccm_ctr_cipher(job);
        }

        self.unused_lanes.push(lane);
        self.job_in_lane[lane] = None;
        self.init_done[lane] = 0;
        self.ciphers[lane] = None;
        jobs[idx].status.insert(JobStatus::COMPLETED_HMAC);
        idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{ChainOrder, CipherMode, HashAlg};

    #[test]
    fn test_ctr_block_layout() {
        let nonce: Vec<u8> = (1..=13u8).collect();
        let mut block = [0u8; 16];
        ctr_block(&mut block, &nonce, 7);
        assert_eq!(block[0], 1); // L = 2, flags = L - 1
        assert_eq!(&block[1..14], &nonce[..]);
        assert_eq!(block[14], 0);
        assert_eq!(block[15], 7);

        let nonce = [0xaau8; 7];
        let mut block = [0u8; 16];
        ctr_block(&mut block, &nonce, 0);
        assert_eq!(block[0], 7); // L = 8
        assert_eq!(&block[1..8], &nonce[..]);
        assert!(block[8..15].iter().all(|&b| b == 0));
    }

    fn ccm_job(direction: CipherDirection, msg: &[u8], aad: &[u8]) -> Job {
        Job {
            cipher_mode: CipherMode::Ccm,
            hash_alg: HashAlg::AesCcm,
            chain_order: if direction == CipherDirection::Encrypt {
                ChainOrder::CipherHash
            } else {
                ChainOrder::HashCipher
            },
            cipher_direction: direction,
            src: msg.to_vec(),
            dst: vec![0u8; msg.len()],
            msg_len_to_cipher: msg.len(),
            msg_len_to_hash: msg.len(),
            iv: (0..13u8).collect(),
            cipher_key: (0..16u8).collect(),
            aad: aad.to_vec(),
            auth_tag_len: 8,
            ..Job::default()
        }
    }

    #[test]
    fn test_b0_and_aad_blocks_after_submit() {
        let mut engine = CcmOoo::new(4);
        let aad = [0x11u8; 8];
        let mut jobs = vec![ccm_job(CipherDirection::Encrypt, &[0x22u8; 23], &aad)];
        assert_eq!(engine.submit(&mut jobs, 0), None);

        let pb = &engine.init_blocks[0];
        // flags: L' = 1, AAD present, M' = (8 - 2) / 2 = 3.
        assert_eq!(pb[0], 0x01 | 0x40 | (3 << 3));
        assert_eq!(&pb[14..16], &[0, 23]);
        // AAD block: big-endian length then the bytes, zero padded.
        assert_eq!(&pb[16..18], &[0, 8]);
        assert_eq!(&pb[18..26], &aad[..]);
        assert!(pb[26..32].iter().all(|&b| b == 0));
        // One B₀ block plus one padded AAD block pending.
        assert_eq!(engine.lens[0], 32);
    }

    #[test]
    fn test_single_job_flush_round_trip() {
        let msg = [0x5au8; 30];
        let aad = [0x0fu8; 4];

        let mut engine = CcmOoo::new(4);
        let mut jobs = vec![ccm_job(CipherDirection::Encrypt, &msg, &aad)];
        assert_eq!(engine.submit(&mut jobs, 0), None);
        assert_eq!(engine.flush(&mut jobs), Some(0));
        assert!(jobs[0].status.contains(JobStatus::COMPLETED_HMAC));
        let ciphertext = jobs[0].dst.clone();
        let tag = jobs[0].auth_tag_output.clone();
        assert_eq!(tag.len(), 8);

        let mut engine = CcmOoo::new(4);
        let mut dec = ccm_job(CipherDirection::Decrypt, &ciphertext, &aad);
        dec.iv = jobs[0].iv.clone();
        let mut jobs2 = vec![dec];
        assert_eq!(engine.submit(&mut jobs2, 0), None);
        assert_eq!(engine.flush(&mut jobs2), Some(0));
        assert_eq!(jobs2[0].dst, msg);
        assert_eq!(jobs2[0].auth_tag_output, tag);
    }

    #[test]
    fn test_four_jobs_complete_in_remaining_length_order() {
        let mut engine = CcmOoo::new(4);
        let mut jobs = vec![
            ccm_job(CipherDirection::Encrypt, &[1u8; 64], &[]),
            ccm_job(CipherDirection::Encrypt, &[2u8; 16], &[]),
            ccm_job(CipherDirection::Encrypt, &[3u8; 48], &[]),
            ccm_job(CipherDirection::Encrypt, &[4u8; 32], &[]),
        ];
        assert_eq!(engine.submit(&mut jobs, 0), None);
        assert_eq!(engine.submit(&mut jobs, 1), None);
        assert_eq!(engine.submit(&mut jobs, 2), None);
        // All prefixes are one block; the shortest payload retires first.
        assert_eq!(engine.submit(&mut jobs, 3), Some(1));
        assert_eq!(engine.flush(&mut jobs), Some(3));
        assert_eq!(engine.flush(&mut jobs), Some(2));
        assert_eq!(engine.flush(&mut jobs), Some(0));
        assert_eq!(engine.flush(&mut jobs), None);
    }
}
