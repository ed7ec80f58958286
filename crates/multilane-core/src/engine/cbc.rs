//! Multi-lane AES-CBC encryption engine.
//!
//! CBC chains block-to-block, so a single stream cannot be vectorized;
//! throughput comes from encrypting several independent jobs side by side.
//! Jobs park until all lanes are busy, then every round encrypts the minimum
//! remaining length across all lanes and retires the lane that hits zero.

use multilane_primitives::aes::AesCbcEnc;

use crate::engine::LaneStack;
use crate::job::{Job, JobStatus};

pub(crate) struct AesCbcOoo {
    lanes: usize,
    unused_lanes: LaneStack,
    job_in_lane: Vec<Option<usize>>,
    /// Whole-block bytes still to encrypt per lane.
    lens: Vec<usize>,
    /// Bytes of the cipher region already produced per lane.
    cursor: Vec<usize>,
    encryptors: Vec<Option<AesCbcEnc>>,
}

impl AesCbcOoo {
    pub fn new(lanes: usize) -> Self {
        Self {
            lanes,
            unused_lanes: LaneStack::new(lanes),
            job_in_lane: vec![None; lanes],
            lens: vec![0; lanes],
            cursor: vec![0; lanes],
            encryptors: (0..lanes).map(|_| None).collect(),
        }
    }

    /// Parks `jobs[idx]` in a free lane. Returns a completed job index once
    /// the engine is full, usually for a different, older job.
    pub fn submit(&mut self, jobs: &mut [Job], idx: usize) -> Option<usize> {
        let lane = self.unused_lanes.pop();
        let job = &jobs[idx];
        let enc = match AesCbcEnc::new(&job.cipher_key, &job.iv) {
            Ok(enc) => enc,
            Err(_) => {
                self.unused_lanes.push(lane);
                jobs[idx].status.insert(JobStatus::INTERNAL_ERROR);
                return Some(idx);
            }
        };
        self.job_in_lane[lane] = Some(idx);
        self.lens[lane] = job.msg_len_to_cipher & !15;
        self.cursor[lane] = 0;
        self.encryptors[lane] = Some(enc);

        if !self.unused_lanes.is_exhausted() {
            return None;
        }
        Some(self.round(jobs))
    }

    /// Forces one parked job to completion; `None` when the engine is empty.
    pub fn flush(&mut self, jobs: &mut [Job]) -> Option<usize> {
        if self.job_in_lane.iter().all(Option::is_none) {
            return None;
        }
        Some(self.round(jobs))
    }

    fn round(&mut self, jobs: &mut [Job]) -> usize {
        let mut min_idx = 0;
        let mut min_len = usize::MAX;
        for lane in 0..self.lanes {
            if self.job_in_lane[lane].is_some() && self.lens[lane] < min_len {
                min_len = self.lens[lane];
                min_idx = lane;
            }
        }

        for lane in 0..self.lanes {
            let Some(idx) = self.job_in_lane[lane] else {
                continue;
            };
            self.lens[lane] -= min_len;
            if min_len == 0 {
                continue;
            }
            let Some(enc) = self.encryptors[lane].as_mut() else {
                continue;
            };
            let job = &mut jobs[idx];
            let src_start = job.cipher_start_src_offset + self.cursor[lane];
            let out = self.cursor[lane]..self.cursor[lane] + min_len;
            job.dst[out.clone()].copy_from_slice(&job.src[src_start..src_start + min_len]);
            enc.encrypt_blocks(&mut job.dst[out]);
            self.cursor[lane] += min_len;
        }

        let idx = self.job_in_lane[min_idx].take().unwrap_or_default();
        self.encryptors[min_idx] = None;
        self.unused_lanes.push(min_idx);
        jobs[idx].status.insert(JobStatus::COMPLETED_AES);
        idx
    }
}
