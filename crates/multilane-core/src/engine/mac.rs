//! Multi-lane MAC engine.
//!
//! One engine instance exists per algorithm; a lane wraps an incremental
//! keyed state from the primitives crate and a cursor over the job's hash
//! region. Rounds feed every busy lane the minimum remaining byte count, and
//! the lane that runs dry finalizes into the job's truncated tag.

use multilane_primitives::mac::{MacAlg, MacState};

use crate::engine::LaneStack;
use crate::job::{Job, JobStatus};

pub(crate) struct MacOoo {
    alg: MacAlg,
    lanes: usize,
    unused_lanes: LaneStack,
    job_in_lane: Vec<Option<usize>>,
    lens: Vec<usize>,
    cursor: Vec<usize>,
    states: Vec<Option<MacState>>,
}

impl MacOoo {
    pub fn new(alg: MacAlg, lanes: usize) -> Self {
        Self {
            alg,
            lanes,
            unused_lanes: LaneStack::new(lanes),
            job_in_lane: vec![None; lanes],
            lens: vec![0; lanes],
            cursor: vec![0; lanes],
            states: (0..lanes).map(|_| None).collect(),
        }
    }

    pub fn submit(&mut self, jobs: &mut [Job], idx: usize) -> Option<usize> {
        let lane = self.unused_lanes.pop();
        let state = match MacState::new(self.alg, &jobs[idx].hash_key) {
            Ok(state) => state,
            Err(_) => {
                self.unused_lanes.push(lane);
                jobs[idx].status.insert(JobStatus::INTERNAL_ERROR);
                return Some(idx);
            }
        };
        self.job_in_lane[lane] = Some(idx);
        self.lens[lane] = jobs[idx].msg_len_to_hash;
        self.cursor[lane] = 0;
        self.states[lane] = Some(state);

        if !self.unused_lanes.is_exhausted() {
            return None;
        }
        Some(self.round(jobs))
    }

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
            let Some(state) = self.states[lane].as_mut() else {
                continue;
            };
            let window = self.cursor[lane]..self.cursor[lane] + min_len;
            state.update(&jobs[idx].hash_input()[window]);
            self.cursor[lane] += min_len;
        }

        let idx = self.job_in_lane[min_idx].take().unwrap_or_default();
        self.unused_lanes.push(min_idx);
        let job = &mut jobs[idx];
        if let Some(state) = self.states[min_idx].take() {
            job.auth_tag_output.clear();
            job.auth_tag_output.resize(job.auth_tag_len, 0);
            state.finalize_into(&mut job.auth_tag_output);
        }
        job.status.insert(JobStatus::COMPLETED_HMAC);
        idx
    }
}
