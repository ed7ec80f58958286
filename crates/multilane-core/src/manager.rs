//! The job manager: a fixed ring of job slots with strict FIFO return
//! order, fronted by the validator and drained through the chain
//! orchestrator.
//!
//! Internally the lane engines complete jobs out of order, but the ring only
//! ever reports the oldest slot, so callers observe submission order.

use crate::config::{ConfigError, MgrConfig};
use crate::dispatch::Engines;
use crate::job::{ChainOrder, Job, JobStatus};
use crate::validate;

/// Lifetime counters for one manager instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MgrStats {
    /// Jobs pushed through `submit_job` / `submit_job_nocheck`.
    pub submitted: u64,
    /// Jobs the validator rejected.
    pub rejected: u64,
    /// Completed (or rejected) jobs handed back to the caller.
    pub returned: u64,
    /// `flush_job` invocations that drained a job.
    pub flushes: u64,
}

/// A multi-buffer crypto job manager. Single-threaded; owns all engine
/// scratch, so independent instances can serve independent threads.
pub struct JobManager {
    slots: Vec<Job>,
    next_job: usize,
    /// Oldest slot still owned by the manager; `None` when the ring is empty.
    earliest_job: Option<usize>,
    engines: Engines,
    stats: MgrStats,
}

impl JobManager {
    pub fn new() -> Self {
        Self::build(MgrConfig::default())
    }

    pub fn with_config(cfg: MgrConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self::build(cfg))
    }

    fn build(cfg: MgrConfig) -> Self {
        let mut slots = Vec::with_capacity(cfg.max_jobs);
        slots.resize_with(cfg.max_jobs, Job::default);
        Self {
            slots,
            next_job: 0,
            earliest_job: None,
            engines: Engines::new(&cfg),
            stats: MgrStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn stats(&self) -> MgrStats {
        self.stats
    }

    fn advance(&self, cursor: usize) -> usize {
        (cursor + 1) & (self.slots.len() - 1)
    }

    /// Returns the next free slot for the caller to fill. No side effects;
    /// the slot becomes owned by the manager only on `submit_job`.
    pub fn get_next_job(&mut self) -> &mut Job {
        let idx = self.next_job;
        &mut self.slots[idx]
    }

    /// Number of jobs currently owned by the manager.
    pub fn queue_size(&self) -> u32 {
        match self.earliest_job {
            None => 0,
            Some(earliest) => {
                ((self.next_job.wrapping_sub(earliest)) & (self.slots.len() - 1)) as u32
            }
        }
    }

    /// Validates and dispatches the slot last returned by `get_next_job`.
    ///
    /// May return a different, earlier-submitted job that is now complete;
    /// returns `None` while nothing has reached the head of the ring. The
    /// returned reference is only valid until the next `get_next_job`.
    pub fn submit_job(&mut self) -> Option<&mut Job> {
        self.submit_and_check(true)
    }

    /// `submit_job` minus the constraint table, for callers that have
    /// already validated their descriptors.
    pub fn submit_job_nocheck(&mut self) -> Option<&mut Job> {
        self.submit_and_check(false)
    }

    fn submit_and_check(&mut self, run_check: bool) -> Option<&mut Job> {
        let idx = self.next_job;
        self.stats.submitted += 1;

        let mut dispatch = true;
        if run_check {
            if let Err(reason) = validate::check_job(&self.slots[idx]) {
                let job = &mut self.slots[idx];
                job.status = JobStatus::INVALID_ARGS;
                job.invalid_reason = Some(reason);
                self.stats.rejected += 1;
                dispatch = false;
            }
        }
        if dispatch {
            let job = &mut self.slots[idx];
            job.status = JobStatus::BEING_PROCESSED;
            job.invalid_reason = None;
            // The completed job (if any) stays in its ring slot; only the
            // oldest slot is ever returned below.
            let _ = submit_new_job(&mut self.engines, &mut self.slots, idx);
        }

        let Some(earliest) = self.earliest_job else {
            // Ring was empty: nothing older can be ready yet.
            self.earliest_job = Some(self.next_job);
            self.next_job = self.advance(self.next_job);
            return None;
        };

        self.next_job = self.advance(self.next_job);

        if earliest == self.next_job {
            // Ring full: force the oldest job out synchronously.
            complete_job(&mut self.engines, &mut self.slots, earliest);
            self.earliest_job = Some(self.advance(earliest));
            self.stats.returned += 1;
            return Some(&mut self.slots[earliest]);
        }

        if self.slots[earliest].status.is_complete() {
            self.earliest_job = Some(self.advance(earliest));
            self.stats.returned += 1;
            return Some(&mut self.slots[earliest]);
        }
        None
    }

    /// Forces completion of the oldest in-flight job; `None` when empty.
    pub fn flush_job(&mut self) -> Option<&mut Job> {
        let earliest = self.earliest_job?;
        complete_job(&mut self.engines, &mut self.slots, earliest);

        let next_earliest = self.advance(earliest);
        self.earliest_job = if next_earliest == self.next_job {
            None
        } else {
            Some(next_earliest)
        };
        self.stats.flushes += 1;
        self.stats.returned += 1;
        Some(&mut self.slots[earliest])
    }
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new()
    }
}

fn stop_piping(jobs: &[Job], idx: usize) -> bool {
    jobs[idx].status.contains(JobStatus::INTERNAL_ERROR)
}

/// Runs a freshly submitted job through its chain, threading whichever job
/// each stage hands back into the next stage.
fn submit_new_job(engines: &mut Engines, jobs: &mut [Job], idx: usize) -> Option<usize> {
    match jobs[idx].chain_order {
        ChainOrder::CipherHash => {
            let idx = engines.submit_cipher_enc(jobs, idx)?;
            if stop_piping(jobs, idx) {
                return Some(idx);
            }
            let idx = engines.submit_hash(jobs, idx)?;
            // A lane engine may hand back a decrypt-chain job here.
            if jobs[idx].chain_order == ChainOrder::HashCipher && !stop_piping(jobs, idx) {
                engines.submit_cipher_dec(jobs, idx);
            }
            Some(idx)
        }
        ChainOrder::HashCipher => {
            let idx = engines.submit_hash(jobs, idx)?;
            if jobs[idx].chain_order == ChainOrder::HashCipher && !stop_piping(jobs, idx) {
                engines.submit_cipher_dec(jobs, idx);
            }
            Some(idx)
        }
    }
}

/// Drains engines until `jobs[idx]` is complete, re-piping every job a flush
/// surfaces. The flushed job need not be `idx`: lane engines retire whatever
/// lane has the least work left, so the loop keys every routing decision off
/// the surfaced job, not the target.
fn complete_job(engines: &mut Engines, jobs: &mut [Job], idx: usize) {
    while !jobs[idx].status.is_complete() {
        match jobs[idx].chain_order {
            ChainOrder::CipherHash => {
                let surfaced = match engines.flush_cipher_enc(jobs, idx) {
                    Some(done) => {
                        if stop_piping(jobs, done) {
                            continue;
                        }
                        engines.submit_hash(jobs, done)
                    }
                    None => engines.flush_hash(jobs, idx),
                };
                if let Some(done) = surfaced {
                    if jobs[done].chain_order == ChainOrder::HashCipher && !stop_piping(jobs, done)
                    {
                        engines.submit_cipher_dec(jobs, done);
                    }
                }
            }
            ChainOrder::HashCipher => {
                match engines.flush_hash(jobs, idx) {
                    Some(done) => {
                        if jobs[done].chain_order == ChainOrder::HashCipher
                            && !stop_piping(jobs, done)
                        {
                            engines.submit_cipher_dec(jobs, done);
                        }
                    }
                    None => {
                        engines.flush_cipher_dec(jobs, idx);
                    }
                }
            }
        }
    }
}
