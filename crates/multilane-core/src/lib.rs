//! # multilane-core
//!
//! A multi-buffer symmetric cryptography job manager. Callers fill job
//! descriptors in a fixed ring of slots and submit them; per-algorithm
//! out-of-order lane engines batch several in-flight jobs and advance all
//! lanes by the minimum remaining length each round. Completed jobs are
//! always handed back in submission order.
//!
//! The usual cycle is `get_next_job` → fill the slot → `submit_job`,
//! with `flush_job` to force out stragglers once no more input is coming:
//!
//! ```
//! use multilane_core::{CipherDirection, CipherMode, ChainOrder, HashAlg, JobManager};
//!
//! let mut mgr = JobManager::new();
//! let job = mgr.get_next_job();
//! job.reset();
//! job.cipher_mode = CipherMode::Cbc;
//! job.hash_alg = HashAlg::NullHash;
//! job.chain_order = ChainOrder::CipherHash;
//! job.cipher_direction = CipherDirection::Encrypt;
//! job.cipher_key = vec![0u8; 16];
//! job.iv = vec![0u8; 16];
//! job.src = vec![0u8; 16];
//! job.dst = vec![0u8; 16];
//! job.msg_len_to_cipher = 16;
//!
//! let returned = mgr.submit_job();
//! assert!(returned.is_none());
//! let done = mgr.flush_job().expect("one job in flight");
//! assert!(done.status.is_complete());
//! ```

#![deny(unsafe_code)]

pub mod config;
mod dispatch;
mod engine;
pub mod job;
pub mod manager;
pub mod validate;

pub use config::{ConfigError, MgrConfig};
pub use job::{
    ChainOrder, CipherDirection, CipherMode, CustomOpError, CustomOpFn, HashAlg, Job, JobStatus,
};
pub use manager::{JobManager, MgrStats};
pub use validate::ValidationError;
