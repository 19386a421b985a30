//! Job Coordinator and Worker Pool (`spec.md` §4.D, §4.E) — the subsystem
//! that turns a cache-warm request into claimed, executed `JobItem`s.
//!
//! Scoped to the one concrete job kind this crate has (cache-warm); unlike
//! the teacher's pluggable multi-job-kind registry, there is no generic
//! dispatch layer here (see `DESIGN.md`).

pub mod coordinator;
pub mod error;
pub mod rollup;
pub mod worker_pool;

pub use coordinator::{JobCoordinator, ProfileRef};
pub use error::{JobError, JobResult};
pub use worker_pool::{PoolConfig, WorkerPool};
