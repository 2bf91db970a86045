//! Background jobs.
//!
//! Both jobs are plain async functions over a `JobContext`; scheduling,
//! timing and shutdown live in `services::job_scheduler_service`.
//!
//! - `price_fetch_job` - appends one mid-price observation per tracked coin
//! - `retention_job` - soft-deletes observations older than the retention window

pub mod price_fetch_job;
pub mod retention_job;
