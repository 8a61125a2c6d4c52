//! Live progress events for subscribers that do not want to poll the job record.

pub mod job_progress;

pub use job_progress::{JobProgressBroadcaster, JobProgressEvent};
