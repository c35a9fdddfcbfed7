pub mod api;
pub mod audio;
pub mod job;
mod content;

pub use api::{JobInput, StatusResponse, SubmitRequest, SubmitResponse};
pub use content::message::*;
pub use job::{BackendStatus, Job, JobId, JobKind, JobStatus};
