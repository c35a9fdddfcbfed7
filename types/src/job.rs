mod status;

pub use status::{BackendStatus, JobStatus};

use chrono::{DateTime, Utc};

/// Identifier the backend assigns to a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of user input a job carries: "text" or "audio"
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Text,
    Audio,
}

/// A job tracked from submission until it reaches a terminal status.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    id: JobId,
    submitted_at: DateTime<Utc>,
    kind: JobKind,
    status: JobStatus,
}

impl Job {
    pub fn new(id: JobId, kind: JobKind) -> Self {
        Self {
            id,
            submitted_at: Utc::now(),
            kind,
            status: JobStatus::Queued,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Moves the job to `next`. Returns false, leaving the status untouched,
    /// when the job is already terminal or `next` would move it backwards.
    pub fn advance(&mut self, next: JobStatus) -> bool {
        if self.status.is_terminal() || next.rank() < self.status.rank() {
            return false;
        }
        self.status = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_queued() {
        let job = Job::new(JobId::new("job-1"), JobKind::Text);
        assert_eq!(job.status(), JobStatus::Queued);
        assert_eq!(job.id().as_str(), "job-1");
        assert_eq!(job.kind(), JobKind::Text);
    }

    #[test]
    fn advance_is_monotonic() {
        let mut job = Job::new(JobId::new("job-1"), JobKind::Audio);
        assert!(job.advance(JobStatus::Processing));
        assert!(!job.advance(JobStatus::Queued));
        assert_eq!(job.status(), JobStatus::Processing);

        assert!(job.advance(JobStatus::Completed));
        assert!(!job.advance(JobStatus::Failed));
        assert!(!job.advance(JobStatus::Processing));
        assert_eq!(job.status(), JobStatus::Completed);
    }

    #[test]
    fn queued_may_jump_straight_to_terminal() {
        let mut job = Job::new(JobId::new("job-2"), JobKind::Text);
        assert!(job.advance(JobStatus::TimedOut));
        assert!(job.status().is_terminal());
    }

    #[test]
    fn job_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&JobKind::Audio).unwrap(), r#""audio""#);
        assert_eq!(serde_json::to_string(&JobKind::Text).unwrap(), r#""text""#);
    }
}
