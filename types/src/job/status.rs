use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::str::FromStr;

/// Client-side view of a job's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    /// The poll budget ran out before the backend reported a terminal status.
    TimedOut,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::TimedOut)
    }

    pub(crate) fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Processing => 1,
            JobStatus::Completed | JobStatus::Failed | JobStatus::TimedOut => 2,
        }
    }
}

/// Status string reported by the backend's status endpoint.
///
/// Strings this client does not know are kept verbatim in `Unknown` instead of
/// failing deserialization.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendStatus {
    InQueue,
    Processing,
    Completed,
    Failed,
    Unknown(String),
}

impl BackendStatus {
    /// The matching client status, or `None` for strings this client does not
    /// recognise.
    pub fn job_status(&self) -> Option<JobStatus> {
        match self {
            BackendStatus::InQueue => Some(JobStatus::Queued),
            BackendStatus::Processing => Some(JobStatus::Processing),
            BackendStatus::Completed => Some(JobStatus::Completed),
            BackendStatus::Failed => Some(JobStatus::Failed),
            BackendStatus::Unknown(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BackendStatus::InQueue => "IN_QUEUE",
            BackendStatus::Processing => "PROCESSING",
            BackendStatus::Completed => "COMPLETED",
            BackendStatus::Failed => "FAILED",
            BackendStatus::Unknown(s) => s,
        }
    }
}

impl Serialize for BackendStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for BackendStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "IN_QUEUE" | "PENDING" => BackendStatus::InQueue,
            "PROCESSING" | "IN_PROGRESS" => BackendStatus::Processing,
            "COMPLETED" => BackendStatus::Completed,
            "FAILED" => BackendStatus::Failed,
            _ => BackendStatus::Unknown(s.to_string()),
        })
    }
}

impl<'de> Deserialize<'de> for BackendStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(BackendStatus::from_str(&s).unwrap_or_else(|never| match never {}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize() {
        let status: BackendStatus = serde_json::from_str(r#""IN_QUEUE""#).unwrap();
        assert_eq!(status, BackendStatus::InQueue);
        let status: BackendStatus = serde_json::from_str(r#""PENDING""#).unwrap();
        assert_eq!(status, BackendStatus::InQueue);
        let status: BackendStatus = serde_json::from_str(r#""FAILED""#).unwrap();
        assert_eq!(status, BackendStatus::Failed);

        let status: BackendStatus = serde_json::from_str(r#""WARMING_UP""#).unwrap();
        assert_eq!(status, BackendStatus::Unknown("WARMING_UP".to_string()));
        assert_eq!(status.job_status(), None);
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&BackendStatus::Completed).unwrap();
        assert_eq!(json, r#""COMPLETED""#);
        let json = serde_json::to_string(&BackendStatus::Unknown("CANCELLED".into())).unwrap();
        assert_eq!(json, r#""CANCELLED""#);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::TimedOut.is_terminal());
    }
}
