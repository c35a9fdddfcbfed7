#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    jobs_submitted: u64,
    status_checks: u64,
    transient_failures: u64,
}

impl Stats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_submission(&mut self) {
        self.jobs_submitted += 1;
    }

    pub(crate) fn record_status_check(&mut self) {
        self.status_checks += 1;
    }

    pub(crate) fn record_transient_failure(&mut self) {
        self.transient_failures += 1;
    }

    pub fn jobs_submitted(&self) -> u64 {
        self.jobs_submitted
    }

    pub fn status_checks(&self) -> u64 {
        self.status_checks
    }

    pub fn transient_failures(&self) -> u64 {
        self.transient_failures
    }
}
