use std::time::Duration;

use dispatchr_common::error::{CloseError, CommandError, OpenError};

use crate::executor::ExecutionOutcome;

/// Terminal state of one host-task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostStatus {
    /// Every planned command succeeded.
    Succeeded,
    /// A command failed and the remaining ones were not attempted.
    Partial(CommandError),
    /// The host never got a session.
    OpenFailed(OpenError),
    /// The run was cancelled before this host finished.
    Cancelled,
    /// The host-task panicked or could not be started.
    Crashed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostReport {
    pub host: String,
    pub status: HostStatus,
    pub planned: usize,
    pub completed: usize,
    /// Reported alongside the status, never folded into it.
    pub close_error: Option<CloseError>,
}

impl HostReport {
    pub fn new(host: impl Into<String>, planned: usize, status: HostStatus) -> Self {
        Self {
            host: host.into(),
            status,
            planned,
            completed: 0,
            close_error: None,
        }
    }

    pub fn open_failed(host: impl Into<String>, planned: usize, error: OpenError) -> Self {
        let status = match error {
            OpenError::Cancelled => HostStatus::Cancelled,
            error => HostStatus::OpenFailed(error),
        };
        Self::new(host, planned, status)
    }

    pub fn from_execution(
        host: impl Into<String>,
        planned: usize,
        outcome: ExecutionOutcome,
        close_error: Option<CloseError>,
    ) -> Self {
        let status = match outcome.failure {
            None => HostStatus::Succeeded,
            Some(CommandError::Cancelled) => HostStatus::Cancelled,
            Some(error) => HostStatus::Partial(error),
        };

        Self {
            host: host.into(),
            status,
            planned,
            completed: outcome.completed,
            close_error,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.status == HostStatus::Succeeded && self.close_error.is_none()
    }
}

/// Aggregated result of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Sorted by host name.
    pub hosts: Vec<HostReport>,
    pub skipped: Vec<String>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn new(mut hosts: Vec<HostReport>, skipped: Vec<String>, elapsed: Duration) -> Self {
        hosts.sort_by(|a, b| a.host.cmp(&b.host));
        Self {
            hosts,
            skipped,
            elapsed,
        }
    }

    pub fn report(&self, host: &str) -> Option<&HostReport> {
        self.hosts.iter().find(|report| report.host == host)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &HostReport> {
        self.hosts
            .iter()
            .filter(|r| matches!(r.status, HostStatus::Succeeded))
    }

    pub fn partial(&self) -> impl Iterator<Item = &HostReport> {
        self.hosts
            .iter()
            .filter(|r| matches!(r.status, HostStatus::Partial(_)))
    }

    pub fn open_failed(&self) -> impl Iterator<Item = &HostReport> {
        self.hosts
            .iter()
            .filter(|r| matches!(r.status, HostStatus::OpenFailed(_)))
    }

    pub fn cancelled(&self) -> impl Iterator<Item = &HostReport> {
        self.hosts
            .iter()
            .filter(|r| matches!(r.status, HostStatus::Cancelled))
    }

    pub fn crashed(&self) -> impl Iterator<Item = &HostReport> {
        self.hosts
            .iter()
            .filter(|r| matches!(r.status, HostStatus::Crashed(_)))
    }

    pub fn close_failures(&self) -> impl Iterator<Item = &HostReport> {
        self.hosts.iter().filter(|r| r.close_error.is_some())
    }

    pub fn commands_completed(&self) -> usize {
        self.hosts.iter().map(|r| r.completed).sum()
    }

    /// Drives the exit status of the CLI.
    pub fn has_errors(&self) -> bool {
        self.hosts.iter().any(|report| !report.is_clean())
    }
}
