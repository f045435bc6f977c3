use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a job. Transitions are monotonic and one-directional;
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Coarse progress indicator for the polling boundary.
    pub fn progress(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::InProgress => 50,
            JobStatus::Completed => 100,
            JobStatus::Failed => 100,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::InProgress => write!(f, "in_progress"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One end-to-end request to transcribe and summarize a single audio file.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub source: PathBuf,
    pub status: JobStatus,
    pub created_at: SystemTime,
    pub completed_at: Option<SystemTime>,
    pub error: Option<String>,
}

impl Job {
    pub fn new(id: String, source: PathBuf) -> Self {
        Self {
            id,
            source,
            status: JobStatus::Pending,
            created_at: SystemTime::now(),
            completed_at: None,
            error: None,
        }
    }

    /// Apply a status transition. Terminal states absorb: once completed or
    /// failed the job never changes again, and illegal forward jumps are
    /// ignored the same way.
    pub fn transition(&mut self, next: JobStatus) -> bool {
        let allowed = match (self.status, next) {
            (JobStatus::Pending, JobStatus::InProgress) => true,
            (JobStatus::InProgress, JobStatus::Completed) => true,
            (JobStatus::InProgress, JobStatus::Failed) => true,
            // A job can fail before a worker picks it up (e.g. queue shutdown).
            (JobStatus::Pending, JobStatus::Failed) => true,
            _ => false,
        };

        if allowed {
            self.status = next;
            if next.is_terminal() {
                self.completed_at = Some(SystemTime::now());
            }
        }
        allowed
    }

    pub fn fail(&mut self, error: String) {
        self.error = Some(error);
        self.transition(JobStatus::Failed);
    }
}
