use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, RwLock};
use tracing::info;

use crate::error::{Result, VoxpipeError};
use crate::job::{Job, JobStatus};
use crate::staging::{self, StagingDirs};

/// Shared view of every submitted job's state. Workers record transitions
/// here; the submission boundary reads from it.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
}

impl JobRegistry {
    pub async fn insert(&self, job: Job) {
        self.jobs.write().await.insert(job.id.clone(), job);
    }

    pub async fn get(&self, id: &str) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Record a status transition; illegal transitions are dropped by the
    /// job's own monotonic rule.
    pub async fn transition(&self, id: &str, next: JobStatus) {
        if let Some(job) = self.jobs.write().await.get_mut(id) {
            job.transition(next);
        }
    }

    pub async fn fail(&self, id: &str, error: String) {
        if let Some(job) = self.jobs.write().await.get_mut(id) {
            job.fail(error);
        }
    }

    pub async fn all_terminal(&self) -> bool {
        self.jobs.read().await.values().all(|j| j.status.is_terminal())
    }

    pub async fn snapshot(&self) -> Vec<Job> {
        self.jobs.read().await.values().cloned().collect()
    }
}

/// Submission boundary for the pipeline, consumed by the HTTP façade.
/// Delivery to workers goes over an in-process channel; at-least-once
/// semantics are the channel's only guarantee.
pub struct JobQueue {
    sender: std::sync::Mutex<Option<mpsc::UnboundedSender<Job>>>,
    registry: JobRegistry,
    staging: StagingDirs,
    counter: AtomicU64,
}

impl JobQueue {
    pub fn new(staging: StagingDirs) -> (Self, mpsc::UnboundedReceiver<Job>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: std::sync::Mutex::new(Some(sender)),
                registry: JobRegistry::default(),
                staging,
                counter: AtomicU64::new(0),
            },
            receiver,
        )
    }

    pub fn registry(&self) -> JobRegistry {
        self.registry.clone()
    }

    /// Stop accepting submissions and let the workers drain.
    pub fn close(&self) {
        self.sender.lock().expect("queue lock poisoned").take();
    }

    /// Enqueue a file already present in the input directory.
    pub async fn submit(&self, path: &Path) -> Result<String> {
        self.staging.stage(path)?;

        let id = self.next_id();
        let job = Job::new(id.clone(), path.to_path_buf());
        self.registry.insert(job.clone()).await;

        let send_result = self
            .sender
            .lock()
            .expect("queue lock poisoned")
            .as_ref()
            .map(|s| s.send(job).map_err(|e| e.to_string()));
        match send_result {
            Some(Ok(())) => {}
            _ => {
                self.registry.fail(&id, "Job queue is closed".to_string()).await;
                return Err(VoxpipeError::Io(std::io::Error::other(
                    "Job queue is closed",
                )));
            }
        }

        info!("Job submitted: {} ({})", id, path.display());
        Ok(id)
    }

    /// Current status and a coarse progress indicator.
    pub async fn poll(&self, id: &str) -> Option<(JobStatus, u8)> {
        self.registry
            .get(id)
            .await
            .map(|job| (job.status, job.status.progress()))
    }

    /// Subtitle and summary content for a completed job.
    pub async fn fetch(&self, id: &str) -> Result<(String, String)> {
        let job = self.registry.get(id).await.ok_or_else(|| {
            VoxpipeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Unknown job: {id}"),
            ))
        })?;

        if job.status != JobStatus::Completed {
            return Err(VoxpipeError::Io(std::io::Error::other(format!(
                "Job {id} is not completed (status: {})",
                job.status
            ))));
        }

        self.staging.read_artifacts(&staging::base_name(&job.source))
    }

    fn next_id(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        format!("job-{seq}-{nanos:09}")
    }
}
