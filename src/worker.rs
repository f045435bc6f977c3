use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::error::VoxpipeError;
use crate::job::{Job, JobStatus};
use crate::queue::JobRegistry;
use crate::task::Orchestrator;

/// A pool of workers pulling jobs from a shared channel.
///
/// Each worker holds at most one job at a time: the recognition and
/// diarization engines are exclusive consumers of accelerator memory, so
/// prefetching is limited to the single in-flight job.
pub struct WorkerPool {
    orchestrator: Arc<Orchestrator>,
    registry: JobRegistry,
    soft_limit: Duration,
    hard_limit: Duration,
}

impl WorkerPool {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        registry: JobRegistry,
        soft_limit: Duration,
        hard_limit: Duration,
    ) -> Self {
        Self {
            orchestrator,
            registry,
            soft_limit,
            hard_limit,
        }
    }

    /// Run `workers` workers until the queue closes and drains.
    pub async fn run(self, receiver: mpsc::UnboundedReceiver<Job>, workers: usize) {
        let receiver = Arc::new(Mutex::new(receiver));
        let pool = Arc::new(self);

        info!("Starting {} workers", workers);

        let handles: Vec<_> = (0..workers)
            .map(|worker_id| {
                let receiver = receiver.clone();
                let pool = pool.clone();
                tokio::spawn(async move {
                    loop {
                        // Lock released before processing so other workers
                        // can dequeue while this one is busy.
                        let job = { receiver.lock().await.recv().await };
                        match job {
                            Some(job) => pool.process_one(worker_id, job).await,
                            None => {
                                debug!("Worker {} shutting down", worker_id);
                                break;
                            }
                        }
                    }
                })
            })
            .collect();

        join_all(handles).await;
        info!("All workers stopped");
    }

    async fn process_one(&self, worker_id: usize, job: Job) {
        debug!("Worker {} dequeued job {}", worker_id, job.id);
        self.registry.transition(&job.id, JobStatus::InProgress).await;

        // Soft limit: flip the abort flag, checked between pipeline stages.
        let abort = Arc::new(AtomicBool::new(false));
        let soft_timer = {
            let abort = abort.clone();
            let soft_limit = self.soft_limit;
            let job_id = job.id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(soft_limit).await;
                warn!("Soft time limit reached for job {}", job_id);
                abort.store(true, Ordering::Relaxed);
            })
        };

        // Hard limit: forcibly terminate the whole job.
        let outcome =
            tokio::time::timeout(self.hard_limit, self.orchestrator.process(&job, &abort)).await;
        soft_timer.abort();

        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(VoxpipeError::Timeout(format!(
                "Hard time limit of {}s exceeded",
                self.hard_limit.as_secs()
            ))),
        };

        match result {
            Ok(()) => {
                self.registry.transition(&job.id, JobStatus::Completed).await;
            }
            Err(err) => {
                // The error handler runs before the state is settled.
                self.orchestrator.handle_failure(&job, &err).await;
                self.registry.fail(&job.id, err.to_string()).await;
            }
        }
    }
}
