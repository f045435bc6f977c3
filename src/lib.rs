pub mod align;
pub mod audio;
pub mod config;
pub mod engines;
pub mod error;
pub mod job;
pub mod queue;
pub mod staging;
pub mod subtitle;
pub mod task;
pub mod worker;

pub use config::Config;
pub use error::{Result, VoxpipeError};
pub use job::{Job, JobStatus};
pub use queue::{JobQueue, JobRegistry};
pub use task::Orchestrator;
pub use worker::WorkerPool;
