use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use voxpipe::config::Config;
use voxpipe::engines::{DiarizationClient, OllamaClient, RecognitionClient, SpeakerBounds};
use voxpipe::job::JobStatus;
use voxpipe::queue::JobQueue;
use voxpipe::staging::StagingDirs;
use voxpipe::task::Orchestrator;
use voxpipe::worker::WorkerPool;

/// Fallback prompt when the config directory has no default_prompt.txt.
const DEFAULT_PROMPT: &str = "{dictionary_section}Summarize the following conversation transcript in a few concise paragraphs.\n\nTranscript:\n{transcript_text}\n";

#[derive(Parser)]
#[command(name = "voxpipe")]
#[command(version, about = "Audio transcription and summarization worker")]
#[command(
    long_about = "Processes WAV files from the input staging directory: transcribes them, labels speakers on stereo recordings, writes SRT and summary artifacts, and relocates sources to processed/ or error/."
)]
struct Cli {
    /// Path to the config file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of workers (overrides the config file)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn load_prompt_files(config_dir: &std::path::Path) -> (String, Option<String>) {
    let prompt = std::fs::read_to_string(config_dir.join("default_prompt.txt"))
        .unwrap_or_else(|_| DEFAULT_PROMPT.to_string());
    let glossary = std::fs::read_to_string(config_dir.join("dictionary.txt")).ok();
    (prompt, glossary)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = match cli.config {
        Some(path) => Config::load_from(Some(path)).context("Failed to load configuration")?,
        None => Config::load().context("Failed to load configuration")?,
    };
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    config.validate().context("Configuration validation failed")?;

    let staging = StagingDirs::new(&config.dirs);
    staging.ensure().context("Failed to create staging directories")?;

    info!("Input dir:  {}", staging.input.display());
    info!("Output dir: {}", staging.output.display());
    info!("Workers:    {}", config.workers);

    let recognizer = Arc::new(RecognitionClient::new(
        config.engines.recognition_url.clone(),
        config.engines.recognition_model.clone(),
    ));
    let diarizer = Arc::new(DiarizationClient::new(
        config.engines.diarization_url.clone(),
        config.engines.diarization_token.clone(),
    ));
    let summarizer = Arc::new(OllamaClient::new(
        config.engines.ollama_url.clone(),
        config.engines.ollama_model.clone(),
        Duration::from_secs(config.engines.ollama_timeout_secs),
    ));

    if !summarizer.check_health().await {
        warn!(
            "Ollama server not reachable at {}; summarization will fail",
            config.engines.ollama_url
        );
    }

    let (prompt_template, glossary) = load_prompt_files(&config.dirs.config);

    let orchestrator = Arc::new(Orchestrator::new(
        staging.clone(),
        recognizer,
        diarizer,
        summarizer,
        config.language.clone(),
        SpeakerBounds::Range {
            min: config.min_speakers,
            max: config.max_speakers,
        },
        prompt_template,
        glossary,
    ));

    let (queue, receiver) = JobQueue::new(staging.clone());
    let registry = queue.registry();

    // Everything already waiting in the input directory becomes a job.
    let mut submitted = 0usize;
    let mut entries = tokio::fs::read_dir(&staging.input)
        .await
        .context("Failed to read input directory")?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_wav = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
        if !is_wav {
            continue;
        }
        match queue.submit(&path).await {
            Ok(id) => {
                info!("Queued {} as {}", path.display(), id);
                submitted += 1;
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    if submitted == 0 {
        info!("No WAV files in the input directory, nothing to do");
        return Ok(());
    }

    // Closing the queue lets workers drain and exit.
    queue.close();

    let pool = WorkerPool::new(
        orchestrator,
        registry.clone(),
        Duration::from_secs(config.soft_time_limit_secs),
        Duration::from_secs(config.hard_time_limit_secs),
    );
    pool.run(receiver, config.workers).await;

    let jobs = registry.snapshot().await;
    let completed = jobs.iter().filter(|j| j.status == JobStatus::Completed).count();
    let failed = jobs.iter().filter(|j| j.status == JobStatus::Failed).count();
    info!("Done: {} completed, {} failed", completed, failed);

    for job in jobs.iter().filter(|j| j.status == JobStatus::Failed) {
        warn!(
            "Failed: {} ({})",
            job.source.display(),
            job.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}
