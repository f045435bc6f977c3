//! End-to-end pipeline tests with mock engines.
//!
//! These exercise the worker pool, the orchestrator state machine, the
//! mono/stereo branch logic and the staging moves without any external
//! services.

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use voxpipe::engines::{
    DiarizationSegment, Diarizer, RecognitionSegment, SpeakerBounds, SpeechRecognizer, Summarizer,
};
use voxpipe::error::{Result, VoxpipeError};
use voxpipe::job::JobStatus;
use voxpipe::queue::JobQueue;
use voxpipe::staging::StagingDirs;
use voxpipe::subtitle::srt::parse_timestamp;
use voxpipe::task::Orchestrator;
use voxpipe::worker::WorkerPool;

const PROMPT: &str = "{dictionary_section}Summarize:\n{transcript_text}";

// ============================================================================
// Test fixtures
// ============================================================================

/// Shared event log asserting engine lifecycle ordering.
type EventLog = Arc<Mutex<Vec<String>>>;

struct MockRecognizer {
    segments: Vec<RecognitionSegment>,
    fail: bool,
    delay: Option<Duration>,
    acquires: AtomicUsize,
    releases: AtomicUsize,
    events: EventLog,
}

impl MockRecognizer {
    fn new(segments: Vec<RecognitionSegment>, events: EventLog) -> Self {
        Self {
            segments,
            fail: false,
            delay: None,
            acquires: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            events,
        }
    }

    fn failing(events: EventLog) -> Self {
        let mut m = Self::new(Vec::new(), events);
        m.fail = true;
        m
    }
}

#[async_trait]
impl SpeechRecognizer for MockRecognizer {
    async fn acquire(&self) -> Result<()> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push("rec.acquire".into());
        Ok(())
    }

    async fn transcribe(&self, _audio: &Path, _language: &str) -> Result<Vec<RecognitionSegment>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(VoxpipeError::Transcription("mock engine failure".into()));
        }
        Ok(self.segments.clone())
    }

    async fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push("rec.release".into());
    }

    fn name(&self) -> &'static str {
        "mock-recognizer"
    }
}

struct MockDiarizer {
    segments: Vec<DiarizationSegment>,
    events: EventLog,
}

#[async_trait]
impl Diarizer for MockDiarizer {
    async fn acquire(&self) -> Result<()> {
        self.events.lock().unwrap().push("dia.acquire".into());
        Ok(())
    }

    async fn diarize(&self, _audio: &Path, _bounds: SpeakerBounds) -> Result<Vec<DiarizationSegment>> {
        Ok(self.segments.clone())
    }

    async fn release(&self) {
        self.events.lock().unwrap().push("dia.release".into());
    }

    fn name(&self) -> &'static str {
        "mock-diarizer"
    }
}

struct MockSummarizer;

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(
        &self,
        transcript: &str,
        _prompt_template: &str,
        _glossary: Option<&str>,
    ) -> Result<String> {
        Ok(format!("SUMMARY({} chars)", transcript.len()))
    }

    fn name(&self) -> &'static str {
        "mock-summarizer"
    }
}

fn staging_dirs(tmp: &TempDir) -> StagingDirs {
    let dirs = StagingDirs {
        input: tmp.path().join("input"),
        processed: tmp.path().join("processed"),
        error: tmp.path().join("error"),
        output: tmp.path().join("output"),
    };
    dirs.ensure().unwrap();
    dirs
}

fn write_wav(dir: &Path, name: &str, channels: u16) -> PathBuf {
    let spec = WavSpec {
        channels,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let path = dir.join(name);
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for _ in 0..(1600 * channels as usize) {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
    path
}

fn rseg(start: &str, end: &str, text: &str) -> RecognitionSegment {
    RecognitionSegment {
        start: parse_timestamp(start).unwrap(),
        end: parse_timestamp(end).unwrap(),
        text: text.to_string(),
    }
}

fn dseg(start: f64, end: f64, speaker: &str) -> DiarizationSegment {
    DiarizationSegment {
        start_secs: start,
        end_secs: end,
        speaker: speaker.to_string(),
    }
}

fn orchestrator(
    dirs: &StagingDirs,
    recognizer: MockRecognizer,
    diarizer: MockDiarizer,
) -> Arc<Orchestrator> {
    Arc::new(Orchestrator::new(
        dirs.clone(),
        Arc::new(recognizer),
        Arc::new(diarizer),
        Arc::new(MockSummarizer),
        "ko".to_string(),
        SpeakerBounds::Range { min: 1, max: 3 },
        PROMPT.to_string(),
        None,
    ))
}

async fn run_jobs(dirs: &StagingDirs, orch: Arc<Orchestrator>, paths: &[PathBuf]) -> JobQueue {
    run_jobs_with_limits(
        dirs,
        orch,
        paths,
        Duration::from_secs(60),
        Duration::from_secs(90),
    )
    .await
}

async fn run_jobs_with_limits(
    dirs: &StagingDirs,
    orch: Arc<Orchestrator>,
    paths: &[PathBuf],
    soft: Duration,
    hard: Duration,
) -> JobQueue {
    let (queue, receiver) = JobQueue::new(dirs.clone());
    for path in paths {
        queue.submit(path).await.unwrap();
    }
    queue.close();
    let pool = WorkerPool::new(orch, queue.registry(), soft, hard);
    pool.run(receiver, 1).await;
    queue
}

async fn job_status(queue: &JobQueue, path: &Path) -> JobStatus {
    let snapshot = queue.registry().snapshot().await;
    snapshot
        .iter()
        .find(|j| j.source == path)
        .map(|j| j.status)
        .expect("job not found")
}

// ============================================================================
// Mono path
// ============================================================================

#[tokio::test]
async fn test_mono_job_completes_with_artifacts() {
    let tmp = TempDir::new().unwrap();
    let dirs = staging_dirs(&tmp);
    let src = write_wav(&dirs.input, "call.wav", 1);

    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let recognizer = MockRecognizer::new(
        vec![
            rseg("00:00:00,000", "00:00:02,000", "hello"),
            rseg("00:00:02,000", "00:00:04,000", "world"),
        ],
        events.clone(),
    );
    let diarizer = MockDiarizer {
        segments: Vec::new(),
        events: events.clone(),
    };

    let orch = orchestrator(&dirs, recognizer, diarizer);
    let queue = run_jobs(&dirs, orch, &[src.clone()]).await;

    assert_eq!(job_status(&queue, &src).await, JobStatus::Completed);

    // Artifacts written, source promoted
    let (srt, summary) = dirs.read_artifacts("call").unwrap();
    assert!(srt.contains("1\n00:00:00,000 --> 00:00:02,000\nhello"));
    assert!(!srt.contains('['), "mono output must carry no speaker labels");
    assert!(summary.starts_with("SUMMARY("));
    assert!(!src.exists());
    assert!(dirs.processed.join("call.wav").exists());

    // Diarizer never touched on the mono branch
    let log = events.lock().unwrap();
    assert!(!log.iter().any(|e| e.starts_with("dia.")));
    assert_eq!(
        log.as_slice(),
        ["rec.acquire".to_string(), "rec.release".to_string()]
    );
}

#[tokio::test]
async fn test_fetch_returns_artifacts_once_completed() {
    let tmp = TempDir::new().unwrap();
    let dirs = staging_dirs(&tmp);
    let src = write_wav(&dirs.input, "poll.wav", 1);

    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let recognizer = MockRecognizer::new(
        vec![rseg("00:00:00,000", "00:00:01,000", "hi")],
        events.clone(),
    );
    let diarizer = MockDiarizer {
        segments: Vec::new(),
        events,
    };
    let orch = orchestrator(&dirs, recognizer, diarizer);

    let (queue, receiver) = JobQueue::new(dirs.clone());
    let id = queue.submit(&src).await.unwrap();
    queue.close();
    let pool = WorkerPool::new(
        orch,
        queue.registry(),
        Duration::from_secs(60),
        Duration::from_secs(90),
    );
    pool.run(receiver, 1).await;

    let (status, progress) = queue.poll(&id).await.unwrap();
    assert_eq!(status, JobStatus::Completed);
    assert_eq!(progress, 100);

    let (srt, summary) = queue.fetch(&id).await.unwrap();
    assert!(srt.contains("hi"));
    assert!(!summary.is_empty());
}

// ============================================================================
// Stereo path
// ============================================================================

#[tokio::test]
async fn test_stereo_job_labels_speakers() {
    let tmp = TempDir::new().unwrap();
    let dirs = staging_dirs(&tmp);
    let src = write_wav(&dirs.input, "meeting.wav", 2);

    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let recognizer = MockRecognizer::new(
        vec![
            rseg("00:00:02,000", "00:00:04,000", "hello"),
            rseg("00:00:07,000", "00:00:08,000", "goodbye"),
            rseg("00:00:20,000", "00:00:22,000", "anyone there"),
        ],
        events.clone(),
    );
    let diarizer = MockDiarizer {
        segments: vec![dseg(0.0, 5.0, "SPEAKER_00"), dseg(6.0, 10.0, "SPEAKER_01")],
        events: events.clone(),
    };

    let orch = orchestrator(&dirs, recognizer, diarizer);
    let queue = run_jobs(&dirs, orch, &[src.clone()]).await;

    assert_eq!(job_status(&queue, &src).await, JobStatus::Completed);

    let (srt, _summary) = dirs.read_artifacts("meeting").unwrap();
    assert!(srt.contains("[SPEAKER_00] hello"));
    assert!(srt.contains("[SPEAKER_01] goodbye"));
    assert!(srt.contains("[UNKNOWN] anyone there"));

    // Diarizer released before the recognizer is acquired
    let log = events.lock().unwrap();
    assert_eq!(
        log.as_slice(),
        [
            "dia.acquire".to_string(),
            "dia.release".to_string(),
            "rec.acquire".to_string(),
            "rec.release".to_string(),
        ]
    );
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn test_recognition_failure_routes_to_error_dir() {
    let tmp = TempDir::new().unwrap();
    let dirs = staging_dirs(&tmp);
    let src = write_wav(&dirs.input, "broken.wav", 1);

    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let recognizer = MockRecognizer::failing(events.clone());
    let diarizer = MockDiarizer {
        segments: Vec::new(),
        events: events.clone(),
    };

    let orch = orchestrator(&dirs, recognizer, diarizer);
    let queue = run_jobs(&dirs, orch, &[src.clone()]).await;

    assert_eq!(job_status(&queue, &src).await, JobStatus::Failed);

    // Diagnostic exists, source relocated out of input
    let diagnostic = std::fs::read_to_string(dirs.error.join("broken_error.log")).unwrap();
    assert!(diagnostic.contains("Error category: TranscriptionError"));
    assert!(diagnostic.contains("mock engine failure"));
    assert!(!src.exists());
    assert!(dirs.error.join("broken.wav").exists());

    // Engine released even on the failure path
    let log = events.lock().unwrap();
    assert_eq!(
        log.as_slice(),
        ["rec.acquire".to_string(), "rec.release".to_string()]
    );
}

#[tokio::test]
async fn test_unsupported_channel_count_fails() {
    let tmp = TempDir::new().unwrap();
    let dirs = staging_dirs(&tmp);
    let src = write_wav(&dirs.input, "surround.wav", 3);

    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let recognizer = MockRecognizer::new(Vec::new(), events.clone());
    let diarizer = MockDiarizer {
        segments: Vec::new(),
        events: events.clone(),
    };

    let orch = orchestrator(&dirs, recognizer, diarizer);
    let queue = run_jobs(&dirs, orch, &[src.clone()]).await;

    assert_eq!(job_status(&queue, &src).await, JobStatus::Failed);

    let diagnostic = std::fs::read_to_string(dirs.error.join("surround_error.log")).unwrap();
    assert!(diagnostic.contains("UnsupportedFormatError"));
    assert!(dirs.error.join("surround.wav").exists());

    // Neither engine was ever acquired
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_hard_timeout_fails_job_with_timeout_category() {
    let tmp = TempDir::new().unwrap();
    let dirs = staging_dirs(&tmp);
    let src = write_wav(&dirs.input, "slow.wav", 1);

    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let mut recognizer = MockRecognizer::new(
        vec![rseg("00:00:00,000", "00:00:01,000", "too late")],
        events.clone(),
    );
    recognizer.delay = Some(Duration::from_secs(5));
    let diarizer = MockDiarizer {
        segments: Vec::new(),
        events,
    };

    let orch = orchestrator(&dirs, recognizer, diarizer);
    let queue = run_jobs_with_limits(
        &dirs,
        orch,
        &[src.clone()],
        Duration::from_millis(100),
        Duration::from_millis(200),
    )
    .await;

    assert_eq!(job_status(&queue, &src).await, JobStatus::Failed);

    let diagnostic = std::fs::read_to_string(dirs.error.join("slow_error.log")).unwrap();
    assert!(diagnostic.contains("TimeoutError"));
    // Best-effort relocation still moved the file
    assert!(dirs.error.join("slow.wav").exists());
}

#[tokio::test]
async fn test_soft_limit_aborts_between_stages() {
    let tmp = TempDir::new().unwrap();
    let dirs = staging_dirs(&tmp);
    let src = write_wav(&dirs.input, "sluggish.wav", 1);

    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let mut recognizer = MockRecognizer::new(
        vec![rseg("00:00:00,000", "00:00:01,000", "late")],
        events.clone(),
    );
    // Longer than the soft limit but well within the hard limit, so the
    // abort flag is what fails the job.
    recognizer.delay = Some(Duration::from_millis(300));
    let diarizer = MockDiarizer {
        segments: Vec::new(),
        events: events.clone(),
    };

    let orch = orchestrator(&dirs, recognizer, diarizer);
    let queue = run_jobs_with_limits(
        &dirs,
        orch,
        &[src.clone()],
        Duration::from_millis(100),
        Duration::from_secs(30),
    )
    .await;

    assert_eq!(job_status(&queue, &src).await, JobStatus::Failed);

    let diagnostic = std::fs::read_to_string(dirs.error.join("sluggish_error.log")).unwrap();
    assert!(diagnostic.contains("TimeoutError"));
    assert!(diagnostic.contains("Soft time limit"));

    // Cooperative abort still ran the release step
    let log = events.lock().unwrap();
    assert_eq!(
        log.as_slice(),
        ["rec.acquire".to_string(), "rec.release".to_string()]
    );
}

// ============================================================================
// Multi-job runs
// ============================================================================

#[tokio::test]
async fn test_pool_drains_mixed_batch() {
    let tmp = TempDir::new().unwrap();
    let dirs = staging_dirs(&tmp);
    let good = write_wav(&dirs.input, "good.wav", 1);
    let bad = write_wav(&dirs.input, "bad.wav", 3);

    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let recognizer = MockRecognizer::new(
        vec![rseg("00:00:00,000", "00:00:01,000", "fine")],
        events.clone(),
    );
    let diarizer = MockDiarizer {
        segments: Vec::new(),
        events,
    };

    let orch = orchestrator(&dirs, recognizer, diarizer);
    let queue = run_jobs(&dirs, orch, &[good.clone(), bad.clone()]).await;

    assert!(queue.registry().all_terminal().await);
    assert_eq!(job_status(&queue, &good).await, JobStatus::Completed);
    assert_eq!(job_status(&queue, &bad).await, JobStatus::Failed);
    assert!(dirs.processed.join("good.wav").exists());
    assert!(dirs.error.join("bad.wav").exists());
}

#[tokio::test]
async fn test_resubmission_overwrites_artifacts() {
    let tmp = TempDir::new().unwrap();
    let dirs = staging_dirs(&tmp);

    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let recognizer = MockRecognizer::new(
        vec![rseg("00:00:00,000", "00:00:01,000", "take two")],
        events.clone(),
    );
    let diarizer = MockDiarizer {
        segments: Vec::new(),
        events,
    };
    let orch = orchestrator(&dirs, recognizer, diarizer);

    // First run's artifacts are already on disk
    dirs.write_artifacts("repeat", "stale srt", "stale summary").unwrap();

    let src = write_wav(&dirs.input, "repeat.wav", 1);
    let queue = run_jobs(&dirs, orch, &[src.clone()]).await;

    assert_eq!(job_status(&queue, &src).await, JobStatus::Completed);
    let (srt, summary) = dirs.read_artifacts("repeat").unwrap();
    assert!(srt.contains("take two"));
    assert!(!summary.contains("stale"));
}
