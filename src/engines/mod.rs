pub mod diarization;
pub mod recognition;
pub mod summarize;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

pub use diarization::DiarizationClient;
pub use recognition::RecognitionClient;
pub use summarize::OllamaClient;

/// One interval of transcribed speech from the recognition engine.
/// Offsets are wall-clock durations from file start at millisecond
/// resolution; output order is chronological and never re-sorted.
#[derive(Debug, Clone)]
pub struct RecognitionSegment {
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

/// One speaker turn from the diarization engine, in engine-native order.
/// Intervals may be non-contiguous and are not assumed non-overlapping.
#[derive(Debug, Clone)]
pub struct DiarizationSegment {
    pub start_secs: f64,
    pub end_secs: f64,
    pub speaker: String,
}

/// Speaker count hint for the diarization engine: either an exact count or
/// a min/max range.
#[derive(Debug, Clone, Copy)]
pub enum SpeakerBounds {
    Exact(u32),
    Range { min: u32, max: u32 },
}

/// Speech-recognition engine boundary.
///
/// Engines hold accelerator-resident models: `acquire` loads lazily,
/// `release` frees the resources. The orchestrator guarantees `release`
/// runs at stage end on both success and failure paths.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn acquire(&self) -> Result<()>;
    async fn transcribe(&self, audio: &Path, language: &str) -> Result<Vec<RecognitionSegment>>;
    async fn release(&self);
    fn name(&self) -> &'static str;
}

/// Speaker-diarization engine boundary. `acquire` fails with a
/// configuration error when the required access credential is missing.
#[async_trait]
pub trait Diarizer: Send + Sync {
    async fn acquire(&self) -> Result<()>;
    async fn diarize(&self, audio: &Path, bounds: SpeakerBounds) -> Result<Vec<DiarizationSegment>>;
    async fn release(&self);
    fn name(&self) -> &'static str;
}

/// Text-summarization engine boundary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        transcript: &str,
        prompt_template: &str,
        glossary: Option<&str>,
    ) -> Result<String>;
    fn name(&self) -> &'static str;
}
