use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{error, info, warn};

use crate::align;
use crate::audio::{self, ChannelLayout};
use crate::engines::{Diarizer, SpeakerBounds, SpeechRecognizer, Summarizer};
use crate::error::{Result, VoxpipeError};
use crate::job::Job;
use crate::staging::{self, StagingDirs};
use crate::subtitle::{srt, SubtitleEntry};

/// Drives one job from staged input file to persisted artifacts.
///
/// Engines are injected as trait objects and owned per stage: each is
/// acquired on first use and released as soon as its stage completes, on
/// the failure path too, so at most one accelerator-resident model is live
/// per worker at a time.
pub struct Orchestrator {
    staging: StagingDirs,
    recognizer: Arc<dyn SpeechRecognizer>,
    diarizer: Arc<dyn Diarizer>,
    summarizer: Arc<dyn Summarizer>,
    language: String,
    speaker_bounds: SpeakerBounds,
    prompt_template: String,
    glossary: Option<String>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        staging: StagingDirs,
        recognizer: Arc<dyn SpeechRecognizer>,
        diarizer: Arc<dyn Diarizer>,
        summarizer: Arc<dyn Summarizer>,
        language: String,
        speaker_bounds: SpeakerBounds,
        prompt_template: String,
        glossary: Option<String>,
    ) -> Self {
        Self {
            staging,
            recognizer,
            diarizer,
            summarizer,
            language,
            speaker_bounds,
            prompt_template,
            glossary,
        }
    }

    pub fn staging(&self) -> &StagingDirs {
        &self.staging
    }

    /// Run the full pipeline for one job. On success the artifacts are
    /// written and the source is promoted to the processed directory.
    /// Every error propagates unmodified; the caller settles the terminal
    /// state via [`Orchestrator::handle_failure`].
    pub async fn process(&self, job: &Job, abort: &AtomicBool) -> Result<()> {
        info!("Job started [{}]: {}", job.id, job.source.display());

        self.staging.stage(&job.source)?;
        check_abort(abort)?;

        let layout = audio::classify(&job.source)?;
        info!("Detected {} file", layout);

        let (srt_content, transcript) = match layout {
            ChannelLayout::Mono => self.process_mono(&job.source, abort).await?,
            ChannelLayout::Stereo => self.process_stereo(&job.source, abort).await?,
        };
        check_abort(abort)?;

        info!("Generating summary");
        let summary = self
            .summarizer
            .summarize(&transcript, &self.prompt_template, self.glossary.as_deref())
            .await?;

        let base = staging::base_name(&job.source);
        self.staging.write_artifacts(&base, &srt_content, &summary)?;
        self.staging.promote_to_processed(&job.source)?;

        info!("Job completed [{}]", job.id);
        Ok(())
    }

    /// Mono branch: recognition only, no speaker labels.
    async fn process_mono(&self, source: &Path, abort: &AtomicBool) -> Result<(String, String)> {
        self.recognizer.acquire().await?;
        let recognized = self.recognizer.transcribe(source, &self.language).await;
        self.recognizer.release().await;
        let recognized = recognized?;
        check_abort(abort)?;

        let entries: Vec<SubtitleEntry> = recognized
            .into_iter()
            .map(|seg| SubtitleEntry {
                start: seg.start,
                end: seg.end,
                speaker: None,
                text: seg.text,
            })
            .collect();

        let srt_content = srt::render(&entries);
        let transcript = srt::extract_text(&srt_content);
        Ok((srt_content, transcript))
    }

    /// Stereo branch: diarization, then recognition, then alignment.
    /// The diarizer is released before the recognizer is acquired.
    async fn process_stereo(&self, source: &Path, abort: &AtomicBool) -> Result<(String, String)> {
        self.diarizer.acquire().await?;
        let diarized = self.diarizer.diarize(source, self.speaker_bounds).await;
        self.diarizer.release().await;
        let diarized = diarized?;
        check_abort(abort)?;

        self.recognizer.acquire().await?;
        let recognized = self.recognizer.transcribe(source, &self.language).await;
        self.recognizer.release().await;
        let recognized = recognized?;
        check_abort(abort)?;

        let merged = align::merge(&diarized, &recognized);

        let entries: Vec<SubtitleEntry> = merged
            .into_iter()
            .map(|seg| SubtitleEntry {
                start: seg.start,
                end: seg.end,
                speaker: Some(seg.speaker),
                text: seg.text,
            })
            .collect();

        let srt_content = srt::render(&entries);
        let transcript = srt::extract_text(&srt_content);
        Ok((srt_content, transcript))
    }

    /// Settle a failed job: persist a diagnostic to the error directory and
    /// relocate the source file if it is still at its original path. Never
    /// retries and never deletes anything; a failure while recording the
    /// diagnostic is logged and does not mask the original error.
    pub async fn handle_failure(&self, job: &Job, err: &VoxpipeError) {
        error!("Job failed [{}]: {}", job.id, err);

        let base = staging::base_name(&job.source);
        let report = diagnostic_report(job, err);

        if let Err(write_err) = self.staging.write_diagnostic(&base, &report) {
            error!("Failed to write diagnostic for {}: {}", job.id, write_err);
        }

        if job.source.exists() {
            if let Err(move_err) = self.staging.promote_to_error(&job.source) {
                error!(
                    "Failed to move {} to error directory: {}",
                    job.source.display(),
                    move_err
                );
            }
        } else {
            warn!(
                "Source already gone, skipping relocation: {}",
                job.source.display()
            );
        }
    }
}

fn check_abort(abort: &AtomicBool) -> Result<()> {
    if abort.load(Ordering::Relaxed) {
        return Err(VoxpipeError::Timeout(
            "Soft time limit exceeded".to_string(),
        ));
    }
    Ok(())
}

fn diagnostic_report(job: &Job, err: &VoxpipeError) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let filename = job
        .source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    format!(
        "Job ID: {}\nFilename: {}\nTimestamp: {}\nError category: {}\nError message: {}\n",
        job.id,
        filename,
        now,
        err.category(),
        err
    )
}
