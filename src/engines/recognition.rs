use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio::fs;
use tracing::{debug, info};

use crate::engines::{RecognitionSegment, SpeechRecognizer};
use crate::error::{Result, VoxpipeError};

/// Client for an OpenAI-compatible speech-recognition service.
///
/// The service owns an accelerator-resident model; `acquire` checks the
/// service is ready and `release` asks it to free the model so the next
/// pipeline stage gets the accelerator to itself.
pub struct RecognitionClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl RecognitionClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    async fn build_form(&self, audio_path: &Path, language: &str) -> Result<Form> {
        let file_bytes = fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str("audio/wav")?;

        Ok(Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("language", language.to_string())
            .text("response_format", "verbose_json"))
    }

    fn parse_response(&self, response: TranscriptionResponse) -> Vec<RecognitionSegment> {
        response
            .segments
            .into_iter()
            .map(|seg| RecognitionSegment {
                start: Duration::from_secs_f64(seg.start.max(0.0)),
                end: Duration::from_secs_f64(seg.end.max(0.0)),
                text: seg.text.trim().to_string(),
            })
            .collect()
    }
}

#[async_trait]
impl SpeechRecognizer for RecognitionClient {
    async fn acquire(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| {
                VoxpipeError::Transcription(format!("Recognition service unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(VoxpipeError::Transcription(format!(
                "Recognition service not ready: {}",
                response.status()
            )));
        }

        debug!("Recognition engine acquired ({})", self.model);
        Ok(())
    }

    async fn transcribe(&self, audio: &Path, language: &str) -> Result<Vec<RecognitionSegment>> {
        info!("Transcribing {:?}", audio.file_name().unwrap_or_default());

        let form = self.build_form(audio, language).await?;
        let response = self
            .client
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoxpipeError::Transcription(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoxpipeError::Transcription(format!(
                "Recognition service error ({status}): {body}"
            )));
        }

        let body = response.text().await?;
        let parsed: TranscriptionResponse = serde_json::from_str(&body)
            .map_err(|e| VoxpipeError::Transcription(format!("Malformed response: {e}")))?;

        let segments = self.parse_response(parsed);
        info!("Transcription complete: {} segments", segments.len());
        Ok(segments)
    }

    async fn release(&self) {
        // Best-effort unload; a failure here must not fail the job.
        match self
            .client
            .post(format!("{}/unload", self.base_url))
            .send()
            .await
        {
            Ok(_) => debug!("Recognition engine released"),
            Err(e) => debug!("Recognition engine release failed: {e}"),
        }
    }

    fn name(&self) -> &'static str {
        "recognition"
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[allow(dead_code)]
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<TranscriptionResponseSegment>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponseSegment {
    start: f64,
    end: f64,
    text: String,
}
