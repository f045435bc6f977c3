use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio::fs;
use tracing::{debug, info};

use crate::engines::{Diarizer, DiarizationSegment, SpeakerBounds};
use crate::error::{Result, VoxpipeError};

/// Client for the speaker-diarization service.
///
/// The service requires an access token; its absence is a configuration
/// error surfaced from `acquire`, before any processing begins.
pub struct DiarizationClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl DiarizationClient {
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                VoxpipeError::Configuration(
                    "Diarization access token not set. Set HF_TOKEN or engines.diarization_token."
                        .to_string(),
                )
            })
    }

    fn apply_bounds(form: Form, bounds: SpeakerBounds) -> Form {
        match bounds {
            SpeakerBounds::Exact(n) => form.text("num_speakers", n.to_string()),
            SpeakerBounds::Range { min, max } => form
                .text("min_speakers", min.to_string())
                .text("max_speakers", max.to_string()),
        }
    }
}

#[async_trait]
impl Diarizer for DiarizationClient {
    async fn acquire(&self) -> Result<()> {
        let token = self.token()?;

        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                VoxpipeError::Diarization(format!("Diarization service unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(VoxpipeError::Diarization(format!(
                "Diarization service not ready: {}",
                response.status()
            )));
        }

        debug!("Diarization engine acquired");
        Ok(())
    }

    async fn diarize(&self, audio: &Path, bounds: SpeakerBounds) -> Result<Vec<DiarizationSegment>> {
        let token = self.token()?;

        info!("Diarizing {:?}", audio.file_name().unwrap_or_default());

        let file_bytes = fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str("audio/wav")?;

        let form = Self::apply_bounds(Form::new().part("file", file_part), bounds);

        let response = self
            .client
            .post(format!("{}/diarize", self.base_url))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoxpipeError::Diarization(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoxpipeError::Diarization(format!(
                "Diarization service error ({status}): {body}"
            )));
        }

        let body = response.text().await?;
        let parsed: DiarizationResponse = serde_json::from_str(&body)
            .map_err(|e| VoxpipeError::Diarization(format!("Malformed response: {e}")))?;

        let segments: Vec<DiarizationSegment> = parsed
            .segments
            .into_iter()
            .map(|seg| DiarizationSegment {
                start_secs: seg.start,
                end_secs: seg.end,
                speaker: seg.speaker,
            })
            .collect();

        let speakers: std::collections::HashSet<&str> =
            segments.iter().map(|s| s.speaker.as_str()).collect();
        info!(
            "Diarization complete: {} segments, {} speakers",
            segments.len(),
            speakers.len()
        );

        Ok(segments)
    }

    async fn release(&self) {
        match self
            .client
            .post(format!("{}/unload", self.base_url))
            .send()
            .await
        {
            Ok(_) => debug!("Diarization engine released"),
            Err(e) => debug!("Diarization engine release failed: {e}"),
        }
    }

    fn name(&self) -> &'static str {
        "diarization"
    }
}

#[derive(Debug, Deserialize)]
struct DiarizationResponse {
    #[serde(default)]
    segments: Vec<DiarizationResponseSegment>,
}

#[derive(Debug, Deserialize)]
struct DiarizationResponseSegment {
    start: f64,
    end: f64,
    speaker: String,
}
