use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::engines::Summarizer;
use crate::error::{Result, VoxpipeError};

/// Placeholder for the glossary section in a prompt template.
pub const DICTIONARY_PLACEHOLDER: &str = "{dictionary_section}";
/// Placeholder for the transcript body in a prompt template.
pub const TRANSCRIPT_PLACEHOLDER: &str = "{transcript_text}";

/// Client for the Ollama generate API.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout,
        }
    }

    /// Check whether the Ollama server is reachable.
    pub async fn check_health(&self) -> bool {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await;
        matches!(response, Ok(r) if r.status().is_success())
    }
}

/// Fill the prompt template's placeholders. An empty or missing glossary
/// produces no dictionary section at all.
pub fn render_prompt(template: &str, transcript: &str, glossary: Option<&str>) -> String {
    let dictionary_section = match glossary {
        Some(g) if !g.trim().is_empty() => format!("Glossary:\n{}\n", g.trim()),
        _ => String::new(),
    };

    template
        .replace(DICTIONARY_PLACEHOLDER, &dictionary_section)
        .replace(TRANSCRIPT_PLACEHOLDER, transcript)
}

#[async_trait]
impl Summarizer for OllamaClient {
    async fn summarize(
        &self,
        transcript: &str,
        prompt_template: &str,
        glossary: Option<&str>,
    ) -> Result<String> {
        let prompt = render_prompt(prompt_template, transcript, glossary);

        info!("Summarizing transcript ({} chars)", transcript.len());
        debug!("Prompt length: {} chars", prompt.len());

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(self.timeout)
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
                "options": {
                    "temperature": 0.3,
                    "top_p": 0.9,
                    "num_predict": 512,
                },
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VoxpipeError::Summarization(format!(
                        "Summarization timed out after {}s",
                        self.timeout.as_secs()
                    ))
                } else {
                    VoxpipeError::Summarization(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoxpipeError::Summarization(format!(
                "Ollama error ({status}): {body}"
            )));
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| VoxpipeError::Summarization(format!("Malformed response: {e}")))?;

        let summary = parsed.response.trim().to_string();
        info!("Summary generated: {} chars", summary.len());
        Ok(summary)
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}
