use crate::error::{Result, VoxpipeError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Staging directory layout. A source file lives in exactly one of
/// `input`, `processed`, or `error` at any time; artifacts go to `output`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub processed: PathBuf,
    pub error: PathBuf,
    /// Prompt template and glossary files live here.
    pub config: PathBuf,
}

impl Default for DirConfig {
    fn default() -> Self {
        let base = PathBuf::from("data");
        Self {
            input: base.join("input"),
            output: base.join("output"),
            processed: base.join("processed"),
            error: base.join("error"),
            config: PathBuf::from("config"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the speech-recognition service.
    pub recognition_url: String,
    /// Model reference passed through to the recognition service.
    pub recognition_model: String,
    /// Base URL of the speaker-diarization service.
    pub diarization_url: String,
    /// Access token required by the diarization service.
    pub diarization_token: Option<String>,
    /// Base URL of the Ollama summarization service.
    pub ollama_url: String,
    pub ollama_model: String,
    /// Per-request timeout for summarization, in seconds.
    pub ollama_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recognition_url: "http://localhost:9000".to_string(),
            recognition_model: "faster-whisper-large-v3-turbo".to_string(),
            diarization_url: "http://localhost:9100".to_string(),
            diarization_token: None,
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "midm-2.0:base".to_string(),
            ollama_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dirs: DirConfig,
    pub engines: EngineConfig,
    /// Language code handed to the recognition engine.
    pub language: String,
    /// Number of concurrent workers. Each worker holds one job at a time.
    pub workers: usize,
    /// Cooperative abort limit, measured from dequeue.
    pub soft_time_limit_secs: u64,
    /// Forced termination limit, measured from dequeue.
    pub hard_time_limit_secs: u64,
    /// Expected speaker count bounds for the stereo branch.
    pub min_speakers: u32,
    pub max_speakers: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dirs: DirConfig::default(),
            engines: EngineConfig::default(),
            language: "ko".to_string(),
            workers: 1,
            soft_time_limit_secs: 600,
            hard_time_limit_secs: 900,
            min_speakers: 1,
            max_speakers: 3,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_file_path())
    }

    pub fn load_from(path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = path {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = toml::from_str(&contents)
                    .map_err(|e| VoxpipeError::Configuration(format!("{e}")))?;
            }
        }

        // Environment variables override the file
        if let Ok(token) = std::env::var("HF_TOKEN") {
            config.engines.diarization_token = Some(token);
        }
        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            config.engines.ollama_url = url;
        }
        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            config.engines.ollama_model = model;
        }
        if let Ok(url) = std::env::var("RECOGNITION_URL") {
            config.engines.recognition_url = url;
        }
        if let Ok(dir) = std::env::var("INPUT_DIR") {
            config.dirs.input = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("OUTPUT_DIR") {
            config.dirs.output = PathBuf::from(dir);
        }
        if let Ok(workers) = std::env::var("VOXPIPE_WORKERS") {
            if let Ok(n) = workers.parse() {
                config.workers = n;
            }
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(VoxpipeError::Configuration(
                "Worker count must be greater than 0".to_string(),
            ));
        }
        if self.min_speakers == 0 || self.min_speakers > self.max_speakers {
            return Err(VoxpipeError::Configuration(format!(
                "Invalid speaker bounds: min={} max={}",
                self.min_speakers, self.max_speakers
            )));
        }
        if self.soft_time_limit_secs > self.hard_time_limit_secs {
            return Err(VoxpipeError::Configuration(
                "Soft time limit must not exceed the hard time limit".to_string(),
            ));
        }
        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("voxpipe").join("config.toml"))
    }
}
