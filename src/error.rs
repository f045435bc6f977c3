use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxpipeError {
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Diarization failed: {0}")]
    Diarization(String),

    #[error("Summarization failed: {0}")]
    Summarization(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Job timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VoxpipeError {
    /// Short category name used in diagnostic reports.
    pub fn category(&self) -> &'static str {
        match self {
            VoxpipeError::UnsupportedFormat(_) => "UnsupportedFormatError",
            VoxpipeError::Configuration(_) => "ConfigurationError",
            VoxpipeError::Transcription(_) => "TranscriptionError",
            VoxpipeError::Diarization(_) => "DiarizationError",
            VoxpipeError::Summarization(_) => "SummarizationError",
            VoxpipeError::InvalidTimestamp(_) => "InvalidTimestampError",
            VoxpipeError::Timeout(_) => "TimeoutError",
            VoxpipeError::Io(_) => "IOError",
            VoxpipeError::Wav(_) => "IOError",
            VoxpipeError::Http(_) => "HttpError",
            VoxpipeError::Json(_) => "JsonError",
        }
    }
}

pub type Result<T> = std::result::Result<T, VoxpipeError>;
