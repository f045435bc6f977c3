use std::path::Path;
use std::time::Duration;

use hound::WavReader;
use tracing::debug;

use crate::error::{Result, VoxpipeError};

/// Channel layout of an input file, which selects the processing branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl std::fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelLayout::Mono => write!(f, "mono"),
            ChannelLayout::Stereo => write!(f, "stereo"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AudioInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub duration: Duration,
}

/// Read channel count, sample rate and duration from the WAV header
/// without decoding the waveform.
pub fn probe(path: &Path) -> Result<AudioInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let samples_per_channel = reader.duration();
    let duration = Duration::from_secs_f64(samples_per_channel as f64 / spec.sample_rate as f64);

    debug!(
        "Audio info for {:?}: {} ch, {} Hz, {:.2}s",
        path.file_name().unwrap_or_default(),
        spec.channels,
        spec.sample_rate,
        duration.as_secs_f64()
    );

    Ok(AudioInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        duration,
    })
}

/// Classify a file as mono or stereo. Any other channel count is rejected.
pub fn classify(path: &Path) -> Result<ChannelLayout> {
    let info = probe(path)?;
    match info.channels {
        1 => Ok(ChannelLayout::Mono),
        2 => Ok(ChannelLayout::Stereo),
        n => Err(VoxpipeError::UnsupportedFormat(format!(
            "{n} channels (only mono or stereo is supported)"
        ))),
    }
}
