use std::time::Duration;

use tracing::{debug, info};

use crate::engines::{DiarizationSegment, RecognitionSegment};

/// Label assigned when no diarization interval contains a recognition
/// segment's midpoint.
pub const UNKNOWN_SPEAKER: &str = "UNKNOWN";

/// A recognition segment annotated with the speaker active at its midpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSegment {
    pub start: Duration,
    pub end: Duration,
    pub speaker: String,
    pub text: String,
}

/// Merge diarization intervals with recognition intervals into a single
/// speaker-labeled transcript.
///
/// Recognition order is preserved as-is. For each recognition segment the
/// midpoint time is looked up in the diarization list; the first interval
/// containing it (inclusive bounds) wins. Overlapping diarization intervals
/// are therefore resolved by list order, not duration or confidence — the
/// engine's output order defines precedence. A midpoint falling in a gap
/// yields [`UNKNOWN_SPEAKER`]; there is no nearest-interval fallback.
pub fn merge(
    diarization: &[DiarizationSegment],
    recognition: &[RecognitionSegment],
) -> Vec<MergedSegment> {
    let merged: Vec<MergedSegment> = recognition
        .iter()
        .map(|seg| {
            let mid = (seg.start.as_secs_f64() + seg.end.as_secs_f64()) / 2.0;
            let speaker = speaker_at(diarization, mid);
            debug!(
                "[{} -> {}] speaker={} mid={:.3}s",
                crate::subtitle::srt::format_timestamp(seg.start),
                crate::subtitle::srt::format_timestamp(seg.end),
                speaker,
                mid
            );
            MergedSegment {
                start: seg.start,
                end: seg.end,
                speaker: speaker.to_string(),
                text: seg.text.clone(),
            }
        })
        .collect();

    info!("Merged {} segments with speaker labels", merged.len());
    merged
}

fn speaker_at(diarization: &[DiarizationSegment], time_secs: f64) -> &str {
    diarization
        .iter()
        .find(|d| d.start_secs <= time_secs && time_secs <= d.end_secs)
        .map(|d| d.speaker.as_str())
        .unwrap_or(UNKNOWN_SPEAKER)
}
