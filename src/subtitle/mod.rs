pub mod srt;

use std::time::Duration;

/// One subtitle block. The speaker label, when present, is rendered as a
/// bracketed prefix on the content line.
#[derive(Debug, Clone)]
pub struct SubtitleEntry {
    pub start: Duration,
    pub end: Duration,
    pub speaker: Option<String>,
    pub text: String,
}
