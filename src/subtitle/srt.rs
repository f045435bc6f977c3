// SRT subtitle format
use std::time::Duration;

use regex::Regex;

use super::SubtitleEntry;
use crate::error::{Result, VoxpipeError};

/// Render entries as SRT. Numbering is strictly sequential from 1 in input
/// order, regardless of gaps in time.
pub fn render(entries: &[SubtitleEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let content = match &entry.speaker {
                Some(speaker) => format!("[{}] {}", speaker, entry.text),
                None => entry.text.clone(),
            };
            format!(
                "{}\n{} --> {}\n{}\n",
                i + 1,
                format_timestamp(entry.start),
                format_timestamp(entry.end),
                content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract the plain transcript text from SRT content.
///
/// Sequence-number lines, timestamp lines and blank lines are discarded;
/// the remaining lines are joined with single spaces. Speaker prefixes stay
/// embedded in the text, so this is not an inverse of [`render`].
pub fn extract_text(srt: &str) -> String {
    srt.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.chars().all(|c| c.is_ascii_digit()))
        .filter(|line| !line.contains("-->"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_timestamp(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = d.subsec_millis();
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Parse an `HH:MM:SS,mmm` timestamp. Exact to millisecond resolution.
pub fn parse_timestamp(s: &str) -> Result<Duration> {
    let re = Regex::new(r"^(\d{2,}):(\d{2}):(\d{2}),(\d{3})$").expect("Invalid regex");
    let caps = re
        .captures(s.trim())
        .ok_or_else(|| VoxpipeError::InvalidTimestamp(s.to_string()))?;

    let hours: u64 = caps[1].parse().unwrap_or(0);
    let minutes: u64 = caps[2].parse().unwrap_or(0);
    let seconds: u64 = caps[3].parse().unwrap_or(0);
    let millis: u64 = caps[4].parse().unwrap_or(0);

    if minutes >= 60 || seconds >= 60 {
        return Err(VoxpipeError::InvalidTimestamp(s.to_string()));
    }

    Ok(Duration::from_millis(
        ((hours * 3600 + minutes * 60 + seconds) * 1000) + millis,
    ))
}
