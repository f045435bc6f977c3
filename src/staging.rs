use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::DirConfig;
use crate::error::{Result, VoxpipeError};

/// Suffix appended to the base name for the summary artifact.
pub const SUMMARY_SUFFIX: &str = "_summary.txt";
/// Suffix appended to the base name for the diagnostic artifact.
pub const ERROR_LOG_SUFFIX: &str = "_error.log";

/// Owns the staging directories and the move semantics between them.
///
/// A source file occupies exactly one of input/processed/error at a time;
/// a promote is the ownership transfer point — after it succeeds the
/// caller no longer touches the original path.
#[derive(Debug, Clone)]
pub struct StagingDirs {
    pub input: PathBuf,
    pub processed: PathBuf,
    pub error: PathBuf,
    pub output: PathBuf,
}

impl StagingDirs {
    pub fn new(dirs: &DirConfig) -> Self {
        Self {
            input: dirs.input.clone(),
            processed: dirs.processed.clone(),
            error: dirs.error.clone(),
            output: dirs.output.clone(),
        }
    }

    /// Create all staging directories if missing.
    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.input, &self.processed, &self.error, &self.output] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Validate that a path is a readable file inside the input directory.
    /// Files arrive already staged, so this performs no copies.
    pub fn stage(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(VoxpipeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Source file not found: {}", path.display()),
            )));
        }
        if !path.starts_with(&self.input) {
            return Err(VoxpipeError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("File is not in the input directory: {}", path.display()),
            )));
        }
        Ok(())
    }

    /// Move a source file to the processed directory, same filename.
    pub fn promote_to_processed(&self, path: &Path) -> Result<PathBuf> {
        self.promote(path, &self.processed)
    }

    /// Move a source file to the error directory, same filename.
    pub fn promote_to_error(&self, path: &Path) -> Result<PathBuf> {
        self.promote(path, &self.error)
    }

    fn promote(&self, path: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let file_name = path.file_name().ok_or_else(|| {
            VoxpipeError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Path has no filename: {}", path.display()),
            ))
        })?;
        let dest = dest_dir.join(file_name);

        if !path.exists() {
            // Duplicate delivery: a crashed worker may have moved the file
            // before acknowledging. The promote is idempotent in that case.
            if dest.exists() {
                warn!(
                    "Source already promoted, treating as idempotent: {}",
                    dest.display()
                );
                return Ok(dest);
            }
            return Err(VoxpipeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Source file no longer exists: {}", path.display()),
            )));
        }

        match fs::rename(path, &dest) {
            Ok(()) => {}
            Err(_) => {
                // rename fails across filesystems; fall back to copy+remove
                fs::copy(path, &dest)?;
                fs::remove_file(path)?;
            }
        }

        info!("Moved {} -> {}", path.display(), dest.display());
        Ok(dest)
    }

    /// Write the subtitle and summary artifacts to the output directory.
    /// Existing files of the same derived names are overwritten.
    pub fn write_artifacts(&self, base_name: &str, srt: &str, summary: &str) -> Result<()> {
        let srt_path = self.output.join(format!("{base_name}.srt"));
        fs::write(&srt_path, srt)?;
        info!("Wrote subtitle artifact: {}", srt_path.display());

        let summary_path = self.output.join(format!("{base_name}{SUMMARY_SUFFIX}"));
        fs::write(&summary_path, summary)?;
        info!("Wrote summary artifact: {}", summary_path.display());

        Ok(())
    }

    /// Read back a completed job's artifacts.
    pub fn read_artifacts(&self, base_name: &str) -> Result<(String, String)> {
        let srt = fs::read_to_string(self.output.join(format!("{base_name}.srt")))?;
        let summary = fs::read_to_string(self.output.join(format!("{base_name}{SUMMARY_SUFFIX}")))?;
        Ok((srt, summary))
    }

    /// Write a plain-text diagnostic to the error directory.
    pub fn write_diagnostic(&self, base_name: &str, report: &str) -> Result<PathBuf> {
        let path = self.error.join(format!("{base_name}{ERROR_LOG_SUFFIX}"));
        fs::write(&path, report)?;
        info!("Wrote diagnostic: {}", path.display());
        Ok(path)
    }
}

/// Base filename with the extension stripped.
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
