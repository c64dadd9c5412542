use crate::error::{ConvertError, Result};
use crate::sqlite::DATABASE_FILE_NAME;
use std::env;
use std::path::{Path, PathBuf};

/// Concatenated-sample count above which the accumulator flushes.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 2_000_000;

/// Files picked up inside the input directory.
pub const DEFAULT_FILE_PATTERN: &str = "wav*.bin";

/// Settings for one conversion run
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertConfig {
    /// Directory holding the capture files
    pub input_dir: PathBuf,
    /// Directory receiving `waveforms.sqlite`
    pub output_dir: PathBuf,
    /// Glob matched against file names in `input_dir`
    pub file_pattern: String,
    /// Persist the per-buffer sample table as well
    pub save_buffers: bool,
    pub flush_threshold: usize,
    /// Run the aggregate stage after the final flush
    pub compute_average: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("out"),
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            save_buffers: false,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            compute_average: true,
        }
    }
}

impl ConvertConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Defaults overlaid with `SCOPE_FLUSH_THRESHOLD` and `SCOPE_SAVE_BUFFERS`.
    pub fn from_env(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::new(input_dir, output_dir).with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SCOPE_FLUSH_THRESHOLD") {
            self.flush_threshold = value.trim().parse().map_err(|_| {
                ConvertError::InvalidConfig(format!(
                    "SCOPE_FLUSH_THRESHOLD must be a positive integer, got '{}'",
                    value
                ))
            })?;
        }
        if let Some(value) = lookup("SCOPE_SAVE_BUFFERS") {
            self.save_buffers = matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(self)
    }

    pub fn database_path(&self) -> PathBuf {
        self.output_dir.join(DATABASE_FILE_NAME)
    }

    /// Full glob for the capture files.
    pub fn input_glob(&self) -> String {
        glob_in(&self.input_dir, &self.file_pattern)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.input_dir.is_dir() {
            return Err(ConvertError::InputNotFound(
                self.input_dir.display().to_string(),
            ));
        }
        if self.flush_threshold == 0 {
            return Err(ConvertError::InvalidConfig(
                "flush threshold must be greater than zero".to_string(),
            ));
        }
        if self.file_pattern.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "file pattern must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn glob_in(dir: &Path, pattern: &str) -> String {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    format!("{}/{}", escaped.trim_end_matches('/'), pattern)
}
