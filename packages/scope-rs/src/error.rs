use thiserror::Error;

/// Reasons a single capture file is rejected.
///
/// All variants are local to one file: the pipeline logs them, skips the file
/// and carries on with the next one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("not an Agilent binary waveform file (cookie {found:?})")]
    FormatMismatch { found: String },

    #[error("corrupt {structure}: {detail}")]
    StructuralCorruption {
        structure: &'static str,
        detail: String,
    },

    #[error("{context}: needed {needed} bytes, only {available} available")]
    TruncatedData {
        context: String,
        needed: usize,
        available: usize,
    },

    #[error("waveform {waveform_idx} declares {declared} points but its buffers hold {decoded}")]
    PointCountMismatch {
        waveform_idx: usize,
        declared: i64,
        decoded: usize,
    },
}

impl ParseFailure {
    /// Short stable name, used in logs and conversion reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseFailure::FormatMismatch { .. } => "FormatMismatch",
            ParseFailure::StructuralCorruption { .. } => "StructuralCorruption",
            ParseFailure::TruncatedData { .. } => "TruncatedData",
            ParseFailure::PointCountMismatch { .. } => "PointCountMismatch",
        }
    }
}

/// Errors that abort a conversion run.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Input directory not found: {0}")]
    InputNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Table '{0}' not found in database")]
    MissingTable(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Conversion cancelled after {0} file(s)")]
    Cancelled(usize),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
