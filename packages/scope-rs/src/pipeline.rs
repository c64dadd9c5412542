//! Directory-level conversion: discover capture files, decode them one at a
//! time and stream the records into a sink.

use crate::accumulator::BatchAccumulator;
use crate::aggregate::{compute_averages, AggregateSummary};
use crate::config::ConvertConfig;
use crate::error::{ConvertError, Result};
use crate::mmap_utils::mmap_file;
use crate::reconstruct::{parse_file, ParseOptions};
use crate::registry::ChannelRegistry;
use crate::sink::BatchSink;
use crate::sqlite::SqliteSink;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// A file the pipeline rejected, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub file_name: String,
    pub kind: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversionReport {
    pub files_seen: usize,
    pub files_converted: usize,
    pub skipped: Vec<SkippedFile>,
    pub flushes: usize,
    pub rows_written: BTreeMap<&'static str, usize>,
    pub channels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<AggregateSummary>,
}

impl ConversionReport {
    pub fn has_skipped(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Capture files matching the configured pattern, sorted by name.
pub fn list_input_files(config: &ConvertConfig) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = glob::glob(&config.input_glob())?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("Cannot read directory entry: {}", e);
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Decode `files` in order and stream their records into `sink`.
///
/// A file either contributes every row it describes and the next trigger
/// number, or nothing at all. `cancel` is polled between files only.
pub fn convert_files<S: BatchSink>(
    files: &[PathBuf],
    sink: S,
    config: &ConvertConfig,
    cancel: Option<&AtomicBool>,
) -> Result<(S, ConversionReport)> {
    let options = ParseOptions {
        keep_buffer_samples: config.save_buffers,
    };
    let mut registry = ChannelRegistry::new();
    let mut accumulator = BatchAccumulator::new(sink, config.flush_threshold, config.save_buffers);
    let mut report = ConversionReport {
        files_seen: files.len(),
        ..ConversionReport::default()
    };
    let mut n_trigger: u64 = 0;
    let mut cancelled = false;

    for path in files {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            log::warn!(
                "Cancellation requested, stopping after {} file(s)",
                report.files_converted
            );
            cancelled = true;
            break;
        }

        let file_name = display_name(path);
        log::info!("Processing run {}", file_name);

        let bytes = mmap_file(path)?;
        match parse_file(bytes.as_ref(), &file_name, n_trigger, &mut registry, options) {
            Ok(records) => {
                accumulator.push(records)?;
                n_trigger += 1;
                report.files_converted += 1;
            }
            Err(failure) => {
                log::error!("Skipping {}: {}", file_name, failure);
                report.skipped.push(SkippedFile {
                    file_name,
                    kind: failure.kind(),
                    reason: failure.to_string(),
                });
            }
        }
    }

    let (sink, stats) = accumulator.finish(&registry)?;
    report.flushes = stats.flushes;
    report.rows_written = stats.rows_written;
    report.channels = registry.iter().map(|(_, name)| name.to_string()).collect();

    log::info!(
        "Converted {} of {} file(s), {} skipped",
        report.files_converted,
        report.files_seen,
        report.skipped.len()
    );

    if cancelled {
        return Err(ConvertError::Cancelled(report.files_converted));
    }
    Ok((sink, report))
}

/// Convert every capture file under `config.input_dir` into
/// `config.output_dir/waveforms.sqlite`, then run the aggregate stage.
pub fn convert_directory(
    config: &ConvertConfig,
    cancel: Option<&AtomicBool>,
) -> Result<ConversionReport> {
    config.validate()?;

    let files = list_input_files(config)?;
    if files.is_empty() {
        log::warn!("No files matching {} found", config.input_glob());
    }

    std::fs::create_dir_all(&config.output_dir)?;
    let database = config.database_path();
    let sink = SqliteSink::open(&database)?;

    let (mut sink, mut report) = convert_files(&files, sink, config, cancel)?;
    report.database = Some(database);

    if config.compute_average {
        report.aggregate = Some(compute_averages(&mut sink)?);
    }
    Ok(report)
}
