//! Destination for flushed record batches.
//!
//! The accumulator only knows about [`BatchSink`]; the SQLite writer and the
//! in-memory sink used by tests both implement it.

use crate::error::Result;
use crate::records::{
    AverageSampleRow, BufferMetadataRow, BufferSampleRow, ChannelMapRow, RunMetadataRow,
    WaveformMetadataRow, WaveformSampleRow,
};

/// How a batch combines with what the table already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Drop any existing contents first.
    Replace,
    Append,
}

/// A borrowed slice of rows destined for one output table.
#[derive(Debug, Clone, Copy)]
pub enum TableBatch<'a> {
    RunMetadata(&'a [RunMetadataRow]),
    WaveformMetadata(&'a [WaveformMetadataRow]),
    BufferMetadata(&'a [BufferMetadataRow]),
    BufferSamples(&'a [BufferSampleRow]),
    Samples(&'a [WaveformSampleRow]),
    ChannelMap(&'a [ChannelMapRow]),
    Average(&'a [AverageSampleRow]),
}

impl TableBatch<'_> {
    pub fn table_name(&self) -> &'static str {
        match self {
            TableBatch::RunMetadata(_) => "run_metadata",
            TableBatch::WaveformMetadata(_) => "waveform_metadata",
            TableBatch::BufferMetadata(_) => "waveform_buffer_metadata",
            TableBatch::BufferSamples(_) => "waveform_buffer",
            TableBatch::Samples(_) => "waveforms",
            TableBatch::ChannelMap(_) => "channel_map",
            TableBatch::Average(_) => "average_waveform",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TableBatch::RunMetadata(rows) => rows.len(),
            TableBatch::WaveformMetadata(rows) => rows.len(),
            TableBatch::BufferMetadata(rows) => rows.len(),
            TableBatch::BufferSamples(rows) => rows.len(),
            TableBatch::Samples(rows) => rows.len(),
            TableBatch::ChannelMap(rows) => rows.len(),
            TableBatch::Average(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait BatchSink {
    fn write_batch(&mut self, batch: TableBatch<'_>, mode: WriteMode) -> Result<()>;
}

/// One `write_batch` call as seen by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteEvent {
    pub table: &'static str,
    pub mode: WriteMode,
    pub rows: usize,
}

/// Keeps every table in memory. Replace and append behave like the SQLite
/// sink so tests can compare final contents.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub run_metadata: Vec<RunMetadataRow>,
    pub waveform_metadata: Vec<WaveformMetadataRow>,
    pub buffer_metadata: Vec<BufferMetadataRow>,
    pub buffer_samples: Vec<BufferSampleRow>,
    pub samples: Vec<WaveformSampleRow>,
    pub channel_map: Vec<ChannelMapRow>,
    pub average: Vec<AverageSampleRow>,
    pub events: Vec<WriteEvent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write events for one table, in call order.
    pub fn events_for(&self, table: &str) -> Vec<&WriteEvent> {
        self.events.iter().filter(|e| e.table == table).collect()
    }
}

fn store<T: Clone>(table: &mut Vec<T>, rows: &[T], mode: WriteMode) {
    if mode == WriteMode::Replace {
        table.clear();
    }
    table.extend_from_slice(rows);
}

impl BatchSink for MemorySink {
    fn write_batch(&mut self, batch: TableBatch<'_>, mode: WriteMode) -> Result<()> {
        self.events.push(WriteEvent {
            table: batch.table_name(),
            mode,
            rows: batch.len(),
        });
        match batch {
            TableBatch::RunMetadata(rows) => store(&mut self.run_metadata, rows, mode),
            TableBatch::WaveformMetadata(rows) => store(&mut self.waveform_metadata, rows, mode),
            TableBatch::BufferMetadata(rows) => store(&mut self.buffer_metadata, rows, mode),
            TableBatch::BufferSamples(rows) => store(&mut self.buffer_samples, rows, mode),
            TableBatch::Samples(rows) => store(&mut self.samples, rows, mode),
            TableBatch::ChannelMap(rows) => store(&mut self.channel_map, rows, mode),
            TableBatch::Average(rows) => store(&mut self.average, rows, mode),
        }
        Ok(())
    }
}
