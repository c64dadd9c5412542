//! Bounded in-memory staging of decoded records.
//!
//! Records from successful files pile up here until the concatenated sample
//! count passes the threshold, then every table is written through the sink
//! and memory is released. The first flush of a run replaces whatever the
//! tables held before; later flushes append.

use crate::error::Result;
use crate::records::{
    BufferMetadataRow, BufferSampleRow, ChannelMapRow, RunMetadataRow, TriggerRecordSet,
    WaveformMetadataRow, WaveformSampleRow,
};
use crate::registry::ChannelRegistry;
use crate::sink::{BatchSink, TableBatch, WriteMode};
use serde::Serialize;
use std::collections::BTreeMap;

/// What the accumulator pushed through its sink over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushStats {
    pub flushes: usize,
    pub rows_written: BTreeMap<&'static str, usize>,
}

pub struct BatchAccumulator<S: BatchSink> {
    sink: S,
    threshold: usize,
    save_buffers: bool,
    run: Vec<RunMetadataRow>,
    waveforms: Vec<WaveformMetadataRow>,
    buffers: Vec<BufferMetadataRow>,
    buffer_samples: Vec<BufferSampleRow>,
    samples: Vec<WaveformSampleRow>,
    stats: FlushStats,
}

impl<S: BatchSink> BatchAccumulator<S> {
    pub fn new(sink: S, threshold: usize, save_buffers: bool) -> Self {
        Self {
            sink,
            threshold,
            save_buffers,
            run: Vec::new(),
            waveforms: Vec::new(),
            buffers: Vec::new(),
            buffer_samples: Vec::new(),
            samples: Vec::new(),
            stats: FlushStats::default(),
        }
    }

    /// Samples currently held in memory.
    pub fn pending_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn stats(&self) -> &FlushStats {
        &self.stats
    }

    /// Merge one file's records, flushing if the threshold is exceeded.
    pub fn push(&mut self, records: TriggerRecordSet) -> Result<()> {
        let TriggerRecordSet {
            run,
            waveforms,
            buffers,
            buffer_samples,
            samples,
        } = records;

        self.run.push(run);
        self.waveforms.extend(waveforms);
        self.buffers.extend(buffers);
        if self.save_buffers {
            self.buffer_samples.extend(buffer_samples);
        }
        self.samples.extend(samples);

        if self.samples.len() > self.threshold {
            self.flush()?;
        }
        Ok(())
    }

    /// Write every pending set and clear it.
    pub fn flush(&mut self) -> Result<()> {
        let mode = if self.stats.flushes == 0 {
            WriteMode::Replace
        } else {
            WriteMode::Append
        };

        log::info!(
            "Flushing {} triggers ({} samples) to storage",
            self.run.len(),
            self.samples.len()
        );

        let sink = &mut self.sink;
        let stats = &mut self.stats;
        write_counted(sink, stats, TableBatch::RunMetadata(&self.run), mode)?;
        write_counted(sink, stats, TableBatch::WaveformMetadata(&self.waveforms), mode)?;
        write_counted(sink, stats, TableBatch::BufferMetadata(&self.buffers), mode)?;
        if self.save_buffers {
            write_counted(sink, stats, TableBatch::BufferSamples(&self.buffer_samples), mode)?;
        } else if mode == WriteMode::Replace {
            // Clears buffer rows left by an earlier run.
            write_counted(sink, stats, TableBatch::BufferSamples(&[]), mode)?;
        }
        write_counted(sink, stats, TableBatch::Samples(&self.samples), mode)?;

        self.run.clear();
        self.waveforms.clear();
        self.buffers.clear();
        self.buffer_samples.clear();
        self.samples.clear();
        self.stats.flushes += 1;
        Ok(())
    }

    /// Final flush of the remainder, then the channel map in full.
    ///
    /// Always writes, even when nothing is pending, so an empty run still
    /// leaves empty tables behind.
    pub fn finish(mut self, registry: &ChannelRegistry) -> Result<(S, FlushStats)> {
        self.flush()?;

        let channel_map: Vec<ChannelMapRow> = registry
            .iter()
            .map(|(channel_idx, name)| ChannelMapRow {
                channel_idx,
                channel_name: name.to_string(),
            })
            .collect();
        write_counted(
            &mut self.sink,
            &mut self.stats,
            TableBatch::ChannelMap(&channel_map),
            WriteMode::Replace,
        )?;

        Ok((self.sink, self.stats))
    }
}

fn write_counted<S: BatchSink>(
    sink: &mut S,
    stats: &mut FlushStats,
    batch: TableBatch<'_>,
    mode: WriteMode,
) -> Result<()> {
    let table = batch.table_name();
    let rows = batch.len();
    sink.write_batch(batch, mode)?;
    let written = stats.rows_written.entry(table).or_insert(0);
    if mode == WriteMode::Replace {
        *written = 0;
    }
    *written += rows;
    Ok(())
}
