//! Row types produced by the reconstructor, one struct per output table.

use crate::units::Unit;
use chrono::NaiveDateTime;
use serde::Serialize;

/// `run_metadata`: one row per converted file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadataRow {
    pub n_trigger: u64,
    pub file_name: String,
    pub file_version: Option<i64>,
    pub file_size: i32,
    pub number_waveforms: i32,
}

/// `waveform_metadata`: one row per waveform, keyed by
/// `(n_trigger, channel_idx, waveform_idx)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveformMetadataRow {
    pub n_trigger: u64,
    pub channel_idx: usize,
    pub waveform_idx: usize,
    pub header_size: i32,
    pub waveform_type: i32,
    pub number_buffers: i32,
    pub number_points: i32,
    pub count: i32,
    pub x_display_range: f32,
    pub x_display_origin: f64,
    pub x_increment: f64,
    pub x_origin: f64,
    pub raw_x_units: i32,
    pub raw_y_units: i32,
    pub x_units: Unit,
    pub y_units: Unit,
    pub date: String,
    pub time: String,
    pub datetime: Option<NaiveDateTime>,
    pub frame: String,
    pub channel: String,
    pub time_tag: f64,
    pub segment_index: u32,
}

/// `waveform_buffer_metadata`: one row per data buffer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferMetadataRow {
    pub n_trigger: u64,
    pub channel_idx: usize,
    pub waveform_idx: usize,
    pub buffer_idx: usize,
    pub header_size: i32,
    pub buffer_type: i16,
    pub bytes_per_point: i16,
    pub buffer_size: i32,
    pub x_units: Unit,
    pub y_units: Unit,
}

/// `waveform_buffer`: raw samples of a single buffer. `x_idx` restarts at 0
/// for every buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BufferSampleRow {
    pub n_trigger: u64,
    pub channel_idx: usize,
    pub waveform_idx: usize,
    pub buffer_idx: usize,
    pub x_idx: usize,
    pub x: f64,
    pub y: f64,
}

/// `waveforms`: the concatenated samples of one waveform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaveformSampleRow {
    pub n_trigger: u64,
    pub channel_idx: usize,
    pub waveform_idx: usize,
    pub x_idx: usize,
    pub x: f64,
    pub y: f64,
}

/// Everything one successfully decoded file contributes to the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerRecordSet {
    pub run: RunMetadataRow,
    pub waveforms: Vec<WaveformMetadataRow>,
    pub buffers: Vec<BufferMetadataRow>,
    pub buffer_samples: Vec<BufferSampleRow>,
    pub samples: Vec<WaveformSampleRow>,
}

impl TriggerRecordSet {
    pub fn n_trigger(&self) -> u64 {
        self.run.n_trigger
    }

    /// Concatenated samples belonging to one waveform slot.
    pub fn samples_for(&self, waveform_idx: usize) -> impl Iterator<Item = &WaveformSampleRow> {
        self.samples
            .iter()
            .filter(move |row| row.waveform_idx == waveform_idx)
    }
}

/// `channel_map`: label for every channel index of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelMapRow {
    pub channel_idx: usize,
    pub channel_name: String,
}

/// `average_waveform`: per-sample mean over all triggers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AverageSampleRow {
    pub channel_idx: usize,
    pub waveform_idx: usize,
    pub x_idx: usize,
    pub x: f64,
    pub y: f64,
}
