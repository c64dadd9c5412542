//! Decoding of one Infiniium capture file into a [`TriggerRecordSet`].
//!
//! The walk is file -> waveform -> buffer. Every level returns a `Result` and
//! the first failure short-circuits the whole file, so a caller either gets
//! every row the file describes or none of them.

use crate::error::ParseFailure;
use crate::header::{BufferHeader, FileHeader, WaveformHeader};
use crate::records::{
    BufferMetadataRow, BufferSampleRow, RunMetadataRow, TriggerRecordSet, WaveformMetadataRow,
    WaveformSampleRow,
};
use crate::registry::ChannelRegistry;
use crate::units::Unit;
use byteorder::{ByteOrder, LE};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rayon::prelude::*;

/// Decode options for [`parse_file`].
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Also produce per-buffer sample rows (`waveform_buffer` table).
    pub keep_buffer_samples: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            keep_buffer_samples: true,
        }
    }
}

/// How the payload of a buffer is interpreted, selected by its type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    /// Codes 1-5 (normal, raw, min, max and counts data): IEEE float.
    Float,
    /// Code 6 (digital / hits data): unsigned integer.
    Unsigned,
    /// Anything else. Bytes are consumed, values become `NaN`.
    Unknown,
}

impl SampleEncoding {
    pub fn from_buffer_type(code: i16) -> Self {
        match code {
            1..=5 => SampleEncoding::Float,
            6 => SampleEncoding::Unsigned,
            _ => SampleEncoding::Unknown,
        }
    }
}

/// Decode a run of fixed-width little-endian samples.
///
/// `payload.len()` is expected to be a multiple of `width`; a trailing
/// partial sample is ignored. Widths the encoding cannot represent yield
/// `NaN` for every sample.
pub fn decode_samples(payload: &[u8], encoding: SampleEncoding, width: usize) -> Vec<f64> {
    if width == 0 {
        return Vec::new();
    }
    let decode: fn(&[u8]) -> f64 = match (encoding, width) {
        (SampleEncoding::Float, 2) => |b| f16_bits_to_f32(LE::read_u16(b)) as f64,
        (SampleEncoding::Float, 4) => |b| LE::read_f32(b) as f64,
        (SampleEncoding::Float, 8) => LE::read_f64,
        (SampleEncoding::Unsigned, 1..=8) => |b| LE::read_uint(b, b.len()) as f64,
        _ => |_| f64::NAN,
    };
    payload.par_chunks_exact(width).map(decode).collect()
}

/// IEEE 754 binary16 to binary32.
fn f16_bits_to_f32(bits: u16) -> f32 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exponent = ((bits >> 10) & 0x1f) as i32;
    let fraction = (bits & 0x03ff) as f32;
    let magnitude = match exponent {
        0 => fraction * 2f32.powi(-24),
        0x1f if fraction == 0.0 => f32::INFINITY,
        0x1f => f32::NAN,
        _ => (1.0 + fraction / 1024.0) * 2f32.powi(exponent - 15),
    };
    sign * magnitude
}

/// Combine the header's date and time strings into a timestamp.
///
/// Infiniium writes dates like `"05 MAR 2023"` and times like
/// `"14:02:11:27"`, where the last group is hundredths of a second.
pub fn parse_capture_datetime(date: &str, time: &str) -> Option<NaiveDateTime> {
    const DATE_FORMATS: &[&str] = &["%d %b %Y", "%d-%b-%Y", "%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];

    let date = date.trim();
    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date, fmt).ok())?;

    let parts: Vec<u32> = time
        .trim()
        .split(|c: char| c == ':' || c == '.')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .ok()?;
    let time = match parts.as_slice() {
        [h, m, s] => NaiveTime::from_hms_opt(*h, *m, *s)?,
        [h, m, s, hundredths] => NaiveTime::from_hms_milli_opt(*h, *m, *s, hundredths * 10)?,
        _ => return None,
    };
    Some(date.and_time(time))
}

/// Decode a complete capture file.
///
/// Channel labels met on the way are registered in `registry`; if the file
/// is rejected those registrations are rolled back, so a failed file leaves
/// no trace anywhere.
pub fn parse_file(
    bytes: &[u8],
    file_name: &str,
    n_trigger: u64,
    registry: &mut ChannelRegistry,
    options: ParseOptions,
) -> Result<TriggerRecordSet, ParseFailure> {
    let checkpoint = registry.checkpoint();
    let result = FileDecoder {
        bytes,
        offset: 0,
        n_trigger,
        options,
    }
    .decode(file_name, registry);

    if result.is_err() {
        registry.rollback_to(checkpoint);
    }
    result
}

struct FileDecoder<'a> {
    bytes: &'a [u8],
    offset: usize,
    n_trigger: u64,
    options: ParseOptions,
}

impl<'a> FileDecoder<'a> {
    fn remaining(&self) -> &'a [u8] {
        self.bytes.get(self.offset..).unwrap_or(&[])
    }

    fn decode(
        mut self,
        file_name: &str,
        registry: &mut ChannelRegistry,
    ) -> Result<TriggerRecordSet, ParseFailure> {
        let (file_header, used) = FileHeader::decode(self.remaining())?;
        self.offset += used;

        log::debug!(
            "File header: cookie={} version={} file_size={} num_waveforms={}",
            file_header.cookie_display(),
            file_header.version,
            file_header.file_size,
            file_header.num_waveforms
        );

        if !file_header.has_agilent_cookie() {
            return Err(ParseFailure::FormatMismatch {
                found: file_header.cookie_display(),
            });
        }

        let mut records = TriggerRecordSet {
            run: RunMetadataRow {
                n_trigger: self.n_trigger,
                file_name: file_name.to_string(),
                file_version: file_header.version_number(),
                file_size: file_header.file_size,
                number_waveforms: file_header.num_waveforms,
            },
            waveforms: Vec::new(),
            buffers: Vec::new(),
            buffer_samples: Vec::new(),
            samples: Vec::new(),
        };

        for waveform_idx in 0..file_header.num_waveforms.max(0) as usize {
            self.decode_waveform(waveform_idx, registry, &mut records)?;
        }

        Ok(records)
    }

    fn decode_waveform(
        &mut self,
        waveform_idx: usize,
        registry: &mut ChannelRegistry,
        records: &mut TriggerRecordSet,
    ) -> Result<(), ParseFailure> {
        let (header, used) = WaveformHeader::decode(self.remaining())?;
        self.offset += used;

        log::info!("    Parsing {}", header.waveform_label);
        log::debug!("      Waveform header: {:?}", header);

        if header.header_size != WaveformHeader::SIZE as i32 {
            return Err(ParseFailure::StructuralCorruption {
                structure: "waveform header",
                detail: format!(
                    "declares {} bytes, expected {}",
                    header.header_size,
                    WaveformHeader::SIZE
                ),
            });
        }

        let channel_idx = registry.index_for(&header.waveform_label);
        let x_units = Unit::from_code(header.x_units);
        let y_units = Unit::from_code(header.y_units);

        records.waveforms.push(WaveformMetadataRow {
            n_trigger: self.n_trigger,
            channel_idx,
            waveform_idx,
            header_size: header.header_size,
            waveform_type: header.waveform_type,
            number_buffers: header.num_waveform_buffers,
            number_points: header.num_points,
            count: header.count,
            x_display_range: header.x_display_range,
            x_display_origin: header.x_display_origin,
            x_increment: header.x_increment,
            x_origin: header.x_origin,
            raw_x_units: header.x_units,
            raw_y_units: header.y_units,
            x_units,
            y_units,
            date: header.date.clone(),
            time: header.time.clone(),
            datetime: parse_capture_datetime(&header.date, &header.time),
            frame: header.frame.clone(),
            channel: header.waveform_label.clone(),
            time_tag: header.time_tag,
            segment_index: header.segment_index,
        });

        if header.num_waveform_buffers > 1 {
            log::warn!(
                "Waveform {} ({}) has {} buffers; multi-buffer concatenation is unverified",
                waveform_idx,
                header.waveform_label,
                header.num_waveform_buffers
            );
        }

        // Each sample takes at least one byte, so the declared count is capped
        // by what is left in the file.
        let capacity = (header.num_points.max(0) as usize).min(self.remaining().len());
        let mut amplitudes: Vec<f64> = Vec::with_capacity(capacity);
        for buffer_idx in 0..header.num_waveform_buffers.max(0) as usize {
            let ctx = BufferContext {
                header: &header,
                channel_idx,
                waveform_idx,
                buffer_idx,
                x_units,
                y_units,
            };
            let decoded = self.decode_buffer(&ctx, records)?;
            amplitudes.extend(decoded);
        }

        if amplitudes.len() as i64 != header.num_points as i64 {
            return Err(ParseFailure::PointCountMismatch {
                waveform_idx,
                declared: header.num_points as i64,
                decoded: amplitudes.len(),
            });
        }

        records
            .samples
            .extend(amplitudes.into_iter().enumerate().map(|(x_idx, y)| {
                WaveformSampleRow {
                    n_trigger: self.n_trigger,
                    channel_idx,
                    waveform_idx,
                    x_idx,
                    x: header.time_at(x_idx),
                    y,
                }
            }));

        Ok(())
    }

    fn decode_buffer(
        &mut self,
        ctx: &BufferContext<'_>,
        records: &mut TriggerRecordSet,
    ) -> Result<Vec<f64>, ParseFailure> {
        let (header, used) = BufferHeader::decode(self.remaining())?;
        self.offset += used;

        log::debug!("      Buffer header: {:?}", header);

        if header.header_size != BufferHeader::SIZE as i32 {
            return Err(ParseFailure::StructuralCorruption {
                structure: "buffer header",
                detail: format!(
                    "declares {} bytes, expected {}",
                    header.header_size,
                    BufferHeader::SIZE
                ),
            });
        }

        let points = header
            .sample_count()
            .ok_or_else(|| ParseFailure::StructuralCorruption {
                structure: "buffer header",
                detail: format!(
                    "{} bytes at {} bytes per point",
                    header.buffer_size, header.bytes_per_point
                ),
            })?;

        records.buffers.push(BufferMetadataRow {
            n_trigger: self.n_trigger,
            channel_idx: ctx.channel_idx,
            waveform_idx: ctx.waveform_idx,
            buffer_idx: ctx.buffer_idx,
            header_size: header.header_size,
            buffer_type: header.buffer_type,
            bytes_per_point: header.bytes_per_point,
            buffer_size: header.buffer_size,
            x_units: ctx.x_units,
            y_units: ctx.y_units,
        });

        let width = header.bytes_per_point as usize;
        let needed = points * width;
        let available = self.remaining();
        if available.len() < needed {
            return Err(ParseFailure::TruncatedData {
                context: format!(
                    "buffer {} of waveform {}",
                    ctx.buffer_idx, ctx.waveform_idx
                ),
                needed,
                available: available.len(),
            });
        }

        let encoding = SampleEncoding::from_buffer_type(header.buffer_type);
        if encoding == SampleEncoding::Unknown {
            log::warn!(
                "Buffer type {} is not supported, {} samples stored as NaN",
                header.buffer_type,
                points
            );
        }
        let amplitudes = decode_samples(&available[..needed], encoding, width);

        // Bytes past the last whole sample still belong to this buffer.
        let slack = (header.buffer_size as usize - needed).min(available.len() - needed);
        self.offset += needed + slack;

        if self.options.keep_buffer_samples {
            records
                .buffer_samples
                .extend(amplitudes.iter().enumerate().map(|(x_idx, &y)| {
                    BufferSampleRow {
                        n_trigger: self.n_trigger,
                        channel_idx: ctx.channel_idx,
                        waveform_idx: ctx.waveform_idx,
                        buffer_idx: ctx.buffer_idx,
                        x_idx,
                        x: ctx.header.time_at(x_idx),
                        y,
                    }
                }));
        }

        Ok(amplitudes)
    }
}

struct BufferContext<'h> {
    header: &'h WaveformHeader,
    channel_idx: usize,
    waveform_idx: usize,
    buffer_idx: usize,
    x_units: Unit,
    y_units: Unit,
}
