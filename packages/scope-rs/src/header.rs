//! Fixed-layout Infiniium headers.
//!
//! Layout (all little-endian):
//!
//! ```text
//! file      := FileHeader  waveform{num_waveforms}
//! waveform  := WaveformHeader  buffer{num_waveform_buffers}
//! buffer    := BufferHeader  payload[buffer_size]
//! ```
//!
//! The decoders here are pure transcoders: they read exactly one structure
//! and never judge the values they find. Size and cookie checks belong to
//! the reconstructor.

use crate::error::ParseFailure;
use byteorder::{ReadBytesExt, LE};
use serde::Serialize;
use std::io::{self, Read};

/// Magic tag at the start of every Agilent binary waveform file.
pub const AGILENT_COOKIE: [u8; 2] = *b"AG";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileHeader {
    pub cookie: [u8; 2],
    pub version: String,
    pub file_size: i32,
    pub num_waveforms: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveformHeader {
    pub header_size: i32,
    pub waveform_type: i32,
    pub num_waveform_buffers: i32,
    pub num_points: i32,
    pub count: i32,
    pub x_display_range: f32,
    pub x_display_origin: f64,
    pub x_increment: f64,
    pub x_origin: f64,
    pub x_units: i32,
    pub y_units: i32,
    pub date: String,
    pub time: String,
    pub frame: String,
    pub waveform_label: String,
    pub time_tag: f64,
    pub segment_index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferHeader {
    pub header_size: i32,
    pub buffer_type: i16,
    pub bytes_per_point: i16,
    pub buffer_size: i32,
}

impl FileHeader {
    pub const SIZE: usize = 12;

    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), ParseFailure> {
        let mut region = fixed_region(bytes, Self::SIZE, "file header")?;
        let header = Self::read_from(&mut region)
            .map_err(|_| short_read("file header", Self::SIZE, bytes.len()))?;
        Ok((header, Self::SIZE))
    }

    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut cookie = [0u8; 2];
        reader.read_exact(&mut cookie)?;
        let version = read_fixed_string(reader, 2)?;
        Ok(Self {
            cookie,
            version,
            file_size: reader.read_i32::<LE>()?,
            num_waveforms: reader.read_i32::<LE>()?,
        })
    }

    pub fn has_agilent_cookie(&self) -> bool {
        self.cookie == AGILENT_COOKIE
    }

    /// Cookie rendered for diagnostics; non-ASCII bytes are escaped.
    pub fn cookie_display(&self) -> String {
        self.cookie.escape_ascii().to_string()
    }

    /// Numeric form of the two-character version tag ("10" -> 10).
    pub fn version_number(&self) -> Option<i64> {
        self.version.trim().parse().ok()
    }
}

impl WaveformHeader {
    pub const SIZE: usize = 140;

    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), ParseFailure> {
        let mut region = fixed_region(bytes, Self::SIZE, "waveform header")?;
        let header = Self::read_from(&mut region)
            .map_err(|_| short_read("waveform header", Self::SIZE, bytes.len()))?;
        Ok((header, Self::SIZE))
    }

    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            header_size: reader.read_i32::<LE>()?,
            waveform_type: reader.read_i32::<LE>()?,
            num_waveform_buffers: reader.read_i32::<LE>()?,
            num_points: reader.read_i32::<LE>()?,
            count: reader.read_i32::<LE>()?,
            x_display_range: reader.read_f32::<LE>()?,
            x_display_origin: reader.read_f64::<LE>()?,
            x_increment: reader.read_f64::<LE>()?,
            x_origin: reader.read_f64::<LE>()?,
            x_units: reader.read_i32::<LE>()?,
            y_units: reader.read_i32::<LE>()?,
            date: read_fixed_string(reader, 16)?,
            time: read_fixed_string(reader, 16)?,
            frame: read_fixed_string(reader, 24)?,
            waveform_label: read_fixed_string(reader, 16)?,
            time_tag: reader.read_f64::<LE>()?,
            segment_index: reader.read_u32::<LE>()?,
        })
    }

    /// Time of sample `index`: `index * x_increment + x_origin`.
    pub fn time_at(&self, index: usize) -> f64 {
        index as f64 * self.x_increment + self.x_origin
    }
}

impl BufferHeader {
    pub const SIZE: usize = 12;

    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), ParseFailure> {
        let mut region = fixed_region(bytes, Self::SIZE, "buffer header")?;
        let header = Self::read_from(&mut region)
            .map_err(|_| short_read("buffer header", Self::SIZE, bytes.len()))?;
        Ok((header, Self::SIZE))
    }

    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            header_size: reader.read_i32::<LE>()?,
            buffer_type: reader.read_i16::<LE>()?,
            bytes_per_point: reader.read_i16::<LE>()?,
            buffer_size: reader.read_i32::<LE>()?,
        })
    }

    /// Number of samples in the payload, `None` when the header is unusable
    /// (non-positive width or negative size).
    pub fn sample_count(&self) -> Option<usize> {
        if self.bytes_per_point <= 0 || self.buffer_size < 0 {
            return None;
        }
        Some(self.buffer_size as usize / self.bytes_per_point as usize)
    }
}

fn fixed_region<'a>(
    bytes: &'a [u8],
    size: usize,
    context: &str,
) -> Result<&'a [u8], ParseFailure> {
    bytes
        .get(..size)
        .ok_or_else(|| short_read(context, size, bytes.len()))
}

fn short_read(context: &str, needed: usize, available: usize) -> ParseFailure {
    ParseFailure::TruncatedData {
        context: context.to_string(),
        needed,
        available,
    }
}

/// Read a NUL-padded ASCII field. Anything after the first NUL is padding.
fn read_fixed_string<R: Read>(reader: &mut R, size: usize) -> io::Result<String> {
    let mut buffer = vec![0u8; size];
    reader.read_exact(&mut buffer)?;
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(size);
    Ok(String::from_utf8_lossy(&buffer[..end]).trim().to_string())
}
