//! Builders for synthetic Infiniium capture files.
//!
//! Used by the unit tests in this crate, the integration tests and the CLI
//! tests, so the module is always compiled.

use std::path::Path;

/// One data buffer of a synthetic waveform.
#[derive(Debug, Clone)]
pub struct BufferSpec {
    header_size: i32,
    buffer_type: i16,
    bytes_per_point: i16,
    payload: Vec<u8>,
}

impl BufferSpec {
    /// Raw buffer with an arbitrary type code and width.
    pub fn raw(buffer_type: i16, bytes_per_point: i16, payload: &[u8]) -> Self {
        Self {
            header_size: 12,
            buffer_type,
            bytes_per_point,
            payload: payload.to_vec(),
        }
    }

    pub fn float32(samples: &[f32]) -> Self {
        let payload: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Self::raw(1, 4, &payload)
    }

    pub fn float64(samples: &[f64]) -> Self {
        let payload: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Self::raw(1, 8, &payload)
    }

    pub fn unsigned8(samples: &[u8]) -> Self {
        Self::raw(6, 1, samples)
    }

    pub fn unsigned16(samples: &[u16]) -> Self {
        let payload: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Self::raw(6, 2, &payload)
    }

    /// Override the declared header size.
    pub fn header_size(mut self, size: i32) -> Self {
        self.header_size = size;
        self
    }

    fn sample_count(&self) -> usize {
        if self.bytes_per_point <= 0 {
            return 0;
        }
        self.payload.len() / self.bytes_per_point as usize
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.header_size.to_le_bytes());
        out.extend_from_slice(&self.buffer_type.to_le_bytes());
        out.extend_from_slice(&self.bytes_per_point.to_le_bytes());
        out.extend_from_slice(&(self.payload.len() as i32).to_le_bytes());
        out.extend_from_slice(&self.payload);
    }
}

/// One synthetic waveform: header fields plus its buffers.
#[derive(Debug, Clone)]
pub struct WaveformSpec {
    label: String,
    header_size: i32,
    num_points: Option<i32>,
    x_increment: f64,
    x_origin: f64,
    x_units: i32,
    y_units: i32,
    date: String,
    time: String,
    frame: String,
    buffers: Vec<BufferSpec>,
}

impl WaveformSpec {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            header_size: 140,
            num_points: None,
            x_increment: 1e-9,
            x_origin: 0.0,
            x_units: 2,
            y_units: 1,
            date: "05 MAR 2023".to_string(),
            time: "14:02:11:27".to_string(),
            frame: "DSO9254A:MY1234".to_string(),
            buffers: Vec::new(),
        }
    }

    pub fn buffer(mut self, buffer: BufferSpec) -> Self {
        self.buffers.push(buffer);
        self
    }

    pub fn x_increment(mut self, value: f64) -> Self {
        self.x_increment = value;
        self
    }

    pub fn x_origin(mut self, value: f64) -> Self {
        self.x_origin = value;
        self
    }

    pub fn units(mut self, x_units: i32, y_units: i32) -> Self {
        self.x_units = x_units;
        self.y_units = y_units;
        self
    }

    pub fn timestamp(mut self, date: &str, time: &str) -> Self {
        self.date = date.to_string();
        self.time = time.to_string();
        self
    }

    /// Override the declared header size.
    pub fn header_size(mut self, size: i32) -> Self {
        self.header_size = size;
        self
    }

    /// Override the declared point count (defaults to the buffer total).
    pub fn num_points(mut self, points: i32) -> Self {
        self.num_points = Some(points);
        self
    }

    /// The 140-byte waveform header.
    pub fn header_bytes(&self) -> Vec<u8> {
        let points = self.num_points.unwrap_or_else(|| {
            self.buffers.iter().map(BufferSpec::sample_count).sum::<usize>() as i32
        });
        let mut out = Vec::with_capacity(140);
        out.extend_from_slice(&self.header_size.to_le_bytes());
        out.extend_from_slice(&1i32.to_le_bytes()); // waveform_type: normal
        out.extend_from_slice(&(self.buffers.len() as i32).to_le_bytes());
        out.extend_from_slice(&points.to_le_bytes());
        out.extend_from_slice(&1i32.to_le_bytes()); // count
        out.extend_from_slice(&((points as f32) * self.x_increment as f32).to_le_bytes());
        out.extend_from_slice(&self.x_origin.to_le_bytes());
        out.extend_from_slice(&self.x_increment.to_le_bytes());
        out.extend_from_slice(&self.x_origin.to_le_bytes());
        out.extend_from_slice(&self.x_units.to_le_bytes());
        out.extend_from_slice(&self.y_units.to_le_bytes());
        push_fixed(&mut out, &self.date, 16);
        push_fixed(&mut out, &self.time, 16);
        push_fixed(&mut out, &self.frame, 24);
        push_fixed(&mut out, &self.label, 16);
        out.extend_from_slice(&0f64.to_le_bytes()); // time_tag
        out.extend_from_slice(&0u32.to_le_bytes()); // segment_index
        out
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.header_bytes());
        for buffer in &self.buffers {
            buffer.write_to(out);
        }
    }
}

/// Assembles a complete capture file.
#[derive(Debug, Clone)]
pub struct WaveformFileBuilder {
    cookie: [u8; 2],
    version: [u8; 2],
    waveforms: Vec<WaveformSpec>,
}

impl Default for WaveformFileBuilder {
    fn default() -> Self {
        Self {
            cookie: *b"AG",
            version: *b"10",
            waveforms: Vec::new(),
        }
    }
}

impl WaveformFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cookie(mut self, cookie: [u8; 2]) -> Self {
        self.cookie = cookie;
        self
    }

    pub fn waveform(mut self, waveform: WaveformSpec) -> Self {
        self.waveforms.push(waveform);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for waveform in &self.waveforms {
            waveform.write_to(&mut body);
        }
        let mut out = Vec::with_capacity(12 + body.len());
        out.extend_from_slice(&self.cookie);
        out.extend_from_slice(&self.version);
        out.extend_from_slice(&((12 + body.len()) as i32).to_le_bytes());
        out.extend_from_slice(&(self.waveforms.len() as i32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    pub fn write(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, self.build())
    }
}

/// Capture file with one float waveform per `(label, samples)` pair.
pub fn simple_capture(channels: &[(&str, &[f32])]) -> Vec<u8> {
    channels
        .iter()
        .fold(WaveformFileBuilder::new(), |builder, (label, samples)| {
            builder.waveform(WaveformSpec::new(label).buffer(BufferSpec::float32(samples)))
        })
        .build()
}

fn push_fixed(out: &mut Vec<u8>, value: &str, size: usize) {
    let mut field = value.as_bytes().to_vec();
    field.resize(size, 0);
    out.extend_from_slice(&field);
}
