//! Infiniium unit codes, as stored in the `x_units`/`y_units` header fields.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Unit {
    Volts,
    Seconds,
    Constant,
    Amps,
    #[serde(rename = "dB")]
    Decibel,
    #[serde(rename = "Hz")]
    Hertz,
    Unknown,
}

impl Unit {
    /// Unmapped codes degrade to `Unknown` instead of failing the parse.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Unit::Volts,
            2 => Unit::Seconds,
            3 => Unit::Constant,
            4 => Unit::Amps,
            5 => Unit::Decibel,
            6 => Unit::Hertz,
            _ => Unit::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Volts => "Volts",
            Unit::Seconds => "Seconds",
            Unit::Constant => "Constant",
            Unit::Amps => "Amps",
            Unit::Decibel => "dB",
            Unit::Hertz => "Hz",
            Unit::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Translate a raw unit code straight to its display name.
pub fn translate(code: i32) -> &'static str {
    Unit::from_code(code).as_str()
}
