pub mod accumulator;
pub mod aggregate;
pub mod config;
pub mod error;
pub mod header;
pub mod mmap_utils;
pub mod pipeline;
pub mod reconstruct;
pub mod records;
pub mod registry;
pub mod sink;
pub mod sqlite;
pub mod testing;
pub mod units;

pub use accumulator::{BatchAccumulator, FlushStats};
pub use aggregate::{compute_averages, AggregateSummary};
pub use config::ConvertConfig;
pub use error::{ConvertError, ParseFailure, Result};
pub use pipeline::{convert_directory, convert_files, ConversionReport, SkippedFile};
pub use reconstruct::{parse_file, ParseOptions};
pub use records::*;
pub use registry::ChannelRegistry;
pub use sink::{BatchSink, MemorySink, TableBatch, WriteMode};
pub use sqlite::SqliteSink;
pub use units::Unit;
