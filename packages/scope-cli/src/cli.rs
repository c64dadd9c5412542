use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "scopeconv",
    version,
    about = "Convert Infiniium binary waveform captures to SQLite",
    long_about = "Decode a directory of Agilent/Keysight Infiniium binary waveform files \
                  (wav*.bin) and store their metadata and samples in waveforms.sqlite."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write the full (trace level) log to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert a directory of capture files into a SQLite database
    Convert(ConvertArgs),
    /// Recompute the average waveform of an existing database
    Average(AverageArgs),
    /// Decode a single capture file and print its headers
    Inspect(InspectArgs),
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Directory holding the capture files
    #[arg(short, long)]
    pub dir: PathBuf,

    /// Directory receiving waveforms.sqlite
    #[arg(short, long = "out-directory", default_value = "./out")]
    pub out_directory: PathBuf,

    /// Also store the raw per-buffer samples (waveform_buffer table)
    #[arg(short = 'b', long, default_value_t = false)]
    pub save_buffers: bool,

    /// Samples held in memory before flushing [env: SCOPE_FLUSH_THRESHOLD]
    #[arg(long)]
    pub flush_threshold: Option<usize>,

    /// File name pattern inside --dir
    #[arg(long, default_value = scope_rs::config::DEFAULT_FILE_PATTERN)]
    pub pattern: String,

    /// Do not compute the average waveform after converting
    #[arg(long, default_value_t = false)]
    pub skip_average: bool,

    /// Print the conversion report as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Write the JSON report to this file instead of stdout
    #[arg(long)]
    pub report: Option<String>,
}

#[derive(Args)]
pub struct AverageArgs {
    /// Directory holding waveforms.sqlite
    #[arg(short, long = "out-directory", default_value = "./out")]
    pub out_directory: PathBuf,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Capture file to decode
    #[arg(long)]
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,
}
