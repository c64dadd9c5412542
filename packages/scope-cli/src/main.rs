use clap::Parser;
use std::fs::File;
use std::path::Path;

mod cli;
mod commands;
mod exit_codes;
mod output;

use cli::Cli;

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<(), String> {
    let mut builder = env_logger::Builder::new();
    builder.format_timestamp(None);

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| format!("Failed to create log file '{}': {}", path.display(), e))?;
            builder
                .filter_level(log::LevelFilter::Trace)
                .format_timestamp_millis()
                .target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            let log_level = match verbose {
                0 => log::LevelFilter::Warn,
                1 => log::LevelFilter::Info,
                2 => log::LevelFilter::Debug,
                _ => log::LevelFilter::Trace,
            };
            builder.filter_level(log_level);
        }
    }

    builder.init();
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("Error: {}", e);
        std::process::exit(exit_codes::INPUT_ERROR);
    }

    let exit_code = match cli.command {
        cli::Command::Convert(args) => commands::convert::execute(args),
        cli::Command::Average(args) => commands::average::execute(args),
        cli::Command::Inspect(args) => commands::inspect::execute(args),
    };

    std::process::exit(exit_code);
}
