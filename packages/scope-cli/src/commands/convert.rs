use crate::cli::ConvertArgs;
use crate::exit_codes;
use crate::output;
use scope_rs::{convert_directory, ConversionReport, ConvertConfig};

fn build_config(args: &ConvertArgs) -> Result<ConvertConfig, scope_rs::ConvertError> {
    let mut config = ConvertConfig::from_env(&args.dir, &args.out_directory)?;
    if let Some(threshold) = args.flush_threshold {
        config.flush_threshold = threshold;
    }
    if args.save_buffers {
        config.save_buffers = true;
    }
    config.file_pattern = args.pattern.clone();
    config.compute_average = !args.skip_average;
    Ok(config)
}

pub fn execute(args: ConvertArgs) -> i32 {
    let config = match build_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::for_error(&e);
        }
    };

    log::info!(
        "Converting {} into {}",
        config.input_dir.display(),
        config.database_path().display()
    );

    let report = match convert_directory(&config, None) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::for_error(&e);
        }
    };

    if args.json || args.report.is_some() {
        if let Err(e) = output::emit_json(&report, args.compact, args.report.as_deref()) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    }
    if !args.json {
        print_summary(&report);
    }

    if report.has_skipped() {
        exit_codes::PARTIAL_FAILURE
    } else {
        exit_codes::SUCCESS
    }
}

fn print_summary(report: &ConversionReport) {
    println!(
        "Converted {} of {} file(s) in {} flush(es)",
        report.files_converted, report.files_seen, report.flushes
    );
    if let Some(ref database) = report.database {
        println!("Database: {}", database.display());
    }
    if !report.channels.is_empty() {
        println!("Channels: {}", report.channels.join(", "));
    }
    for (table, rows) in &report.rows_written {
        println!("  {:<26} {:>10} rows", table, rows);
    }
    if let Some(ref aggregate) = report.aggregate {
        println!(
            "Start-time variance over {} trigger(s): {}",
            aggregate.triggers,
            output::format_optional(aggregate.start_time_variance)
        );
    }
    for skipped in &report.skipped {
        eprintln!(
            "Skipped {} ({}): {}",
            skipped.file_name, skipped.kind, skipped.reason
        );
    }
}
