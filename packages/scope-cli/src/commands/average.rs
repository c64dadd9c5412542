use crate::cli::AverageArgs;
use crate::exit_codes;
use crate::output;
use scope_rs::sqlite::DATABASE_FILE_NAME;
use scope_rs::{compute_averages, SqliteSink};

pub fn execute(args: AverageArgs) -> i32 {
    let database = args.out_directory.join(DATABASE_FILE_NAME);
    if !database.is_file() {
        eprintln!("Error: Database not found: {}", database.display());
        return exit_codes::INPUT_ERROR;
    }

    let summary = match SqliteSink::open(&database).and_then(|mut sink| compute_averages(&mut sink))
    {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::for_error(&e);
        }
    };

    if args.json {
        if let Err(e) = output::emit_json(&summary, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else {
        println!(
            "Averaged {} trigger(s) into {} rows",
            summary.triggers, summary.average_rows
        );
        println!(
            "Start-time variance: {}",
            output::format_optional(summary.start_time_variance)
        );
    }

    exit_codes::SUCCESS
}
