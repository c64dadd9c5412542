use crate::cli::InspectArgs;
use crate::exit_codes;
use crate::output;
use scope_rs::mmap_utils::mmap_file;
use scope_rs::{
    parse_file, BufferMetadataRow, ChannelRegistry, ParseOptions, RunMetadataRow,
    WaveformMetadataRow,
};
use serde::Serialize;

#[derive(Serialize)]
struct InspectOutput {
    file: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    run: Option<RunMetadataRow>,
    waveforms: Vec<WaveformMetadataRow>,
    buffers: Vec<BufferMetadataRow>,
    total_samples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn execute(args: InspectArgs) -> i32 {
    let file_name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());

    let bytes = match mmap_file(&args.file) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: {}: {}", args.file.display(), e);
            return exit_codes::INPUT_ERROR;
        }
    };

    let mut registry = ChannelRegistry::new();
    let options = ParseOptions {
        keep_buffer_samples: false,
    };
    let result = match parse_file(bytes.as_ref(), &file_name, 0, &mut registry, options) {
        Ok(records) => InspectOutput {
            file: file_name,
            valid: true,
            total_samples: records.samples.len(),
            run: Some(records.run),
            waveforms: records.waveforms,
            buffers: records.buffers,
            error_kind: None,
            error: None,
        },
        Err(failure) => InspectOutput {
            file: file_name,
            valid: false,
            run: None,
            waveforms: Vec::new(),
            buffers: Vec::new(),
            total_samples: 0,
            error_kind: Some(failure.kind()),
            error: Some(failure.to_string()),
        },
    };

    if args.json {
        if let Err(e) = output::emit_json(&result, args.compact, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else {
        print_text(&result);
    }

    if result.valid {
        exit_codes::SUCCESS
    } else {
        exit_codes::INPUT_ERROR
    }
}

fn print_text(result: &InspectOutput) {
    if let Some(ref error) = result.error {
        eprintln!(
            "Error: {} is not usable ({}): {}",
            result.file,
            result.error_kind.unwrap_or("Unknown"),
            error
        );
        return;
    }

    if let Some(ref run) = result.run {
        println!(
            "{}: version {}, {} bytes, {} waveform(s)",
            run.file_name,
            run.file_version
                .map(|v| v.to_string())
                .unwrap_or_else(|| "?".to_string()),
            run.file_size,
            run.number_waveforms
        );
    }
    for wf in &result.waveforms {
        println!(
            "  [{}] {:<8} {} points, dt={:e} {}, origin={:e}, y in {}, {} {}",
            wf.waveform_idx,
            wf.channel,
            wf.number_points,
            wf.x_increment,
            wf.x_units,
            wf.x_origin,
            wf.y_units,
            wf.date,
            wf.time
        );
        for buf in result
            .buffers
            .iter()
            .filter(|b| b.waveform_idx == wf.waveform_idx)
        {
            println!(
                "      buffer {}: type {}, {} bytes/point, {} bytes",
                buf.buffer_idx, buf.buffer_type, buf.bytes_per_point, buf.buffer_size
            );
        }
    }
    println!("Total samples: {}", result.total_samples);
}
