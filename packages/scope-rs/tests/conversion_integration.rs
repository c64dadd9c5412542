use rusqlite::Connection;
use scope_rs::testing::{simple_capture, BufferSpec, WaveformFileBuilder, WaveformSpec};
use scope_rs::{convert_directory, convert_files, ConvertConfig, MemorySink};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn ramp(len: usize, offset: f32) -> Vec<f32> {
    (0..len).map(|i| i as f32 * 0.5 + offset).collect()
}

fn write_run(dir: &Path, triggers: usize, points: usize) -> Vec<PathBuf> {
    (0..triggers)
        .map(|i| {
            let ch1 = ramp(points, i as f32);
            let ch2 = ramp(points, -(i as f32));
            let path = dir.join(format!("wav{:04}.bin", i + 1));
            std::fs::write(
                &path,
                simple_capture(&[("CHAN1", ch1.as_slice()), ("CHAN2", ch2.as_slice())]),
            )
            .unwrap();
            path
        })
        .collect()
}

fn query_i64(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

#[test]
fn test_three_good_one_bad_end_to_end() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_run(input.path(), 3, 8);

    // Sorts between the good files and fails with a point-count mismatch.
    WaveformFileBuilder::new()
        .waveform(
            WaveformSpec::new("CHAN7")
                .num_points(10)
                .buffer(BufferSpec::float32(&[1.0, 2.0])),
        )
        .write(input.path().join("wav0002a.bin"))
        .unwrap();

    let config = ConvertConfig::new(input.path(), output.path());
    let report = convert_directory(&config, None).unwrap();

    assert_eq!(report.files_seen, 4);
    assert_eq!(report.files_converted, 3);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].file_name, "wav0002a.bin");
    assert_eq!(report.skipped[0].kind, "PointCountMismatch");

    let conn = Connection::open(output.path().join("waveforms.sqlite")).unwrap();
    assert_eq!(query_i64(&conn, "SELECT COUNT(*) FROM run_metadata"), 3);

    let mut stmt = conn
        .prepare("SELECT n_trigger FROM run_metadata ORDER BY n_trigger")
        .unwrap();
    let triggers: Vec<i64> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(triggers, vec![0, 1, 2]);

    assert_eq!(query_i64(&conn, "SELECT COUNT(*) FROM waveforms"), 3 * 2 * 8);
    assert_eq!(query_i64(&conn, "SELECT COUNT(*) FROM channel_map"), 2);
    assert_eq!(
        query_i64(&conn, "SELECT COUNT(*) FROM channel_map WHERE channel_name = 'CHAN7'"),
        0
    );
    assert_eq!(query_i64(&conn, "SELECT COUNT(*) FROM average_waveform"), 2 * 8);

    let aggregate = report.aggregate.unwrap();
    assert_eq!(aggregate.triggers, 3);
    // Every trigger starts at x_origin = 0.
    assert_eq!(aggregate.start_time_variance, Some(0.0));
}

#[test]
fn test_waveform_rows_match_declared_points() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_run(input.path(), 2, 13);

    let config = ConvertConfig::new(input.path(), output.path());
    convert_directory(&config, None).unwrap();

    let conn = Connection::open(config.database_path()).unwrap();
    let mismatches = query_i64(
        &conn,
        "SELECT COUNT(*) FROM waveform_metadata m
         WHERE m.number_points != (
            SELECT COUNT(*) FROM waveforms w
            WHERE w.n_trigger = m.n_trigger
              AND w.channel_idx = m.channel_idx
              AND w.waveform_idx = m.waveform_idx)",
    );
    assert_eq!(mismatches, 0);
}

#[test]
fn test_flush_threshold_does_not_change_output() {
    let input = tempdir().unwrap();
    let paths = write_run(input.path(), 5, 20);

    let mut outputs = Vec::new();
    for threshold in [1, 45, 10_000] {
        let config = ConvertConfig {
            flush_threshold: threshold,
            save_buffers: true,
            ..ConvertConfig::new(input.path(), "unused")
        };
        let (sink, report) = convert_files(&paths, MemorySink::new(), &config, None).unwrap();
        assert!(report.flushes >= 1);
        outputs.push(sink);
    }

    let reference = &outputs[2];
    assert_eq!(reference.samples.len(), 5 * 2 * 20);
    for sink in &outputs[..2] {
        assert_eq!(sink.run_metadata, reference.run_metadata);
        assert_eq!(sink.waveform_metadata, reference.waveform_metadata);
        assert_eq!(sink.buffer_metadata, reference.buffer_metadata);
        assert_eq!(sink.buffer_samples, reference.buffer_samples);
        assert_eq!(sink.samples, reference.samples);
        assert_eq!(sink.channel_map, reference.channel_map);
    }
}

#[test]
fn test_corrupt_files_write_no_rows() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();

    let mut truncated = simple_capture(&[("CHAN1", &[1.0, 2.0, 3.0, 4.0])]);
    truncated.truncate(truncated.len() - 6);
    std::fs::write(input.path().join("wav0001.bin"), truncated).unwrap();

    WaveformFileBuilder::new()
        .waveform(
            WaveformSpec::new("CHAN2")
                .buffer(BufferSpec::float32(&[1.0]))
                .header_size(100),
        )
        .write(input.path().join("wav0002.bin"))
        .unwrap();

    let config = ConvertConfig::new(input.path(), output.path());
    let report = convert_directory(&config, None).unwrap();
    assert_eq!(report.files_converted, 0);
    assert!(report.channels.is_empty());

    let conn = Connection::open(config.database_path()).unwrap();
    for table in [
        "run_metadata",
        "waveform_metadata",
        "waveform_buffer_metadata",
        "waveforms",
        "channel_map",
    ] {
        assert_eq!(
            query_i64(&conn, &format!("SELECT COUNT(*) FROM {}", table)),
            0,
            "{} should be empty",
            table
        );
    }
}

#[test]
fn test_rerun_replaces_previous_contents() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_run(input.path(), 2, 4);

    let config = ConvertConfig {
        save_buffers: true,
        ..ConvertConfig::new(input.path(), output.path())
    };
    convert_directory(&config, None).unwrap();
    convert_directory(&config, None).unwrap();

    let conn = Connection::open(config.database_path()).unwrap();
    assert_eq!(query_i64(&conn, "SELECT COUNT(*) FROM run_metadata"), 2);
    assert_eq!(query_i64(&conn, "SELECT COUNT(*) FROM waveform_buffer"), 2 * 2 * 4);
}

#[test]
fn test_rerun_without_buffers_clears_buffer_table() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_run(input.path(), 2, 4);

    let with_buffers = ConvertConfig {
        save_buffers: true,
        ..ConvertConfig::new(input.path(), output.path())
    };
    convert_directory(&with_buffers, None).unwrap();

    let without_buffers = ConvertConfig::new(input.path(), output.path());
    let report = convert_directory(&without_buffers, None).unwrap();
    assert_eq!(report.files_converted, 2);

    let conn = Connection::open(without_buffers.database_path()).unwrap();
    assert_eq!(query_i64(&conn, "SELECT COUNT(*) FROM waveform_buffer"), 0);
    assert_eq!(query_i64(&conn, "SELECT COUNT(*) FROM waveforms"), 2 * 2 * 4);
}

#[test]
fn test_units_and_timestamp_persisted() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    WaveformFileBuilder::new()
        .waveform(
            WaveformSpec::new("CHAN1")
                .units(6, 5)
                .timestamp("01 JAN 2024", "00:00:01:50")
                .buffer(BufferSpec::float32(&[0.0])),
        )
        .write(input.path().join("wav0001.bin"))
        .unwrap();

    let config = ConvertConfig::new(input.path(), output.path());
    convert_directory(&config, None).unwrap();

    let conn = Connection::open(config.database_path()).unwrap();
    let (x_units, y_units, datetime): (String, String, String) = conn
        .query_row(
            "SELECT x_units, y_units, datetime FROM waveform_metadata",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(x_units, "Hz");
    assert_eq!(y_units, "dB");
    assert!(datetime.starts_with("2024-01-01"));
}
