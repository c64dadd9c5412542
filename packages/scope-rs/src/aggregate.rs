//! Post-conversion statistics over the persisted `waveforms` table.

use crate::error::{ConvertError, Result};
use crate::records::AverageSampleRow;
use crate::sink::{BatchSink, TableBatch, WriteMode};
use crate::sqlite::SqliteSink;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub triggers: usize,
    pub average_rows: usize,
    /// Sample variance of the first time value across triggers.
    pub start_time_variance: Option<f64>,
}

/// Sample variance (n - 1 denominator). `None` for fewer than two values.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some(squares / (n - 1.0))
}

/// Rebuild `average_waveform` from `waveforms` and compute the trigger
/// start-time variance.
pub fn compute_averages(sink: &mut SqliteSink) -> Result<AggregateSummary> {
    if !sink.has_table("waveforms")? {
        return Err(ConvertError::MissingTable("waveforms"));
    }

    log::info!("Computing average waveform");
    let conn = sink.connection();
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_waveforms_sample
            ON waveforms (channel_idx, waveform_idx, x_idx);",
    )?;

    let averages: Vec<AverageSampleRow> = {
        let mut stmt = conn.prepare(
            "SELECT waveform_idx, channel_idx, x_idx, AVG(x) AS x, AVG(y) AS y
             FROM waveforms
             GROUP BY x_idx, waveform_idx, channel_idx
             ORDER BY channel_idx, waveform_idx, x_idx",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(AverageSampleRow {
                waveform_idx: row.get::<_, i64>(0)? as usize,
                channel_idx: row.get::<_, i64>(1)? as usize,
                x_idx: row.get::<_, i64>(2)? as usize,
                x: row.get(3)?,
                y: row.get::<_, Option<f64>>(4)?.unwrap_or(f64::NAN),
            })
        })?;
        rows.collect::<rusqlite::Result<_>>()?
    };

    let start_times: Vec<f64> = {
        let mut stmt = conn.prepare("SELECT x FROM waveforms WHERE x_idx = 0")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<_>>()?
    };

    let triggers: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT n_trigger) FROM waveforms",
        [],
        |row| row.get(0),
    )?;

    sink.write_batch(TableBatch::Average(&averages), WriteMode::Replace)?;

    let start_time_variance = sample_variance(&start_times);
    match start_time_variance {
        Some(variance) => log::info!("Variance of trigger start times: {:e}", variance),
        None => log::warn!("Fewer than two start samples, start-time variance undefined"),
    }

    Ok(AggregateSummary {
        triggers: triggers as usize,
        average_rows: averages.len(),
        start_time_variance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::WaveformSampleRow;
    use std::collections::BTreeMap;

    /// Mean `x` and `y` per `(channel_idx, waveform_idx, x_idx)`.
    ///
    /// `NaN` amplitudes are left out of the mean the way SQL `AVG` skips NULL.
    fn average_samples(samples: &[WaveformSampleRow]) -> Vec<AverageSampleRow> {
        #[derive(Default)]
        struct Sums {
            x: f64,
            n: usize,
            y: f64,
            ny: usize,
        }

        let mut groups: BTreeMap<(usize, usize, usize), Sums> = BTreeMap::new();
        for row in samples {
            let sums = groups
                .entry((row.channel_idx, row.waveform_idx, row.x_idx))
                .or_default();
            sums.x += row.x;
            sums.n += 1;
            if !row.y.is_nan() {
                sums.y += row.y;
                sums.ny += 1;
            }
        }

        groups
            .into_iter()
            .map(|((channel_idx, waveform_idx, x_idx), sums)| AverageSampleRow {
                channel_idx,
                waveform_idx,
                x_idx,
                x: sums.x / sums.n as f64,
                y: if sums.ny == 0 {
                    f64::NAN
                } else {
                    sums.y / sums.ny as f64
                },
            })
            .collect()
    }

    fn row(n_trigger: u64, x_idx: usize, x: f64, y: f64) -> WaveformSampleRow {
        WaveformSampleRow {
            n_trigger,
            channel_idx: 0,
            waveform_idx: 0,
            x_idx,
            x,
            y,
        }
    }

    #[test]
    fn test_sample_variance() {
        assert_eq!(sample_variance(&[]), None);
        assert_eq!(sample_variance(&[1.0]), None);
        assert_eq!(sample_variance(&[1.0, 3.0]), Some(2.0));
        assert_eq!(
            sample_variance(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]),
            Some(32.0 / 7.0)
        );
    }

    #[test]
    fn test_average_samples_groups_by_index() {
        let samples = [
            row(0, 0, 0.0, 1.0),
            row(0, 1, 1.0, 3.0),
            row(1, 0, 0.5, 2.0),
            row(1, 1, 1.5, f64::NAN),
        ];
        let averages = average_samples(&samples);
        assert_eq!(averages.len(), 2);
        assert_eq!(averages[0].x, 0.25);
        assert_eq!(averages[0].y, 1.5);
        assert_eq!(averages[1].x, 1.25);
        assert_eq!(averages[1].y, 3.0);
    }

    #[test]
    fn test_compute_averages_matches_in_memory() {
        let samples = [
            row(0, 0, 0.0, 1.0),
            row(0, 1, 1.0, 3.0),
            row(1, 0, 0.5, 2.0),
            row(1, 1, 1.5, 5.0),
        ];
        let mut sink = SqliteSink::in_memory().unwrap();
        sink.write_batch(TableBatch::Samples(&samples), WriteMode::Replace)
            .unwrap();

        let summary = compute_averages(&mut sink).unwrap();
        assert_eq!(summary.triggers, 2);
        assert_eq!(summary.average_rows, 2);
        assert_eq!(summary.start_time_variance, Some(0.125));
        assert_eq!(sink.row_count("average_waveform").unwrap(), 2);

        let y: f64 = sink
            .connection()
            .query_row(
                "SELECT y FROM average_waveform WHERE x_idx = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(y, average_samples(&samples)[1].y);
    }

    #[test]
    fn test_compute_averages_is_rerunnable() {
        let samples = [row(0, 0, 0.0, 1.0)];
        let mut sink = SqliteSink::in_memory().unwrap();
        sink.write_batch(TableBatch::Samples(&samples), WriteMode::Replace)
            .unwrap();
        compute_averages(&mut sink).unwrap();
        let summary = compute_averages(&mut sink).unwrap();
        assert_eq!(summary.start_time_variance, None);
        assert_eq!(sink.row_count("average_waveform").unwrap(), 1);
    }

    #[test]
    fn test_missing_waveforms_table() {
        let mut sink = SqliteSink::in_memory().unwrap();
        let err = compute_averages(&mut sink).unwrap_err();
        assert!(matches!(err, ConvertError::MissingTable("waveforms")));
    }
}
