//! SQLite-backed [`BatchSink`].

use crate::error::Result;
use crate::records::{
    AverageSampleRow, BufferMetadataRow, BufferSampleRow, ChannelMapRow, RunMetadataRow,
    WaveformMetadataRow, WaveformSampleRow,
};
use crate::sink::{BatchSink, TableBatch, WriteMode};
use rusqlite::{params, Connection, Transaction};
use std::path::Path;

/// Name of the database file inside the output directory.
pub const DATABASE_FILE_NAME: &str = "waveforms.sqlite";

const RUN_METADATA_COLUMNS: &str = "
    n_trigger INTEGER NOT NULL,
    file_name TEXT NOT NULL,
    file_version INTEGER,
    file_size INTEGER NOT NULL,
    number_waveforms INTEGER NOT NULL";

const WAVEFORM_METADATA_COLUMNS: &str = "
    channel_idx INTEGER NOT NULL,
    waveform_idx INTEGER NOT NULL,
    n_trigger INTEGER NOT NULL,
    header_size INTEGER NOT NULL,
    waveform_type INTEGER NOT NULL,
    number_buffers INTEGER NOT NULL,
    number_points INTEGER NOT NULL,
    count INTEGER NOT NULL,
    x_display_range REAL NOT NULL,
    x_display_origin REAL NOT NULL,
    x_increment REAL NOT NULL,
    x_origin REAL NOT NULL,
    raw_x_units INTEGER NOT NULL,
    raw_y_units INTEGER NOT NULL,
    x_units TEXT NOT NULL,
    y_units TEXT NOT NULL,
    date TEXT NOT NULL,
    time TEXT NOT NULL,
    datetime TEXT,
    frame TEXT NOT NULL,
    channel TEXT NOT NULL,
    time_tag REAL NOT NULL,
    segment_index INTEGER NOT NULL";

const BUFFER_METADATA_COLUMNS: &str = "
    channel_idx INTEGER NOT NULL,
    waveform_idx INTEGER NOT NULL,
    buffer_idx INTEGER NOT NULL,
    n_trigger INTEGER NOT NULL,
    header_size INTEGER NOT NULL,
    buffer_type INTEGER NOT NULL,
    bytes_per_point INTEGER NOT NULL,
    buffer_size INTEGER NOT NULL,
    x_units TEXT NOT NULL,
    y_units TEXT NOT NULL";

const BUFFER_SAMPLE_COLUMNS: &str = "
    channel_idx INTEGER NOT NULL,
    waveform_idx INTEGER NOT NULL,
    buffer_idx INTEGER NOT NULL,
    n_trigger INTEGER NOT NULL,
    x REAL NOT NULL,
    y REAL,
    x_idx INTEGER NOT NULL";

const SAMPLE_COLUMNS: &str = "
    channel_idx INTEGER NOT NULL,
    waveform_idx INTEGER NOT NULL,
    n_trigger INTEGER NOT NULL,
    x REAL NOT NULL,
    y REAL,
    x_idx INTEGER NOT NULL";

const CHANNEL_MAP_COLUMNS: &str = "
    channel_name TEXT NOT NULL,
    channel_idx INTEGER NOT NULL";

const AVERAGE_COLUMNS: &str = "
    waveform_idx INTEGER NOT NULL,
    channel_idx INTEGER NOT NULL,
    x_idx INTEGER NOT NULL,
    x REAL NOT NULL,
    y REAL";

pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Open (or create) the database at `path` and tune it for bulk loads.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        log::info!("Opened waveform database at {}", path.display());
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;",
        )?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn has_table(&self, table: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Number of rows in `table`, `0` when it does not exist.
    pub fn row_count(&self, table: &str) -> Result<i64> {
        if !self.has_table(table)? {
            return Ok(0);
        }
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }
}

fn columns_for(batch: &TableBatch<'_>) -> &'static str {
    match batch {
        TableBatch::RunMetadata(_) => RUN_METADATA_COLUMNS,
        TableBatch::WaveformMetadata(_) => WAVEFORM_METADATA_COLUMNS,
        TableBatch::BufferMetadata(_) => BUFFER_METADATA_COLUMNS,
        TableBatch::BufferSamples(_) => BUFFER_SAMPLE_COLUMNS,
        TableBatch::Samples(_) => SAMPLE_COLUMNS,
        TableBatch::ChannelMap(_) => CHANNEL_MAP_COLUMNS,
        TableBatch::Average(_) => AVERAGE_COLUMNS,
    }
}

fn prepare_table(tx: &Transaction<'_>, batch: &TableBatch<'_>, mode: WriteMode) -> Result<()> {
    let table = batch.table_name();
    let columns = columns_for(batch);
    let ddl = match mode {
        WriteMode::Replace => format!(
            "DROP TABLE IF EXISTS {table};
             CREATE TABLE {table} ({columns});"
        ),
        WriteMode::Append => format!("CREATE TABLE IF NOT EXISTS {table} ({columns});"),
    };
    tx.execute_batch(&ddl)?;
    Ok(())
}

fn insert_rows(tx: &Transaction<'_>, batch: &TableBatch<'_>) -> Result<()> {
    match *batch {
        TableBatch::RunMetadata(rows) => insert_run_metadata(tx, rows),
        TableBatch::WaveformMetadata(rows) => insert_waveform_metadata(tx, rows),
        TableBatch::BufferMetadata(rows) => insert_buffer_metadata(tx, rows),
        TableBatch::BufferSamples(rows) => insert_buffer_samples(tx, rows),
        TableBatch::Samples(rows) => insert_samples(tx, rows),
        TableBatch::ChannelMap(rows) => insert_channel_map(tx, rows),
        TableBatch::Average(rows) => insert_average(tx, rows),
    }
}

fn insert_run_metadata(tx: &Transaction<'_>, rows: &[RunMetadataRow]) -> Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO run_metadata (n_trigger, file_name, file_version, file_size, number_waveforms)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for row in rows {
        stmt.execute(params![
            row.n_trigger as i64,
            row.file_name,
            row.file_version,
            row.file_size,
            row.number_waveforms,
        ])?;
    }
    Ok(())
}

fn insert_waveform_metadata(tx: &Transaction<'_>, rows: &[WaveformMetadataRow]) -> Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO waveform_metadata (
            channel_idx, waveform_idx, n_trigger, header_size, waveform_type,
            number_buffers, number_points, count, x_display_range, x_display_origin,
            x_increment, x_origin, raw_x_units, raw_y_units, x_units, y_units,
            date, time, datetime, frame, channel, time_tag, segment_index
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                   ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
    )?;
    for row in rows {
        stmt.execute(params![
            row.channel_idx as i64,
            row.waveform_idx as i64,
            row.n_trigger as i64,
            row.header_size,
            row.waveform_type,
            row.number_buffers,
            row.number_points,
            row.count,
            row.x_display_range as f64,
            row.x_display_origin,
            row.x_increment,
            row.x_origin,
            row.raw_x_units,
            row.raw_y_units,
            row.x_units.as_str(),
            row.y_units.as_str(),
            row.date,
            row.time,
            row.datetime,
            row.frame,
            row.channel,
            row.time_tag,
            row.segment_index,
        ])?;
    }
    Ok(())
}

fn insert_buffer_metadata(tx: &Transaction<'_>, rows: &[BufferMetadataRow]) -> Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO waveform_buffer_metadata (
            channel_idx, waveform_idx, buffer_idx, n_trigger, header_size,
            buffer_type, bytes_per_point, buffer_size, x_units, y_units
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    for row in rows {
        stmt.execute(params![
            row.channel_idx as i64,
            row.waveform_idx as i64,
            row.buffer_idx as i64,
            row.n_trigger as i64,
            row.header_size,
            row.buffer_type,
            row.bytes_per_point,
            row.buffer_size,
            row.x_units.as_str(),
            row.y_units.as_str(),
        ])?;
    }
    Ok(())
}

/// `NaN` has no SQLite representation; store it as NULL.
fn nullable(value: f64) -> Option<f64> {
    (!value.is_nan()).then_some(value)
}

fn insert_buffer_samples(tx: &Transaction<'_>, rows: &[BufferSampleRow]) -> Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO waveform_buffer (channel_idx, waveform_idx, buffer_idx, n_trigger, x, y, x_idx)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for row in rows {
        stmt.execute(params![
            row.channel_idx as i64,
            row.waveform_idx as i64,
            row.buffer_idx as i64,
            row.n_trigger as i64,
            row.x,
            nullable(row.y),
            row.x_idx as i64,
        ])?;
    }
    Ok(())
}

fn insert_samples(tx: &Transaction<'_>, rows: &[WaveformSampleRow]) -> Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO waveforms (channel_idx, waveform_idx, n_trigger, x, y, x_idx)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for row in rows {
        stmt.execute(params![
            row.channel_idx as i64,
            row.waveform_idx as i64,
            row.n_trigger as i64,
            row.x,
            nullable(row.y),
            row.x_idx as i64,
        ])?;
    }
    Ok(())
}

fn insert_channel_map(tx: &Transaction<'_>, rows: &[ChannelMapRow]) -> Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO channel_map (channel_name, channel_idx) VALUES (?1, ?2)",
    )?;
    for row in rows {
        stmt.execute(params![row.channel_name, row.channel_idx as i64])?;
    }
    Ok(())
}

fn insert_average(tx: &Transaction<'_>, rows: &[AverageSampleRow]) -> Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO average_waveform (waveform_idx, channel_idx, x_idx, x, y)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for row in rows {
        stmt.execute(params![
            row.waveform_idx as i64,
            row.channel_idx as i64,
            row.x_idx as i64,
            row.x,
            nullable(row.y),
        ])?;
    }
    Ok(())
}

impl BatchSink for SqliteSink {
    fn write_batch(&mut self, batch: TableBatch<'_>, mode: WriteMode) -> Result<()> {
        let tx = self.conn.transaction()?;
        prepare_table(&tx, &batch, mode)?;
        insert_rows(&tx, &batch)?;
        tx.commit()?;
        log::debug!(
            "Wrote {} rows to {} ({:?})",
            batch.len(),
            batch.table_name(),
            mode
        );
        Ok(())
    }
}
