//! CSV table reading and writing
//!
//! Checkpoints and the aggregate are written through [`write_table_atomic`] or
//! [`write_table_new`]: rows go to a temp file in the target directory, which
//! is synced and then renamed over (or next to) the target. Readers never see
//! a half-written file.

use csv::{ReaderBuilder, Writer};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use super::{OutputError, OutputResult, OutputWriter, RowWriter};
use crate::Table;

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// CSV writer for table rows
pub struct CsvTableWriter<W: Write> {
    writer: Writer<W>,
    columns: usize,
    rows_written: u64,
}

impl CsvTableWriter<BufWriter<File>> {
    /// Create `path` (and its parent directory) and write the header row
    pub fn create<P: AsRef<Path>>(path: P, headers: &[String]) -> OutputResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), columns = headers.len(), "Creating CSV writer");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {e}")))?;
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {e}")))?;

        Self::from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file), headers)
    }
}

impl<W: Write> CsvTableWriter<W> {
    /// Wrap an arbitrary sink and write the header row
    ///
    /// An empty header writes nothing, so a table with no columns round-trips
    /// as an empty file.
    pub fn from_writer(inner: W, headers: &[String]) -> OutputResult<Self> {
        let mut writer = Writer::from_writer(inner);
        if !headers.is_empty() {
            writer
                .write_record(headers)
                .map_err(|e| OutputError::CsvError(format!("Failed to write header: {e}")))?;
        }
        Ok(Self {
            writer,
            columns: headers.len(),
            rows_written: 0,
        })
    }

    /// Rows written so far, header excluded
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush and hand back the underlying sink
    pub fn into_inner(self) -> OutputResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))
    }
}

impl<W: Write> RowWriter for CsvTableWriter<W> {
    fn write_row(&mut self, row: &[String]) -> OutputResult<()> {
        if row.len() != self.columns {
            return Err(OutputError::InvalidTable(format!(
                "row has {} cells, header has {}",
                row.len(),
                self.columns
            )));
        }

        self.writer
            .write_record(row)
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {e}")))?;
        self.rows_written += 1;
        Ok(())
    }
}

impl<W: Write> OutputWriter for CsvTableWriter<W> {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))
    }

    fn close(mut self) -> OutputResult<()> {
        self.flush()?;
        debug!(rows = self.rows_written, "CSV writer closed");
        Ok(())
    }
}

/// Read a CSV file with a header row into a [`Table`]
pub fn read_table(path: &Path) -> OutputResult<Table> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| OutputError::CsvError(format!("Failed to open {}: {e}", path.display())))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| OutputError::CsvError(format!("Failed to read header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            OutputError::CsvError(format!("Failed to read {}: {e}", path.display()))
        })?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Table::new(headers, rows).map_err(OutputError::InvalidTable)
}

/// Write `table` to `path`, atomically replacing any existing file
pub fn write_table_atomic(path: &Path, table: &Table) -> OutputResult<()> {
    let temp = stage_table(path, table)?;
    temp.persist(path)
        .map_err(|e| OutputError::IoError(format!("Failed to persist temp file: {e}")))?;
    sync_parent(path);

    info!(path = %path.display(), rows = table.len(), "Table written");
    Ok(())
}

/// Write `table` to `path`, failing if `path` already exists
pub fn write_table_new(path: &Path, table: &Table) -> OutputResult<()> {
    if path.exists() {
        return Err(OutputError::AlreadyExists(path.display().to_string()));
    }

    let temp = stage_table(path, table)?;
    temp.persist_noclobber(path).map_err(|e| {
        if e.error.kind() == std::io::ErrorKind::AlreadyExists {
            OutputError::AlreadyExists(path.display().to_string())
        } else {
            OutputError::IoError(format!("Failed to persist temp file: {}", e.error))
        }
    })?;
    sync_parent(path);

    debug!(path = %path.display(), rows = table.len(), "Table written");
    Ok(())
}

/// Write a table into a synced temp file next to `path`
fn stage_table(path: &Path, table: &Table) -> OutputResult<tempfile::NamedTempFile> {
    let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent_dir)
        .map_err(|e| OutputError::IoError(format!("Failed to create directory: {e}")))?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
        .map_err(|e| OutputError::IoError(format!("Failed to create temp file: {e}")))?;

    {
        let sink = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, temp_file.as_file_mut());
        let mut writer = CsvTableWriter::from_writer(sink, table.headers())?;
        writer.write_rows(table.rows())?;
        writer
            .into_inner()?
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush temp file: {e}")))?;
    }

    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| OutputError::IoError(format!("Failed to sync temp file: {e}")))?;

    Ok(temp_file)
}

fn sync_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}
