//! Table output: CSV writers, atomic file replacement and the on-disk layout

pub mod csv;
pub mod path;

pub use path::OutputLayout;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV read or write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),

    /// Table shape does not match its header
    #[error("invalid table: {0}")]
    InvalidTable(String),

    /// Target exists and must not be replaced
    #[error("refusing to overwrite existing file {0}")]
    AlreadyExists(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer trait
pub trait OutputWriter {
    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and finalize output
    fn close(self) -> OutputResult<()>;
}

/// Writer for rows of a [`crate::Table`]
pub trait RowWriter: OutputWriter {
    /// Write a single row; its width must match the header
    fn write_row(&mut self, row: &[String]) -> OutputResult<()>;

    /// Write multiple rows at once
    fn write_rows(&mut self, rows: &[Vec<String>]) -> OutputResult<()> {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }
}
