use crate::types::StatusRecord;
use csv::Writer;
use std::{
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use thiserror::Error;

pub const HEADER: [&str; 6] = [
    "Subdomain",
    "Status Code",
    "DNS Resolution",
    "Response Time",
    "Server Info",
    "Status",
];

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Permission denied when writing to '{}'.", .0.display())]
    PermissionDenied(PathBuf),
    #[error("Cannot create '{}': {source}", .path.display())]
    Create { path: PathBuf, source: io::Error },
    #[error("Failed to write result row: {0}")]
    Write(#[from] csv::Error),
    #[error("Failed to flush results: {0}")]
    Flush(#[from] io::Error),
}

/// CSV table of results, one row appended per finished host.
pub struct CsvSink<W: Write> {
    writer: Mutex<Writer<W>>,
}

impl CsvSink<File> {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let file = File::create(path).map_err(|source| {
            if source.kind() == io::ErrorKind::PermissionDenied {
                SinkError::PermissionDenied(path.to_path_buf())
            } else {
                SinkError::Create {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::new(file)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Result<Self, SinkError> {
        let mut writer = Writer::from_writer(inner);
        writer.write_record(HEADER)?;
        writer.flush()?;
        Ok(Self {
            writer: Mutex::new(writer),
        })
    }

    /// Rows are flushed immediately so a partial scan still leaves a usable file.
    pub fn write(&self, record: &StatusRecord) -> Result<(), SinkError> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_record(record.to_row())?;
        writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        let writer = self.writer.into_inner().unwrap_or_else(PoisonError::into_inner);
        writer
            .into_inner()
            .map_err(|e| SinkError::Flush(e.into_error()))
    }
}
