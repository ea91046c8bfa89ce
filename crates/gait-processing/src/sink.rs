//! Persistence of phase-indexed tables

use gait_core::{GaitError, GaitResult, Table};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// How a write treats existing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteMode {
    /// Replace any existing output
    Fresh,
    /// Add rows after existing output with the same schema
    Append,
}

impl Default for WriteMode {
    fn default() -> Self {
        WriteMode::Fresh
    }
}

/// Destination for phase-indexed tables
pub trait TableSink: Send {
    fn write(&mut self, table: &Table, mode: WriteMode) -> GaitResult<()>;

    /// Human-readable destination, for logs
    fn describe(&self) -> String;
}

fn csv_error(error: csv::Error) -> GaitError {
    GaitError::Persistence {
        reason: error.to_string(),
    }
}

/// Writes tables to a CSV file with a header row
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header of the existing file, or `None` if it is absent or empty
    fn existing_header(&self) -> GaitResult<Option<Vec<String>>> {
        match std::fs::metadata(&self.path) {
            Ok(meta) if meta.len() > 0 => {}
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let mut reader = csv::Reader::from_path(&self.path).map_err(csv_error)?;
        let header = reader.headers().map_err(csv_error)?;
        Ok(Some(header.iter().map(str::to_string).collect()))
    }

    fn write_rows<W: std::io::Write>(writer: &mut csv::Writer<W>, table: &Table) -> GaitResult<()> {
        let mut record = Vec::with_capacity(table.n_columns());
        for row in 0..table.n_rows() {
            record.clear();
            for column in table.columns() {
                let cell = column.data.cell(row).map(|v| v.to_string()).unwrap_or_default();
                record.push(cell);
            }
            writer.write_record(&record).map_err(csv_error)?;
        }
        Ok(())
    }
}

impl TableSink for CsvSink {
    fn write(&mut self, table: &Table, mode: WriteMode) -> GaitResult<()> {
        let columns = table.column_names();
        let header = match mode {
            WriteMode::Fresh => None,
            WriteMode::Append => self.existing_header()?,
        };

        if let Some(existing) = &header {
            if *existing != columns {
                return Err(GaitError::SchemaMismatch {
                    expected: existing.clone(),
                    actual: columns,
                });
            }
        }

        let file = match (mode, &header) {
            (WriteMode::Append, Some(_)) => OpenOptions::new().append(true).open(&self.path)?,
            _ => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.path)?,
        };

        let mut writer = csv::Writer::from_writer(file);
        if header.is_none() {
            writer.write_record(&columns).map_err(csv_error)?;
        }
        Self::write_rows(&mut writer, table)?;
        writer.flush()?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Accumulates written tables in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    table: Table,
    writes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Number of successful writes
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn into_table(self) -> Table {
        self.table
    }
}

impl TableSink for MemorySink {
    fn write(&mut self, table: &Table, mode: WriteMode) -> GaitResult<()> {
        match mode {
            WriteMode::Fresh => self.table = table.clone(),
            WriteMode::Append => self.table.append(table)?,
        }
        self.writes += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
