//! Channel renaming and unit conversion applied before phase processing
//!
//! Dataset adapters describe how their source columns map onto the toolkit's
//! channel names and units. Columns that are not mapped pass through
//! untouched.

use crate::error::{GaitError, GaitResult};
use crate::table::{Column, ColumnData, Table};
use serde::{Deserialize, Serialize};

/// Standard gravity used for body-weight normalization (m/s²)
pub const GRAVITY: f64 = 9.81;

/// One source → target channel rule: `target = source * scale + offset`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMap {
    pub source: String,
    pub target: String,
    pub scale: f64,
    pub offset: f64,
}

impl ChannelMap {
    /// Pure rename
    pub fn rename(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            scale: 1.0,
            offset: 0.0,
        }
    }

    /// Degrees to radians, optionally flipping the sign convention
    pub fn degrees_to_radians(source: &str, target: &str, flip_sign: bool) -> Self {
        let sign = if flip_sign { -1.0 } else { 1.0 };
        Self {
            source: source.to_string(),
            target: target.to_string(),
            scale: sign * std::f64::consts::PI / 180.0,
            offset: 0.0,
        }
    }

    /// Newtons to body-weight fraction for a subject of `mass_kg`
    pub fn newtons_to_body_weight(source: &str, target: &str, mass_kg: f64) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            scale: 1.0 / (mass_kg * GRAVITY),
            offset: 0.0,
        }
    }
}

/// Ordered set of channel rules for one source dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelMapping {
    pub entries: Vec<ChannelMap>,
}

impl ChannelMapping {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn with(mut self, entry: ChannelMap) -> Self {
        self.entries.push(entry);
        self
    }

    /// Produce a new table with mapped columns in place of their sources
    pub fn apply(&self, table: &Table) -> GaitResult<Table> {
        for entry in &self.entries {
            if !table.has_column(&entry.source) {
                return Err(GaitError::MissingChannel { name: entry.source.clone() });
            }
        }

        let mut columns = Vec::with_capacity(table.n_columns());
        for column in table.columns() {
            match self.entries.iter().find(|e| e.source == column.name) {
                Some(entry) => columns.push(Self::convert(entry, column)?),
                None => columns.push(column.clone()),
            }
        }
        Table::from_columns(columns)
    }

    fn convert(entry: &ChannelMap, column: &Column) -> GaitResult<Column> {
        match &column.data {
            ColumnData::Float(values) => Ok(Column::float(
                entry.target.clone(),
                values.iter().map(|v| v * entry.scale + entry.offset).collect(),
            )),
            _ if entry.scale == 1.0 && entry.offset == 0.0 => Ok(Column {
                name: entry.target.clone(),
                data: column.data.clone(),
            }),
            _ => Err(crate::config_error!(
                "cannot apply unit conversion to non-float channel '{}'",
                entry.source
            )),
        }
    }
}
