//! Column-oriented tables shared by trials and phase-indexed output

use crate::error::{GaitError, GaitResult};
use serde::{Deserialize, Serialize};

/// Storage for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    /// Floating point samples; the only kind that is interpolated
    Float(Vec<f64>),
    /// Integer identifiers (stride numbers, trial ids)
    Integer(Vec<i64>),
    /// Categorical labels (subject, task, leg)
    Label(Vec<String>),
}

/// Single cell value, used when broadcasting a representative value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Float(f64),
    Integer(i64),
    Label(String),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(values) => values.len(),
            ColumnData::Integer(values) => values.len(),
            ColumnData::Label(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ColumnData::Float(_))
    }

    /// Value at `row`, if in range
    pub fn cell(&self, row: usize) -> Option<CellValue> {
        match self {
            ColumnData::Float(values) => values.get(row).copied().map(CellValue::Float),
            ColumnData::Integer(values) => values.get(row).copied().map(CellValue::Integer),
            ColumnData::Label(values) => values.get(row).cloned().map(CellValue::Label),
        }
    }

    /// Column of `len` copies of `value`
    pub fn broadcast(value: &CellValue, len: usize) -> Self {
        match value {
            CellValue::Float(v) => ColumnData::Float(vec![*v; len]),
            CellValue::Integer(v) => ColumnData::Integer(vec![*v; len]),
            CellValue::Label(v) => ColumnData::Label(vec![v.clone(); len]),
        }
    }

    /// Append the rows of `other`; both columns must hold the same kind
    fn extend_from(&mut self, other: &ColumnData) -> bool {
        match (self, other) {
            (ColumnData::Float(a), ColumnData::Float(b)) => a.extend_from_slice(b),
            (ColumnData::Integer(a), ColumnData::Integer(b)) => a.extend_from_slice(b),
            (ColumnData::Label(a), ColumnData::Label(b)) => a.extend_from_slice(b),
            _ => return false,
        }
        true
    }

    fn kind(&self) -> &'static str {
        match self {
            ColumnData::Float(_) => "float",
            ColumnData::Integer(_) => "integer",
            ColumnData::Label(_) => "label",
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Integer(v) => write!(f, "{}", v),
            CellValue::Label(v) => write!(f, "{}", v),
        }
    }
}

/// Named column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn float(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self { name: name.into(), data: ColumnData::Float(values) }
    }

    pub fn integer(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self { name: name.into(), data: ColumnData::Integer(values) }
    }

    pub fn label(name: impl Into<String>, values: Vec<String>) -> Self {
        Self { name: name.into(), data: ColumnData::Label(values) }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Ordered set of equal-length columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self { columns: Vec::new() }
    }

    /// Build a table, checking names are unique and lengths agree
    pub fn from_columns(columns: Vec<Column>) -> GaitResult<Self> {
        let mut table = Table::new();
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Add a column at the end
    pub fn push_column(&mut self, column: Column) -> GaitResult<()> {
        if self.has_column(&column.name) {
            return Err(GaitError::DuplicateColumn { name: column.name });
        }
        if let Some(first) = self.columns.first() {
            let actual = column.len();
            if actual != first.len() {
                return Err(GaitError::ChannelLengthMismatch {
                    name: column.name,
                    expected: first.len(),
                    actual,
                });
            }
        }
        self.columns.push(column);
        Ok(())
    }

    /// Number of rows (0 for a table without columns)
    pub fn n_rows(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// True when the table holds no rows
    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Float samples of `name`, or `MissingChannel`
    pub fn float_column(&self, name: &str) -> GaitResult<&[f64]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Float(values)) => Ok(values),
            _ => Err(GaitError::MissingChannel { name: name.to_string() }),
        }
    }

    /// Label samples of `name`, if present and categorical
    pub fn label_column(&self, name: &str) -> Option<&[String]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Label(values)) => Some(values),
            _ => None,
        }
    }

    /// Integer samples of `name`, if present
    pub fn integer_column(&self, name: &str) -> Option<&[i64]> {
        match self.column(name).map(|c| &c.data) {
            Some(ColumnData::Integer(values)) => Some(values),
            _ => None,
        }
    }

    /// Vertically append `other`.
    ///
    /// Appending to an empty table adopts the other table's schema. Otherwise
    /// both tables must have the same column names, kinds and order.
    pub fn append(&mut self, other: &Table) -> GaitResult<()> {
        self.check_appendable(other)?;
        if other.columns.is_empty() {
            return Ok(());
        }
        if self.columns.is_empty() {
            self.columns = other.columns.clone();
            return Ok(());
        }

        for (column, incoming) in self.columns.iter_mut().zip(&other.columns) {
            column.data.extend_from(&incoming.data);
        }
        Ok(())
    }

    /// Check that `append(other)` would succeed, without modifying `self`
    pub fn check_appendable(&self, other: &Table) -> GaitResult<()> {
        if self.columns.is_empty() || other.columns.is_empty() {
            return Ok(());
        }
        let same_schema = self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.name == b.name && a.data.kind() == b.data.kind());
        if !same_schema {
            return Err(GaitError::SchemaMismatch {
                expected: self.column_names(),
                actual: other.column_names(),
            });
        }
        Ok(())
    }

    /// Concatenate tables in order
    pub fn concat<'a, I>(tables: I) -> GaitResult<Table>
    where
        I: IntoIterator<Item = &'a Table>,
    {
        let mut result = Table::new();
        for table in tables {
            result.append(table)?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table::from_columns(vec![
            Column::float("knee_flexion_angle_ipsi_rad", vec![0.1, 0.2, 0.3]),
            Column::label("subject", vec!["S01".into(); 3]),
        ])
        .unwrap()
    }

    #[test]
    fn test_table_construction() {
        let table = sample_table();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.n_columns(), 2);
        assert_eq!(table.float_column("knee_flexion_angle_ipsi_rad").unwrap()[2], 0.3);
        assert!(table.float_column("subject").is_err());
        assert_eq!(table.label_column("subject").unwrap()[0], "S01");
    }

    #[test]
    fn test_push_column_rejects_length_mismatch() {
        let mut table = sample_table();
        let result = table.push_column(Column::float("hip", vec![0.0; 4]));
        assert_eq!(
            result,
            Err(GaitError::ChannelLengthMismatch {
                name: "hip".to_string(),
                expected: 3,
                actual: 4,
            })
        );
        assert_eq!(table.n_columns(), 2);
    }

    #[test]
    fn test_push_column_rejects_duplicates() {
        let mut table = sample_table();
        let result = table.push_column(Column::float("knee_flexion_angle_ipsi_rad", vec![0.0; 3]));
        assert!(matches!(result, Err(GaitError::DuplicateColumn { .. })));
    }

    #[test]
    fn test_append_and_concat() {
        let a = sample_table();
        let b = sample_table();
        let combined = Table::concat([&a, &b]).unwrap();
        assert_eq!(combined.n_rows(), 6);
        assert_eq!(combined.column_names(), a.column_names());
    }

    #[test]
    fn test_append_schema_mismatch() {
        let mut a = sample_table();
        let b = Table::from_columns(vec![Column::float("other", vec![1.0])]).unwrap();
        assert!(matches!(a.check_appendable(&b), Err(GaitError::SchemaMismatch { .. })));
        assert!(matches!(a.append(&b), Err(GaitError::SchemaMismatch { .. })));
        assert_eq!(a, sample_table());
        assert!(Table::new().check_appendable(&b).is_ok());
    }

    #[test]
    fn test_broadcast_cell() {
        let table = sample_table();
        let value = table.column("subject").unwrap().data.cell(1).unwrap();
        let column = ColumnData::broadcast(&value, 4);
        assert_eq!(column, ColumnData::Label(vec!["S01".to_string(); 4]));
        assert_eq!(value.to_string(), "S01");
    }
}
