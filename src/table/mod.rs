//! In-memory typed tables
//!
//! A [`Table`] is an ordered set of equally long named columns. Each column
//! has one storage kind and nullable cells. Kinds are inferred when data is
//! read from CSV or JSON records, mirroring how dataframe libraries assign
//! dtypes, so validation can compare them against schema type hints.

pub mod csv_io;
pub mod records;

pub use csv_io::{read_csv, write_csv};
pub use records::from_records;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ErrorCode, PipelineError, Result};

/// Storage kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Int,
    Float,
    Bool,
    Str,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Int => "int64",
            ColumnKind::Float => "float64",
            ColumnKind::Bool => "bool",
            ColumnKind::Str => "object",
        };
        f.write_str(name)
    }
}

/// Cell storage of one column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Str(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Int(_) => ColumnKind::Int,
            ColumnData::Float(_) => ColumnKind::Float,
            ColumnData::Bool(_) => ColumnKind::Bool,
            ColumnData::Str(_) => ColumnKind::Str,
        }
    }

    fn take(&self, indices: &[usize]) -> ColumnData {
        fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
            indices.iter().map(|&i| values[i].clone()).collect()
        }
        match self {
            ColumnData::Int(v) => ColumnData::Int(pick(v, indices)),
            ColumnData::Float(v) => ColumnData::Float(pick(v, indices)),
            ColumnData::Bool(v) => ColumnData::Bool(pick(v, indices)),
            ColumnData::Str(v) => ColumnData::Str(pick(v, indices)),
        }
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn int(name: impl Into<String>, values: Vec<Option<i64>>) -> Self {
        Self::new(name, ColumnData::Int(values))
    }

    pub fn float(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::new(name, ColumnData::Float(values))
    }

    pub fn boolean(name: impl Into<String>, values: Vec<Option<bool>>) -> Self {
        Self::new(name, ColumnData::Bool(values))
    }

    pub fn string<S: Into<String>>(name: impl Into<String>, values: Vec<Option<S>>) -> Self {
        Self::new(
            name,
            ColumnData::Str(values.into_iter().map(|v| v.map(Into::into)).collect()),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn into_data(self) -> ColumnData {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Numeric view of the column; nulls become NaN, strings are an error
    pub fn to_f64(&self) -> Result<Vec<f64>> {
        match &self.data {
            ColumnData::Int(v) => Ok(v.iter().map(|x| x.map_or(f64::NAN, |x| x as f64)).collect()),
            ColumnData::Float(v) => Ok(v.iter().map(|x| x.unwrap_or(f64::NAN)).collect()),
            ColumnData::Bool(v) => Ok(v
                .iter()
                .map(|x| x.map_or(f64::NAN, |b| if b { 1.0 } else { 0.0 }))
                .collect()),
            ColumnData::Str(_) => Err(PipelineError::invalid_input_with_code(
                ErrorCode::DATA_NON_NUMERIC,
                "string column cannot be used as a numeric feature",
                Some(self.name.clone()),
            )),
        }
    }

    /// Cell rendered as text, `None` for nulls
    pub fn cell_string(&self, row: usize) -> Option<String> {
        match &self.data {
            ColumnData::Int(v) => v[row].map(|x| x.to_string()),
            // Debug keeps a trailing ".0" so whole floats stay floats on re-read
            ColumnData::Float(v) => v[row].map(|x| format!("{:?}", x)),
            ColumnData::Bool(v) => v[row].map(|b| b.to_string()),
            ColumnData::Str(v) => v[row].clone(),
        }
    }
}

/// Ordered, equally long named columns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table, checking lengths and name uniqueness
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let mut table = Self::new();
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Append a column at the end
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if self.has_column(&column.name) {
            return Err(PipelineError::invalid_input_with_code(
                ErrorCode::DATA_INVALID,
                "duplicate column",
                Some(column.name),
            ));
        }
        if !self.columns.is_empty() && column.len() != self.n_rows() {
            return Err(PipelineError::invalid_input_with_code(
                ErrorCode::DATA_SHAPE_MISMATCH,
                format!(
                    "column has {} rows, table has {}",
                    column.len(),
                    self.n_rows()
                ),
                Some(column.name),
            ));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Replace a column's data in place, keeping its position
    pub fn replace_column(&mut self, name: &str, data: ColumnData) -> Result<()> {
        let rows = self.n_rows();
        let idx = self.position(name).ok_or_else(|| {
            PipelineError::invalid_input_with_code(
                ErrorCode::DATA_INVALID,
                "no such column",
                Some(name.to_string()),
            )
        })?;
        if data.len() != rows {
            return Err(PipelineError::invalid_input_with_code(
                ErrorCode::DATA_SHAPE_MISMATCH,
                format!("replacement has {} rows, table has {}", data.len(), rows),
                Some(name.to_string()),
            ));
        }
        self.columns[idx].data = data;
        Ok(())
    }

    /// Remove a column, returning it when present
    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        self.position(name).map(|idx| self.columns.remove(idx))
    }

    /// Rename a column; no-op when absent
    pub fn rename_column(&mut self, from: &str, to: &str) {
        if let Some(idx) = self.position(from) {
            self.columns[idx].name = to.to_string();
        }
    }

    /// New table with the given rows, in the given order
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.take(indices)))
                .collect(),
        }
    }

    /// New table with exactly the named columns, in that order
    pub fn select(&self, names: &[String]) -> Result<Table> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let column = self.column(name).ok_or_else(|| {
                PipelineError::invalid_input_with_code(
                    ErrorCode::DATA_INVALID,
                    "no such column",
                    Some(name.clone()),
                )
            })?;
            columns.push(column.clone());
        }
        Table::from_columns(columns)
    }
}

/// Infer the column kind of raw text cells; empty cells are nulls
pub(crate) fn infer_from_strings(name: &str, cells: Vec<Option<String>>) -> Column {
    let present = || cells.iter().flatten();

    if present().next().is_none() {
        return Column::float(name, vec![None; cells.len()]);
    }
    if present().all(|s| s.parse::<i64>().is_ok()) {
        return Column::int(
            name,
            cells.iter().map(|c| c.as_ref().and_then(|s| s.parse().ok())).collect(),
        );
    }
    if present().all(|s| s.parse::<f64>().is_ok()) {
        return Column::float(
            name,
            cells.iter().map(|c| c.as_ref().and_then(|s| s.parse().ok())).collect(),
        );
    }
    if present().all(|s| parse_bool(s).is_some()) {
        return Column::boolean(
            name,
            cells.iter().map(|c| c.as_deref().and_then(parse_bool)).collect(),
        );
    }
    Column::new(name, ColumnData::Str(cells))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_columns(vec![
            Column::int("id", vec![Some(1), Some(2), Some(3)]),
            Column::string("Gender", vec![Some("Male"), Some("Female"), None]),
            Column::float("Annual_Premium", vec![Some(10.5), None, Some(3.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_shape_and_names() {
        let table = sample();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.n_cols(), 3);
        assert_eq!(table.column_names(), vec!["id", "Gender", "Annual_Premium"]);
        assert_eq!(table.column("Gender").unwrap().kind(), ColumnKind::Str);
    }

    #[test]
    fn test_push_rejects_length_mismatch_and_duplicates() {
        let mut table = sample();
        assert!(table.push_column(Column::int("x", vec![Some(1)])).is_err());
        assert!(table.push_column(Column::int("id", vec![None, None, None])).is_err());
    }

    #[test]
    fn test_take_rows_and_select() {
        let table = sample();
        let picked = table.take_rows(&[2, 0]);
        assert_eq!(
            picked.column("id").unwrap().data(),
            &ColumnData::Int(vec![Some(3), Some(1)])
        );
        let selected = table
            .select(&["Annual_Premium".to_string(), "id".to_string()])
            .unwrap();
        assert_eq!(selected.column_names(), vec!["Annual_Premium", "id"]);
        assert!(table.select(&["nope".to_string()]).is_err());
    }

    #[test]
    fn test_to_f64_nulls_are_nan() {
        let table = sample();
        let values = table.column("Annual_Premium").unwrap().to_f64().unwrap();
        assert_eq!(values[0], 10.5);
        assert!(values[1].is_nan());
        assert!(table.column("Gender").unwrap().to_f64().is_err());
    }

    #[test]
    fn test_infer_kinds() {
        let s = |v: &[&str]| {
            v.iter()
                .map(|x| if x.is_empty() { None } else { Some(x.to_string()) })
                .collect::<Vec<_>>()
        };
        assert_eq!(infer_from_strings("a", s(&["1", "", "3"])).kind(), ColumnKind::Int);
        assert_eq!(infer_from_strings("a", s(&["1", "2.5"])).kind(), ColumnKind::Float);
        assert_eq!(infer_from_strings("a", s(&["True", "false"])).kind(), ColumnKind::Bool);
        assert_eq!(infer_from_strings("a", s(&["x", "1"])).kind(), ColumnKind::Str);
        assert_eq!(infer_from_strings("a", s(&["", ""])).kind(), ColumnKind::Float);
    }

    #[test]
    fn test_float_cells_keep_decimal_point() {
        let col = Column::float("f", vec![Some(1.0), Some(2.5)]);
        assert_eq!(col.cell_string(0).as_deref(), Some("1.0"));
        assert_eq!(col.cell_string(1).as_deref(), Some("2.5"));
    }
}
