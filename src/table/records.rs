//! Conversion from JSON documents to tables
//!
//! Documents are heterogeneous: a key may be absent from some records, and a
//! column may mix integers and floats. Column order follows first appearance.

use serde_json::{Map, Value};

use super::{infer_from_strings, Column, ColumnData, Table};
use crate::error::{ErrorCode, PipelineError, Result};

static NULL: Value = Value::Null;

/// Build a table from JSON objects
pub fn from_records(records: &[Map<String, Value>]) -> Result<Table> {
    let mut names: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }

    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        let values: Vec<&Value> = records
            .iter()
            .map(|r| r.get(name).unwrap_or(&NULL))
            .collect();
        columns.push(column_from_values(name, &values)?);
    }
    Table::from_columns(columns)
}

fn column_from_values(name: &str, values: &[&Value]) -> Result<Column> {
    let present: Vec<&Value> = values.iter().copied().filter(|v| !v.is_null()).collect();

    if present.iter().any(|v| v.is_array() || v.is_object()) {
        return Err(PipelineError::invalid_input_with_code(
            ErrorCode::DATA_INVALID,
            "nested values are not supported in tabular records",
            Some(name.to_string()),
        ));
    }

    if !present.is_empty() && present.iter().all(|v| v.is_i64() || v.is_u64()) {
        return Ok(Column::int(name, values.iter().map(|v| v.as_i64()).collect()));
    }
    if !present.is_empty() && present.iter().all(|v| v.is_number()) {
        return Ok(Column::float(name, values.iter().map(|v| v.as_f64()).collect()));
    }
    if !present.is_empty() && present.iter().all(|v| v.is_boolean()) {
        return Ok(Column::boolean(name, values.iter().map(|v| v.as_bool()).collect()));
    }
    if !present.is_empty() && present.iter().all(|v| v.is_string()) {
        let cells = values.iter().map(|v| v.as_str().map(str::to_string)).collect();
        return Ok(Column::new(name, ColumnData::Str(cells)));
    }

    // Mixed scalars: fall back to text and let inference decide
    let cells = values
        .iter()
        .map(|v| match v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .collect();
    Ok(infer_from_strings(name, cells))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnKind;
    use serde_json::json;

    fn objects(value: Value) -> Vec<Map<String, Value>> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn test_column_order_and_kinds() {
        let records = objects(json!([
            {"Gender": "Male", "Age": 44, "Annual_Premium": 40454.0},
            {"Gender": "Female", "Age": 76, "Annual_Premium": 33536.5, "Extra": true}
        ]));
        let table = from_records(&records).unwrap();

        assert_eq!(table.column_names(), vec!["Gender", "Age", "Annual_Premium", "Extra"]);
        assert_eq!(table.column("Age").unwrap().kind(), ColumnKind::Int);
        assert_eq!(table.column("Annual_Premium").unwrap().kind(), ColumnKind::Float);
        assert_eq!(
            table.column("Extra").unwrap().data(),
            &ColumnData::Bool(vec![None, Some(true)])
        );
    }

    #[test]
    fn test_mixed_int_and_float_is_float() {
        let records = objects(json!([{"x": 1}, {"x": 2.5}]));
        let table = from_records(&records).unwrap();
        assert_eq!(table.column("x").unwrap().kind(), ColumnKind::Float);
    }

    #[test]
    fn test_nested_values_rejected() {
        let records = objects(json!([{"x": {"y": 1}}]));
        assert!(from_records(&records).is_err());
    }

    #[test]
    fn test_empty_input_is_empty_table() {
        let table = from_records(&[]).unwrap();
        assert_eq!(table.n_cols(), 0);
        assert_eq!(table.n_rows(), 0);
    }
}
