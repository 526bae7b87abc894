//! Schema validation of a run's train/test splits
//!
//! A failing report is a normal result and is always persisted. The
//! pipeline decides what to do with `ok = false`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{error, info};

use crate::error::Result;
use crate::schema::Schema;
use crate::storage::{self, RunHandle};
use crate::table::{read_csv, Table};

/// Validation outcome of one split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitReport {
    pub expected_count: usize,
    pub actual_count: usize,
    pub missing: Vec<String>,
    pub extra: Vec<String>,
    pub missing_numerical: Vec<String>,
    pub missing_categorical: Vec<String>,
    pub order_matches: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dtype_issues: BTreeMap<String, String>,
    pub ok: bool,
}

/// Validation outcome of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub splits: BTreeMap<String, SplitReport>,
}

impl Report {
    /// Names of the splits that failed
    pub fn failed_splits(&self) -> Vec<&str> {
        self.splits
            .iter()
            .filter(|(_, s)| !s.ok)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Compare one table with the schema
pub fn check_table(table: &Table, schema: &Schema) -> SplitReport {
    let actual = table.column_names();
    let expected = &schema.columns;

    let missing: Vec<String> = expected.iter().filter(|c| !actual.contains(c)).cloned().collect();
    let extra: Vec<String> = actual.iter().filter(|c| !expected.contains(c)).cloned().collect();
    let absent = |group: &[String]| -> Vec<String> {
        group.iter().filter(|c| !table.has_column(c)).cloned().collect()
    };

    let mut dtype_issues = BTreeMap::new();
    for name in expected {
        let (Some(hint), Some(column)) = (schema.types.get(name), table.column(name)) else {
            continue;
        };
        if hint.accepts(column.kind()) == Some(false) {
            dtype_issues.insert(
                name.clone(),
                format!("expected {}, got {}", hint.label(), column.kind()),
            );
        }
    }

    let ok = expected.len() == actual.len()
        && missing.is_empty()
        && extra.is_empty()
        && dtype_issues.is_empty();

    SplitReport {
        expected_count: expected.len(),
        actual_count: actual.len(),
        missing_numerical: absent(&schema.numerical_columns),
        missing_categorical: absent(&schema.categorical_columns),
        order_matches: &actual == expected,
        missing,
        extra,
        dtype_issues,
        ok,
    }
}

/// Validate the persisted train and test splits of a run
pub fn check(run: &RunHandle, schema: &Schema) -> Result<Report> {
    if schema.columns.is_empty() {
        let message = "No 'columns' found in schema".to_string();
        error!("{}", message);
        return Ok(Report {
            ok: false,
            error: Some(message),
            splits: BTreeMap::new(),
        });
    }

    let paths = run.paths();
    let mut splits = BTreeMap::new();
    for (name, path) in [("train", paths.train_csv()), ("test", paths.test_csv())] {
        let table = read_csv(&path)?;
        splits.insert(name.to_string(), check_table(&table, schema));
    }

    let ok = splits.values().all(|s| s.ok);
    if ok {
        info!("Train and test splits match the schema");
    } else {
        error!("Schema validation failed; see the validation report");
    }
    Ok(Report {
        ok,
        error: None,
        splits,
    })
}

/// Persist the report as YAML in the run's validation artifact set
pub fn save_report(run: &RunHandle, report: &Report) -> Result<PathBuf> {
    let path = run.paths().validation_report();
    storage::write_yaml(&path, report)?;
    info!("Validation report saved at {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;
    use crate::storage::ArtifactStore;
    use crate::table::{write_csv, Column};
    use tempfile::TempDir;

    fn ab() -> Table {
        Table::from_columns(vec![
            Column::int("A", vec![Some(1)]),
            Column::string("B", vec![Some("x")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_missing_column_fails() {
        let schema = parse_schema("columns: [A, B, C]\n", None).unwrap();
        let report = check_table(&ab(), &schema);
        assert_eq!(report.missing, vec!["C"]);
        assert!(report.extra.is_empty());
        assert_eq!(report.expected_count, 3);
        assert_eq!(report.actual_count, 2);
        assert!(!report.ok);
    }

    #[test]
    fn test_order_mismatch_alone_passes() {
        let schema = parse_schema("columns: [B, A]\n", None).unwrap();
        let report = check_table(&ab(), &schema);
        assert!(!report.order_matches);
        assert!(report.ok);
    }

    #[test]
    fn test_extra_and_group_columns() {
        let schema = parse_schema(
            "columns: [A]\nnumerical_columns: [A, N]\ncategorical_columns: [K]\n",
            None,
        )
        .unwrap();
        let report = check_table(&ab(), &schema);
        assert_eq!(report.extra, vec!["B"]);
        assert_eq!(report.missing_numerical, vec!["N"]);
        assert_eq!(report.missing_categorical, vec!["K"]);
        assert!(!report.ok);
    }

    #[test]
    fn test_dtype_issues() {
        let schema = parse_schema("columns:\n  - A: float\n  - B: category\n", None).unwrap();
        let report = check_table(&ab(), &schema);
        assert_eq!(report.dtype_issues.len(), 1);
        assert_eq!(report.dtype_issues["A"], "expected float, got int64");
        assert!(!report.ok);

        let lenient = parse_schema("columns:\n  - A: timestamp\n  - B: object\n", None).unwrap();
        assert!(check_table(&ab(), &lenient).ok);
    }

    #[test]
    fn test_check_run_and_save_report() {
        let temp = TempDir::new().unwrap();
        let run = ArtifactStore::new(temp.path()).create_run().unwrap();
        write_csv(&run.paths().train_csv(), &ab()).unwrap();
        write_csv(&run.paths().test_csv(), &ab()).unwrap();

        let schema = parse_schema("columns: [A, B, C]\n", None).unwrap();
        let report = check(&run, &schema).unwrap();
        assert!(!report.ok);
        assert_eq!(report.failed_splits(), vec!["test", "train"]);

        let path = save_report(&run, &report).unwrap();
        assert_eq!(path, run.paths().validation_report());
        let back: Report = storage::read_yaml(&path).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_empty_schema_is_a_report_not_an_error() {
        let temp = TempDir::new().unwrap();
        let run = ArtifactStore::new(temp.path()).create_run().unwrap();
        let report = check(&run, &Schema::default()).unwrap();
        assert!(!report.ok);
        assert!(report.error.is_some());
    }

    #[test]
    fn test_missing_split_file_is_error() {
        let temp = TempDir::new().unwrap();
        let run = ArtifactStore::new(temp.path()).create_run().unwrap();
        let schema = parse_schema("columns: [A]\n", None).unwrap();
        assert!(check(&run, &schema).unwrap_err().is_not_found());
    }
}
