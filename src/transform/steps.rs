//! Fixed feature-engineering steps applied before scaling
//!
//! In order: binary-map one column, drop configured columns, one-hot encode
//! the remaining string columns (first level dropped), rename the resulting
//! dummies and force configured columns to integers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::{ErrorCode, PipelineError, Result};
use crate::table::{Column, ColumnData, Table};

/// Column rename applied after one-hot encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRule {
    pub from: String,
    pub to: String,
}

impl RenameRule {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Configurable parts of the custom steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    /// Column mapped through `binary_mapping`; `None` disables the step
    #[serde(default = "default_binary_column")]
    pub binary_column: Option<String>,

    #[serde(default = "default_binary_mapping")]
    pub binary_mapping: BTreeMap<String, i64>,

    #[serde(default = "default_renames")]
    pub renames: Vec<RenameRule>,

    /// Columns coerced to integers after renaming, when present
    #[serde(default = "default_int_columns")]
    pub int_columns: Vec<String>,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            binary_column: default_binary_column(),
            binary_mapping: default_binary_mapping(),
            renames: default_renames(),
            int_columns: default_int_columns(),
        }
    }
}

fn default_binary_column() -> Option<String> {
    Some("Gender".to_string())
}

fn default_binary_mapping() -> BTreeMap<String, i64> {
    BTreeMap::from([("Female".to_string(), 0), ("Male".to_string(), 1)])
}

fn default_renames() -> Vec<RenameRule> {
    vec![
        RenameRule::new("Vehicle_Age_< 1 Year", "Vehicle_Age_lt_1_Year"),
        RenameRule::new("Vehicle_Age_> 2 Years", "Vehicle_Age_gt_2_Years"),
    ]
}

fn default_int_columns() -> Vec<String> {
    vec![
        "Vehicle_Age_lt_1_Year".to_string(),
        "Vehicle_Age_gt_2_Years".to_string(),
        "Vehicle_Damage_Yes".to_string(),
    ]
}

/// Sorted levels of one categorical column, as seen when fitting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLevels {
    pub column: String,
    pub levels: Vec<String>,
}

/// Columns added and removed by [`align`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    pub filled: Vec<String>,
    pub dropped: Vec<String>,
}

/// The step sequence bound to its configuration and the schema's drops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomSteps {
    pub config: StepConfig,
    pub drop_columns: Vec<String>,
}

impl CustomSteps {
    pub fn new(config: StepConfig, drop_columns: Vec<String>) -> Self {
        Self {
            config,
            drop_columns,
        }
    }

    /// Run every step, deriving categorical levels from this table
    pub fn apply(&self, table: &Table) -> Result<(Table, Vec<CategoryLevels>)> {
        let table = self.map_binary(table)?;
        let table = self.drop(table);
        let levels = categorical_levels(&table);
        let table = one_hot(&table, &levels)?;
        let table = self.rename_and_coerce(table)?;
        Ok((table, levels))
    }

    /// Run every step using levels captured at fit time
    ///
    /// String columns without captured levels are encoded with their own
    /// levels; [`align`] later drops whatever dummies that produces.
    pub fn apply_with_levels(&self, table: &Table, fitted: &[CategoryLevels]) -> Result<Table> {
        let table = self.map_binary(table)?;
        let table = self.drop(table);
        let levels: Vec<CategoryLevels> = categorical_levels(&table)
            .into_iter()
            .map(|own| {
                fitted
                    .iter()
                    .find(|f| f.column == own.column)
                    .cloned()
                    .unwrap_or(own)
            })
            .collect();
        let table = one_hot(&table, &levels)?;
        self.rename_and_coerce(table)
    }

    fn map_binary(&self, table: &Table) -> Result<Table> {
        let mut table = table.clone();
        let Some(name) = self.config.binary_column.as_deref() else {
            return Ok(table);
        };
        let Some(column) = table.column(name) else {
            return Ok(table);
        };
        let ColumnData::Str(values) = column.data() else {
            // Already numeric, e.g. a second application
            return Ok(table);
        };

        let mut unknown = 0usize;
        let mapped: Vec<Option<i64>> = values
            .iter()
            .map(|v| {
                v.as_ref().and_then(|s| {
                    let hit = self.config.binary_mapping.get(s).copied();
                    if hit.is_none() {
                        unknown += 1;
                    }
                    hit
                })
            })
            .collect();
        if unknown > 0 {
            warn!("{} value(s) of {} are not in the binary mapping and were left empty", unknown, name);
        }
        table.replace_column(name, ColumnData::Int(mapped))?;
        Ok(table)
    }

    fn drop(&self, mut table: Table) -> Table {
        for name in &self.drop_columns {
            if table.drop_column(name).is_some() {
                debug!("Dropped column {}", name);
            }
        }
        table
    }

    fn rename_and_coerce(&self, mut table: Table) -> Result<Table> {
        for rule in &self.config.renames {
            table.rename_column(&rule.from, &rule.to);
        }
        for name in &self.config.int_columns {
            if let Some(column) = table.column(name) {
                let coerced = to_int(column)?;
                table.replace_column(name, coerced)?;
            }
        }
        Ok(table)
    }
}

/// Sorted distinct values of every string column, in column order
pub fn categorical_levels(table: &Table) -> Vec<CategoryLevels> {
    table
        .columns()
        .iter()
        .filter_map(|column| match column.data() {
            ColumnData::Str(values) => {
                let mut levels: Vec<String> = values.iter().flatten().cloned().collect();
                levels.sort();
                levels.dedup();
                Some(CategoryLevels {
                    column: column.name().to_string(),
                    levels,
                })
            }
            _ => None,
        })
        .collect()
}

/// Replace string columns by `drop_first` dummies appended at the end
///
/// Every string column must have an entry in `levels`. Nulls and values
/// outside the levels produce all-zero dummies.
pub fn one_hot(table: &Table, levels: &[CategoryLevels]) -> Result<Table> {
    let mut kept = Vec::new();
    let mut dummies = Vec::new();

    for column in table.columns() {
        let ColumnData::Str(values) = column.data() else {
            kept.push(column.clone());
            continue;
        };
        let spec = levels
            .iter()
            .find(|l| l.column == column.name())
            .ok_or_else(|| {
                PipelineError::invalid_input_with_code(
                    ErrorCode::DATA_INVALID,
                    "no categorical levels known for column",
                    Some(column.name().to_string()),
                )
            })?;
        for level in spec.levels.iter().skip(1) {
            let indicator = values
                .iter()
                .map(|v| Some(i64::from(v.as_deref() == Some(level.as_str()))))
                .collect();
            dummies.push(Column::int(format!("{}_{}", column.name(), level), indicator));
        }
    }

    kept.extend(dummies);
    Table::from_columns(kept)
}

/// Conform a table to an expected column list
///
/// Missing columns are added as integer zeros, extra columns dropped, and
/// the result ordered as `expected`.
pub fn align(table: &Table, expected: &[String]) -> Result<(Table, Alignment)> {
    let mut report = Alignment::default();
    let rows = table.n_rows();
    let mut columns = Vec::with_capacity(expected.len());

    for name in expected {
        match table.column(name) {
            Some(column) => columns.push(column.clone()),
            None => {
                report.filled.push(name.clone());
                columns.push(Column::int(name.clone(), vec![Some(0); rows]));
            }
        }
    }
    report.dropped = table
        .column_names()
        .into_iter()
        .filter(|name| !expected.contains(name))
        .collect();

    Ok((Table::from_columns(columns)?, report))
}

fn to_int(column: &Column) -> Result<ColumnData> {
    let values = match column.data() {
        ColumnData::Int(v) => v.clone(),
        ColumnData::Bool(v) => v.iter().map(|b| b.map(i64::from)).collect(),
        ColumnData::Float(v) => v
            .iter()
            .map(|f| f.filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .collect(),
        ColumnData::Str(v) => v
            .iter()
            .map(|s| match s {
                None => Ok(None),
                Some(s) => s.trim().parse::<i64>().map(Some).map_err(|_| {
                    PipelineError::invalid_input_with_code(
                        ErrorCode::DATA_NON_NUMERIC,
                        format!("cannot convert {:?} to an integer", s),
                        Some(column.name().to_string()),
                    )
                }),
            })
            .collect::<Result<_>>()?,
    };
    Ok(ColumnData::Int(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insurance_rows() -> Table {
        Table::from_columns(vec![
            Column::int("id", vec![Some(1), Some(2), Some(3), Some(4)]),
            Column::string(
                "Gender",
                vec![Some("Male"), Some("Female"), Some("Female"), Some("Other")],
            ),
            Column::int("Age", vec![Some(44), Some(76), Some(47), Some(21)]),
            Column::string(
                "Vehicle_Age",
                vec![Some("> 2 Years"), Some("1-2 Year"), Some("< 1 Year"), Some("1-2 Year")],
            ),
            Column::string("Vehicle_Damage", vec![Some("Yes"), Some("No"), Some("Yes"), None]),
            Column::float("Annual_Premium", vec![Some(40454.0), Some(33536.0), Some(38294.0), Some(28619.0)]),
        ])
        .unwrap()
    }

    fn steps() -> CustomSteps {
        CustomSteps::new(StepConfig::default(), vec!["id".to_string()])
    }

    #[test]
    fn test_full_sequence() {
        let (out, levels) = steps().apply(&insurance_rows()).unwrap();

        assert_eq!(
            out.column_names(),
            vec![
                "Gender",
                "Age",
                "Annual_Premium",
                "Vehicle_Age_lt_1_Year",
                "Vehicle_Age_gt_2_Years",
                "Vehicle_Damage_Yes",
            ]
        );
        assert_eq!(
            out.column("Gender").unwrap().data(),
            &ColumnData::Int(vec![Some(1), Some(0), Some(0), None])
        );
        assert_eq!(
            out.column("Vehicle_Damage_Yes").unwrap().data(),
            &ColumnData::Int(vec![Some(1), Some(0), Some(1), Some(0)])
        );
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].levels, vec!["1-2 Year", "< 1 Year", "> 2 Years"]);
    }

    #[test]
    fn test_absent_columns_are_tolerated() {
        let table = Table::from_columns(vec![Column::int("Age", vec![Some(1)])]).unwrap();
        let (out, levels) = steps().apply(&table).unwrap();
        assert_eq!(out, table);
        assert!(levels.is_empty());
    }

    #[test]
    fn test_second_application_keeps_columns() {
        let (first, _) = steps().apply(&insurance_rows()).unwrap();
        let (second, _) = steps().apply(&first).unwrap();
        assert_eq!(first.column_names(), second.column_names());
    }

    #[test]
    fn test_fitted_levels_fix_dummy_set() {
        let (_, levels) = steps().apply(&insurance_rows()).unwrap();
        let live = Table::from_columns(vec![
            Column::string("Gender", vec![Some("Male")]),
            Column::string("Vehicle_Age", vec![Some("> 2 Years")]),
            Column::string("Vehicle_Damage", vec![Some("No")]),
        ])
        .unwrap();

        let out = steps().apply_with_levels(&live, &levels).unwrap();
        assert_eq!(
            out.column_names(),
            vec![
                "Gender",
                "Vehicle_Age_lt_1_Year",
                "Vehicle_Age_gt_2_Years",
                "Vehicle_Damage_Yes"
            ]
        );
        assert_eq!(
            out.column("Vehicle_Age_gt_2_Years").unwrap().data(),
            &ColumnData::Int(vec![Some(1)])
        );
    }

    #[test]
    fn test_align_fills_drops_and_orders() {
        let table = Table::from_columns(vec![
            Column::int("b", vec![Some(2)]),
            Column::int("extra", vec![Some(9)]),
        ])
        .unwrap();
        let expected = vec!["a".to_string(), "b".to_string()];
        let (aligned, report) = align(&table, &expected).unwrap();

        assert_eq!(aligned.column_names(), expected);
        assert_eq!(aligned.column("a").unwrap().data(), &ColumnData::Int(vec![Some(0)]));
        assert_eq!(report.filled, vec!["a"]);
        assert_eq!(report.dropped, vec!["extra"]);
    }

    #[test]
    fn test_int_coercion_truncates_floats() {
        let config = StepConfig {
            int_columns: vec!["x".to_string()],
            ..StepConfig::default()
        };
        let table = Table::from_columns(vec![Column::float("x", vec![Some(2.7), None])]).unwrap();
        let (out, _) = CustomSteps::new(config, vec![]).apply(&table).unwrap();
        assert_eq!(out.column("x").unwrap().data(), &ColumnData::Int(vec![Some(2), None]));
    }
}
