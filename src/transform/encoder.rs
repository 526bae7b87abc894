//! Column scalers fitted on training features
//!
//! Standard scaling uses the population mean and standard deviation,
//! min-max scaling the observed range. A zero spread scales by one. Missing
//! cells are NaN and are ignored when fitting.

use serde::{Deserialize, Serialize};

use crate::array::Matrix;
use crate::error::{ErrorCode, PipelineError, Result};
use crate::schema::Schema;
use crate::table::Table;

/// `(x - offset) / scale` for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScale {
    pub column: String,
    pub offset: f64,
    pub scale: f64,
}

impl ColumnScale {
    fn apply(&self, value: f64) -> f64 {
        (value - self.offset) / self.scale
    }
}

/// Fitted column transformer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encoder {
    /// Standard-scaled columns, in `num_features` order
    pub standard: Vec<ColumnScale>,
    /// Min-max-scaled columns, in `mm_columns` order
    pub minmax: Vec<ColumnScale>,
    /// Remaining columns, in input order
    pub passthrough: Vec<String>,
}

impl Encoder {
    /// Output column order: standard, then min-max, then pass-through
    pub fn output_columns(&self) -> Vec<String> {
        self.standard
            .iter()
            .map(|s| s.column.clone())
            .chain(self.minmax.iter().map(|s| s.column.clone()))
            .chain(self.passthrough.iter().cloned())
            .collect()
    }

    pub fn width(&self) -> usize {
        self.standard.len() + self.minmax.len() + self.passthrough.len()
    }

    /// Encode a table that has every fitted column
    pub fn transform(&self, features: &Table) -> Result<Matrix> {
        let mut columns = Vec::with_capacity(self.width());
        for scale in self.standard.iter().chain(&self.minmax) {
            let values = numeric(features, &scale.column)?;
            columns.push(values.into_iter().map(|v| scale.apply(v)).collect());
        }
        for name in &self.passthrough {
            columns.push(numeric(features, name)?);
        }

        if columns.is_empty() {
            return Matrix::new(features.n_rows(), 0, Vec::new());
        }
        Matrix::from_columns(&columns)
    }
}

/// Fit scalers on training features (after the custom steps)
pub fn fit_encoder(features: &Table, schema: &Schema) -> Result<Encoder> {
    schema.check_feature_groups()?;

    let missing: Vec<&str> = schema
        .num_features
        .iter()
        .chain(&schema.mm_columns)
        .filter(|c| !features.has_column(c))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::config_with_code(
            ErrorCode::CONFIG_INVALID_VALUE,
            format!("scaled columns not present in features: {}", missing.join(", ")),
            Some("num_features".to_string()),
        ));
    }

    let standard = schema
        .num_features
        .iter()
        .map(|name| {
            let (mean, std) = mean_and_std(&numeric(features, name)?);
            Ok(ColumnScale {
                column: name.clone(),
                offset: mean,
                scale: non_zero(std),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let minmax = schema
        .mm_columns
        .iter()
        .map(|name| {
            let (min, max) = min_and_max(&numeric(features, name)?);
            Ok(ColumnScale {
                column: name.clone(),
                offset: min,
                scale: non_zero(max - min),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let scaled: Vec<&String> = schema.num_features.iter().chain(&schema.mm_columns).collect();
    let passthrough = features
        .column_names()
        .into_iter()
        .filter(|name| !scaled.iter().any(|s| *s == name))
        .collect();

    Ok(Encoder {
        standard,
        minmax,
        passthrough,
    })
}

fn numeric(table: &Table, name: &str) -> Result<Vec<f64>> {
    table
        .column(name)
        .ok_or_else(|| {
            PipelineError::invalid_input_with_code(
                ErrorCode::DATA_SHAPE_MISMATCH,
                "encoded column missing from input",
                Some(name.to_string()),
            )
        })?
        .to_f64()
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if present.is_empty() {
        return (0.0, 1.0);
    }
    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let var = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn min_and_max(values: &[f64]) -> (f64, f64) {
    let mut present = values.iter().copied().filter(|v| !v.is_nan()).peekable();
    if present.peek().is_none() {
        return (0.0, 1.0);
    }
    present.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn non_zero(spread: f64) -> f64 {
    if spread == 0.0 || !spread.is_finite() {
        1.0
    } else {
        spread
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;
    use crate::table::Column;

    fn schema(yaml: &str) -> Schema {
        parse_schema(yaml, None).unwrap()
    }

    #[test]
    fn test_fit_on_train_only() {
        let train = Table::from_columns(vec![Column::int("x", vec![Some(1), Some(2), Some(3)])]).unwrap();
        let test = Table::from_columns(vec![Column::int("x", vec![Some(100)])]).unwrap();
        let encoder = fit_encoder(&train, &schema("num_features: [x]\n")).unwrap();

        let scale = &encoder.standard[0];
        assert!((scale.offset - 2.0).abs() < 1e-12);
        assert!((scale.scale.powi(2) - 2.0 / 3.0).abs() < 1e-12);

        let encoded = encoder.transform(&test).unwrap();
        let expected = (100.0 - 2.0) / (2.0f64 / 3.0).sqrt();
        assert!((encoded.get(0, 0) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_output_order_and_minmax() {
        let table = Table::from_columns(vec![
            Column::int("pass", vec![Some(7), Some(8)]),
            Column::float("mm", vec![Some(10.0), Some(20.0)]),
            Column::float("std", vec![Some(1.0), Some(3.0)]),
        ])
        .unwrap();
        let encoder = fit_encoder(&table, &schema("num_features: [std]\nmm_columns: [mm]\n")).unwrap();

        assert_eq!(encoder.output_columns(), vec!["std", "mm", "pass"]);
        let m = encoder.transform(&table).unwrap();
        assert_eq!(m.row(0), &[-1.0, 0.0, 7.0]);
        assert_eq!(m.row(1), &[1.0, 1.0, 8.0]);
    }

    #[test]
    fn test_constant_columns_scale_by_one() {
        let table = Table::from_columns(vec![
            Column::float("a", vec![Some(5.0), Some(5.0)]),
            Column::float("b", vec![Some(3.0), Some(3.0)]),
        ])
        .unwrap();
        let encoder = fit_encoder(&table, &schema("num_features: [a]\nmm_columns: [b]\n")).unwrap();
        let m = encoder.transform(&table).unwrap();
        assert_eq!(m.row(0), &[0.0, 0.0]);
    }

    #[test]
    fn test_overlap_and_absent_columns_rejected() {
        let table = Table::from_columns(vec![Column::float("a", vec![Some(1.0)])]).unwrap();
        let err = fit_encoder(&table, &schema("num_features: [a]\nmm_columns: [a]\n")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_FEATURE_OVERLAP);

        let err = fit_encoder(&table, &schema("num_features: [zzz]\n")).unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));
    }

    #[test]
    fn test_string_feature_is_rejected_at_transform() {
        let table = Table::from_columns(vec![Column::string("s", vec![Some("x")])]).unwrap();
        let encoder = fit_encoder(&table, &schema("columns: [s]\n")).unwrap();
        let err = encoder.transform(&table).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DATA_NON_NUMERIC);
    }

    #[test]
    fn test_nulls_become_nan() {
        let table = Table::from_columns(vec![
            Column::float("a", vec![Some(1.0), None, Some(3.0)]),
        ])
        .unwrap();
        let encoder = fit_encoder(&table, &schema("num_features: [a]\n")).unwrap();
        assert_eq!(encoder.standard[0].offset, 2.0);
        let m = encoder.transform(&table).unwrap();
        assert!(m.get(1, 0).is_nan());
    }
}
