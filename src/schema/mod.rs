//! Declarative column contract
//!
//! The schema document is YAML with these keys, all optional except that
//! validation needs `columns` and transformation needs `target_column`:
//!
//! ```yaml
//! columns:            # mapping, list of single-entry mappings, or list of names
//!   - id: int
//!   - Gender: category
//! numerical_columns: [Age, Annual_Premium]
//! categorical_columns: [Gender, Vehicle_Age]
//! num_features: [Age, Vintage]
//! mm_columns: [Annual_Premium]
//! drop_columns: id    # string or list
//! target_column: Response
//! ```

use serde_yaml::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ErrorCode, PipelineError, Result};
use crate::table::ColumnKind;

/// Type hint attached to a schema column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeHint {
    Int,
    Float,
    Str,
    /// Any other hint; recorded but never checked
    Other(String),
}

impl TypeHint {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => TypeHint::Int,
            "float" | "double" => TypeHint::Float,
            "string" | "object" | "category" => TypeHint::Str,
            _ => TypeHint::Other(raw.to_string()),
        }
    }

    /// Whether a column kind satisfies the hint; `None` when unchecked
    pub fn accepts(&self, kind: ColumnKind) -> Option<bool> {
        match self {
            TypeHint::Int => Some(kind == ColumnKind::Int),
            TypeHint::Float => Some(kind == ColumnKind::Float),
            TypeHint::Str => Some(kind == ColumnKind::Str),
            TypeHint::Other(_) => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TypeHint::Int => "int",
            TypeHint::Float => "float",
            TypeHint::Str => "string-like",
            TypeHint::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    /// Expected columns, in order
    pub columns: Vec<String>,
    /// Declared type per column, when the schema gives one
    pub types: HashMap<String, TypeHint>,
    pub numerical_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    /// Columns standard-scaled by the encoder
    pub num_features: Vec<String>,
    /// Columns min-max-scaled by the encoder
    pub mm_columns: Vec<String>,
    pub drop_columns: Vec<String>,
    pub target_column: Option<String>,
}

impl Schema {
    /// The target column, required by transformation
    pub fn target_column(&self) -> Result<&str> {
        self.target_column.as_deref().ok_or_else(|| {
            PipelineError::config_with_code(
                ErrorCode::CONFIG_MISSING_REQUIRED,
                "schema does not name a target_column",
                Some("target_column".to_string()),
            )
        })
    }

    /// `num_features` and `mm_columns` must not share a column
    pub fn check_feature_groups(&self) -> Result<()> {
        let standard: HashSet<&str> = self.num_features.iter().map(String::as_str).collect();
        let mut overlap: Vec<&str> = self
            .mm_columns
            .iter()
            .map(String::as_str)
            .filter(|c| standard.contains(c))
            .collect();
        if overlap.is_empty() {
            return Ok(());
        }
        overlap.sort_unstable();
        overlap.dedup();
        Err(PipelineError::config_with_code(
            ErrorCode::CONFIG_FEATURE_OVERLAP,
            format!(
                "columns listed in both num_features and mm_columns: {}",
                overlap.join(", ")
            ),
            Some("mm_columns".to_string()),
        ))
    }
}

/// Load and parse a schema file
pub fn load_schema(path: &Path) -> Result<Schema> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PipelineError::not_found("schema file not found", Some(path.to_path_buf()))
        } else {
            PipelineError::schema_parse("cannot read schema file", Some(path.to_path_buf()))
                .with_source(e)
        }
    })?;
    let schema = parse_schema(&content, Some(path.to_path_buf()))?;
    debug!(
        "Loaded schema from {} with {} columns",
        path.display(),
        schema.columns.len()
    );
    Ok(schema)
}

/// Parse schema YAML; `origin` is only used in error messages
pub fn parse_schema(content: &str, origin: Option<PathBuf>) -> Result<Schema> {
    let doc: Value = serde_yaml::from_str(content).map_err(|e| {
        PipelineError::schema_parse("schema is not valid YAML", origin.clone()).with_source(e)
    })?;
    let map = match doc {
        Value::Mapping(map) => map,
        _ => {
            return Err(PipelineError::schema_parse(
                "schema document is not a mapping",
                origin,
            ))
        }
    };
    let get = |key: &str| map.get(key).filter(|v| !v.is_null());

    let (columns, types) = match get("columns") {
        Some(value) => parse_columns(value).map_err(|msg| {
            PipelineError::SchemaParse {
                code: ErrorCode::SCHEMA_INVALID_COLUMNS,
                message: msg,
                path: origin.clone(),
                source: None,
            }
        })?,
        None => (Vec::new(), HashMap::new()),
    };

    let list = |key: &str| -> Result<Vec<String>> {
        match get(key) {
            None => Ok(Vec::new()),
            Some(value) => string_list(value).ok_or_else(|| {
                PipelineError::schema_parse(
                    format!("'{}' must be a string or a list of strings", key),
                    origin.clone(),
                )
            }),
        }
    };

    let target_column = match get("target_column") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(PipelineError::schema_parse(
                "'target_column' must be a string",
                origin.clone(),
            ))
        }
    };

    Ok(Schema {
        columns,
        types,
        numerical_columns: list("numerical_columns")?,
        categorical_columns: list("categorical_columns")?,
        num_features: list("num_features")?,
        mm_columns: list("mm_columns")?,
        drop_columns: list("drop_columns")?,
        target_column,
    })
}

type ParsedColumns = (Vec<String>, HashMap<String, TypeHint>);

fn parse_columns(value: &Value) -> std::result::Result<ParsedColumns, String> {
    let mut names = Vec::new();
    let mut types = HashMap::new();

    match value {
        Value::Mapping(map) => {
            for (key, hint) in map {
                let name = scalar_name(key).ok_or("column names must be strings")?;
                if let Some(hint) = hint.as_str() {
                    types.insert(name.clone(), TypeHint::parse(hint));
                }
                names.push(name);
            }
        }
        Value::Sequence(items) if items.iter().all(Value::is_mapping) => {
            for item in items {
                let entry = item.as_mapping().ok_or("column entries must be mappings")?;
                let (key, hint) = match entry.iter().next() {
                    Some(pair) if entry.len() == 1 => pair,
                    _ => return Err("each column entry must have exactly one key".into()),
                };
                let name = scalar_name(key).ok_or("column names must be strings")?;
                if let Some(hint) = hint.as_str() {
                    types.insert(name.clone(), TypeHint::parse(hint));
                }
                names.push(name);
            }
        }
        Value::Sequence(items) => {
            for item in items {
                names.push(scalar_name(item).ok_or(
                    "columns list must hold only names or only single-entry mappings",
                )?);
            }
        }
        _ => return Err("'columns' must be a mapping or a list".into()),
    }

    Ok((names, types))
}

fn scalar_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Sequence(items) => items.iter().map(|v| v.as_str().map(str::to_string)).collect(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_columns_as_list_of_mappings() {
        let schema = parse_schema(
            "columns:\n  - id: int\n  - Gender: category\n  - Annual_Premium: float\ntarget_column: Response\n",
            None,
        )
        .unwrap();
        assert_eq!(schema.columns, vec!["id", "Gender", "Annual_Premium"]);
        assert_eq!(schema.types["id"], TypeHint::Int);
        assert_eq!(schema.types["Gender"], TypeHint::Str);
        assert_eq!(schema.target_column().unwrap(), "Response");
    }

    #[test]
    fn test_columns_as_mapping_keeps_order() {
        let schema = parse_schema("columns:\n  b: int\n  a: weird\n", None).unwrap();
        assert_eq!(schema.columns, vec!["b", "a"]);
        assert_eq!(schema.types["a"], TypeHint::Other("weird".into()));
    }

    #[test]
    fn test_columns_as_plain_names() {
        let schema = parse_schema("columns: [A, B, C]\ndrop_columns: id\n", None).unwrap();
        assert_eq!(schema.columns, vec!["A", "B", "C"]);
        assert!(schema.types.is_empty());
        assert_eq!(schema.drop_columns, vec!["id"]);
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            parse_schema("- just\n- a list\n", None),
            Err(PipelineError::SchemaParse { .. })
        ));
        let err = parse_schema("columns: 5\n", None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SCHEMA_INVALID_COLUMNS);
        assert!(parse_schema("columns: [A, {B: int}]\n", None).is_err());
        assert!(parse_schema("columns: [A]\nnum_features: {a: 1}\n", None).is_err());
        assert!(parse_schema("columns: [A\n", None).is_err());
    }

    #[test]
    fn test_missing_target_is_config_error() {
        let schema = parse_schema("columns: [A]\n", None).unwrap();
        assert!(matches!(
            schema.target_column(),
            Err(PipelineError::Config { .. })
        ));
    }

    #[test]
    fn test_feature_group_overlap_rejected() {
        let schema = parse_schema(
            "columns: [A, B]\nnum_features: [A, B]\nmm_columns: [B]\n",
            None,
        )
        .unwrap();
        let err = schema.check_feature_groups().unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_FEATURE_OVERLAP);
        assert!(err.to_string().contains('B'));

        let ok = parse_schema("num_features: [A]\nmm_columns: [B]\n", None).unwrap();
        assert!(ok.check_feature_groups().is_ok());
    }

    #[test]
    fn test_load_schema_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("schema.yaml");
        std::fs::write(&path, "columns: [A]\n").unwrap();
        assert_eq!(load_schema(&path).unwrap().columns, vec!["A"]);
        assert!(load_schema(&temp.path().join("nope.yaml")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_type_hint_accepts() {
        assert_eq!(TypeHint::parse("Integer").accepts(ColumnKind::Int), Some(true));
        assert_eq!(TypeHint::parse("double").accepts(ColumnKind::Int), Some(false));
        assert_eq!(TypeHint::parse("datetime").accepts(ColumnKind::Str), None);
    }
}
