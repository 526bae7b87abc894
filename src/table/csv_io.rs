//! CSV persistence for tables

use std::fs;
use std::path::Path;

use super::{infer_from_strings, Table};
use crate::error::{ErrorCode, PipelineError, Result};

/// Read a headed CSV file, inferring column kinds
pub fn read_csv(path: &Path) -> Result<Table> {
    if !path.exists() {
        return Err(PipelineError::not_found(
            "CSV artifact not found",
            Some(path.to_path_buf()),
        ));
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        for (idx, column) in cells.iter_mut().enumerate() {
            let value = record.get(idx).unwrap_or("");
            column.push(if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            });
        }
    }

    let columns = headers
        .iter()
        .zip(cells)
        .map(|(name, values)| infer_from_strings(name, values))
        .collect();
    Table::from_columns(columns)
}

/// Write a table as headed CSV, creating parent directories; nulls are empty
pub fn write_csv(path: &Path, table: &Table) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                PipelineError::storage_with_code(
                    ErrorCode::STORAGE_IO_ERROR,
                    "failed to create artifact directory",
                    Some(parent.to_path_buf()),
                )
                .with_source(e)
            })?;
        }
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    writer
        .write_record(table.column_names())
        .map_err(|e| csv_error(path, e))?;
    for row in 0..table.n_rows() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|c| c.cell_string(row).unwrap_or_default())
            .collect();
        writer.write_record(&record).map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|e| {
        PipelineError::storage_with_code(
            ErrorCode::STORAGE_IO_ERROR,
            "failed to flush CSV",
            Some(path.to_path_buf()),
        )
        .with_source(e)
    })
}

fn csv_error(path: &Path, err: csv::Error) -> PipelineError {
    let code = if err.is_io_error() {
        ErrorCode::STORAGE_IO_ERROR
    } else {
        ErrorCode::STORAGE_CORRUPTED
    };
    PipelineError::storage_with_code(code, "CSV read/write failed", Some(path.to_path_buf()))
        .with_source(err)
}
