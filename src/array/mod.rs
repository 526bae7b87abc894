//! Dense row-major `f64` matrices exchanged between stages
//!
//! Encoded splits are stored with the target as the last column.

pub mod npy;

pub use npy::{read_npy, write_npy};

use crate::error::{ErrorCode, PipelineError, Result};

/// Row-major matrix of `f64`
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Wrap a row-major buffer; its length must be `rows * cols`
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(shape_error(format!(
                "buffer of {} values does not fit a {}x{} matrix",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build from equally long rows
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(shape_error(format!(
                    "row {} has {} values, expected {}",
                    idx,
                    row.len(),
                    cols
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Build from equally long columns
    pub fn from_columns(columns: &[Vec<f64>]) -> Result<Self> {
        let rows = columns.first().map_or(0, Vec::len);
        if let Some(bad) = columns.iter().position(|c| c.len() != rows) {
            return Err(shape_error(format!(
                "column {} has {} values, expected {}",
                bad,
                columns[bad].len(),
                rows
            )));
        }
        let cols = columns.len();
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            data.extend(columns.iter().map(|c| c[r]));
        }
        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.rows).map(|r| self.get(r, col)).collect()
    }

    /// Split into features (all but the last column) and the last column
    pub fn split_last_column(&self) -> Result<(Matrix, Vec<f64>)> {
        if self.cols == 0 {
            return Err(shape_error("matrix has no columns to take a target from"));
        }
        let width = self.cols - 1;
        let mut features = Vec::with_capacity(self.rows * width);
        let mut target = Vec::with_capacity(self.rows);
        for r in 0..self.rows {
            let row = self.row(r);
            features.extend_from_slice(&row[..width]);
            target.push(row[width]);
        }
        Ok((
            Matrix {
                rows: self.rows,
                cols: width,
                data: features,
            },
            target,
        ))
    }

    /// Append a column on the right
    pub fn with_last_column(&self, column: &[f64]) -> Result<Matrix> {
        if column.len() != self.rows {
            return Err(shape_error(format!(
                "column has {} values, matrix has {} rows",
                column.len(),
                self.rows
            )));
        }
        let mut data = Vec::with_capacity(self.rows * (self.cols + 1));
        for (r, value) in column.iter().enumerate() {
            data.extend_from_slice(self.row(r));
            data.push(*value);
        }
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols + 1,
            data,
        })
    }

    pub fn select_rows(&self, indices: &[usize]) -> Matrix {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &r in indices {
            data.extend_from_slice(self.row(r));
        }
        Matrix {
            rows: indices.len(),
            cols: self.cols,
            data,
        }
    }
}

fn shape_error(message: impl Into<String>) -> PipelineError {
    PipelineError::invalid_input_with_code(ErrorCode::DATA_SHAPE_MISMATCH, message, None)
}
