//! NumPy `.npy` format for 2-D little-endian `f64` arrays
//!
//! Files are written in format version 1.0 so `numpy.load` reads them
//! directly. Reading accepts versions 1.x and 2.x, C order only.

use std::fs;
use std::path::Path;

use super::Matrix;
use crate::error::{ErrorCode, PipelineError, Result};

const MAGIC: &[u8] = b"\x93NUMPY";
const ALIGNMENT: usize = 64;

/// Write a matrix as a v1.0 `.npy` file, creating parent directories
pub fn write_npy(path: &Path, matrix: &Matrix) -> Result<()> {
    let mut header = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': ({}, {}), }}",
        matrix.rows(),
        matrix.cols()
    );
    // magic(6) + version(2) + header length(2) + header, padded to the alignment
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let header_len = u16::try_from(header.len()).map_err(|_| {
        PipelineError::storage_with_code(
            ErrorCode::STORAGE_SERIALIZATION_ERROR,
            "npy header too long for format 1.0",
            Some(path.to_path_buf()),
        )
    })?;

    let mut bytes = Vec::with_capacity(MAGIC.len() + 4 + header.len() + matrix.data().len() * 8);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&[1, 0]);
    bytes.extend_from_slice(&header_len.to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    for value in matrix.data() {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error(path, e))?;
    }
    fs::write(path, bytes).map_err(|e| io_error(path, e))
}

/// Read a 2-D `<f8` `.npy` file
pub fn read_npy(path: &Path) -> Result<Matrix> {
    let bytes = fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PipelineError::not_found("array artifact not found", Some(path.to_path_buf()))
        } else {
            io_error(path, e)
        }
    })?;
    parse_npy(&bytes).map_err(|msg| {
        PipelineError::storage_with_code(
            ErrorCode::STORAGE_CORRUPTED,
            format!("invalid npy file: {}", msg),
            Some(path.to_path_buf()),
        )
    })
}

fn parse_npy(bytes: &[u8]) -> std::result::Result<Matrix, String> {
    if bytes.len() < MAGIC.len() + 2 || &bytes[..MAGIC.len()] != MAGIC {
        return Err("missing magic string".into());
    }
    let major = bytes[MAGIC.len()];
    let (header_len, header_start) = match major {
        1 => {
            let raw = bytes.get(8..10).ok_or("truncated header length")?;
            (u16::from_le_bytes([raw[0], raw[1]]) as usize, 10)
        }
        2 | 3 => {
            let raw = bytes.get(8..12).ok_or("truncated header length")?;
            (
                u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize,
                12,
            )
        }
        other => return Err(format!("unsupported format version {}", other)),
    };
    let header_end = header_start + header_len;
    let header = bytes
        .get(header_start..header_end)
        .ok_or("truncated header")?;
    let header = std::str::from_utf8(header).map_err(|_| "header is not text")?;

    let descr = dict_value(header, "descr").ok_or("header has no descr")?;
    if descr.trim_matches(|c| c == '\'' || c == '"') != "<f8" {
        return Err(format!("unsupported dtype {}", descr));
    }
    if dict_value(header, "fortran_order").map(str::trim) == Some("True") {
        return Err("fortran order is not supported".into());
    }
    let shape = dict_value(header, "shape").ok_or("header has no shape")?;
    let dims: Vec<usize> = shape
        .trim_matches(|c| c == '(' || c == ')')
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|_| format!("bad dimension {}", s)))
        .collect::<std::result::Result<_, _>>()?;
    let (rows, cols) = match dims.as_slice() {
        [rows, cols] => (*rows, *cols),
        [len] => (*len, 1),
        _ => return Err(format!("expected a 2-D array, got shape {}", shape)),
    };

    let body = &bytes[header_end..];
    let expected = rows * cols * 8;
    if body.len() != expected {
        return Err(format!(
            "data section has {} bytes, expected {}",
            body.len(),
            expected
        ));
    }
    let data = body
        .chunks_exact(8)
        .map(|chunk| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect();
    Matrix::new(rows, cols, data).map_err(|e| e.to_string())
}

/// Value text of one key of the header's Python dict literal
fn dict_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("'{}':", key);
    let start = header.find(&needle)? + needle.len();
    let rest = header[start..].trim_start();
    let end = if rest.starts_with('(') {
        rest.find(')')? + 1
    } else {
        rest.find(',').or_else(|| rest.find('}'))?
    };
    Some(rest[..end].trim())
}

fn io_error(path: &Path, err: std::io::Error) -> PipelineError {
    PipelineError::storage_with_code(
        ErrorCode::STORAGE_IO_ERROR,
        "failed to access array artifact",
        Some(path.to_path_buf()),
    )
    .with_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_header_is_aligned_and_terminated() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("train.npy");
        let m = Matrix::from_rows(&[vec![1.0, 2.0, 0.0], vec![-3.5, 4.0, 1.0]]).unwrap();
        write_npy(&path, &m).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..6], MAGIC);
        assert_eq!(&bytes[6..8], &[1, 0]);
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
        assert_eq!(bytes[10 + header_len - 1], b'\n');
        assert_eq!(bytes.len(), 10 + header_len + 6 * 8);

        assert_eq!(read_npy(&path).unwrap(), m);
    }

    #[test]
    fn test_reads_numpy_written_header() {
        // Header as produced by numpy.save for a (2, 1) float64 array
        let mut header =
            "{'descr': '<f8', 'fortran_order': False, 'shape': (2, 1), }".to_string();
        while (10 + header.len() + 1) % 64 != 0 {
            header.push(' ');
        }
        header.push('\n');
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&7.0f64.to_le_bytes());
        bytes.extend_from_slice(&8.0f64.to_le_bytes());

        let m = parse_npy(&bytes).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.column(0), vec![7.0, 8.0]);
    }

    #[test]
    fn test_rejects_other_dtypes() {
        let header = "{'descr': '<i8', 'fortran_order': False, 'shape': (0, 0), }\n";
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        assert!(parse_npy(&bytes).unwrap_err().contains("dtype"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        assert!(read_npy(&temp.path().join("nope.npy")).unwrap_err().is_not_found());
    }
}
