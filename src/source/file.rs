//! Directory of exported collections
//!
//! `<dir>/<collection>.json` holds a JSON array; `<dir>/<collection>.jsonl`
//! holds one document per line. The array form wins when both exist.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{documents_from_value, strip_internal_id, Document, DocumentSource};
use crate::error::{ErrorCode, PipelineError, Result};

#[derive(Debug, Clone)]
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_lines(&self, path: &Path, collection: &str) -> Result<Vec<Document>> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| unavailable(collection, path, e))?;

        let mut documents = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(Value::Object(doc)) => documents.push(doc),
                Ok(_) => {
                    return Err(bad_line(collection, idx, "not a JSON object".to_string()));
                }
                Err(e) => return Err(bad_line(collection, idx, e.to_string())),
            }
        }
        strip_internal_id(&mut documents);
        Ok(documents)
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    async fn fetch(&self, collection: &str) -> Result<Vec<Document>> {
        let array_path = self.dir.join(format!("{}.json", collection));
        let lines_path = self.dir.join(format!("{}.jsonl", collection));

        if array_path.is_file() {
            debug!("Reading collection {} from {}", collection, array_path.display());
            let content = tokio::fs::read_to_string(&array_path)
                .await
                .map_err(|e| unavailable(collection, &array_path, e))?;
            let value: Value = serde_json::from_str(&content).map_err(|e| {
                PipelineError::SourceUnavailable {
                    code: ErrorCode::SOURCE_BAD_RESPONSE,
                    message: format!("{} is not valid JSON", array_path.display()),
                    collection: Some(collection.to_string()),
                    source: Some(Box::new(e)),
                }
            })?;
            return documents_from_value(value, collection);
        }

        if lines_path.is_file() {
            debug!("Reading collection {} from {}", collection, lines_path.display());
            return self.read_lines(&lines_path, collection).await;
        }

        Err(PipelineError::source_unavailable(
            format!(
                "no export found for collection in {} (expected {}.json or {}.jsonl)",
                self.dir.display(),
                collection,
                collection
            ),
            Some(collection.to_string()),
        ))
    }

    fn describe(&self) -> String {
        format!("file source at {}", self.dir.display())
    }
}

fn unavailable(collection: &str, path: &Path, err: std::io::Error) -> PipelineError {
    PipelineError::source_unavailable(
        format!("failed to read {}", path.display()),
        Some(collection.to_string()),
    )
    .with_source(err)
}

fn bad_line(collection: &str, idx: usize, reason: String) -> PipelineError {
    PipelineError::SourceUnavailable {
        code: ErrorCode::SOURCE_BAD_RESPONSE,
        message: format!("line {}: {}", idx + 1, reason),
        collection: Some(collection.to_string()),
        source: None,
    }
}
