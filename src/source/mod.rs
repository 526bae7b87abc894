//! Document store collaborator
//!
//! Ingestion only needs "every document of a collection, without the store's
//! internal `_id`". [`DocumentSource`] captures that contract; the concrete
//! backend is chosen from the configured connection URL.

pub mod file;
pub mod http;
pub mod memory;

pub use file::FileSource;
pub use http::HttpSource;
pub use memory::MemorySource;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::SourceConfig;
use crate::error::{ErrorCode, PipelineError, Result};

/// One document as a JSON object
pub type Document = Map<String, Value>;

/// Field the document store adds to every record
pub const INTERNAL_ID_FIELD: &str = "_id";

/// Read access to a document collection
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Every document of the collection (empty filter), `_id` removed
    async fn fetch(&self, collection: &str) -> Result<Vec<Document>>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Pick a backend from the connection URL
///
/// `http://` and `https://` select [`HttpSource`]; `file://` or a bare path
/// select [`FileSource`] rooted at that directory.
pub fn from_config(config: &SourceConfig) -> Result<Box<dyn DocumentSource>> {
    let url = config.connection_url.trim();
    if url.is_empty() {
        return Err(PipelineError::config_with_code(
            ErrorCode::CONFIG_MISSING_REQUIRED,
            "no document source configured (set CONNECTION_URL)",
            Some("source.connection_url".to_string()),
        ));
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(Box::new(HttpSource::new(config)?))
    } else {
        let dir = url.strip_prefix("file://").unwrap_or(url);
        Ok(Box::new(FileSource::new(dir)))
    }
}

/// Remove the store's internal identifier from each document
pub fn strip_internal_id(documents: &mut [Document]) {
    for doc in documents {
        doc.remove(INTERNAL_ID_FIELD);
    }
}

/// Interpret a JSON payload as a list of documents
///
/// Accepts a bare array or an object wrapping one under `documents`.
pub(crate) fn documents_from_value(value: Value, collection: &str) -> Result<Vec<Document>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("documents") {
            Some(Value::Array(items)) => items,
            _ => return Err(bad_payload(collection, "expected an array of documents")),
        },
        _ => return Err(bad_payload(collection, "expected an array of documents")),
    };

    let mut documents = items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(doc) => Ok(doc),
            _ => Err(bad_payload(
                collection,
                &format!("document {} is not an object", idx),
            )),
        })
        .collect::<Result<Vec<_>>>()?;
    strip_internal_id(&mut documents);
    Ok(documents)
}

fn bad_payload(collection: &str, message: &str) -> PipelineError {
    PipelineError::SourceUnavailable {
        code: ErrorCode::SOURCE_BAD_RESPONSE,
        message: message.to_string(),
        collection: Some(collection.to_string()),
        source: None,
    }
}
