//! In-memory document source

use async_trait::async_trait;
use std::collections::HashMap;

use super::{strip_internal_id, Document, DocumentSource};
use crate::error::{PipelineError, Result};

/// Collections held in memory; unknown collections are empty, as in a
/// document store. `unavailable()` builds a source whose every fetch fails.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    collections: HashMap<String, Vec<Document>>,
    unavailable: bool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, name: impl Into<String>, documents: Vec<Document>) -> Self {
        self.collections.insert(name.into(), documents);
        self
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    async fn fetch(&self, collection: &str) -> Result<Vec<Document>> {
        if self.unavailable {
            return Err(PipelineError::source_unavailable(
                "in-memory source marked unavailable",
                Some(collection.to_string()),
            ));
        }
        let mut documents = self.collections.get(collection).cloned().unwrap_or_default();
        strip_internal_id(&mut documents);
        Ok(documents)
    }

    fn describe(&self) -> String {
        format!("in-memory source with {} collection(s)", self.collections.len())
    }
}
