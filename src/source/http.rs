//! Document store reached over an HTTP data API
//!
//! `GET {base_url}/{database}/{collection}` must return the collection's
//! documents as a JSON array. TLS trust can be extended with a PEM CA file.

use async_trait::async_trait;
use reqwest::{Certificate, Client};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::{documents_from_value, Document, DocumentSource};
use crate::config::SourceConfig;
use crate::error::{ErrorCode, PipelineError, Result};

#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: String,
    database: String,
    timeout: Duration,
}

impl HttpSource {
    /// Build the client from config; the CA file is read here, not per request
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let mut builder = Client::builder().timeout(config.timeout);

        if let Some(ca_file) = &config.tls_ca_file {
            let pem = std::fs::read(ca_file).map_err(|e| {
                PipelineError::config_with_code(
                    ErrorCode::CONFIG_NOT_FOUND,
                    format!("cannot read TLS CA file {}", ca_file.display()),
                    Some("source.tls_ca_file".to_string()),
                )
                .with_source(e)
            })?;
            let cert = Certificate::from_pem(&pem).map_err(|e| {
                PipelineError::config_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!("{} is not a PEM certificate", ca_file.display()),
                    Some("source.tls_ca_file".to_string()),
                )
                .with_source(e)
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder.build().map_err(|e| {
            PipelineError::config("failed to build HTTP client for document source").with_source(e)
        })?;

        Ok(Self {
            client,
            base_url: config.connection_url.trim_end_matches('/').to_string(),
            database: config.database.clone(),
            timeout: config.timeout,
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        if self.database.is_empty() {
            format!("{}/{}", self.base_url, collection)
        } else {
            format!("{}/{}/{}", self.base_url, self.database, collection)
        }
    }

    fn request_error(&self, collection: &str, err: reqwest::Error) -> PipelineError {
        let code = if err.is_timeout() {
            ErrorCode::SOURCE_TIMEOUT
        } else {
            ErrorCode::SOURCE_UNAVAILABLE
        };
        let message = if err.is_timeout() {
            format!("request timed out after {:?}", self.timeout)
        } else {
            format!("request to {} failed", self.base_url)
        };
        PipelineError::SourceUnavailable {
            code,
            message,
            collection: Some(collection.to_string()),
            source: Some(Box::new(err)),
        }
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn fetch(&self, collection: &str) -> Result<Vec<Document>> {
        let url = self.collection_url(collection);
        debug!("Fetching collection {} from {}", collection, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.request_error(collection, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::SourceUnavailable {
                code: ErrorCode::SOURCE_BAD_RESPONSE,
                message: format!("{} returned HTTP {}", url, status),
                collection: Some(collection.to_string()),
                source: None,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| self.request_error(collection, e))?;
        let documents = documents_from_value(payload, collection)?;
        info!("Fetched {} documents from {}", documents.len(), url);
        Ok(documents)
    }

    fn describe(&self) -> String {
        format!("{} (database {})", self.base_url, self.database)
    }
}
