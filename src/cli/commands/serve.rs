//! `tabflow serve`

use anyhow::Result;
use std::sync::Arc;

use crate::app::{load_pipeline_config, AppConfig};
use crate::server;
use crate::source::{self, DocumentSource};

pub async fn execute(app: &AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = load_pipeline_config(app, true)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let source: Arc<dyn DocumentSource> = Arc::from(source::from_config(&config.source)?);
    server::serve(config, source).await
}
