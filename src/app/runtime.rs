//! Startup sequence shared by every subcommand

use anyhow::Result;
use tracing::debug;

use crate::app::{config::AppConfig, logging::init_logging};
use crate::config::{ConfigLoader, PipelineConfig};

/// Initialize logging
pub fn initialize_app(config: &AppConfig) {
    init_logging(config);
}

/// Load the pipeline configuration for this invocation
///
/// Commands that only read existing runs skip validation, so they work
/// without a seed or collection configured.
pub fn load_pipeline_config(app: &AppConfig, validate: bool) -> Result<PipelineConfig> {
    let loader = ConfigLoader::new(app.working_dir.clone()).with_config_path(app.config_path.clone());
    let config = if validate {
        loader.load()?
    } else {
        loader.load_unvalidated()?
    };
    debug!(
        "Artifact root {}, schema {}",
        config.artifact_root.display(),
        config.schema_path.display()
    );
    Ok(config)
}
