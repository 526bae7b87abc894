//! `tabflow run`

use anyhow::{bail, Result};

use crate::app::{load_pipeline_config, AppConfig};
use crate::pipeline::Pipeline;

pub async fn execute(app: &AppConfig) -> Result<()> {
    let config = load_pipeline_config(app, true)?;
    let pipeline = Pipeline::from_config(config)?;
    let report = pipeline.run().await?;
    println!("{}", report);
    if !report.succeeded {
        bail!(
            "pipeline halted at stage {}",
            report.failed_stage.as_deref().unwrap_or("unknown")
        );
    }
    Ok(())
}
