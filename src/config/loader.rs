use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::PipelineConfig;
use crate::error::{ErrorCode, PipelineError, Result};

/// Config file picked up from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "tabflow.yaml";

/// Builds a [`PipelineConfig`] from defaults, file and environment
///
/// Precedence, lowest first: defaults, YAML file, `.env`, process
/// environment. Variables already set in the process win over `.env`.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    working_dir: PathBuf,
    explicit_path: Option<PathBuf>,
    load_dotenv: bool,
    use_env: bool,
}

impl ConfigLoader {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            explicit_path: None,
            load_dotenv: true,
            use_env: true,
        }
    }

    /// Use this config file instead of looking for `tabflow.yaml`
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.explicit_path = path;
        self
    }

    pub fn with_dotenv(mut self, enabled: bool) -> Self {
        self.load_dotenv = enabled;
        self
    }

    /// Skip environment overrides entirely
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self.load_dotenv = false;
        self
    }

    /// Load and validate
    pub fn load(&self) -> Result<PipelineConfig> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Load without validating; used by commands that only inspect runs
    pub fn load_unvalidated(&self) -> Result<PipelineConfig> {
        let mut config = match self.config_file()? {
            Some(path) => Self::read_file(&path)?,
            None => {
                debug!("No config file found, using defaults");
                PipelineConfig::default()
            }
        };

        if self.load_dotenv {
            let env_file = self.working_dir.join(".env");
            if env_file.is_file() {
                dotenvy::from_path(&env_file).map_err(|e| {
                    PipelineError::config_with_code(
                        ErrorCode::CONFIG_INVALID_VALUE,
                        format!("cannot load {}", env_file.display()),
                        None,
                    )
                    .with_source(e)
                })?;
                debug!("Loaded environment from {}", env_file.display());
            }
        }

        if self.use_env {
            config.merge_env_vars()?;
        }

        self.resolve_relative_paths(&mut config);
        Ok(config)
    }

    fn config_file(&self) -> Result<Option<PathBuf>> {
        if let Some(path) = &self.explicit_path {
            if !path.is_file() {
                return Err(PipelineError::config_with_code(
                    ErrorCode::CONFIG_NOT_FOUND,
                    format!("config file {} not found", path.display()),
                    None,
                ));
            }
            return Ok(Some(path.clone()));
        }
        let default = self.working_dir.join(DEFAULT_CONFIG_FILE);
        Ok(default.is_file().then_some(default))
    }

    fn read_file(path: &Path) -> Result<PipelineConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::config_with_code(
                ErrorCode::CONFIG_NOT_FOUND,
                format!("cannot read {}", path.display()),
                None,
            )
            .with_source(e)
        })?;
        let config: PipelineConfig = serde_yaml::from_str(&content).map_err(|e| {
            PipelineError::config_with_code(
                ErrorCode::CONFIG_INVALID_YAML,
                format!("{} is not a valid config", path.display()),
                None,
            )
            .with_source(e)
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn resolve_relative_paths(&self, config: &mut PipelineConfig) {
        if config.artifact_root.is_relative() {
            config.artifact_root = self.working_dir.join(&config.artifact_root);
        }
        if config.schema_path.is_relative() {
            config.schema_path = self.working_dir.join(&config.schema_path);
        }
    }
}
