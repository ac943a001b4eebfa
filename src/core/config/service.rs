use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::EngineConfig;
use super::validation::validate_config;
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("LOCALAI_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let data_config = self.paths.data_dir.join("config.yml");
        if data_config.exists() {
            return data_config;
        }

        self.paths.project_root.join("config.yml")
    }

    /// Loads `config.yml`, applies environment overrides and validates the result.
    ///
    /// A missing file yields the defaults; a malformed file is reported as a
    /// validation error rather than silently ignored.
    pub fn load_config(&self) -> Result<EngineConfig, ApiError> {
        let raw = load_yaml_file(&self.config_path())?;
        let mut config: EngineConfig = serde_json::from_value(raw)
            .map_err(|e| ApiError::validation(format!("invalid config.yml: {e}")))?;

        apply_env_overrides(&mut config);
        validate_config(&config)?;
        Ok(config)
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, ApiError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(ApiError::internal)?;
    let value = serde_yaml::from_str::<Value>(&contents)
        .map_err(|e| ApiError::validation(format!("{}: {e}", path.display())))?;

    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ApiError::validation(format!(
            "{}: top level must be a mapping",
            path.display()
        ))),
    }
}

fn apply_env_overrides(config: &mut EngineConfig) {
    if let Ok(url) = env::var("LOCALAI_LLM_BASE_URL") {
        config.llm.base_url = url;
    }
    if let Ok(backend) = env::var("LOCALAI_LLM_BACKEND") {
        config.llm.backend = backend;
    }
    if let Ok(model) = env::var("LOCALAI_LLM_MODEL") {
        config.llm.model = model;
    }
    if let Some(port) = env::var("PORT").ok().and_then(|v| v.parse::<u16>().ok()) {
        config.server.port = port;
    }
}
