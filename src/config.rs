//! Project-level defaults, read from `scenario.config.{yaml,yml,json}` and
//! overlaid with environment variables.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::ScenarioError;

pub const CONFIG_FILE_NAMES: [&str; 3] = [
    "scenario.config.yaml",
    "scenario.config.yml",
    "scenario.config.json",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub default_model: Option<ModelConfig>,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub batch_run_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModelConfig {
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".to_string(),
            temperature: 0.0,
            api_key: None,
            max_tokens: None,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventsConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ProjectConfig {
    /// Looks for a config file in the current directory; a missing file yields
    /// the defaults. Environment variables are applied on top either way.
    pub fn load() -> Result<Self, ScenarioError> {
        let cwd = env::current_dir().map_err(|error| ScenarioError::Config(error.to_string()))?;
        let mut config = match find_config_file(&cwd) {
            Some(path) => {
                let config = Self::from_path(&path)?;
                tracing::info!(path = %path.display(), "loaded scenario project config");
                config
            }
            None => Self::default(),
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ScenarioError> {
        let content = fs::read_to_string(path)
            .map_err(|error| ScenarioError::Config(format!("{}: {error}", path.display())))?;

        let config = if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            Self::from_json_str(&content)?
        } else {
            Self::from_yaml_str(&content)?
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ScenarioError> {
        serde_yaml::from_str(content).map_err(|error| ScenarioError::Config(error.to_string()))
    }

    pub fn from_json_str(content: &str) -> Result<Self, ScenarioError> {
        serde_json::from_str(content).map_err(|error| ScenarioError::Config(error.to_string()))
    }

    pub fn apply_env(&mut self) {
        self.apply_vars(|key| env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = var("SCENARIO_EVENTS_ENDPOINT") {
            self.events.endpoint = Some(endpoint);
        }
        if let Some(api_key) = var("LANGWATCH_API_KEY") {
            self.events.api_key = Some(api_key);
        }
        if let Some(batch_run_id) = var("SCENARIO_BATCH_ID") {
            self.batch_run_id = Some(batch_run_id);
        }
        if let Some(model) = var("SCENARIO_MODEL") {
            self.default_model.get_or_insert_with(ModelConfig::default).model = model;
        }
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if let Some(model) = &self.default_model {
            if !(0.0..=1.0).contains(&model.temperature) {
                return Err(ScenarioError::Config(format!(
                    "defaultModel.temperature must be between 0.0 and 1.0, got {}",
                    model.temperature
                )));
            }
            if model.model.trim().is_empty() {
                return Err(ScenarioError::Config("defaultModel.model must not be empty".into()));
            }
        }
        Ok(())
    }
}

fn find_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}
