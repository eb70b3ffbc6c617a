use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct EditorConfig {
    pub models: Vec<String>,
    pub image_label: String,
    pub image_id_prefix: String,
    pub placeholder: String,
    pub log_level: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            models: vec![
                "claude-3.5-sonnet".to_string(),
                "gpt-4o".to_string(),
                "llama-3".to_string(),
            ],
            image_label: "Uploaded image".to_string(),
            image_id_prefix: "img".to_string(),
            placeholder: "Start writing... (Select text and press Cmd+K to add a link)"
                .to_string(),
            log_level: "debug".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = serde_json::from_str(raw)?;
        if config.models.is_empty() {
            return Err(ConfigError::NoModels);
        }
        Ok(config)
    }

    pub fn log_level(&self) -> log::Level {
        self.log_level.parse().unwrap_or(log::Level::Debug)
    }
}
