//! Configuration management for the resume ranker

use crate::error::{RankerError, Result};
use crate::rubric::TOTAL_POSSIBLE_POINTS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub rubric: RubricConfig,
    pub processing: ProcessingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricConfig {
    pub excluded_criterion: String,
    pub require_weights_sum_to_100: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub channel_capacity: usize,
    pub remove_processed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub color_output: bool,
    pub show_justifications: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Console,
    Json,
    Markdown,
    Html,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                base_url: "https://api.groq.com/openai/v1".to_string(),
                model: "gemma2-9b-it".to_string(),
                temperature: 0.0,
                max_tokens: 1024,
                api_key_env: "GROQ_API_KEY".to_string(),
                timeout_secs: 60,
                max_attempts: 3,
                initial_backoff_ms: 1000,
            },
            rubric: RubricConfig {
                excluded_criterion: TOTAL_POSSIBLE_POINTS.to_string(),
                require_weights_sum_to_100: false,
            },
            processing: ProcessingConfig {
                channel_capacity: 16,
                remove_processed: false,
            },
            output: OutputConfig {
                format: OutputFormat::Console,
                color_output: true,
                show_justifications: false,
            },
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

impl Config {
    /// Load from the default location, writing defaults on first use.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content).map_err(|e| {
                RankerError::Configuration(format!("Failed to parse config: {}", e))
            })?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            RankerError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("resume-ranker")
            .join("config.toml")
    }

    fn validate(&self) -> Result<()> {
        if self.llm.max_attempts == 0 {
            return Err(RankerError::Configuration(
                "llm.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.llm.timeout_secs == 0 {
            return Err(RankerError::Configuration(
                "llm.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.processing.channel_capacity == 0 {
            return Err(RankerError::Configuration(
                "processing.channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
