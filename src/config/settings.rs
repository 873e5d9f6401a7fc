//! Configuration settings for studykit.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub scraper: ScraperSettings,
    pub render: RenderSettings,
    pub notes: NotesSettings,
    pub agents: AgentSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Article search and fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    /// Search endpoint queried with `products`, `query` and `articles_count`.
    pub search_endpoint: String,
    /// User-Agent header sent with search requests.
    pub user_agent: String,
    /// CSS selector of the article's main content container.
    pub content_selector: String,
    /// Number of search results requested.
    pub articles_count: u32,
    /// Optional per-request timeout. None means requests never time out.
    pub timeout_secs: Option<u64>,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            search_endpoint: "https://recommendations.geeksforgeeks.org/api/v1/global-search"
                .to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
                .to_string(),
            content_selector: "article.content".to_string(),
            articles_count: 1,
            timeout_secs: None,
        }
    }
}

/// Document rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Display width of embedded images, in inches.
    pub image_width_inches: f64,
    /// Font used for code blocks.
    pub code_font: String,
    /// Hex fill color of the code block background.
    pub code_shading: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            image_width_inches: 4.5,
            code_font: "Lucida Console".to_string(),
            code_shading: "EAEAEA".to_string(),
        }
    }
}

/// Syllabus notes settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesSettings {
    /// Directory where the CLI writes unit documents.
    pub output_dir: String,
    /// Run the text normalizer over article HTML before rendering.
    pub normalize_articles: bool,
}

impl Default for NotesSettings {
    fn default() -> Self {
        Self {
            output_dir: "Syllabus_Notes".to_string(),
            normalize_articles: true,
        }
    }
}

/// Study agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Base URL of the OpenAI-compatible chat API.
    pub api_base: String,
    /// Chat model used by all agents.
    pub model: String,
    /// API key. Takes precedence over the environment variable.
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Maximum LLM calls per agent run.
    pub max_iterations: usize,
    /// Timeout for a single chat request, in seconds.
    pub timeout_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key: None,
            api_key_env: "GROQ_API_KEY".to_string(),
            max_iterations: 10,
            timeout_secs: 300,
        }
    }
}

impl AgentSettings {
    /// Resolve the API key from config, then the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory holding an `agents.toml` that overrides the preset prompts.
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::StudyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("studykit")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded notes output directory.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.notes.output_dir)
    }
}
