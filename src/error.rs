//! Error types for studykit.

use thiserror::Error;

/// Library-level error type for studykit operations.
#[derive(Error, Debug)]
pub enum StudyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scraping failed: {0}")]
    Scrape(String),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Invalid syllabus: {0}")]
    Syllabus(String),

    #[error("No API key configured. Set {0} or enter a key in the web UI.")]
    MissingApiKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Tool error: {0}")]
    Tool(String),
}

/// Result type alias for studykit operations.
pub type Result<T> = std::result::Result<T, StudyError>;
