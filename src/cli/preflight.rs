//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{Result, StudyError};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Notes need a parseable content selector and search endpoint.
    Notes,
    /// Agents need an API key.
    Agent,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Notes => {
            check_selector(&settings.scraper.content_selector)?;
            check_url(&settings.scraper.search_endpoint)?;
        }
        Operation::Agent => {
            require_api_key(settings)?;
            check_url(&settings.agents.api_base)?;
        }
    }
    Ok(())
}

/// Resolve the agent API key, or explain where to set it.
pub fn require_api_key(settings: &Settings) -> Result<String> {
    settings
        .agents
        .resolve_api_key()
        .ok_or_else(|| StudyError::MissingApiKey(settings.agents.api_key_env.clone()))
}

fn check_selector(selector: &str) -> Result<()> {
    scraper::Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| StudyError::Config(format!("Invalid content selector '{}': {:?}", selector, e)))
}

fn check_url(url: &str) -> Result<()> {
    url::Url::parse(url)
        .map(|_| ())
        .map_err(|e| StudyError::Config(format!("Invalid URL '{}': {}", url, e)))
}
