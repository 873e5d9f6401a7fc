//! Prompt templates for the study agents.
//!
//! Prompts can be customized by placing an `agents.toml` file in the custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid placeholder regex"));

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub agents: AgentPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// System description and task template for one agent preset.
///
/// The task template receives `{{input}}` and, for presets that take a second
/// field, `{{query}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetPrompt {
    pub description: String,
    pub task: String,
}

impl PresetPrompt {
    fn new(description: &str, task: &str) -> Self {
        Self {
            description: description.to_string(),
            task: task.to_string(),
        }
    }
}

/// Prompts for every agent preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    pub youtube: PresetPrompt,
    pub arxiv: PresetPrompt,
    pub web: PresetPrompt,
    pub flashcards: PresetPrompt,
    pub news: PresetPrompt,
    pub finance: PresetPrompt,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            youtube: PresetPrompt::new(
                "You are a YouTube agent. Obtain the captions of a YouTube video and answer questions.",
                "{{query}} {{input}}",
            ),
            arxiv: PresetPrompt::new(
                "You are an Arxiv agent. Fetch and summarize research papers.",
                "Find and summarize the 5 latest papers on {{input}}.",
            ),
            web: PresetPrompt::new(
                "You are a web agent. Search and summarize web content.",
                "Search and summarize content about {{input}}.",
            ),
            flashcards: PresetPrompt::new(
                "You are a flashcard generator. Create flashcards for the given topic.",
                "Generate 5 flashcards for the topic: {{input}}.",
            ),
            news: PresetPrompt::new(
                "You are an enthusiastic news reporter with a flair for storytelling!",
                "{{input}}",
            ),
            finance: PresetPrompt::new(
                r#"You are a market analyst. Search the web for information and get financial data.

Always include sources.
Use tables to display data."#,
                "{{input}}",
            ),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let agents_path = custom_path.join("agents.toml");
            if agents_path.exists() {
                let content = std::fs::read_to_string(&agents_path)?;
                prompts.agents = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are substituted in one pass over the template, so values
    /// are never expanded again. Unknown placeholders are left as they are.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
