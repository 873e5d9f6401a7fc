//! Configuration module for studykit.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, PresetPrompt, Prompts};
pub use settings::{
    AgentSettings, GeneralSettings, NotesSettings, PromptSettings, RenderSettings,
    ScraperSettings, ServerSettings, Settings,
};
