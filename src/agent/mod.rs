//! Study agents backed by an OpenAI-compatible chat API.
//!
//! Callers depend on the narrow [`TextGenerator`] interface: given a prompt
//! and a capability set, return generated text. [`ChatAgent`] is the
//! concrete backend; it runs a tool-calling loop against the chat API and
//! executes the tools its capabilities allow.

mod presets;
mod runner;
mod tools;

pub use presets::{AgentKind, PresetInfo, DEFAULT_VIDEO_QUERY, DEFAULT_VIDEO_URL};
pub use runner::{AgentResponse, ChatAgent, ToolCallRecord};
pub use tools::{
    extract_readable_text, extract_video_id, parse_arxiv_feed, parse_caption_tracks,
    parse_search_results, parse_timedtext, parse_tool_call, tool_definitions, Capability,
    CaptionTrack, Paper, Quote, ReadablePage, SearchHit, ToolCall, ToolContext, ToolEndpoints,
};

use crate::error::Result;
use async_trait::async_trait;

/// A single generation job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Who the model is and what it does; becomes the system prompt.
    pub description: String,
    /// The user task.
    pub prompt: String,
    /// Tool families the model may call. Empty means plain chat.
    pub capabilities: Vec<Capability>,
    /// Ask for markdown-formatted output.
    pub markdown: bool,
}

impl GenerationRequest {
    pub fn new(description: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            prompt: prompt.into(),
            capabilities: Vec::new(),
            markdown: true,
        }
    }

    pub fn with_capabilities(mut self, capabilities: &[Capability]) -> Self {
        self.capabilities = capabilities.to_vec();
        self
    }

    pub fn with_markdown(mut self, markdown: bool) -> Self {
        self.markdown = markdown;
        self
    }
}

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<AgentResponse>;
}
