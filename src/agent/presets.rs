//! Named agent presets.

use super::tools::Capability;
use super::{AgentResponse, GenerationRequest, TextGenerator};
use crate::config::{AgentPrompts, PresetPrompt, Prompts};
use crate::error::{Result, StudyError};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Question asked about a video when the user leaves the query blank.
pub const DEFAULT_VIDEO_QUERY: &str = "Summarize this video in 5 bullet points.";

/// Video offered as a starting point in the UI.
pub const DEFAULT_VIDEO_URL: &str = "https://www.youtube.com/watch?v=Iv9dewmcFbs&t";

/// The study agents on offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Youtube,
    Arxiv,
    Web,
    Flashcards,
    News,
    Finance,
}

/// Description of a preset for UI clients.
#[derive(Debug, Clone, Serialize)]
pub struct PresetInfo {
    pub kind: AgentKind,
    pub title: &'static str,
    pub input_label: &'static str,
    pub default_input: &'static str,
    pub takes_query: bool,
    pub capabilities: Vec<Capability>,
}

impl AgentKind {
    pub const ALL: [AgentKind; 6] = [
        AgentKind::Youtube,
        AgentKind::Arxiv,
        AgentKind::Web,
        AgentKind::Flashcards,
        AgentKind::News,
        AgentKind::Finance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Youtube => "youtube",
            AgentKind::Arxiv => "arxiv",
            AgentKind::Web => "web",
            AgentKind::Flashcards => "flashcards",
            AgentKind::News => "news",
            AgentKind::Finance => "finance",
        }
    }

    /// Heading shown above the agent's output.
    pub fn title(&self) -> &'static str {
        match self {
            AgentKind::Youtube => "YouTube Video Summary",
            AgentKind::Arxiv => "Research Paper Summaries",
            AgentKind::Web => "Web Content Summary",
            AgentKind::Flashcards => "Flashcards",
            AgentKind::News => "News Report",
            AgentKind::Finance => "Market Analysis",
        }
    }

    pub fn input_label(&self) -> &'static str {
        match self {
            AgentKind::Youtube => "YouTube video URL",
            AgentKind::Arxiv => "Research topic",
            AgentKind::Web => "Search query",
            AgentKind::Flashcards => "Topic",
            AgentKind::News => "News request",
            AgentKind::Finance => "Market question",
        }
    }

    pub fn default_input(&self) -> &'static str {
        match self {
            AgentKind::Youtube => DEFAULT_VIDEO_URL,
            _ => "",
        }
    }

    /// Whether the preset takes a free-form question besides its input.
    pub fn takes_query(&self) -> bool {
        matches!(self, AgentKind::Youtube)
    }

    /// Tools this preset may call.
    pub fn capabilities(&self) -> Vec<Capability> {
        match self {
            AgentKind::Youtube => vec![Capability::VideoCaptions],
            AgentKind::Arxiv => vec![Capability::Arxiv],
            AgentKind::Web => vec![Capability::WebSearch, Capability::WebReader],
            AgentKind::Flashcards => Vec::new(),
            AgentKind::News => vec![Capability::WebSearch, Capability::WebReader],
            AgentKind::Finance => vec![Capability::WebSearch, Capability::Finance],
        }
    }

    pub fn prompt<'a>(&self, prompts: &'a AgentPrompts) -> &'a PresetPrompt {
        match self {
            AgentKind::Youtube => &prompts.youtube,
            AgentKind::Arxiv => &prompts.arxiv,
            AgentKind::Web => &prompts.web,
            AgentKind::Flashcards => &prompts.flashcards,
            AgentKind::News => &prompts.news,
            AgentKind::Finance => &prompts.finance,
        }
    }

    pub fn info(&self) -> PresetInfo {
        PresetInfo {
            kind: *self,
            title: self.title(),
            input_label: self.input_label(),
            default_input: self.default_input(),
            takes_query: self.takes_query(),
            capabilities: self.capabilities(),
        }
    }

    /// Build the generation request for `input` (and `query`, where taken).
    pub fn request(
        &self,
        prompts: &Prompts,
        input: &str,
        query: Option<&str>,
    ) -> Result<GenerationRequest> {
        let input = input.trim();
        if input.is_empty() {
            return Err(StudyError::InvalidInput(format!(
                "{} is required",
                self.input_label()
            )));
        }

        let mut vars = HashMap::new();
        vars.insert("input".to_string(), input.to_string());
        if self.takes_query() {
            let query = query
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .unwrap_or(DEFAULT_VIDEO_QUERY);
            vars.insert("query".to_string(), query.to_string());
        }

        let preset = self.prompt(&prompts.agents);
        Ok(GenerationRequest::new(
            prompts.render_with_custom(&preset.description, &vars),
            prompts.render_with_custom(&preset.task, &vars).trim().to_string(),
        )
        .with_capabilities(&self.capabilities()))
    }

    /// Build the request and run it on `generator`.
    pub async fn run(
        &self,
        generator: &dyn TextGenerator,
        prompts: &Prompts,
        input: &str,
        query: Option<&str>,
    ) -> Result<AgentResponse> {
        let request = self.request(prompts, input, query)?;
        generator.generate(&request).await
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AgentKind {
    type Err = StudyError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        AgentKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| {
                StudyError::InvalidInput(format!(
                    "Unknown agent '{}'. Available: {}",
                    s,
                    AgentKind::ALL.map(|k| k.name()).join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes the prompt back and remembers what it was asked.
    #[derive(Default)]
    struct Echo {
        seen: Mutex<Vec<GenerationRequest>>,
    }

    #[async_trait]
    impl TextGenerator for Echo {
        async fn generate(&self, request: &GenerationRequest) -> Result<AgentResponse> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(AgentResponse {
                content: request.prompt.clone(),
                ..AgentResponse::default()
            })
        }
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("arxiv".parse::<AgentKind>().unwrap(), AgentKind::Arxiv);
        assert_eq!(" YouTube ".parse::<AgentKind>().unwrap(), AgentKind::Youtube);
        assert!("weather".parse::<AgentKind>().is_err());
        for kind in AgentKind::ALL {
            assert_eq!(kind.to_string().parse::<AgentKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_capabilities() {
        assert!(AgentKind::Flashcards.capabilities().is_empty());
        assert_eq!(AgentKind::Youtube.capabilities(), vec![Capability::VideoCaptions]);
        assert!(AgentKind::Finance.capabilities().contains(&Capability::Finance));
    }

    #[test]
    fn test_arxiv_request() {
        let request = AgentKind::Arxiv
            .request(&Prompts::default(), " graph neural networks ", None)
            .unwrap();
        assert_eq!(
            request.prompt,
            "Find and summarize the 5 latest papers on graph neural networks."
        );
        assert!(request.description.contains("Arxiv agent"));
        assert_eq!(request.capabilities, vec![Capability::Arxiv]);
        assert!(request.markdown);
    }

    #[test]
    fn test_youtube_request_defaults_query() {
        let prompts = Prompts::default();
        let request = AgentKind::Youtube
            .request(&prompts, DEFAULT_VIDEO_URL, Some("  "))
            .unwrap();
        assert_eq!(
            request.prompt,
            format!("{} {}", DEFAULT_VIDEO_QUERY, DEFAULT_VIDEO_URL)
        );

        let request = AgentKind::Youtube
            .request(&prompts, DEFAULT_VIDEO_URL, Some("List the key terms."))
            .unwrap();
        assert!(request.prompt.starts_with("List the key terms. https://"));
    }

    #[test]
    fn test_empty_input_rejected() {
        let result = AgentKind::Web.request(&Prompts::default(), "   ", None);
        assert!(matches!(result, Err(StudyError::InvalidInput(_))));
    }

    #[test]
    fn test_custom_variables_reach_prompts() {
        let mut prompts = Prompts::default();
        prompts.agents.flashcards.task = "Make {{count}} cards on {{input}}.".to_string();
        prompts.variables.insert("count".to_string(), "3".to_string());
        let request = AgentKind::Flashcards.request(&prompts, "heaps", None).unwrap();
        assert_eq!(request.prompt, "Make 3 cards on heaps.");
    }

    #[tokio::test]
    async fn test_run_uses_generator() {
        let echo = Echo::default();
        let response = AgentKind::Flashcards
            .run(&echo, &Prompts::default(), "binary trees", None)
            .await
            .unwrap();
        assert_eq!(response.content, "Generate 5 flashcards for the topic: binary trees.");
        let seen = echo.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].capabilities.is_empty());
    }
}
