//! Chat agent with tool calling loop.

use super::tools::{parse_tool_call, tool_definitions, Capability, ToolContext, ToolEndpoints};
use super::{GenerationRequest, TextGenerator};
use crate::config::Settings;
use crate::error::{Result, StudyError};
use crate::openai::create_client;
use crate::scrape::http_client;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, info, instrument};

const MARKDOWN_GUIDANCE: &str =
    "Format your response in markdown, using headers, lists and tables where they help.";

const TOOL_GUIDANCE: &str = "Use the available tools to gather the information you need. \
When you have enough, give your final answer without calling more tools.";

/// Agent that talks to an OpenAI-compatible chat API and runs tools.
pub struct ChatAgent {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    tools: ToolContext,
    max_iterations: usize,
}

impl ChatAgent {
    /// Create an agent from settings with the given API key.
    pub fn new(settings: &Settings, api_key: &str) -> Result<Self> {
        let client = create_client(&settings.agents, api_key)?;
        let tools = ToolContext::new(
            http_client(settings.scraper.timeout_secs)?,
            ToolEndpoints::default(),
        );

        Ok(Self {
            client,
            model: settings.agents.model.clone(),
            tools,
            max_iterations: settings.agents.max_iterations,
        })
    }

    /// Use a different model.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Replace the tool execution context.
    pub fn with_tools(mut self, tools: ToolContext) -> Self {
        self.tools = tools;
        self
    }

    /// Set maximum iterations for the agent loop.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(request: &GenerationRequest) -> String {
        let mut prompt = request.description.trim().to_string();
        if !request.capabilities.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(TOOL_GUIDANCE);
        }
        if request.markdown {
            prompt.push_str("\n\n");
            prompt.push_str(MARKDOWN_GUIDANCE);
        }
        prompt
    }

    /// Run the tool-calling loop for one request.
    #[instrument(skip(self, request), fields(model = %self.model))]
    pub async fn run(&self, request: &GenerationRequest) -> Result<AgentResponse> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(Self::system_prompt(request))
                .build()
                .map_err(|e| StudyError::Agent(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.clone())
                .build()
                .map_err(|e| StudyError::Agent(e.to_string()))?
                .into(),
        ];

        let tools = tool_definitions(&request.capabilities);
        let mut iterations = 0;
        let mut tool_calls_made = Vec::new();

        loop {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(StudyError::Agent(format!(
                    "Agent exceeded maximum iterations ({})",
                    self.max_iterations
                )));
            }

            debug!("Agent iteration {}", iterations);

            let mut args = CreateChatCompletionRequestArgs::default();
            args.model(&self.model).messages(messages.clone());
            if !tools.is_empty() {
                args.tools(tools.clone());
            }
            let chat_request = args.build().map_err(|e| StudyError::Agent(e.to_string()))?;

            let response = self
                .client
                .chat()
                .create(chat_request)
                .await
                .map_err(|e| StudyError::OpenAI(format!("Agent API error: {}", e)))?;

            let choice = response
                .choices
                .first()
                .ok_or_else(|| StudyError::Agent("No response from model".to_string()))?;

            let tool_calls = match &choice.message.tool_calls {
                Some(calls) if !calls.is_empty() => calls,
                _ => {
                    return Ok(AgentResponse {
                        content: choice.message.content.clone().unwrap_or_default(),
                        tool_calls: tool_calls_made,
                        iterations,
                    })
                }
            };

            let assistant_msg = ChatCompletionRequestAssistantMessageArgs::default()
                .tool_calls(tool_calls.clone())
                .build()
                .map_err(|e| StudyError::Agent(e.to_string()))?;
            messages.push(assistant_msg.into());

            for tool_call in tool_calls {
                let record = self
                    .execute_tool_call(tool_call, &request.capabilities)
                    .await;

                let tool_msg = ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(&tool_call.id)
                    .content(record.result.clone())
                    .build()
                    .map_err(|e| StudyError::Agent(e.to_string()))?;
                messages.push(tool_msg.into());

                tool_calls_made.push(record);
            }
        }
    }

    /// Execute a single tool call and return a record of it.
    ///
    /// Failures become the tool's result text so the model can react to them.
    async fn execute_tool_call(
        &self,
        tool_call: &ChatCompletionMessageToolCall,
        allowed: &[Capability],
    ) -> ToolCallRecord {
        let name = &tool_call.function.name;
        let arguments = &tool_call.function.arguments;

        info!("Agent calling tool: {} with args: {}", name, arguments);

        let result = match parse_tool_call(name, arguments) {
            Ok(tool) if !allowed.contains(&tool.capability()) => {
                format!("Tool not available to this agent: {}", name)
            }
            Ok(tool) => match self.tools.execute(&tool).await {
                Ok(output) => output,
                Err(e) => format!("Tool error: {}", e),
            },
            Err(e) => format!("Failed to parse tool call: {}", e),
        };

        ToolCallRecord {
            name: name.clone(),
            arguments: arguments.clone(),
            result,
        }
    }
}

#[async_trait]
impl TextGenerator for ChatAgent {
    async fn generate(&self, request: &GenerationRequest) -> Result<AgentResponse> {
        self.run(request).await
    }
}

/// Response from an agent run.
#[derive(Debug, Clone, Default)]
pub struct AgentResponse {
    /// The final response content from the agent.
    pub content: String,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of iterations (LLM calls) used.
    pub iterations: usize,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}
