//! Agent command implementation.

use crate::agent::{AgentKind, ChatAgent};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::error::StudyError;
use anyhow::Result;

/// Run the agent command.
///
/// A missing API key is reported as a warning, not a failure.
pub async fn run_agent(
    kind: &str,
    input: &str,
    query: Option<String>,
    model: Option<String>,
    settings: Settings,
) -> Result<()> {
    let kind: AgentKind = kind.parse()?;

    match preflight::check(Operation::Agent, &settings) {
        Ok(()) => {}
        Err(e @ StudyError::MissingApiKey(_)) => {
            Output::warning(&format!("{}", e));
            Output::info("Run 'studykit doctor' for detailed diagnostics.");
            return Ok(());
        }
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Run 'studykit doctor' for detailed diagnostics.");
            return Err(e.into());
        }
    }
    let api_key = preflight::require_api_key(&settings)?;

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;

    let mut agent = ChatAgent::new(&settings, &api_key)?;
    if let Some(model) = model {
        agent = agent.with_model(&model);
    }

    let spinner = Output::spinner(&format!("{} agent working...", kind));

    match kind.run(&agent, &prompts, input, query.as_deref()).await {
        Ok(response) => {
            spinner.finish_and_clear();

            Output::header(kind.title());
            println!("\n{}\n", response.content);

            if !response.tool_calls.is_empty() {
                Output::header(&format!("Tool calls ({})", response.tool_calls.len()));
                for call in &response.tool_calls {
                    Output::tool_call(&call.to_string(), &call.result);
                }
                println!();
            }

            Output::info(&format!(
                "Completed in {} iteration(s) with {}",
                response.iterations,
                agent.model()
            ));
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Agent failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
