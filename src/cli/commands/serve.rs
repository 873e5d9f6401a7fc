//! Web UI and HTTP API server.
//!
//! Serves the single-page UI plus JSON endpoints for building notes and
//! running the study agents.

use crate::agent::{AgentKind, ChatAgent, PresetInfo};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::document::DOCX_MIME;
use crate::error::StudyError;
use crate::notes::{NotesBuilder, Syllabus};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use pulldown_cmark::{html::push_html, Event, Options, Parser};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

const INDEX_HTML: &str = include_str!("index.html");

/// Shared application state.
struct AppState {
    settings: Settings,
    prompts: Prompts,
}

/// Run the web server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let key_configured = settings.agents.resolve_api_key().is_some();

    let app = router(settings, prompts);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("studykit");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Web UI", "GET  /");
    Output::kv("Health", "GET  /health");
    Output::kv("Status", "GET  /api/status");
    Output::kv("Notes", "POST /api/notes");
    Output::kv("Agents", "POST /api/agents/{kind}");
    println!();
    if !key_configured {
        Output::warning("No API key configured. Agents need a key entered in the web UI.");
    }
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(settings: Settings, prompts: Prompts) -> Router {
    let state = Arc::new(AppState { settings, prompts });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/notes", post(notes))
        .route("/api/agents/{kind}", post(run_agent))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Serialize)]
struct StatusResponse {
    api_key_configured: bool,
    agents: Vec<PresetInfo>,
}

#[derive(Deserialize)]
struct NotesRequest {
    #[serde(default)]
    syllabus: String,
}

#[derive(Serialize)]
struct NotesResponse {
    units: Vec<UnitDocument>,
}

#[derive(Serialize)]
struct UnitDocument {
    unit: String,
    file_name: String,
    mime: &'static str,
    docx_base64: String,
    blocks: usize,
}

#[derive(Deserialize)]
struct AgentRequest {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    input: String,
    #[serde(default)]
    query: Option<String>,
}

#[derive(Serialize)]
struct AgentResult {
    title: &'static str,
    content: String,
    /// `content` rendered from Markdown.
    html: String,
    tool_calls: Vec<String>,
}

/// Render an agent reply for the UI.
///
/// Raw HTML in the reply is emitted as escaped text.
fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    push_html(&mut html, parser);
    html
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatusResponse {
        api_key_configured: state.settings.agents.resolve_api_key().is_some(),
        agents: AgentKind::ALL.iter().map(AgentKind::info).collect(),
    })
}

async fn notes(State(state): State<Arc<AppState>>, Json(req): Json<NotesRequest>) -> Response {
    let syllabus = match Syllabus::parse(&req.syllabus) {
        Ok(syllabus) => syllabus,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    let builder = match NotesBuilder::new(&state.settings) {
        Ok(builder) => builder,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    };

    info!("Building notes for {} unit(s)", syllabus.len());
    let mut units = Vec::with_capacity(syllabus.len());
    for unit_notes in builder.build(&syllabus).await {
        let bytes = match builder.to_docx(&unit_notes) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to package {}: {}", unit_notes.unit, e);
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, e);
            }
        };
        units.push(UnitDocument {
            blocks: unit_notes.document.len(),
            unit: unit_notes.unit,
            file_name: unit_notes.file_name,
            mime: DOCX_MIME,
            docx_base64: STANDARD.encode(bytes),
        });
    }

    Json(NotesResponse { units }).into_response()
}

async fn run_agent(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Json(req): Json<AgentRequest>,
) -> Response {
    let kind: AgentKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => return error_response(StatusCode::NOT_FOUND, e),
    };

    let api_key = req
        .api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .or_else(|| state.settings.agents.resolve_api_key());
    let Some(api_key) = api_key else {
        let e = StudyError::MissingApiKey(state.settings.agents.api_key_env.clone());
        warn!("{}", e);
        return error_response(StatusCode::BAD_REQUEST, e);
    };

    let agent = match ChatAgent::new(&state.settings, &api_key) {
        Ok(agent) => agent,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    };

    match kind
        .run(&agent, &state.prompts, &req.input, req.query.as_deref())
        .await
    {
        Ok(response) => Json(AgentResult {
            title: kind.title(),
            html: markdown_to_html(&response.content),
            content: response.content,
            tool_calls: response.tool_calls.iter().map(ToString::to_string).collect(),
        })
        .into_response(),
        Err(e @ StudyError::InvalidInput(_)) => error_response(StatusCode::BAD_REQUEST, e),
        Err(e) => {
            error!("{} agent failed: {}", kind, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Settings that never reach the real network or the user's environment.
    fn offline_settings(mock: &MockServer) -> Settings {
        let mut settings = Settings::default();
        settings.agents.api_key = None;
        settings.agents.api_key_env = "STUDYKIT_TEST_UNSET_KEY".to_string();
        settings.agents.api_base = mock.uri();
        settings.scraper.search_endpoint = format!("{}/search", mock.uri());
        settings
    }

    async fn spawn(settings: Settings) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(settings, Prompts::default());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_index_and_health() {
        let mock = MockServer::start().await;
        let base = spawn(offline_settings(&mock)).await;
        let client = reqwest::Client::new();

        let page = client.get(format!("{}/", base)).send().await.unwrap();
        assert!(page.status().is_success());
        let page = page.text().await.unwrap();
        assert!(page.contains("Syllabus notes"));
        assert!(page.contains("output.innerHTML = data.html"));

        let health: serde_json::Value = client
            .get(format!("{}/health", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");
    }

    #[tokio::test]
    async fn test_status_without_key() {
        let mock = MockServer::start().await;
        let base = spawn(offline_settings(&mock)).await;

        let status: serde_json::Value = reqwest::get(format!("{}/api/status", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["api_key_configured"], false);
        let agents = status["agents"].as_array().unwrap();
        assert_eq!(agents.len(), 6);
        assert_eq!(agents[0]["kind"], "youtube");
        assert_eq!(agents[0]["takes_query"], true);
    }

    #[tokio::test]
    async fn test_agent_errors() {
        let mock = MockServer::start().await;
        let base = spawn(offline_settings(&mock)).await;
        let client = reqwest::Client::new();

        let missing_key = client
            .post(format!("{}/api/agents/arxiv", base))
            .json(&serde_json::json!({"input": "graphs"}))
            .send()
            .await
            .unwrap();
        assert_eq!(missing_key.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = missing_key.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("STUDYKIT_TEST_UNSET_KEY"));

        let unknown = client
            .post(format!("{}/api/agents/weather", base))
            .json(&serde_json::json!({"input": "rain", "api_key": "k"}))
            .send()
            .await
            .unwrap();
        assert_eq!(unknown.status(), reqwest::StatusCode::NOT_FOUND);

        let empty_input = client
            .post(format!("{}/api/agents/web", base))
            .json(&serde_json::json!({"input": " ", "api_key": "k"}))
            .send()
            .await
            .unwrap();
        assert_eq!(empty_input.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_agent_runs_with_request_key() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1_700_000_000,
                "model": "llama-3.3-70b-versatile",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "**Q:** What is a heap?"},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&mock)
            .await;
        let base = spawn(offline_settings(&mock)).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/agents/flashcards", base))
            .json(&serde_json::json!({"input": "heaps", "api_key": "gsk-ui"}))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["content"], "**Q:** What is a heap?");
        assert_eq!(body["html"], "<p><strong>Q:</strong> What is a heap?</p>\n");
        assert_eq!(body["title"], "Flashcards");
    }

    #[test]
    fn test_markdown_to_html_renders_tables() {
        let html = markdown_to_html("| Ticker | Price |\n|---|---|\n| NVDA | 120.5 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>NVDA</td>"));
    }

    #[test]
    fn test_markdown_to_html_escapes_raw_html() {
        let html = markdown_to_html("See <script>alert(1)</script> and <b>this</b>");
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn test_agent_backend_failure_is_500() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"message": "model decommissioned", "type": "invalid_request_error", "param": null, "code": null}
            })))
            .mount(&mock)
            .await;
        let base = spawn(offline_settings(&mock)).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/agents/flashcards", base))
            .json(&serde_json::json!({"input": "heaps", "api_key": "gsk-ui"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("model decommissioned"));
    }

    #[tokio::test]
    async fn test_notes_endpoint() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "detail": {"articles": {"data": []}}
            })))
            .mount(&mock)
            .await;
        let base = spawn(offline_settings(&mock)).await;
        let client = reqwest::Client::new();

        let empty = client
            .post(format!("{}/api/notes", base))
            .json(&serde_json::json!({"syllabus": "  \n "}))
            .send()
            .await
            .unwrap();
        assert_eq!(empty.status(), reqwest::StatusCode::BAD_REQUEST);

        let response = client
            .post(format!("{}/api/notes", base))
            .json(&serde_json::json!({"syllabus": "Unit 1: Stacks"}))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        let body: serde_json::Value = response.json().await.unwrap();
        let unit = &body["units"][0];
        assert_eq!(unit["unit"], "Unit 1");
        assert_eq!(unit["file_name"], "Unit_1.docx");
        assert_eq!(unit["mime"], DOCX_MIME);
        // Unit heading, topic heading, placeholder paragraph.
        assert_eq!(unit["blocks"], 3);
        let bytes = STANDARD.decode(unit["docx_base64"].as_str().unwrap()).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
