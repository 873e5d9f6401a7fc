//! Tool definitions and implementations for the agent system.
//!
//! Each [`Capability`] grants the model one tool. Tools are plain HTTP
//! lookups (web search, page reader, arXiv, video captions, stock quotes)
//! whose results are returned to the model as text.

use crate::error::{Result, StudyError};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// Browser-like User-Agent for sites that reject unknown clients.
const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?:
            (?:https?://)?
            (?:www\.|m\.)?
            (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/)
            ([a-zA-Z0-9_-]{11})
        )
        |
        ^([a-zA-Z0-9_-]{11})$
    ",
    )
    .expect("Invalid regex")
});

/// A family of tools an agent may be given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Search the web.
    WebSearch,
    /// Read the main text of a web page.
    WebReader,
    /// Search arXiv papers.
    Arxiv,
    /// Fetch a YouTube video's captions.
    VideoCaptions,
    /// Look up stock quotes.
    Finance,
}

impl Capability {
    /// Name of the tool this capability exposes.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Capability::WebSearch => "web_search",
            Capability::WebReader => "read_web_page",
            Capability::Arxiv => "search_arxiv",
            Capability::VideoCaptions => "get_video_captions",
            Capability::Finance => "get_stock_quote",
        }
    }
}

/// Available tools for the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ToolCall {
    WebSearch {
        query: String,
        #[serde(default = "default_limit")]
        max_results: u32,
    },
    ReadWebPage { url: String },
    SearchArxiv {
        query: String,
        #[serde(default = "default_limit")]
        max_results: u32,
    },
    GetVideoCaptions { video: String },
    GetStockQuote { symbol: String },
}

fn default_limit() -> u32 {
    5
}

impl ToolCall {
    /// Capability required to run this call.
    pub fn capability(&self) -> Capability {
        match self {
            ToolCall::WebSearch { .. } => Capability::WebSearch,
            ToolCall::ReadWebPage { .. } => Capability::WebReader,
            ToolCall::SearchArxiv { .. } => Capability::Arxiv,
            ToolCall::GetVideoCaptions { .. } => Capability::VideoCaptions,
            ToolCall::GetStockQuote { .. } => Capability::Finance,
        }
    }
}

/// Remote endpoints the tools talk to.
#[derive(Debug, Clone)]
pub struct ToolEndpoints {
    pub web_search: String,
    pub arxiv: String,
    pub youtube: String,
    pub finance: String,
}

impl Default for ToolEndpoints {
    fn default() -> Self {
        Self {
            web_search: "https://html.duckduckgo.com/html/".to_string(),
            arxiv: "https://export.arxiv.org/api/query".to_string(),
            youtube: "https://www.youtube.com".to_string(),
            finance: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
        }
    }
}

/// Tool execution context.
pub struct ToolContext {
    client: Client,
    endpoints: ToolEndpoints,
    /// Longest text handed back to the model from a single tool call.
    max_chars: usize,
}

impl ToolContext {
    /// Create a new tool context.
    pub fn new(client: Client, endpoints: ToolEndpoints) -> Self {
        Self {
            client,
            endpoints,
            max_chars: 12_000,
        }
    }

    /// Execute a tool call and return the result as a string.
    pub async fn execute(&self, tool: &ToolCall) -> Result<String> {
        match tool {
            ToolCall::WebSearch { query, max_results } => {
                self.execute_web_search(query, *max_results).await
            }
            ToolCall::ReadWebPage { url } => self.execute_read_page(url).await,
            ToolCall::SearchArxiv { query, max_results } => {
                self.execute_search_arxiv(query, *max_results).await
            }
            ToolCall::GetVideoCaptions { video } => self.execute_video_captions(video).await,
            ToolCall::GetStockQuote { symbol } => self.execute_stock_quote(symbol).await,
        }
    }

    async fn get_text(&self, request: reqwest::RequestBuilder) -> Result<String> {
        let response = request.header(USER_AGENT, BROWSER_UA).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StudyError::Tool(format!(
                "{} returned HTTP {}",
                response.url(),
                status
            )));
        }
        Ok(response.text().await?)
    }

    async fn execute_web_search(&self, query: &str, max_results: u32) -> Result<String> {
        let html = self
            .get_text(
                self.client
                    .get(&self.endpoints.web_search)
                    .query(&[("q", query)]),
            )
            .await?;
        let results = parse_search_results(&html, max_results as usize);

        if results.is_empty() {
            return Ok("No results found.".to_string());
        }

        let formatted = results
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{}. {}\n   {}\n   {}", i + 1, r.title, r.url, r.snippet))
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(format!("Found {} results:\n\n{}", results.len(), formatted))
    }

    async fn execute_read_page(&self, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url)
            .map_err(|e| StudyError::Tool(format!("Invalid URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(StudyError::Tool(format!("Unsupported URL scheme: {}", url)));
        }

        let html = self.get_text(self.client.get(parsed)).await?;
        let page = extract_readable_text(&html);
        if page.text.is_empty() {
            return Ok(format!("No readable text found at {}.", url));
        }

        Ok(format!(
            "# {}\n\nSource: {}\n\n{}",
            page.title.unwrap_or_else(|| url.to_string()),
            url,
            truncate(&page.text, self.max_chars)
        ))
    }

    async fn execute_search_arxiv(&self, query: &str, max_results: u32) -> Result<String> {
        let search_query = format!("all:{}", query);
        let max = max_results.to_string();
        let xml = self
            .get_text(self.client.get(&self.endpoints.arxiv).query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ]))
            .await?;
        let papers = parse_arxiv_feed(&xml)?;

        if papers.is_empty() {
            return Ok(format!("No papers found for '{}'.", query));
        }

        let formatted = papers
            .iter()
            .enumerate()
            .map(|(i, p)| {
                format!(
                    "{}. {}\n   Authors: {}\n   Published: {}\n   Link: {}\n   Abstract: {}",
                    i + 1,
                    p.title,
                    p.authors.join(", "),
                    p.published,
                    p.id,
                    p.summary
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(truncate(
            &format!("Found {} papers:\n\n{}", papers.len(), formatted),
            self.max_chars,
        ))
    }

    async fn execute_video_captions(&self, video: &str) -> Result<String> {
        let video_id = extract_video_id(video)
            .ok_or_else(|| StudyError::Tool(format!("Not a YouTube URL or video ID: {}", video)))?;

        let watch_url = format!("{}/watch", self.endpoints.youtube.trim_end_matches('/'));
        let page = self
            .get_text(
                self.client
                    .get(&watch_url)
                    .query(&[("v", video_id.as_str())])
                    .header("Accept-Language", "en-US,en;q=0.9"),
            )
            .await?;

        let tracks = parse_caption_tracks(&page);
        let Some(track) = tracks
            .iter()
            .find(|t| t.language_code.starts_with("en"))
            .or_else(|| tracks.first())
        else {
            return Ok(format!("No captions available for video {}.", video_id));
        };
        debug!("Using {} captions for {}", track.language_code, video_id);

        let xml = self.get_text(self.client.get(&track.base_url)).await?;
        let text = parse_timedtext(&xml)?;

        Ok(format!(
            "Captions for video {} ({}):\n\n{}",
            video_id,
            track.language_code,
            truncate(&text, self.max_chars)
        ))
    }

    async fn execute_stock_quote(&self, symbol: &str) -> Result<String> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(StudyError::Tool("Empty stock symbol".to_string()));
        }

        let url = format!("{}/{}", self.endpoints.finance.trim_end_matches('/'), symbol);
        let body = self
            .get_text(
                self.client
                    .get(&url)
                    .query(&[("range", "5d"), ("interval", "1d")]),
            )
            .await?;
        let quote = parse_quote(&body)?;
        Ok(format_quote(&quote))
    }
}

/// One web search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Parse a DuckDuckGo HTML results page.
pub fn parse_search_results(html: &str, limit: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let (Ok(result), Ok(link), Ok(snippet)) = (
        Selector::parse(".result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    document
        .select(&result)
        .filter_map(|r| {
            let a = r.select(&link).next()?;
            let href = a.value().attr("href")?;
            Some(SearchHit {
                title: squash(&a.text().collect::<String>()),
                url: resolve_result_url(href),
                snippet: r
                    .select(&snippet)
                    .next()
                    .map(|s| squash(&s.text().collect::<String>()))
                    .unwrap_or_default(),
            })
        })
        .take(limit)
        .collect()
}

/// Unwrap DuckDuckGo's `/l/?uddg=` redirect links.
fn resolve_result_url(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };
    url::Url::parse(&absolute)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or(absolute)
}

/// Readable text pulled from a web page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadablePage {
    pub title: Option<String>,
    pub text: String,
}

/// Extract the main readable text of a page.
///
/// Tries semantic containers first (`article`, `main`, ...) and falls back to
/// `body`. Text is taken from headings, paragraphs, list items and code.
pub fn extract_readable_text(html: &str) -> ReadablePage {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|s| document.select(&s).next().map(|t| squash(&t.text().collect::<String>())))
        .filter(|t| !t.is_empty());

    let containers = [
        "article",
        "main",
        "[role='main']",
        ".post-content",
        ".article-content",
        ".entry-content",
        "#content",
        "body",
    ];

    for container in containers {
        let Ok(selector) = Selector::parse(container) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = readable_text(&element);
            if text.len() > 200 || container == "body" {
                return ReadablePage { title, text };
            }
        }
    }

    ReadablePage {
        title,
        text: String::new(),
    }
}

fn readable_text(element: &ElementRef) -> String {
    let Ok(blocks) = Selector::parse("h1, h2, h3, h4, p, li, pre, blockquote") else {
        return String::new();
    };
    let lines: Vec<String> = element
        .select(&blocks)
        .map(|e| squash(&e.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .collect();

    if lines.is_empty() {
        squash(&element.text().collect::<Vec<_>>().join(" "))
    } else {
        lines.join("\n")
    }
}

/// A paper from the arXiv Atom feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paper {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub published: String,
    pub authors: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum PaperField {
    Id,
    Title,
    Summary,
    Published,
    Author,
}

/// Parse the entries of an arXiv API Atom feed.
pub fn parse_arxiv_feed(xml: &str) -> Result<Vec<Paper>> {
    let mut reader = Reader::from_str(xml);
    let mut papers = Vec::new();
    let mut current: Option<Paper> = None;
    let mut field: Option<PaperField> = None;
    let mut in_author = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"entry" => current = Some(Paper::default()),
                b"author" => in_author = true,
                b"id" => field = Some(PaperField::Id),
                b"title" => field = Some(PaperField::Title),
                b"summary" => field = Some(PaperField::Summary),
                b"published" => field = Some(PaperField::Published),
                b"name" if in_author => {
                    field = Some(PaperField::Author);
                    if let Some(paper) = current.as_mut() {
                        paper.authors.push(String::new());
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"entry" => {
                        if let Some(mut paper) = current.take() {
                            paper.title = squash(&paper.title);
                            paper.summary = squash(&paper.summary);
                            paper.authors.retain(|a| !a.trim().is_empty());
                            papers.push(paper);
                        }
                    }
                    b"author" => in_author = false,
                    _ => {}
                }
                field = None;
            }
            Ok(Event::Text(t)) => {
                if let (Some(paper), Some(f)) = (current.as_mut(), field) {
                    let text = t
                        .unescape()
                        .map_err(|e| StudyError::Tool(format!("Invalid arXiv feed: {}", e)))?;
                    let target = match f {
                        PaperField::Id => &mut paper.id,
                        PaperField::Title => &mut paper.title,
                        PaperField::Summary => &mut paper.summary,
                        PaperField::Published => &mut paper.published,
                        PaperField::Author => match paper.authors.last_mut() {
                            Some(author) => author,
                            None => continue,
                        },
                    };
                    target.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(StudyError::Tool(format!("Invalid arXiv feed: {}", e))),
            _ => {}
        }
    }

    for paper in &mut papers {
        paper.id = paper.id.trim().to_string();
        paper.published = paper.published.trim().to_string();
    }
    Ok(papers)
}

/// Extract an 11-character video ID from a YouTube URL or bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = VIDEO_ID.captures(input.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// A caption track listed in a watch page's player response.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "languageCode")]
    pub language_code: String,
}

/// Find the `captionTracks` array embedded in a watch page.
pub fn parse_caption_tracks(page: &str) -> Vec<CaptionTrack> {
    const MARKER: &str = "\"captionTracks\":";
    let Some(start) = page.find(MARKER) else {
        return Vec::new();
    };
    let rest = &page[start + MARKER.len()..];
    serde_json::Deserializer::from_str(rest)
        .into_iter::<Vec<CaptionTrack>>()
        .next()
        .and_then(|r| r.ok())
        .unwrap_or_default()
}

/// Join the `<text>` cues of a timedtext document into plain text.
pub fn parse_timedtext(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut cues = Vec::new();
    let mut in_cue = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"text" => {
                in_cue = true;
                cues.push(String::new());
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"text" => in_cue = false,
            Ok(Event::Text(t)) if in_cue => {
                let text = t
                    .unescape()
                    .map_err(|e| StudyError::Tool(format!("Invalid caption track: {}", e)))?;
                if let Some(cue) = cues.last_mut() {
                    cue.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(StudyError::Tool(format!("Invalid caption track: {}", e))),
            _ => {}
        }
    }

    Ok(cues
        .iter()
        .map(|c| squash(&c.replace("&#39;", "'").replace("&quot;", "\"")))
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(" "))
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Quote,
}

/// Latest quote for a ticker symbol.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub currency: Option<String>,
    pub exchange_name: Option<String>,
    pub long_name: Option<String>,
    pub regular_market_price: Option<f64>,
    pub chart_previous_close: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
}

fn parse_quote(body: &str) -> Result<Quote> {
    let response: ChartResponse = serde_json::from_str(body)?;
    response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .map(|r| r.meta)
        .ok_or_else(|| StudyError::Tool("No quote data returned".to_string()))
}

fn format_quote(quote: &Quote) -> String {
    let currency = quote.currency.as_deref().unwrap_or("");
    let mut lines = vec![format!(
        "{} ({})",
        quote.long_name.as_deref().unwrap_or(&quote.symbol),
        quote.symbol
    )];
    if let Some(exchange) = &quote.exchange_name {
        lines.push(format!("Exchange: {}", exchange));
    }
    if let Some(price) = quote.regular_market_price {
        lines.push(format!("Price: {:.2} {}", price, currency).trim_end().to_string());
        if let Some(prev) = quote.chart_previous_close.filter(|p| *p != 0.0) {
            let change = price - prev;
            lines.push(format!(
                "Change: {:+.2} ({:+.2}%) vs previous close {:.2}",
                change,
                change / prev * 100.0,
                prev
            ));
        }
    }
    if let (Some(low), Some(high)) = (quote.fifty_two_week_low, quote.fifty_two_week_high) {
        lines.push(format!("52-week range: {:.2} - {:.2}", low, high));
    }
    lines.join("\n")
}

/// Collapse whitespace runs to single spaces.
fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_chars` characters.
fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Get OpenAI function/tool definitions for the given capabilities.
pub fn tool_definitions(capabilities: &[Capability]) -> Vec<async_openai::types::ChatCompletionTool> {
    use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};

    let mut seen = Vec::new();
    capabilities
        .iter()
        .filter(|c| {
            if seen.contains(*c) {
                false
            } else {
                seen.push(**c);
                true
            }
        })
        .map(|capability| {
            let (description, parameters) = match capability {
                Capability::WebSearch => (
                    "Search the web. Returns titles, links and snippets of the top results.",
                    serde_json::json!({
                        "type": "object",
                        "properties": {
                            "query": {"type": "string", "description": "The search query"},
                            "max_results": {
                                "type": "integer",
                                "description": "Maximum number of results (default: 5)",
                                "default": 5
                            }
                        },
                        "required": ["query"]
                    }),
                ),
                Capability::WebReader => (
                    "Read the main text of a web page or news article.",
                    serde_json::json!({
                        "type": "object",
                        "properties": {
                            "url": {"type": "string", "description": "The page URL"}
                        },
                        "required": ["url"]
                    }),
                ),
                Capability::Arxiv => (
                    "Search arXiv for research papers, newest first. Returns titles, authors, links and abstracts.",
                    serde_json::json!({
                        "type": "object",
                        "properties": {
                            "query": {"type": "string", "description": "Search terms"},
                            "max_results": {
                                "type": "integer",
                                "description": "Maximum number of papers (default: 5)",
                                "default": 5
                            }
                        },
                        "required": ["query"]
                    }),
                ),
                Capability::VideoCaptions => (
                    "Get the captions (transcript) of a YouTube video.",
                    serde_json::json!({
                        "type": "object",
                        "properties": {
                            "video": {"type": "string", "description": "YouTube URL or video ID"}
                        },
                        "required": ["video"]
                    }),
                ),
                Capability::Finance => (
                    "Get the latest stock price, daily change and 52-week range for a ticker symbol.",
                    serde_json::json!({
                        "type": "object",
                        "properties": {
                            "symbol": {"type": "string", "description": "Ticker symbol, e.g. NVDA"}
                        },
                        "required": ["symbol"]
                    }),
                ),
            };

            ChatCompletionTool {
                r#type: ChatCompletionToolType::Function,
                function: FunctionObject {
                    name: capability.tool_name().to_string(),
                    description: Some(description.to_string()),
                    parameters: Some(parameters),
                    strict: None,
                },
            }
        })
        .collect()
}

/// Parse a tool call from the OpenAI response format.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall> {
    let args: serde_json::Value = if arguments.trim().is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_str(arguments)
            .map_err(|e| StudyError::Agent(format!("Invalid tool arguments: {}", e)))?
    };

    let required = |key: &str| -> Result<String> {
        args[key]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| StudyError::Agent(format!("Missing '{}' argument", key)))
    };
    let limit = args["max_results"].as_u64().unwrap_or(5).clamp(1, 20) as u32;

    match name {
        "web_search" => Ok(ToolCall::WebSearch {
            query: required("query")?,
            max_results: limit,
        }),
        "read_web_page" => Ok(ToolCall::ReadWebPage {
            url: required("url")?,
        }),
        "search_arxiv" => Ok(ToolCall::SearchArxiv {
            query: required("query")?,
            max_results: limit,
        }),
        "get_video_captions" => Ok(ToolCall::GetVideoCaptions {
            video: required("video")?,
        }),
        "get_stock_quote" => Ok(ToolCall::GetStockQuote {
            symbol: required("symbol")?,
        }),
        _ => Err(StudyError::Agent(format!("Unknown tool: {}", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context_for(server: &MockServer) -> ToolContext {
        let endpoints = ToolEndpoints {
            web_search: format!("{}/html/", server.uri()),
            arxiv: format!("{}/api/query", server.uri()),
            youtube: server.uri(),
            finance: format!("{}/v8/finance/chart", server.uri()),
        };
        ToolContext::new(Client::new(), endpoints)
    }

    const ARXIV_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: search_query=all:graphs</title>
  <id>http://arxiv.org/api/feed-id</id>
  <entry>
    <id>http://arxiv.org/abs/2401.00001v1</id>
    <published>2024-01-01T00:00:00Z</published>
    <title>Graph Neural
      Networks &amp; You</title>
    <summary>  We study graphs.
    A lot.  </summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2401.00002v1</id>
    <published>2024-01-02T00:00:00Z</published>
    <title>Second Paper</title>
    <summary>Short.</summary>
    <author><name>Grace Hopper</name></author>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_web_search_tool() {
        let tool = parse_tool_call("web_search", r#"{"query": "AI chips", "max_results": 3}"#).unwrap();
        assert_eq!(
            tool,
            ToolCall::WebSearch {
                query: "AI chips".to_string(),
                max_results: 3
            }
        );
        assert_eq!(tool.capability(), Capability::WebSearch);
    }

    #[test]
    fn test_parse_tool_defaults_and_errors() {
        let tool = parse_tool_call("search_arxiv", r#"{"query": "graphs"}"#).unwrap();
        assert_eq!(
            tool,
            ToolCall::SearchArxiv {
                query: "graphs".to_string(),
                max_results: 5
            }
        );
        assert!(parse_tool_call("get_stock_quote", "{}").is_err());
        assert!(parse_tool_call("get_stock_quote", "not json").is_err());
        assert!(parse_tool_call("launch_rockets", "{}").is_err());
    }

    #[test]
    fn test_tool_definitions_follow_capabilities() {
        let tools = tool_definitions(&[Capability::Arxiv, Capability::Finance, Capability::Arxiv]);
        let names: Vec<_> = tools.iter().map(|t| t.function.name.as_str()).collect();
        assert_eq!(names, vec!["search_arxiv", "get_stock_quote"]);
        assert!(tool_definitions(&[]).is_empty());
    }

    #[test]
    fn test_parse_search_results() {
        let html = r##"
            <div class="result results_links">
              <h2 class="result__title">
                <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fai%3Fx%3D1&amp;rut=abc">AI  chips
                </a>
              </h2>
              <a class="result__snippet" href="#">Latest <b>AI</b> news</a>
            </div>
            <div class="result">
              <a class="result__a" href="https://direct.example.org/">Direct</a>
            </div>
            <div class="result"><span>no link</span></div>"##;

        let hits = parse_search_results(html, 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "AI chips");
        assert_eq!(hits[0].url, "https://example.com/ai?x=1");
        assert_eq!(hits[0].snippet, "Latest AI news");
        assert_eq!(hits[1].url, "https://direct.example.org/");
        assert_eq!(hits[1].snippet, "");

        assert_eq!(parse_search_results(html, 1).len(), 1);
    }

    #[test]
    fn test_extract_readable_text_prefers_article() {
        let body = "Rotations restore balance after every insert. ".repeat(6);
        let html = format!(
            "<html><head><title> AVL </title></head><body><nav>menu</nav>\
             <article><h1>AVL Tree</h1><p>{}</p><ul><li>LL</li><li>RR</li></ul></article></body></html>",
            body
        );
        let page = extract_readable_text(&html);
        assert_eq!(page.title.as_deref(), Some("AVL"));
        assert!(page.text.starts_with("AVL Tree\nRotations"));
        assert!(page.text.ends_with("LL\nRR"));
        assert!(!page.text.contains("menu"));
    }

    #[test]
    fn test_extract_readable_text_falls_back_to_body() {
        let page = extract_readable_text("<html><body><div>tiny page</div></body></html>");
        assert_eq!(page.text, "tiny page");
        assert!(page.title.is_none());
    }

    #[test]
    fn test_parse_arxiv_feed() {
        let papers = parse_arxiv_feed(ARXIV_FEED).unwrap();
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].id, "http://arxiv.org/abs/2401.00001v1");
        assert_eq!(papers[0].title, "Graph Neural Networks & You");
        assert_eq!(papers[0].summary, "We study graphs. A lot.");
        assert_eq!(papers[0].published, "2024-01-01T00:00:00Z");
        assert_eq!(papers[0].authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(papers[1].authors, vec!["Grace Hopper"]);
    }

    #[test]
    fn test_extract_video_id() {
        let id = Some("Iv9dewmcFbs".to_string());
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=Iv9dewmcFbs&t"), id);
        assert_eq!(extract_video_id("https://youtu.be/Iv9dewmcFbs"), id);
        assert_eq!(extract_video_id("https://www.youtube.com/watch?feature=share&v=Iv9dewmcFbs"), id);
        assert_eq!(extract_video_id("Iv9dewmcFbs"), id);
        assert_eq!(extract_video_id("not a video"), None);
    }

    #[test]
    fn test_parse_caption_tracks() {
        let page = r#"<script>var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=x&lang=de","name":{"runs":[{"text":"German"}]},"languageCode":"de"},{"baseUrl":"https://www.youtube.com/api/timedtext?v=x&lang=en","languageCode":"en","kind":"asr"}],"audioTracks":[]}}};</script>"#;
        let tracks = parse_caption_tracks(page);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].language_code, "en");
        assert_eq!(tracks[1].base_url, "https://www.youtube.com/api/timedtext?v=x&lang=en");
        assert!(parse_caption_tracks("<html></html>").is_empty());
    }

    #[test]
    fn test_parse_timedtext() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0" dur="1.5">Hello &amp;amp; welcome</text><text start="1.5" dur="2">it&amp;#39;s   a
tree</text><text start="4" dur="1"></text></transcript>"#;
        assert_eq!(parse_timedtext(xml).unwrap(), "Hello &amp; welcome it's a tree");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 4), "héll...");
        assert_eq!(truncate("short", 10), "short");
    }

    #[tokio::test]
    async fn test_stock_quote_tool() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/NVDA"))
            .and(query_param("range", "5d"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chart": {"result": [{"meta": {
                    "symbol": "NVDA",
                    "currency": "USD",
                    "exchangeName": "NMS",
                    "longName": "NVIDIA Corporation",
                    "regularMarketPrice": 110.0,
                    "chartPreviousClose": 100.0,
                    "fiftyTwoWeekHigh": 150.0,
                    "fiftyTwoWeekLow": 80.0
                }}], "error": null}
            })))
            .mount(&server)
            .await;

        let output = context_for(&server)
            .execute(&ToolCall::GetStockQuote { symbol: "nvda".to_string() })
            .await
            .unwrap();
        assert!(output.starts_with("NVIDIA Corporation (NVDA)"));
        assert!(output.contains("Price: 110.00 USD"));
        assert!(output.contains("Change: +10.00 (+10.00%)"));
        assert!(output.contains("52-week range: 80.00 - 150.00"));
    }

    #[tokio::test]
    async fn test_arxiv_tool() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .and(query_param("search_query", "all:graphs"))
            .and(query_param("max_results", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ARXIV_FEED))
            .mount(&server)
            .await;

        let output = context_for(&server)
            .execute(&ToolCall::SearchArxiv {
                query: "graphs".to_string(),
                max_results: 2,
            })
            .await
            .unwrap();
        assert!(output.starts_with("Found 2 papers:"));
        assert!(output.contains("Authors: Ada Lovelace, Alan Turing"));
    }

    #[tokio::test]
    async fn test_video_captions_tool() {
        let server = MockServer::start().await;
        let page = format!(
            r#"<script>{{"captionTracks":[{{"baseUrl":"{}/api/timedtext?v=Iv9dewmcFbs","languageCode":"en"}}]}}</script>"#,
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/watch"))
            .and(query_param("v", "Iv9dewmcFbs"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/timedtext"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<transcript><text start="0" dur="1">Binary search</text><text start="1" dur="1">halves the range</text></transcript>"#,
            ))
            .mount(&server)
            .await;

        let output = context_for(&server)
            .execute(&ToolCall::GetVideoCaptions {
                video: "https://www.youtube.com/watch?v=Iv9dewmcFbs".to_string(),
            })
            .await
            .unwrap();
        assert!(output.ends_with("Binary search halves the range"));
    }

    #[tokio::test]
    async fn test_read_page_rejects_non_http() {
        let server = MockServer::start().await;
        let result = context_for(&server)
            .execute(&ToolCall::ReadWebPage { url: "file:///etc/passwd".to_string() })
            .await;
        assert!(matches!(result, Err(StudyError::Tool(_))));
    }
}
