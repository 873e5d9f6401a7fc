//! HTML to document rendering.
//!
//! Rendering happens in two steps: [`parse_blocks`] walks the HTML and
//! produces a flat list of [`HtmlBlock`]s, then [`HtmlRenderer::render`]
//! resolves image references and builds the [`Document`].

use crate::config::Settings;
use crate::document::{to_docx_bytes, Block, Document, DocxOptions, Image, ListKind};
use crate::error::{Result, StudyError};
use crate::scrape::http_client;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Elements the renderer understands. Everything else is ignored, and inline
/// markup inside these is flattened to text.
const RENDERED_ELEMENTS: &str = "h1, h2, h3, p, ul, ol, img, pre";

/// Image extensions worth downloading.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// A block found in the source HTML, before images are fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlBlock {
    Heading { level: u8, text: String },
    Paragraph(String),
    ListItem { text: String, kind: ListKind },
    Image { src: String },
    Code(String),
}

/// Walk `html` in document order and collect the blocks to render.
pub fn parse_blocks(html: &str) -> Vec<HtmlBlock> {
    let fragment = Html::parse_fragment(html);
    let Ok(selector) = Selector::parse(RENDERED_ELEMENTS) else {
        return Vec::new();
    };

    let mut blocks = Vec::new();
    for element in fragment.select(&selector) {
        match element.value().name() {
            "h1" | "h2" | "h3" => {
                let level = element.value().name()[1..].parse().unwrap_or(1);
                blocks.push(HtmlBlock::Heading {
                    level,
                    text: element_text(&element),
                });
            }
            "p" => blocks.push(HtmlBlock::Paragraph(element_text(&element))),
            "ul" | "ol" => {
                let kind = if element.value().name() == "ul" {
                    ListKind::Bullet
                } else {
                    ListKind::Numbered
                };
                for item in element
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|child| child.value().name() == "li")
                {
                    blocks.push(HtmlBlock::ListItem {
                        text: element_text(&item),
                        kind,
                    });
                }
            }
            "img" => match element.value().attr("src") {
                Some(src) if is_supported_image(src) => blocks.push(HtmlBlock::Image {
                    src: src.to_string(),
                }),
                other => debug!("Skipping image {:?}", other),
            },
            "pre" => {
                let code = element_text(&element);
                if code.is_empty() {
                    debug!("Skipping empty code block");
                } else {
                    blocks.push(HtmlBlock::Code(code));
                }
            }
            _ => {}
        }
    }
    blocks
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Whether an image URL points at a PNG or JPEG, judged by its extension.
pub fn is_supported_image(src: &str) -> bool {
    let path = src.split(['?', '#']).next().unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();
    match file.rsplit_once('.') {
        Some((_, ext)) => IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// Source of image bytes.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>>;
}

/// Downloads images over HTTP.
pub struct HttpImageSource {
    client: Client,
}

impl HttpImageSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StudyError::Render(format!("HTTP {} for image {}", status, url)));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Renders HTML fragments into documents.
pub struct HtmlRenderer {
    images: Arc<dyn ImageSource>,
    options: DocxOptions,
}

impl HtmlRenderer {
    /// Create a renderer that downloads images over HTTP.
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = http_client(settings.scraper.timeout_secs)?;
        Ok(Self::with_image_source(
            Arc::new(HttpImageSource::new(client)),
            DocxOptions::from(&settings.render),
        ))
    }

    pub fn with_image_source(images: Arc<dyn ImageSource>, options: DocxOptions) -> Self {
        Self { images, options }
    }

    pub fn options(&self) -> &DocxOptions {
        &self.options
    }

    /// Render `html` into a document.
    ///
    /// A failing image is skipped; it never aborts the document.
    #[instrument(skip(self, html), fields(len = html.len()))]
    pub async fn render(&self, html: &str) -> Document {
        let mut doc = Document::new();

        for block in parse_blocks(html) {
            let block = match block {
                HtmlBlock::Heading { level, text } => Block::heading(level, text),
                HtmlBlock::Paragraph(text) => Block::Paragraph(text),
                HtmlBlock::ListItem { text, kind } => Block::ListItem { text, kind },
                HtmlBlock::Code(text) => Block::Code(text),
                HtmlBlock::Image { src } => match self.load_image(&src).await {
                    Ok(image) => Block::Image(image),
                    Err(e) => {
                        warn!("Skipping image {}: {}", src, e);
                        continue;
                    }
                },
            };
            doc.push(block);
        }

        debug!("Rendered {} blocks", doc.len());
        doc
    }

    /// Render `html` and package it as `.docx` bytes.
    pub async fn render_docx(&self, html: &str) -> Result<Vec<u8>> {
        let doc = self.render(html).await;
        to_docx_bytes(&doc, &self.options)
    }

    async fn load_image(&self, src: &str) -> Result<Image> {
        let data = self.images.fetch_image(src).await?;
        Image::from_bytes(data)
    }
}
