//! Syllabus notes pipeline.
//!
//! Turns a [`Syllabus`] into one document per unit: every topic is located,
//! fetched, cleaned and appended to the unit's combined HTML, which is then
//! rendered. Processing is strictly sequential and a failing topic only
//! leaves a placeholder behind.

use crate::config::Settings;
use crate::document::{to_docx_bytes, write_docx, Document};
use crate::error::{Result, StudyError};
use crate::normalize::normalize;
use crate::render::HtmlRenderer;
use crate::scrape::{ArticleFetcher, ArticleLocator, PageFetcher, SearchLocator};
use quick_xml::escape::escape;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Placeholder when the search finds no article.
pub const NO_CONTENT: &str = "No content found.";

/// Placeholder when the article page has no usable content.
pub const NO_ARTICLE_CONTENT: &str = "No content found in article.";

/// A named group of topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub name: String,
    pub topics: Vec<String>,
}

impl Unit {
    /// Create a unit from a comma-separated topic list.
    pub fn new(name: &str, topics: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            topics: topics
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Output file name: spaces become underscores.
    pub fn file_name(&self) -> String {
        file_name_for(&self.name)
    }
}

/// Ordered units to build notes for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Syllabus {
    units: Vec<Unit>,
}

impl Syllabus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit. A unit with the same name replaces the earlier one in place.
    pub fn add_unit(&mut self, unit: Unit) {
        match self.units.iter_mut().find(|u| u.name == unit.name) {
            Some(existing) => *existing = unit,
            None => self.units.push(unit),
        }
    }

    /// Parse `UnitName: topic1, topic2` lines, one unit per line.
    ///
    /// Lines without a colon or with an empty unit name are ignored. An input
    /// with no units at all is an error.
    pub fn parse(text: &str) -> Result<Self> {
        let mut syllabus = Self::new();
        for line in text.lines() {
            let Some((unit, topics)) = line.split_once(':') else {
                continue;
            };
            if unit.trim().is_empty() {
                continue;
            }
            syllabus.add_unit(Unit::new(unit, topics));
        }

        if syllabus.is_empty() {
            return Err(StudyError::Syllabus(
                "Please enter valid units and topics.".to_string(),
            ));
        }
        Ok(syllabus)
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Document file name for a unit.
///
/// Path separators and characters Windows rejects become `_`, and leading
/// dots are dropped, so the name always stays inside the output directory.
pub fn file_name_for(unit: &str) -> String {
    let stem: String = unit
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = stem.trim_start_matches('.');
    if stem.is_empty() {
        "unit.docx".to_string()
    } else {
        format!("{}.docx", stem)
    }
}

/// Notes built for one unit.
#[derive(Debug, Clone)]
pub struct UnitNotes {
    pub unit: String,
    pub file_name: String,
    pub document: Document,
}

/// Progress notifications emitted while building notes.
#[derive(Debug, Clone, Copy)]
pub enum NotesEvent<'a> {
    Searching { unit: &'a str, topic: &'a str },
    Found { topic: &'a str, url: &'a str },
    NotFound { topic: &'a str },
    NoContent { topic: &'a str, url: &'a str },
    UnitDone { unit: &'a str, blocks: usize },
}

/// Receives [`NotesEvent`]s.
pub trait NotesObserver: Send + Sync {
    fn on_event(&self, event: &NotesEvent<'_>);
}

/// Builds unit documents from a syllabus.
pub struct NotesBuilder {
    locator: Arc<dyn ArticleLocator>,
    fetcher: Arc<dyn ArticleFetcher>,
    renderer: HtmlRenderer,
    normalize_articles: bool,
    observer: Option<Arc<dyn NotesObserver>>,
}

impl NotesBuilder {
    /// Create a builder backed by the configured search API and HTTP.
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self::with_components(
            Arc::new(SearchLocator::new(&settings.scraper)?),
            Arc::new(PageFetcher::new(&settings.scraper)?),
            HtmlRenderer::new(settings)?,
            settings.notes.normalize_articles,
        ))
    }

    /// Create a builder with custom components.
    pub fn with_components(
        locator: Arc<dyn ArticleLocator>,
        fetcher: Arc<dyn ArticleFetcher>,
        renderer: HtmlRenderer,
        normalize_articles: bool,
    ) -> Self {
        Self {
            locator,
            fetcher,
            renderer,
            normalize_articles,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn NotesObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    fn emit(&self, event: NotesEvent<'_>) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event);
        }
    }

    /// Build notes for every unit, in order.
    pub async fn build(&self, syllabus: &Syllabus) -> Vec<UnitNotes> {
        let mut notes = Vec::with_capacity(syllabus.len());
        for unit in syllabus.units() {
            notes.push(self.build_unit(unit).await);
        }
        notes
    }

    /// Build the document for one unit.
    #[instrument(skip(self, unit), fields(unit = %unit.name, topics = unit.topics.len()))]
    pub async fn build_unit(&self, unit: &Unit) -> UnitNotes {
        let html = self.unit_html(unit).await;
        let document = self.renderer.render(&html).await.with_title(&unit.name);

        info!("Built {} blocks for {}", document.len(), unit.name);
        self.emit(NotesEvent::UnitDone {
            unit: &unit.name,
            blocks: document.len(),
        });

        UnitNotes {
            unit: unit.name.clone(),
            file_name: unit.file_name(),
            document,
        }
    }

    /// Combined HTML for a unit: a unit heading, then a section per topic.
    pub async fn unit_html(&self, unit: &Unit) -> String {
        let mut html = format!("<h1>{}</h1>", escape(&unit.name));
        for topic in &unit.topics {
            let section = self.topic_html(&unit.name, topic).await;
            html.push_str(&format!("<h2>{}</h2>{}", escape(topic), section));
        }
        html
    }

    async fn topic_html(&self, unit: &str, topic: &str) -> String {
        self.emit(NotesEvent::Searching { unit, topic });
        info!("Searching for topic: {}", topic);

        let Some(url) = self.locator.locate(topic).await else {
            warn!("No article found for topic: {}", topic);
            self.emit(NotesEvent::NotFound { topic });
            return format!("<p>{}</p>", NO_CONTENT);
        };
        self.emit(NotesEvent::Found { topic, url: &url });

        let Some(article) = self.fetcher.fetch(&url).await else {
            warn!("No content found in article for topic: {}", topic);
            self.emit(NotesEvent::NoContent { topic, url: &url });
            return format!("<p>{}</p>", NO_ARTICLE_CONTENT);
        };

        if self.normalize_articles {
            normalize(&article.html)
        } else {
            article.html
        }
    }

    /// Package a unit's document as `.docx` bytes.
    pub fn to_docx(&self, notes: &UnitNotes) -> Result<Vec<u8>> {
        to_docx_bytes(&notes.document, self.renderer.options())
    }

    /// Write every unit's document into `dir`, creating it if needed.
    pub fn write_to_dir(&self, notes: &[UnitNotes], dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(notes.len());
        for unit in notes {
            let path = dir.join(&unit.file_name);
            write_docx(&unit.document, self.renderer.options(), &path)?;
            info!("Wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, DocxOptions};
    use crate::render::test_support::StaticImages;
    use crate::scrape::Article;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct StubLocator(HashMap<String, String>);

    #[async_trait]
    impl ArticleLocator for StubLocator {
        async fn locate(&self, topic: &str) -> Option<String> {
            self.0.get(topic).cloned()
        }
    }

    struct StubFetcher(HashMap<String, String>);

    #[async_trait]
    impl ArticleFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Option<Article> {
            self.0.get(url).map(|html| Article {
                url: url.to_string(),
                html: html.clone(),
            })
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl NotesObserver for Recorder {
        fn on_event(&self, event: &NotesEvent<'_>) {
            let line = match event {
                NotesEvent::Searching { topic, .. } => format!("search {}", topic),
                NotesEvent::Found { url, .. } => format!("found {}", url),
                NotesEvent::NotFound { topic } => format!("missing {}", topic),
                NotesEvent::NoContent { topic, .. } => format!("empty {}", topic),
                NotesEvent::UnitDone { unit, .. } => format!("done {}", unit),
            };
            self.0.lock().unwrap().push(line);
        }
    }

    fn builder(locate: &[(&str, &str)], pages: &[(&str, &str)]) -> NotesBuilder {
        let locator = StubLocator(
            locate.iter().map(|(t, u)| (t.to_string(), u.to_string())).collect(),
        );
        let fetcher = StubFetcher(
            pages.iter().map(|(u, h)| (u.to_string(), h.to_string())).collect(),
        );
        let renderer = HtmlRenderer::with_image_source(
            Arc::new(StaticImages::default()),
            DocxOptions::default(),
        );
        NotesBuilder::with_components(Arc::new(locator), Arc::new(fetcher), renderer, true)
    }

    #[test]
    fn test_parse_syllabus() {
        let syllabus = Syllabus::parse(
            "Unit – 1: AVL Tree, Binary Search Tree\n\
             not a unit line\n\
             : orphan topics\n\
             Unit 2:Graphs, , BFS ,\n",
        )
        .unwrap();

        assert_eq!(syllabus.len(), 2);
        assert_eq!(syllabus.units()[0].name, "Unit – 1");
        assert_eq!(syllabus.units()[0].topics, vec!["AVL Tree", "Binary Search Tree"]);
        assert_eq!(syllabus.units()[1].name, "Unit 2");
        assert_eq!(syllabus.units()[1].topics, vec!["Graphs", "BFS"]);
    }

    #[test]
    fn test_parse_splits_on_first_colon_only() {
        let syllabus = Syllabus::parse("Unit 3: Time: complexity").unwrap();
        assert_eq!(syllabus.units()[0].topics, vec!["Time: complexity"]);
    }

    #[test]
    fn test_parse_empty_syllabus_is_error() {
        assert!(matches!(
            Syllabus::parse("nothing useful\n\n"),
            Err(StudyError::Syllabus(_))
        ));
    }

    #[test]
    fn test_duplicate_unit_replaces_earlier() {
        let syllabus = Syllabus::parse("U: a\nV: b\nU: c").unwrap();
        assert_eq!(syllabus.len(), 2);
        assert_eq!(syllabus.units()[0].topics, vec!["c"]);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name_for("Unit – 1"), "Unit_–_1.docx");
        assert_eq!(Unit::new("Unit 1", "").file_name(), "Unit_1.docx");
    }

    #[test]
    fn test_file_name_strips_path_components() {
        assert_eq!(file_name_for("../escaped"), "_escaped.docx");
        assert_eq!(file_name_for("a/b\\c"), "a_b_c.docx");
        assert_eq!(file_name_for("/etc/passwd"), "_etc_passwd.docx");
        assert_eq!(file_name_for(".."), "unit.docx");
        assert_eq!(file_name_for("Q1 <draft>?"), "Q1__draft__.docx");
    }

    #[tokio::test]
    async fn test_end_to_end_single_topic() {
        let builder = builder(
            &[("Binary Search Tree", "https://example.org/bst/")],
            &[("https://example.org/bst/", "<h1>BST</h1><p>Intro text</p>")],
        );
        let mut syllabus = Syllabus::new();
        syllabus.add_unit(Unit::new("Unit 1", "Binary Search Tree"));

        let notes = builder.build(&syllabus).await;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].file_name, "Unit_1.docx");
        assert_eq!(notes[0].document.title.as_deref(), Some("Unit 1"));
        assert_eq!(
            notes[0].document.blocks,
            vec![
                Block::heading(1, "Unit 1"),
                Block::heading(2, "Binary Search Tree"),
                Block::heading(1, "BST"),
                Block::paragraph("Intro text"),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_topic_leaves_placeholder() {
        let builder = builder(
            &[("A", "https://example.org/a/"), ("B", "https://example.org/b/"), ("C", "https://example.org/c/")],
            &[
                ("https://example.org/a/", "<p>alpha</p>"),
                ("https://example.org/c/", "<p>gamma</p>"),
            ],
        );
        let notes = builder.build_unit(&Unit::new("Unit", "A, B, C")).await;

        assert_eq!(
            notes.document.blocks,
            vec![
                Block::heading(1, "Unit"),
                Block::heading(2, "A"),
                Block::paragraph("alpha"),
                Block::heading(2, "B"),
                Block::paragraph(NO_ARTICLE_CONTENT),
                Block::heading(2, "C"),
                Block::paragraph("gamma"),
            ]
        );
    }

    #[tokio::test]
    async fn test_unlocated_topic_leaves_placeholder() {
        let builder = builder(
            &[("A", "https://example.org/a/")],
            &[("https://example.org/a/", "<p>alpha</p>")],
        );
        let html = builder.unit_html(&Unit::new("Unit", "A, Missing")).await;
        assert_eq!(
            html,
            format!("<h1>Unit</h1><h2>A</h2><p>alpha</p><h2>Missing</h2><p>{}</p>", NO_CONTENT)
        );
    }

    #[tokio::test]
    async fn test_article_html_is_normalized() {
        let builder = builder(
            &[("A", "https://example.org/a/")],
            &[("https://example.org/a/", "<p>Share</p>\n\n<p>Body  text</p>")],
        );
        let html = builder.unit_html(&Unit::new("U", "A")).await;
        assert_eq!(html, "<h1>U</h1><h2>A</h2><p></p>\n<p>Body text</p>");
    }

    #[tokio::test]
    async fn test_headings_are_escaped() {
        let builder = builder(&[], &[]);
        let html = builder.unit_html(&Unit::new("Trees & Graphs", "<script>")).await;
        assert!(html.starts_with("<h1>Trees &amp; Graphs</h1><h2>&lt;script&gt;</h2>"));
    }

    #[tokio::test]
    async fn test_observer_sees_progress() {
        let recorder = Arc::new(Recorder::default());
        let builder = builder(&[("A", "https://example.org/a/")], &[])
            .with_observer(recorder.clone());
        builder.build_unit(&Unit::new("U", "A, B")).await;

        let events = recorder.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "search A",
                "found https://example.org/a/",
                "empty A",
                "search B",
                "missing B",
                "done U",
            ]
        );
    }

    #[tokio::test]
    async fn test_write_to_dir() {
        let builder = builder(&[], &[]);
        let notes = builder.build_unit(&Unit::new("Unit 1", "X")).await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("Syllabus_Notes");
        let written = builder.write_to_dir(&[notes], &out).unwrap();

        assert_eq!(written, vec![out.join("Unit_1.docx")]);
        let bytes = std::fs::read(&written[0]).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[tokio::test]
    async fn test_write_to_dir_keeps_traversing_names_inside() {
        let builder = builder(&[], &[]);
        let syllabus = Syllabus::parse("../../escaped: X").unwrap();
        let notes = builder.build(&syllabus).await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("Syllabus_Notes");
        let written = builder.write_to_dir(&notes, &out).unwrap();

        assert_eq!(written.len(), 1);
        assert_eq!(written[0].parent(), Some(out.as_path()));
        assert!(written[0].exists());
        assert!(!dir.path().join("escaped.docx").exists());
        assert!(!dir.path().parent().unwrap().join("escaped.docx").exists());
    }
}
