//! studykit - study notes and study agents
//!
//! Turns a syllabus into Word documents assembled from scraped tutorial
//! articles, and runs small LLM study agents against an OpenAI-compatible
//! chat API.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `normalize` - Boilerplate and whitespace cleanup for scraped text
//! - `scrape` - Article search and content extraction
//! - `render` - HTML to document blocks
//! - `document` - Document model and `.docx` packaging
//! - `notes` - Syllabus parsing and per-unit document building
//! - `agent` - Study agents, tools and presets
//! - `cli` - Command line and web UI
//!
//! # Example
//!
//! ```rust,no_run
//! use studykit::config::Settings;
//! use studykit::notes::{NotesBuilder, Syllabus};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let builder = NotesBuilder::new(&settings)?;
//!
//!     let syllabus = Syllabus::parse("Unit 1: Stacks, Queues")?;
//!     let notes = builder.build(&syllabus).await;
//!     builder.write_to_dir(&notes, &settings.output_dir())?;
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod normalize;
pub mod notes;
pub mod openai;
pub mod render;
pub mod scrape;

pub use error::{Result, StudyError};
