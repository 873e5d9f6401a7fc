//! CLI module for studykit.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// studykit - study notes and study agents
///
/// Turns a syllabus into Word documents built from scraped articles, and runs
/// small LLM study agents (video, paper and web summarizers, flashcards,
/// news and markets).
#[derive(Parser, Debug)]
#[command(name = "studykit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "STUDYKIT_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build one .docx of notes per syllabus unit
    Notes {
        /// A unit as "Unit name: topic1, topic2" (repeatable)
        #[arg(short, long = "unit")]
        units: Vec<String>,

        /// Read units from a file, one "Unit name: topics" line each
        #[arg(short, long)]
        file: Option<String>,

        /// Directory to write the documents to
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Run a study agent (youtube, arxiv, web, flashcards, news, finance)
    Agent {
        /// Which agent to run
        kind: String,

        /// The agent's input (video URL, topic or question)
        input: String,

        /// Question about the video (youtube agent only)
        #[arg(short, long)]
        query: Option<String>,

        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Start the web UI and HTTP API
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
