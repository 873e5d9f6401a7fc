//! Notes command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::notes::{NotesBuilder, NotesEvent, NotesObserver, Syllabus};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::sync::Arc;

/// Reports builder progress on a spinner.
struct SpinnerObserver {
    spinner: ProgressBar,
}

impl NotesObserver for SpinnerObserver {
    fn on_event(&self, event: &NotesEvent<'_>) {
        match event {
            NotesEvent::Searching { unit, topic } => {
                self.spinner
                    .set_message(format!("{}: searching for topic: {}...", unit, topic));
            }
            NotesEvent::Found { topic, url } => {
                self.spinner.println(format!("  Found URL for {}: {}", topic, url));
            }
            NotesEvent::NotFound { topic } => {
                self.spinner.println(format!("  No article found for {}", topic));
            }
            NotesEvent::NoContent { topic, url } => {
                self.spinner
                    .println(format!("  No content found in article for {} ({})", topic, url));
            }
            NotesEvent::UnitDone { unit, blocks } => {
                self.spinner.println(format!("  {} done ({} blocks)", unit, blocks));
            }
        }
    }
}

/// Run the notes command.
pub async fn run_notes(
    units: &[String],
    file: Option<String>,
    output: Option<String>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Notes, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'studykit doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let text = syllabus_text(units, file.as_deref())?;
    let syllabus = match Syllabus::parse(&text) {
        Ok(syllabus) => syllabus,
        Err(e) => {
            Output::error(&format!("{}", e));
            Output::info("Pass units as --unit \"Unit 1: Stacks, Queues\" or use --file.");
            return Err(e.into());
        }
    };

    let dir = match output {
        Some(dir) => Settings::expand_path(&dir),
        None => settings.output_dir(),
    };

    let spinner = Output::spinner("Building notes...");
    let builder = NotesBuilder::new(&settings)?.with_observer(Arc::new(SpinnerObserver {
        spinner: spinner.clone(),
    }));

    let notes = builder.build(&syllabus).await;
    spinner.finish_and_clear();

    let written = builder.write_to_dir(&notes, &dir)?;

    Output::header("Notes");
    for (unit, path) in notes.iter().zip(&written) {
        Output::document_info(
            &unit.unit,
            &path.display().to_string(),
            unit.document.len(),
            unit.document.image_count(),
        );
    }
    println!();
    Output::success(&format!(
        "Wrote {} document(s) to {}",
        written.len(),
        dir.display()
    ));

    Ok(())
}

/// Syllabus lines from `--file` followed by each `--unit`.
fn syllabus_text(units: &[String], file: Option<&str>) -> Result<String> {
    let mut lines = Vec::new();
    if let Some(file) = file {
        let path = Settings::expand_path(file);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read syllabus file {}", path.display()))?;
        lines.push(content);
    }
    lines.extend(units.iter().cloned());
    Ok(lines.join("\n"))
}
