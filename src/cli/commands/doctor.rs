//! Doctor command - verify configuration.

use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("studykit doctor");
    println!();
    println!("Checking configuration...\n");

    let sections = [
        ("Agents", vec![check_api_key(settings), check_url("Chat API", &settings.agents.api_base)]),
        (
            "Notes",
            vec![
                check_url("Search endpoint", &settings.scraper.search_endpoint),
                check_selector(&settings.scraper.content_selector),
                check_output_dir(&settings.output_dir()),
            ],
        ),
        ("Configuration", vec![check_config_file(config_path)]),
    ];

    for (title, checks) in &sections {
        println!("{}", style(title).bold());
        for check in checks {
            check.print();
        }
        println!();
    }

    let checks: Vec<&CheckResult> = sections.iter().flat_map(|(_, c)| c).collect();
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using studykit.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! studykit is ready to use.");
    }

    Ok(())
}

/// A missing key only disables the agents, so it is a warning.
fn check_api_key(settings: &Settings) -> CheckResult {
    let name = &settings.agents.api_key_env;
    let source = if settings.agents.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()) {
        "config file"
    } else {
        "environment"
    };
    match settings.agents.resolve_api_key() {
        Some(key) => CheckResult::ok(
            name,
            &format!("configured from {} ({})", source, mask_key(&key)),
        ),
        None => CheckResult::warning(
            name,
            "not set; agents are disabled until a key is entered in the web UI",
            &format!("Set with: export {}='...' (or add it to .env)", name),
        ),
    }
}

fn check_url(name: &str, url: &str) -> CheckResult {
    match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => CheckResult::ok(name, url),
        Ok(_) => CheckResult::error(name, &format!("{} is not an http(s) URL", url), "Fix the URL in the config file"),
        Err(e) => CheckResult::error(name, &format!("invalid URL: {}", e), "Fix the URL in the config file"),
    }
}

fn check_selector(selector: &str) -> CheckResult {
    match scraper::Selector::parse(selector) {
        Ok(_) => CheckResult::ok("Content selector", selector),
        Err(e) => CheckResult::error(
            "Content selector",
            &format!("'{}' does not parse: {:?}", selector, e),
            "Use a CSS selector such as article.content",
        ),
    }
}

fn check_output_dir(dir: &Path) -> CheckResult {
    if dir.is_dir() {
        CheckResult::ok("Output directory", &dir.display().to_string())
    } else if dir.exists() {
        CheckResult::error(
            "Output directory",
            &format!("{} exists but is not a directory", dir.display()),
            "Change notes.output_dir in the config file",
        )
    } else {
        CheckResult::warning(
            "Output directory",
            &format!("{} (will be created)", dir.display()),
            "Directory will be created on first use",
        )
    }
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: studykit config init",
        )
    }
}

/// Show only the ends of a key.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
