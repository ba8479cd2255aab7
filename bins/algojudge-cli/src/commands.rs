// CLI commands for grading submissions and inspecting inputs
use algojudge_common::config::Settings;
use algojudge_common::types::{GradeRequest, TestCase};
use algojudge_engine::{constraints, parse_input, Grader, LanguageConfigManager};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Options for `algojudge grade`
pub struct GradeOptions<'a> {
    pub code: &'a Path,
    pub cases: &'a Path,
    pub language: &'a str,
    pub reference: Option<&'a Path>,
    pub constraints: Option<&'a Path>,
    pub timeout_ms: Option<u64>,
}

/// Load language configuration, falling back to the built-in one
pub fn load_languages(settings: &Settings) -> Result<LanguageConfigManager> {
    let mut languages = LanguageConfigManager::load_or_builtin(&settings.languages_path)
        .context("Failed to load language configuration")?;
    languages.apply_settings(settings);
    Ok(languages)
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Test cases file: a JSON array of `{ "input": ..., "output": ..., "judge": ... }`
pub fn load_test_cases(path: &Path) -> Result<Vec<TestCase>> {
    let content = read_source(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse test cases in {}", path.display()))
}

/// Constraints file: a JSON array of strings such as `"1 <= n <= 10^4"`
pub fn load_constraints(path: &Path) -> Result<Vec<String>> {
    let content = read_source(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse constraints in {}", path.display()))
}

pub fn build_request(options: &GradeOptions<'_>) -> Result<GradeRequest> {
    let mut request =
        GradeRequest::new(read_source(options.code)?, load_test_cases(options.cases)?);
    request.language = options.language.to_string();
    request.reference_code = options.reference.map(read_source).transpose()?;
    request.constraints = options
        .constraints
        .map(load_constraints)
        .transpose()?
        .unwrap_or_default();
    request.timeout_ms = options.timeout_ms;
    Ok(request)
}

/// Grade a submission; prints the ExecutionResult and returns whether
/// every test case passed
pub async fn grade(settings: &Settings, options: GradeOptions<'_>) -> Result<bool> {
    let request = build_request(&options)?;
    let grader = Grader::from_config(Arc::new(load_languages(settings)?));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling run");
            on_interrupt.cancel();
        }
    });

    info!(
        code = %options.code.display(),
        test_cases = request.test_cases.len(),
        language = %request.language,
        "Grading submission"
    );

    let result = grader.grade(&request, cancel).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(result.all_passed())
}

/// Print the parsed variables of a test-case input
pub fn parse(text: &str) -> Result<bool> {
    let parsed = parse_input(text);
    if parsed.is_empty() {
        eprintln!("✗ Could not parse input");
        return Ok(false);
    }
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(true)
}

/// Validate an input against constraints
pub fn check(input: &str, rules: &[String]) -> Result<bool> {
    let validation = constraints::validate(input, rules);
    println!("{}", serde_json::to_string_pretty(&validation)?);
    Ok(validation.valid)
}

/// List configured languages
pub fn list_languages(settings: &Settings) -> Result<()> {
    let languages = load_languages(settings)?;
    let runtime = languages.runtime();
    println!("Runtime: {} (timeout {}ms)", runtime.command, runtime.timeout_ms);
    println!();
    for name in languages.list_languages() {
        let config = languages.get_config(&name)?;
        let aliases = if config.aliases.is_empty() {
            String::new()
        } else {
            format!(" (aliases: {})", config.aliases.join(", "))
        };
        let transpile = config
            .transpile
            .as_ref()
            .map(|t| format!(" → via {}", t.command))
            .unwrap_or_default();
        println!("  {} {}{}{}", config.name, config.version, aliases, transpile);
    }
    Ok(())
}
