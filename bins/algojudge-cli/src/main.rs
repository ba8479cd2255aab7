mod commands;

use algojudge_common::config::Settings;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "algojudge-cli")]
#[command(about = "AlgoJudge CLI - Grade submissions and inspect inputs", long_about = None)]
struct Cli {
    /// Path to languages.json (defaults to $ALGOJUDGE_LANGUAGES or config/languages.json)
    #[arg(long, global = true)]
    languages: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a submission against test cases
    Grade {
        /// Submission source file
        #[arg(short, long)]
        code: PathBuf,

        /// JSON array of test cases
        #[arg(long)]
        cases: PathBuf,

        /// Language tag (name or alias from languages.json)
        #[arg(short, long, default_value = "javascript")]
        language: String,

        /// Reference solution used to fill blank expected outputs
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// JSON array of constraint strings
        #[arg(long)]
        constraints: Option<PathBuf>,

        /// Wall-clock limit per invocation in milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,
    },

    /// Show how a test-case input is parsed
    ParseInput {
        /// Input text, e.g. "nums = [2,7,11,15], target = 9"
        input: String,
    },

    /// Validate a test-case input against constraints
    Check {
        /// Input text
        input: String,

        /// Constraint such as "2 <= nums.length <= 10^4" (repeatable)
        #[arg(short, long = "constraint", required = true)]
        constraints: Vec<String>,
    },

    /// List configured languages
    Languages,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // stdout carries command output; diagnostics go to stderr
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::from_env();
    if let Some(path) = cli.languages {
        settings.languages_path = path;
    }
    init_tracing(settings.json_logs);

    let ok = match cli.command {
        Commands::Grade {
            code,
            cases,
            language,
            reference,
            constraints,
            timeout_ms,
        } => {
            commands::grade(
                &settings,
                commands::GradeOptions {
                    code: &code,
                    cases: &cases,
                    language: &language,
                    reference: reference.as_deref(),
                    constraints: constraints.as_deref(),
                    timeout_ms,
                },
            )
            .await?
        }
        Commands::ParseInput { input } => commands::parse(&input)?,
        Commands::Check { input, constraints } => commands::check(&input, &constraints)?,
        Commands::Languages => {
            commands::list_languages(&settings)?;
            true
        }
    };

    if !ok {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_grade_arguments() {
        let cli = Cli::parse_from([
            "algojudge-cli",
            "--languages",
            "/tmp/languages.json",
            "grade",
            "--code",
            "solution.js",
            "--cases",
            "cases.json",
            "-t",
            "250",
        ]);
        assert_eq!(cli.languages, Some(PathBuf::from("/tmp/languages.json")));
        match cli.command {
            Commands::Grade {
                language,
                timeout_ms,
                reference,
                ..
            } => {
                assert_eq!(language, "javascript");
                assert_eq!(timeout_ms, Some(250));
                assert!(reference.is_none());
            }
            _ => panic!("expected grade command"),
        }
    }

    #[test]
    fn test_check_requires_a_constraint() {
        assert!(Cli::try_parse_from(["algojudge-cli", "check", "n = 1"]).is_err());
        let cli = Cli::try_parse_from(["algojudge-cli", "check", "n = 1", "-c", "1 <= n <= 5"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { .. }));
    }
}
