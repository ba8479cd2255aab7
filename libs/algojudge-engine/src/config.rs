// Language and runtime configuration for the grading engine
use algojudge_common::config::Settings;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::context::DEFAULT_MAX_LOG_BYTES;

pub const DEFAULT_RUNTIME_COMMAND: &str = "node";
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_TRANSPILE_TIMEOUT_MS: u64 = 30_000;

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_transpile_timeout_ms() -> u64 {
    DEFAULT_TRANSPILE_TIMEOUT_MS
}

fn default_max_log_bytes() -> usize {
    DEFAULT_MAX_LOG_BYTES
}

/// The JavaScript runtime every submission ultimately executes in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub command: String,
    /// Extra arguments placed before the harness script.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_log_bytes")]
    pub max_log_bytes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_RUNTIME_COMMAND.to_string(),
            args: Vec::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_log_bytes: DEFAULT_MAX_LOG_BYTES,
        }
    }
}

/// A command that reads source on stdin and writes JavaScript on stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranspileCommand {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Wall-clock limit for one transpilation.
    #[serde(default = "default_transpile_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub version: String,
    #[serde(default)]
    pub transpile: Option<TranspileCommand>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LanguagesJson {
    #[serde(default)]
    runtime: RuntimeConfig,
    languages: Vec<LanguageConfig>,
}

/// Language configuration manager
#[derive(Debug, Clone)]
pub struct LanguageConfigManager {
    runtime: RuntimeConfig,
    configs: HashMap<String, LanguageConfig>,
    /// Lowercased name or alias to canonical name.
    lookup: HashMap<String, String>,
}

impl LanguageConfigManager {
    /// Load language configurations from languages.json
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Language config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    /// Load with default path (config/languages.json)
    pub fn load_default() -> Result<Self> {
        Self::load(Path::new(algojudge_common::config::DEFAULT_LANGUAGES_PATH))
    }

    /// Like [`load`](Self::load), but a missing file falls back to the
    /// built-in JavaScript-only configuration.
    pub fn load_or_builtin(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }
        warn!(
            path = %config_path.display(),
            "language config not found, using built-in javascript configuration"
        );
        Ok(Self::builtin())
    }

    pub fn parse(content: &str) -> Result<Self> {
        let languages_json: LanguagesJson = serde_json::from_str(content)?;
        Self::from_parts(languages_json.runtime, languages_json.languages)
    }

    pub fn builtin() -> Self {
        let javascript = LanguageConfig {
            name: "javascript".to_string(),
            aliases: vec!["js".to_string(), "node".to_string()],
            version: "node".to_string(),
            transpile: None,
        };
        let mut configs = HashMap::new();
        let mut lookup = HashMap::new();
        for key in std::iter::once(&javascript.name).chain(&javascript.aliases) {
            lookup.insert(key.to_lowercase(), javascript.name.clone());
        }
        configs.insert(javascript.name.clone(), javascript);

        Self {
            runtime: RuntimeConfig::default(),
            configs,
            lookup,
        }
    }

    fn from_parts(runtime: RuntimeConfig, languages: Vec<LanguageConfig>) -> Result<Self> {
        if runtime.command.trim().is_empty() {
            bail!("runtime.command must not be empty");
        }

        let mut configs = HashMap::new();
        let mut lookup = HashMap::new();
        for lang in languages {
            for key in std::iter::once(&lang.name).chain(&lang.aliases) {
                if let Some(previous) = lookup.insert(key.to_lowercase(), lang.name.clone()) {
                    if previous != lang.name {
                        bail!(
                            "Language key '{}' is claimed by both '{}' and '{}'",
                            key,
                            previous,
                            lang.name
                        );
                    }
                }
            }
            configs.insert(lang.name.clone(), lang);
        }

        Ok(Self {
            runtime,
            configs,
            lookup,
        })
    }

    /// Applies process-level overrides from the environment.
    pub fn apply_settings(&mut self, settings: &Settings) {
        if let Some(timeout_ms) = settings.timeout_ms {
            self.runtime.timeout_ms = timeout_ms;
        }
        if let Some(command) = &settings.node_command {
            self.runtime.command = command.clone();
        }
    }

    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    /// Get configuration for a language tag (name or alias, any case)
    pub fn get_config(&self, language: &str) -> Result<&LanguageConfig> {
        self.lookup
            .get(&language.trim().to_lowercase())
            .and_then(|name| self.configs.get(name))
            .ok_or_else(|| anyhow::anyhow!("No configuration found for language: {}", language))
    }

    /// List all supported languages
    pub fn list_languages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.configs.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn languages(&self) -> impl Iterator<Item = &LanguageConfig> {
        self.configs.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    const SAMPLE: &str = r#"{
        "runtime": { "command": "node", "args": ["--stack-size=4000"], "timeout_ms": 2000 },
        "languages": [
            { "name": "javascript", "aliases": ["js"], "version": "20" },
            {
                "name": "typescript",
                "aliases": ["ts"],
                "version": "5",
                "transpile": { "command": "npx", "args": ["--no-install", "esbuild", "--loader=ts"] }
            }
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let manager = LanguageConfigManager::parse(SAMPLE).unwrap();
        assert_eq!(manager.list_languages(), ["javascript", "typescript"]);
        assert_eq!(manager.runtime().timeout_ms, 2000);
        assert_eq!(manager.runtime().max_log_bytes, DEFAULT_MAX_LOG_BYTES);
        assert_eq!(manager.runtime().args, ["--stack-size=4000"]);
    }

    #[test]
    fn test_lookup_by_alias_is_case_insensitive() {
        let manager = LanguageConfigManager::parse(SAMPLE).unwrap();
        assert_eq!(manager.get_config("TS").unwrap().name, "typescript");
        assert_eq!(manager.get_config(" JavaScript ").unwrap().name, "javascript");
        let transpile = manager.get_config("typescript").unwrap().transpile.as_ref().unwrap();
        assert_eq!(transpile.timeout_ms, DEFAULT_TRANSPILE_TIMEOUT_MS);
        assert!(manager.get_config("python").is_err());
    }

    #[test]
    fn test_conflicting_alias_is_rejected() {
        let json = r#"{ "languages": [
            { "name": "javascript", "aliases": ["x"], "version": "1" },
            { "name": "typescript", "aliases": ["x"], "version": "1" }
        ] }"#;
        let err = LanguageConfigManager::parse(json).unwrap_err();
        assert!(err.to_string().contains("claimed by both"));
    }

    #[test]
    fn test_runtime_defaults_when_omitted() {
        let json = r#"{ "languages": [ { "name": "javascript", "version": "20" } ] }"#;
        let manager = LanguageConfigManager::parse(json).unwrap();
        assert_eq!(manager.runtime(), &RuntimeConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let manager = LanguageConfigManager::load(file.path()).unwrap();
        assert_eq!(manager.get_config("js").unwrap().version, "20");
    }

    #[test]
    fn test_missing_file() {
        let path = Path::new("/nonexistent/languages.json");
        assert!(LanguageConfigManager::load(path).is_err());
        let manager = LanguageConfigManager::load_or_builtin(path).unwrap();
        assert_eq!(manager.list_languages(), ["javascript"]);
        assert_eq!(manager.runtime().command, "node");
        assert_eq!(manager.runtime().timeout_ms, 5000);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let err = LanguageConfigManager::load_or_builtin(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse"));
    }

    #[test]
    fn test_settings_override_runtime() {
        let mut manager = LanguageConfigManager::builtin();
        let settings = Settings {
            timeout_ms: Some(250),
            node_command: Some("/opt/node/bin/node".to_string()),
            ..Settings::default()
        };
        manager.apply_settings(&settings);
        assert_eq!(manager.runtime().timeout_ms, 250);
        assert_eq!(manager.runtime().command, "/opt/node/bin/node");
    }

    #[test]
    fn test_repository_config_loads() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/languages.json");
        let manager = LanguageConfigManager::load(&path).unwrap();
        assert!(manager.get_config("javascript").unwrap().transpile.is_none());
        assert!(manager.get_config("ts").unwrap().transpile.is_some());
    }
}
