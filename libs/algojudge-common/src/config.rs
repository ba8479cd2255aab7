// Process settings read from the environment

use std::path::PathBuf;

pub const DEFAULT_LANGUAGES_PATH: &str = "config/languages.json";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Location of languages.json
    pub languages_path: PathBuf,
    /// Address the HTTP API listens on
    pub bind_addr: String,
    /// Overrides the runtime timeout from languages.json
    pub timeout_ms: Option<u64>,
    /// Overrides the runtime command from languages.json
    pub node_command: Option<String>,
    /// Emit JSON log lines instead of the human format
    pub json_logs: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            languages_path: PathBuf::from(DEFAULT_LANGUAGES_PATH),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            timeout_ms: None,
            node_command: None,
            json_logs: false,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            languages_path: non_empty("ALGOJUDGE_LANGUAGES")
                .map(PathBuf::from)
                .unwrap_or(defaults.languages_path),
            bind_addr: non_empty("ALGOJUDGE_BIND").unwrap_or(defaults.bind_addr),
            timeout_ms: non_empty("ALGOJUDGE_TIMEOUT_MS").and_then(|v| v.trim().parse().ok()),
            node_command: non_empty("ALGOJUDGE_NODE"),
            json_logs: non_empty("ALGOJUDGE_LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_env() {
        let settings = Settings::from_lookup(|_| None);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.languages_path, PathBuf::from("config/languages.json"));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("ALGOJUDGE_LANGUAGES", "/etc/algojudge/languages.json"),
            ("ALGOJUDGE_BIND", "127.0.0.1:8080"),
            ("ALGOJUDGE_TIMEOUT_MS", "1500"),
            ("ALGOJUDGE_NODE", "/usr/local/bin/node"),
            ("ALGOJUDGE_LOG_FORMAT", "JSON"),
        ]
        .into_iter()
        .collect();

        let settings = Settings::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.bind_addr, "127.0.0.1:8080");
        assert_eq!(settings.timeout_ms, Some(1500));
        assert_eq!(settings.node_command.as_deref(), Some("/usr/local/bin/node"));
        assert!(settings.json_logs);
    }

    #[test]
    fn test_invalid_timeout_is_ignored() {
        let settings = Settings::from_lookup(|key| {
            (key == "ALGOJUDGE_TIMEOUT_MS").then(|| "soon".to_string())
        });
        assert_eq!(settings.timeout_ms, None);
    }
}
