//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$ATTACHSIFT_CONFIG` (environment variable)
//! 2. `~/.config/attachsift/config.toml` (Linux/macOS)
//!    `%APPDATA%\attachsift\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! The model credential is never stored here; it comes from
//! `OPENROUTER_API_KEY` or the command line.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variable that overrides `model.model`.
pub const MODEL_ENV: &str = "OPENROUTER_MODEL";

/// Environment variable holding the provider API key.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Input and output directories.
    pub paths: PathsConfig,
    /// Model provider settings.
    pub model: ModelConfig,
    /// Classification tuning.
    pub classify: ClassifyConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Directories used by the batch commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the `.eml` messages to classify.
    pub input_dir: PathBuf,
    /// Directory the predicted partitions are written to.
    pub output_dir: PathBuf,
    /// Directory holding the ground-truth partitions.
    pub ground_truth_dir: PathBuf,
}

/// Model provider settings (OpenAI-compatible chat completions endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Maximum tokens in the answer.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Value of the `HTTP-Referer` header.
    pub referer: String,
}

/// Classification tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Maximum characters of normalized body embedded in the prompt.
    pub max_body_chars: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("examples"),
            output_dir: PathBuf::from("output"),
            ground_truth_dir: PathBuf::from("ground_truth"),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "anthropic/claude-3.5-sonnet".to_string(),
            max_tokens: 4096,
            timeout_secs: 120,
            referer: "https://github.com".to_string(),
        }
    }
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            max_body_chars: crate::parser::html::MAX_BODY_CHARS,
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
/// `OPENROUTER_MODEL` is applied on top of whatever was loaded.
pub fn load_config() -> Config {
    let mut config = load_file_config();
    if let Ok(model) = std::env::var(MODEL_ENV) {
        if !model.trim().is_empty() {
            config.model.model = model.trim().to_string();
        }
    }
    config
}

fn load_file_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("ATTACHSIFT_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("attachsift").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("attachsift")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.paths.output_dir, PathBuf::from("output"));
        assert_eq!(cfg.model.max_tokens, 4096);
        assert_eq!(cfg.model.timeout_secs, 120);
        assert_eq!(cfg.classify.max_body_chars, 200_000);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[model]
model = "openai/gpt-4o"

[paths]
ground_truth_dir = "truth"
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.model.model, "openai/gpt-4o");
        assert_eq!(cfg.paths.ground_truth_dir, PathBuf::from("truth"));
        // Other fields use defaults
        assert_eq!(cfg.model.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(cfg.paths.input_dir, PathBuf::from("examples"));
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_cache_dir_override() {
        let mut cfg = Config::default();
        cfg.general.cache_dir = Some(PathBuf::from("/tmp/sift-cache"));
        assert_eq!(cache_dir(&cfg), PathBuf::from("/tmp/sift-cache"));
    }
}
