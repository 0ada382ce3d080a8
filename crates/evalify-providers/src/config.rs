//! Recognizer configuration and factory.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use evalify_core::engine::EngineConfig;
use evalify_core::notifications::DEFAULT_CAP;
use evalify_core::traits::Recognizer;

use crate::gemini::GeminiRecognizer;
use crate::mock::MockRecognizer;
use crate::openai::OpenAiRecognizer;

/// Configuration for a single recognition backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecognizerConfig {
    Gemini {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    OpenAI {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Mock {
        /// Compact answers reported for any sheet.
        #[serde(default)]
        answers: String,
        /// File-name substring → compact answers.
        #[serde(default)]
        sheets: BTreeMap<String, String>,
        /// Fail every call with this message.
        #[serde(default)]
        fail: Option<String>,
    },
}

impl std::fmt::Debug for RecognizerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecognizerConfig::Gemini {
                api_key: _,
                base_url,
                model,
            } => f
                .debug_struct("Gemini")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            RecognizerConfig::OpenAI {
                api_key: _,
                base_url,
                model,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .field("org_id", org_id)
                .finish(),
            RecognizerConfig::Mock {
                answers,
                sheets,
                fail,
            } => f
                .debug_struct("Mock")
                .field("answers", answers)
                .field("sheets", sheets)
                .field("fail", fail)
                .finish(),
        }
    }
}

/// Top-level evalify configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalifyConfig {
    /// Recognizer configurations keyed by name.
    #[serde(default)]
    pub recognizers: HashMap<String, RecognizerConfig>,
    /// Recognizer used when none is named on the command line.
    #[serde(default = "default_recognizer")]
    pub default_recognizer: String,
    /// Max retries on transient recognition errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// HTTP timeout for recognition requests.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Directory holding results, custom keys and notifications.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Number of notifications kept.
    #[serde(default = "default_notification_cap")]
    pub notification_cap: usize,
    /// Exam definition file.
    #[serde(default = "default_exam_file")]
    pub exam_file: PathBuf,
}

fn default_recognizer() -> String {
    "gemini".to_string()
}
fn default_retries() -> u32 {
    2
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_timeout() -> u64 {
    120
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./evalify-data")
}
fn default_notification_cap() -> usize {
    DEFAULT_CAP
}
fn default_exam_file() -> PathBuf {
    PathBuf::from("exam.toml")
}

impl Default for EvalifyConfig {
    fn default() -> Self {
        Self {
            recognizers: HashMap::new(),
            default_recognizer: default_recognizer(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            timeout_secs: default_timeout(),
            data_dir: default_data_dir(),
            notification_cap: default_notification_cap(),
            exam_file: default_exam_file(),
        }
    }
}

impl EvalifyConfig {
    /// Retry settings for the evaluation engine.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    /// Look up a recognizer by name, falling back to `default_recognizer`.
    pub fn recognizer(&self, name: Option<&str>) -> Result<(&str, &RecognizerConfig)> {
        let name = name.unwrap_or(&self.default_recognizer);
        let (name, config) = self.recognizers.get_key_value(name).with_context(|| {
            let mut known: Vec<_> = self.recognizers.keys().map(String::as_str).collect();
            known.sort_unstable();
            format!(
                "recognizer '{name}' is not configured (configured: {})",
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            )
        })?;
        Ok((name.as_str(), config))
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_opt(s: &Option<String>) -> Option<String> {
    s.as_deref().map(resolve_env_vars)
}

/// Resolve env vars in a recognizer config.
fn resolve_recognizer_config(config: &RecognizerConfig) -> RecognizerConfig {
    match config {
        RecognizerConfig::Gemini {
            api_key,
            base_url,
            model,
        } => RecognizerConfig::Gemini {
            api_key: resolve_env_vars(api_key),
            base_url: resolve_opt(base_url),
            model: resolve_opt(model),
        },
        RecognizerConfig::OpenAI {
            api_key,
            base_url,
            model,
            org_id,
        } => RecognizerConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: resolve_opt(base_url),
            model: resolve_opt(model),
            org_id: resolve_opt(org_id),
        },
        RecognizerConfig::Mock { .. } => config.clone(),
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `evalify.toml` in the current directory
/// 2. `~/.config/evalify/config.toml`
///
/// Environment variable overrides: `EVALIFY_GEMINI_KEY`, `EVALIFY_OPENAI_KEY`.
pub fn load_config() -> Result<EvalifyConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
///
/// A relative `data_dir` or `exam_file` in a config file is taken relative
/// to the directory holding that file.
pub fn load_config_from(path: Option<&Path>) -> Result<EvalifyConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("evalify.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let mut config = toml::from_str::<EvalifyConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                if config.data_dir.is_relative() {
                    config.data_dir = dir.join(&config.data_dir);
                }
                if config.exam_file.is_relative() {
                    config.exam_file = dir.join(&config.exam_file);
                }
            }
            tracing::debug!("loaded config from {}", path.display());
            config
        }
        None => EvalifyConfig::default(),
    };

    // Apply env var overrides
    if let Ok(key) = std::env::var("EVALIFY_GEMINI_KEY") {
        let entry = config
            .recognizers
            .entry("gemini".into())
            .or_insert(RecognizerConfig::Gemini {
                api_key: String::new(),
                base_url: None,
                model: None,
            });
        if let RecognizerConfig::Gemini { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Ok(key) = std::env::var("EVALIFY_OPENAI_KEY") {
        let entry = config
            .recognizers
            .entry("openai".into())
            .or_insert(RecognizerConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                model: None,
                org_id: None,
            });
        if let RecognizerConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }

    // Resolve env vars in all recognizer configs
    let resolved: HashMap<String, RecognizerConfig> = config
        .recognizers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_recognizer_config(v)))
        .collect();
    config.recognizers = resolved;

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("evalify"))
}

/// Create a recognizer instance from its configuration.
pub fn create_recognizer(
    name: &str,
    config: &RecognizerConfig,
    timeout_secs: u64,
) -> Result<Box<dyn Recognizer>> {
    match config {
        RecognizerConfig::Gemini {
            api_key,
            base_url,
            model,
        } => {
            anyhow::ensure!(
                !api_key.is_empty(),
                "recognizer '{name}' has no API key (set EVALIFY_GEMINI_KEY or api_key)"
            );
            Ok(Box::new(GeminiRecognizer::new(
                api_key,
                base_url.clone(),
                model.clone(),
                timeout_secs,
            )?))
        }
        RecognizerConfig::OpenAI {
            api_key,
            base_url,
            model,
            org_id,
        } => {
            anyhow::ensure!(
                !api_key.is_empty(),
                "recognizer '{name}' has no API key (set EVALIFY_OPENAI_KEY or api_key)"
            );
            Ok(Box::new(OpenAiRecognizer::new(
                api_key,
                base_url.clone(),
                model.clone(),
                org_id.clone(),
                timeout_secs,
            )?))
        }
        RecognizerConfig::Mock {
            answers,
            sheets,
            fail,
        } => Ok(Box::new(match fail {
            Some(message) => MockRecognizer::failing(message),
            None => MockRecognizer::new(sheets.clone(), answers),
        })),
    }
}
