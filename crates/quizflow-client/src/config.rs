//! Backend configuration and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizflow_core::flow::FlowConfig;
use quizflow_core::model::Rating;
use quizflow_core::timer::TimerConfig;
use quizflow_core::traits::QuizService;

use crate::http::{HttpQuizService, DEFAULT_BASE_URL};
use crate::local::LocalQuizService;

/// Configuration for a single quiz backend.
///
/// The hand-written `Debug` impl masks API keys in log output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Http {
        #[serde(default = "default_base_url")]
        base_url: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    Local,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendConfig::Http {
                api_key,
                base_url,
                timeout_secs,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_ref().map(|_| "***"))
                .field("timeout_secs", timeout_secs)
                .finish(),
            BackendConfig::Local => write!(f, "Local"),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Top-level quizflow configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizflowConfig {
    /// Backend configurations keyed by name.
    #[serde(default = "default_backends")]
    pub backends: HashMap<String, BackendConfig>,
    /// Default backend to use.
    #[serde(default = "default_backend")]
    pub default_backend: String,
    /// Awareness countdown length in seconds.
    #[serde(default = "default_awareness_secs")]
    pub awareness_secs: u64,
    /// Question countdown length in seconds.
    #[serde(default = "default_question_secs")]
    pub question_secs: u64,
    /// Remaining seconds at or below which a countdown shows as warning.
    #[serde(default = "default_warning_below_secs")]
    pub warning_below_secs: u64,
    /// Remaining seconds at or below which a countdown shows as critical.
    #[serde(default = "default_critical_below_secs")]
    pub critical_below_secs: u64,
    /// How long answer feedback stays on screen, in milliseconds.
    #[serde(default = "default_feedback_dwell_ms")]
    pub feedback_dwell_ms: u64,
    /// How long timeout feedback stays on screen, in milliseconds.
    #[serde(default = "default_timeout_dwell_ms")]
    pub timeout_dwell_ms: u64,
}

fn default_backends() -> HashMap<String, BackendConfig> {
    HashMap::from([("local".to_string(), BackendConfig::Local)])
}
fn default_backend() -> String {
    "local".to_string()
}
fn default_awareness_secs() -> u64 {
    30
}
fn default_question_secs() -> u64 {
    60
}
fn default_warning_below_secs() -> u64 {
    30
}
fn default_critical_below_secs() -> u64 {
    10
}
fn default_feedback_dwell_ms() -> u64 {
    2000
}
fn default_timeout_dwell_ms() -> u64 {
    1000
}

impl Default for QuizflowConfig {
    fn default() -> Self {
        Self {
            backends: default_backends(),
            default_backend: default_backend(),
            awareness_secs: default_awareness_secs(),
            question_secs: default_question_secs(),
            warning_below_secs: default_warning_below_secs(),
            critical_below_secs: default_critical_below_secs(),
            feedback_dwell_ms: default_feedback_dwell_ms(),
            timeout_dwell_ms: default_timeout_dwell_ms(),
        }
    }
}

impl QuizflowConfig {
    /// Flow parameters derived from the configured timings.
    pub fn flow_config(&self) -> FlowConfig {
        let bands = |duration_secs: u64| TimerConfig {
            duration_secs,
            warning_below_secs: self.warning_below_secs,
            critical_below_secs: self.critical_below_secs,
        };
        FlowConfig {
            feedback_dwell: Duration::from_millis(self.feedback_dwell_ms),
            timeout_dwell: Duration::from_millis(self.timeout_dwell_ms),
            auto_rating: Rating::NEUTRAL,
            awareness_timer: bands(self.awareness_secs),
            question_timer: bands(self.question_secs),
        }
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

/// Resolve env vars in a backend config.
fn resolve_backend_config(config: &BackendConfig) -> BackendConfig {
    match config {
        BackendConfig::Http {
            base_url,
            api_key,
            timeout_secs,
        } => BackendConfig::Http {
            base_url: resolve_env_vars(base_url),
            api_key: api_key.as_ref().map(|k| resolve_env_vars(k)),
            timeout_secs: *timeout_secs,
        },
        BackendConfig::Local => BackendConfig::Local,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizflow.toml` in the current directory
/// 2. `~/.config/quizflow/config.toml`
///
/// Environment variable overrides: `QUIZFLOW_BASE_URL`, `QUIZFLOW_API_KEY`.
pub fn load_config() -> Result<QuizflowConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizflowConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizflow.toml");
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

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<QuizflowConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizflowConfig::default(),
    };

    // The built-in backend is always available.
    config
        .backends
        .entry("local".into())
        .or_insert(BackendConfig::Local);

    // Apply env var overrides
    if let Ok(url) = std::env::var("QUIZFLOW_BASE_URL") {
        config
            .backends
            .entry("http".into())
            .or_insert(BackendConfig::Http {
                base_url: default_base_url(),
                api_key: None,
                timeout_secs: default_timeout_secs(),
            });
        if let Some(BackendConfig::Http { base_url, .. }) = config.backends.get_mut("http") {
            *base_url = url;
        }
    }

    if let Ok(key) = std::env::var("QUIZFLOW_API_KEY") {
        config
            .backends
            .entry("http".into())
            .or_insert(BackendConfig::Http {
                base_url: default_base_url(),
                api_key: None,
                timeout_secs: default_timeout_secs(),
            });
        if let Some(BackendConfig::Http { api_key, .. }) = config.backends.get_mut("http") {
            *api_key = Some(key);
        }
    }

    // Resolve env vars in all backend configs
    let resolved: HashMap<String, BackendConfig> = config
        .backends
        .iter()
        .map(|(k, v)| (k.clone(), resolve_backend_config(v)))
        .collect();
    config.backends = resolved;

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizflow"))
}

/// Create a backend instance from its configuration.
pub fn create_service(name: &str, config: &BackendConfig) -> Result<Box<dyn QuizService>> {
    tracing::debug!(backend = name, "creating quiz backend");
    match config {
        BackendConfig::Http {
            base_url,
            api_key,
            timeout_secs,
        } => Ok(Box::new(HttpQuizService::new(
            Some(base_url.clone()),
            // An unset ${VAR} reference resolves to an empty key; treat it
            // as no key at all.
            api_key.clone().filter(|k| !k.is_empty()),
            Some(*timeout_secs),
        ))),
        BackendConfig::Local => Ok(Box::new(LocalQuizService::new())),
    }
}
