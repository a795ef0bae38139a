//! Session configuration
//!
//! Everything is read from environment variables (optionally via a `.env`
//! file). `from_lookup` takes the variable source as a closure so tests do not
//! have to mutate the process environment.

use std::str::FromStr;
use std::time::Duration;
use url::Url;
use vox_agentic::AgentBackend;

use crate::error::PipelineError;

const DEFAULT_EXECUTOR_TIMEOUT_SECS: u64 = 120;
const DEFAULT_NETWORK_ID: &str = "base-sepolia";

/// How free-text executor results are classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassifierMode {
    /// Keyword and pattern rules only
    #[default]
    Heuristic,
    /// Delegate to the session's LLM client
    Llm,
}

impl FromStr for ClassifierMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "heuristic" | "rules" => Ok(ClassifierMode::Heuristic),
            "llm" | "model" => Ok(ClassifierMode::Llm),
            other => Err(PipelineError::Config(format!(
                "unknown RESULT_CLASSIFIER '{}' (valid values: heuristic, llm)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub backend: AgentBackend,
    /// Agent executor endpoint; `None` runs without live execution
    pub executor_url: Option<Url>,
    pub executor_timeout: Duration,
    pub classifier: ClassifierMode,
    /// Network label shown on balance widgets
    pub network_id: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: AgentBackend::default(),
            executor_url: None,
            executor_timeout: Duration::from_secs(DEFAULT_EXECUTOR_TIMEOUT_SECS),
            classifier: ClassifierMode::default(),
            network_id: DEFAULT_NETWORK_ID.to_string(),
        }
    }
}

impl SessionConfig {
    /// Load from the process environment, reading `.env` first if present
    pub fn from_env() -> Result<Self, PipelineError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let backend = match get("AGENT_BACKEND") {
            Some(value) => value
                .parse()
                .map_err(|e: vox_agentic::backend::ParseBackendError| {
                    PipelineError::Config(e.to_string())
                })?,
            None => defaults.backend,
        };

        let executor_url = get("EXECUTOR_URL")
            .map(|raw| {
                Url::parse(raw.trim()).map_err(|e| {
                    PipelineError::Config(format!("invalid EXECUTOR_URL '{}': {}", raw, e))
                })
            })
            .transpose()?;

        let executor_timeout = match get("EXECUTOR_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(PipelineError::Config(format!(
                        "EXECUTOR_TIMEOUT_SECS must be a positive integer, got '{}'",
                        raw
                    )))
                }
            },
            None => defaults.executor_timeout,
        };

        let classifier = match get("RESULT_CLASSIFIER") {
            Some(value) => value.parse()?,
            None => defaults.classifier,
        };

        let network_id = get("NETWORK_ID").unwrap_or(defaults.network_id);

        Ok(Self {
            backend,
            executor_url,
            executor_timeout,
            classifier,
            network_id,
        })
    }

    /// "base-sepolia" → "Base Sepolia"
    pub fn network_label(&self) -> String {
        self.network_id
            .split(['-', '_'])
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
