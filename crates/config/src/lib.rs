//! Configuration loading, validation, and management for Papertrail.
//!
//! Loads configuration from `~/.papertrail/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.papertrail/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default generation provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Generation call policy (timeout, retries, batch concurrency)
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Per-task selection and budget limits
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Paper store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Discovery service configuration
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "mistral:latest".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("generation", &self.generation)
            .field("synthesis", &self.synthesis)
            .field("store", &self.store)
            .field("discovery", &self.discovery)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// How generation calls are made. Failures are always contained; these knobs
/// only shape how hard we try before giving up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Per-attempt timeout. Expiry counts as a failed attempt.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts per prompt (1 = no retry).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between attempts.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Prompts in flight at once during batch generation (1 = sequential).
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Maximum tokens per response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_timeout_secs() -> u64 {
    120
}
fn default_max_attempts() -> u32 {
    1
}
fn default_retry_backoff_ms() -> u64 {
    500
}
fn default_max_concurrency() -> usize {
    1
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_concurrency: default_max_concurrency(),
            max_tokens: None,
        }
    }
}

/// Selection (`max_papers`) and truncation (`abstract_chars`) limits per task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_review_papers")]
    pub review_max_papers: usize,

    #[serde(default = "default_review_chars")]
    pub review_abstract_chars: usize,

    #[serde(default = "default_qa_papers")]
    pub qa_max_papers: usize,

    #[serde(default = "default_qa_chars")]
    pub qa_abstract_chars: usize,

    #[serde(default = "default_review_papers")]
    pub future_work_max_papers: usize,

    #[serde(default = "default_review_chars")]
    pub future_work_abstract_chars: usize,

    /// Trailing window (in years) used when fetching review candidates.
    #[serde(default = "default_window_years")]
    pub window_years: i32,
}

fn default_review_papers() -> usize {
    2
}
fn default_review_chars() -> usize {
    200
}
fn default_qa_papers() -> usize {
    3
}
fn default_qa_chars() -> usize {
    300
}
fn default_window_years() -> i32 {
    5
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            review_max_papers: default_review_papers(),
            review_abstract_chars: default_review_chars(),
            qa_max_papers: default_qa_papers(),
            qa_abstract_chars: default_qa_chars(),
            future_work_max_papers: default_review_papers(),
            future_work_abstract_chars: default_review_chars(),
            window_years: default_window_years(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "sqlite", "file" or "memory"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// Database / JSONL path. Defaults to a file under the config dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_store_backend() -> String {
    "sqlite".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
        }
    }
}

impl StoreConfig {
    /// The configured path, or the backend's default location.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => PathBuf::from(path),
            None if self.backend == "file" => AppConfig::config_dir().join("papers.jsonl"),
            None => AppConfig::config_dir().join("papers.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// arXiv API base URL
    #[serde(default = "default_arxiv_url")]
    pub arxiv_url: String,

    /// Results requested per search
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_discovery_timeout")]
    pub timeout_secs: u64,

    /// Wait for discovered papers to be stored before answering a search.
    #[serde(default = "default_true")]
    pub await_persist: bool,
}

fn default_arxiv_url() -> String {
    "http://export.arxiv.org".into()
}
fn default_max_results() -> usize {
    5
}
fn default_discovery_timeout() -> u64 {
    10
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            arxiv_url: default_arxiv_url(),
            max_results: default_max_results(),
            timeout_secs: default_discovery_timeout(),
            await_persist: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Requests per minute per client
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: usize,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_rate_limit() -> usize {
    60
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.papertrail/config.toml).
    ///
    /// Environment overrides:
    /// - `PAPERTRAIL_API_KEY`, then `OPENAI_API_KEY` (only when unset in file)
    /// - `PAPERTRAIL_PROVIDER`, `PAPERTRAIL_MODEL`
    /// - `PAPERTRAIL_STORE_PATH`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("PAPERTRAIL_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("PAPERTRAIL_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("PAPERTRAIL_MODEL") {
            config.set_model(model);
        }

        if let Ok(path) = std::env::var("PAPERTRAIL_STORE_PATH") {
            config.store.path = Some(path);
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".papertrail")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.generation.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "generation.max_attempts must be at least 1".into(),
            ));
        }

        if self.generation.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "generation.max_concurrency must be at least 1".into(),
            ));
        }

        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "generation.timeout_secs must be > 0".into(),
            ));
        }

        if self.synthesis.window_years < 0 {
            return Err(ConfigError::ValidationError(
                "synthesis.window_years must not be negative".into(),
            ));
        }

        if !matches!(self.store.backend.as_str(), "sqlite" | "file" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "unknown store backend '{}' (expected sqlite, file or memory)",
                self.store.backend
            )));
        }

        Ok(())
    }

    /// Model sent with every generation request: the active provider's
    /// `default_model` when its section sets one, else the top-level
    /// `default_model`.
    pub fn active_model(&self) -> &str {
        self.providers
            .get(&self.default_provider)
            .and_then(|p| p.default_model.as_deref())
            .unwrap_or(self.default_model.as_str())
    }

    /// Force `model` for the active provider, overriding its section.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.default_model = model.into();
        if let Some(provider) = self.providers.get_mut(&self.default_provider) {
            provider.default_model = None;
        }
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some() || self.providers.values().any(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            generation: GenerationConfig::default(),
            synthesis: SynthesisConfig::default(),
            store: StoreConfig::default(),
            discovery: DiscoveryConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "ollama");
        assert_eq!(config.default_model, "mistral:latest");
        assert_eq!(config.gateway.port, 8000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_budgets_match_task_limits() {
        let s = SynthesisConfig::default();
        assert_eq!((s.review_max_papers, s.review_abstract_chars), (2, 200));
        assert_eq!((s.qa_max_papers, s.qa_abstract_chars), (3, 300));
        assert_eq!(s.window_years, 5);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.generation.timeout_secs, 120);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut config = AppConfig::default();
        config.generation.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_store_backend_rejected() {
        let mut config = AppConfig::default();
        config.store.backend = "neo4j".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("neo4j"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().default_provider, "ollama");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            r#"
default_model = "llama3"

[synthesis]
qa_abstract_chars = 500

[generation]
max_attempts = 3
max_concurrency = 4
"#
        )
        .unwrap();

        let config = AppConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.default_model, "llama3");
        assert_eq!(config.synthesis.qa_abstract_chars, 500);
        assert_eq!(config.synthesis.qa_max_papers, 3);
        assert_eq!(config.generation.max_attempts, 3);
        assert_eq!(config.generation.max_concurrency, 4);
        assert_eq!(config.generation.timeout_secs, 120);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "default_model = [").unwrap();
        let err = AppConfig::load_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn debug_output_redacts_keys() {
        let mut config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-other".into()),
                ..Default::default()
            },
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("sk-other"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn provider_section_model_wins_for_active_provider() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            r#"
default_provider = "openai"
default_model = "mistral:latest"

[providers.openai]
default_model = "gpt-4o-mini"

[providers.openrouter]
default_model = "meta-llama/llama-3-8b"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.active_model(), "gpt-4o-mini");

        let ollama = AppConfig {
            default_provider: "ollama".into(),
            ..config.clone()
        };
        assert_eq!(ollama.active_model(), "mistral:latest");
    }

    #[test]
    fn set_model_overrides_provider_section() {
        let mut config = AppConfig {
            default_provider: "openai".into(),
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                default_model: Some("gpt-4o-mini".into()),
                ..Default::default()
            },
        );
        config.set_model("gpt-4o");
        assert_eq!(config.active_model(), "gpt-4o");
    }

    #[test]
    fn store_path_defaults_by_backend() {
        let sqlite = StoreConfig::default();
        assert!(sqlite.resolved_path().ends_with("papers.db"));

        let file = StoreConfig {
            backend: "file".into(),
            path: None,
        };
        assert!(file.resolved_path().ends_with("papers.jsonl"));

        let explicit = StoreConfig {
            backend: "sqlite".into(),
            path: Some("/data/p.db".into()),
        };
        assert_eq!(explicit.resolved_path(), PathBuf::from("/data/p.db"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("ollama"));
        assert!(toml_str.contains("mistral:latest"));
    }
}
