use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::level::StudentLevel;

pub const CONFIG_FILE_NAME: &str = "codetutor.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    /// Local or remote Ollama daemon (native /api/generate)
    #[default]
    #[serde(rename = "ollama")]
    Ollama,
    /// Hugging Face Inference API
    #[serde(rename = "huggingface")]
    HuggingFace,
    /// Any /chat/completions endpoint (vLLM, LM Studio, gateways)
    #[serde(rename = "openai-compatible")]
    OpenAICompatible,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Ollama => "ollama",
            Provider::HuggingFace => "huggingface",
            Provider::OpenAICompatible => "openai-compatible",
        }
    }

    /// Env var consulted when `api_key_env` is not set explicitly.
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            Provider::Ollama => "OLLAMA_API_KEY",
            Provider::HuggingFace => "HF_TOKEN",
            Provider::OpenAICompatible => "OPENAI_API_KEY",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Ollama => "http://localhost:11434",
            Provider::HuggingFace => "https://api-inference.huggingface.co",
            Provider::OpenAICompatible => "http://localhost:11434/v1",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Name of the env var holding the token. "none" disables the lookup.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Optional: override generation length.
    /// Provider defaults: ollama 2000, openai-compatible 2000, huggingface 512
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Optional: override sampling temperature.
    /// Provider defaults: ollama 0.3, openai-compatible 0.3, huggingface 0.7
    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_repeat_penalty")]
    pub repeat_penalty: f32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "codellama:7b".to_string()
}

fn default_top_p() -> f32 {
    0.9
}

fn default_repeat_penalty() -> f32 {
    1.1
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Ollama,
            model: default_model(),
            base_url: None,
            api_key_env: None,
            max_tokens: None,
            temperature: None,
            top_p: default_top_p(),
            repeat_penalty: default_repeat_penalty(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn get_max_tokens(&self) -> u32 {
        if let Some(tokens) = self.max_tokens {
            return tokens;
        }
        match self.provider {
            Provider::Ollama | Provider::OpenAICompatible => 2000,
            Provider::HuggingFace => 512,
        }
    }

    pub fn get_temperature(&self) -> f32 {
        if let Some(temperature) = self.temperature {
            return temperature;
        }
        match self.provider {
            Provider::Ollama | Provider::OpenAICompatible => 0.3,
            Provider::HuggingFace => 0.7,
        }
    }

    pub fn get_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Name of the env var the token is read from, or None when disabled.
    pub fn resolved_api_key_env(&self) -> Option<&str> {
        match self.api_key_env.as_deref() {
            Some(var) if var.eq_ignore_ascii_case("none") => None,
            Some(var) => Some(var),
            None => Some(self.provider.default_api_key_env()),
        }
    }

    /// Token from the environment. Every provider can run tokenless
    /// (local Ollama, public Hugging Face models), so a missing var is empty.
    pub fn get_api_key(&self) -> String {
        match self.resolved_api_key_env() {
            Some(var) => env::var(var).unwrap_or_else(|_| {
                debug!("{} not set, calling {} without a token", var, self.provider);
                String::new()
            }),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackMode {
    /// Call the configured model
    #[default]
    Model,
    /// Canned feedback, no model call
    Demo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    #[serde(default)]
    pub mode: FeedbackMode,

    #[serde(default)]
    pub default_level: StudentLevel,

    /// Code beyond this many characters is cut before templating
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// Return rule-based feedback instead of the raw error when the model fails
    #[serde(default)]
    pub fallback_on_error: bool,
}

fn default_max_input_chars() -> usize {
    8000
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            mode: FeedbackMode::Model,
            default_level: StudentLevel::Beginner,
            max_input_chars: default_max_input_chars(),
            fallback_on_error: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// Where a loaded config came from, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Repo(PathBuf),
    User(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(p) | ConfigSource::Repo(p) | ConfigSource::User(p) => {
                write!(f, "{}", p.display())
            }
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

impl Config {
    /// Load config from the working directory or user config directory
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    /// Load configuration from a specific path, or use default search paths.
    /// Environment overrides are applied on top.
    pub fn load_with_path(path: Option<String>) -> Result<Self> {
        let (mut config, _) = Self::load_with_source(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load without env overrides, reporting which file was used
    pub fn load_with_source(path: Option<String>) -> Result<(Self, ConfigSource)> {
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            let config = Self::load_from_path(&config_path)?;
            return Ok((config, ConfigSource::Explicit(PathBuf::from(config_path))));
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            let config = Self::load_from_path(&local)?;
            debug!("Loaded config from ./{}", CONFIG_FILE_NAME);
            return Ok((config, ConfigSource::Repo(local)));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user = config_dir.join("codetutor").join("config.toml");
            if user.is_file() {
                let config = Self::load_from_path(&user)?;
                debug!("Loaded config from {:?}", user);
                return Ok((config, ConfigSource::User(user)));
            }
        }

        debug!("Using default config");
        Ok((Self::default(), ConfigSource::Defaults))
    }

    fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| env::var(key).ok())
    }

    /// Apply deployment-style overrides. `MODEL_NAME` beats
    /// `FINETUNED_MODEL_PATH` when both are present.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("FINETUNED_MODEL_PATH") {
            self.llm.model = model;
        }
        if let Some(model) = lookup("MODEL_NAME") {
            self.llm.model = model;
        }
        if let Some(raw) = lookup("MODEL_TEMPERATURE") {
            let temperature: f32 = raw
                .trim()
                .parse()
                .with_context(|| format!("MODEL_TEMPERATURE is not a number: {}", raw))?;
            self.llm.temperature = Some(temperature);
        }
        if let Some(raw) = lookup("MAX_TOKENS") {
            let tokens: u32 = raw
                .trim()
                .parse()
                .with_context(|| format!("MAX_TOKENS is not an integer: {}", raw))?;
            self.llm.max_tokens = Some(tokens);
        }

        let ollama_host = lookup("OLLAMA_HOST");
        let ollama_port = lookup("OLLAMA_PORT");
        if self.llm.provider == Provider::Ollama
            && (ollama_host.is_some() || ollama_port.is_some())
        {
            let host = ollama_host.unwrap_or_else(|| "localhost".to_string());
            self.llm.base_url = Some(ollama_endpoint(&host, ollama_port.as_deref())?);
        }

        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(raw) = lookup("API_PORT") {
            self.server.port = raw
                .trim()
                .parse()
                .with_context(|| format!("API_PORT is not a port number: {}", raw))?;
        }
        if let Some(raw) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(())
    }
}

/// Base URL from OLLAMA_HOST, which may carry a scheme and a port of its
/// own. An explicit port in the host wins over OLLAMA_PORT.
fn ollama_endpoint(host: &str, port: Option<&str>) -> Result<String> {
    let host = host.trim().trim_end_matches('/');
    let (scheme, authority) = match host.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("http", host),
    };
    let has_port = authority
        .rsplit_once(':')
        .is_some_and(|(name, port)| {
            !port.is_empty()
                && port.chars().all(|c| c.is_ascii_digit())
                && (!name.contains(':') || name.ends_with(']'))
        });
    if has_port {
        return Ok(format!("{}://{}", scheme, authority));
    }
    let port: u16 = match port {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("OLLAMA_PORT is not a port number: {}", raw))?,
        None => 11434,
    };
    Ok(format!("{}://{}:{}", scheme, authority, port))
}
