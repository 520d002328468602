//! Runtime configuration
//!
//! Everything the assistant needs from the environment is read once at
//! startup and handed to the components that use it. Nothing below the
//! binary reads `std::env` directly.

use crate::error::AssistantError;
use crate::Result;
use std::env;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

const DEFAULT_DATA_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Which chat-completion backend drives the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Gemini,
}

impl LlmProvider {
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "gpt-4-turbo",
            LlmProvider::Gemini => "gemini-2.0-flash",
        }
    }

    fn default_api_base(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => DEFAULT_OPENAI_API_BASE,
            LlmProvider::Gemini => DEFAULT_GEMINI_API_BASE,
        }
    }

    fn api_key_var(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "OPENAI_API_KEY",
            LlmProvider::Gemini => "GEMINI_API_KEY",
        }
    }

    fn api_base_var(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "OPENAI_API_BASE",
            LlmProvider::Gemini => "GEMINI_API_BASE",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "gemini" => Ok(LlmProvider::Gemini),
            other => Err(AssistantError::ConfigError(format!(
                "Unsupported LLM_PROVIDER '{}' (expected 'openai' or 'gemini')",
                other
            ))),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Gemini => "gemini",
        };
        write!(f, "{}", s)
    }
}

/// Connection settings for the Alpha Vantage data provider
#[derive(Clone)]
pub struct AlphaVantageConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl AlphaVantageConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_ALPHA_VANTAGE_BASE_URL.to_string(),
            timeout_secs: DEFAULT_DATA_TIMEOUT_SECS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

// Keys stay out of logs and panics.
impl fmt::Debug for AlphaVantageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlphaVantageConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Connection settings for the chat model
#[derive(Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
}

impl LlmConfig {
    pub fn new(provider: LlmProvider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
            api_base: provider.default_api_base().to_string(),
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Top-level assistant configuration
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub alpha_vantage: AlphaVantageConfig,
    pub llm: LlmConfig,
    /// Upper bound on model round-trips inside one user turn
    pub max_tool_rounds: usize,
}

impl AssistantConfig {
    pub fn new(alpha_vantage: AlphaVantageConfig, llm: LlmConfig) -> Self {
        Self {
            alpha_vantage,
            llm,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self
    }

    /// Build configuration from process environment variables.
    ///
    /// Call `dotenv::dotenv()` beforehand to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let alpha_key = get("ALPHA_VANTAGE_API_KEY").ok_or_else(|| {
            AssistantError::ConfigError(
                "ALPHA_VANTAGE_API_KEY environment variable not set".to_string(),
            )
        })?;

        let mut alpha_vantage = AlphaVantageConfig::new(alpha_key);
        if let Some(base_url) = get("ALPHA_VANTAGE_BASE_URL") {
            alpha_vantage = alpha_vantage.with_base_url(base_url);
        }
        if let Some(timeout) = get("ALPHA_VANTAGE_TIMEOUT_SECS") {
            alpha_vantage =
                alpha_vantage.with_timeout(parse_positive("ALPHA_VANTAGE_TIMEOUT_SECS", &timeout)?);
        }

        let provider = match get("LLM_PROVIDER") {
            Some(raw) => raw.parse::<LlmProvider>()?,
            None => LlmProvider::OpenAi,
        };

        let llm_key = get(provider.api_key_var()).ok_or_else(|| {
            AssistantError::ConfigError(format!(
                "{} environment variable not set (LLM_PROVIDER={})",
                provider.api_key_var(),
                provider
            ))
        })?;

        let mut llm = LlmConfig::new(provider, llm_key);
        if let Some(model) = get("LLM_MODEL") {
            llm = llm.with_model(model);
        }
        if let Some(api_base) = get(provider.api_base_var()) {
            llm = llm.with_api_base(api_base.trim_end_matches('/'));
        }
        if let Some(timeout) = get("LLM_TIMEOUT_SECS") {
            llm = llm.with_timeout(parse_positive("LLM_TIMEOUT_SECS", &timeout)?);
        }
        if let Some(temperature) = get("LLM_TEMPERATURE") {
            llm = llm.with_temperature(parse_temperature(&temperature)?);
        }

        let mut config = Self::new(alpha_vantage, llm);
        if let Some(rounds) = get("MAX_TOOL_ROUNDS") {
            config = config.with_max_tool_rounds(parse_positive("MAX_TOOL_ROUNDS", &rounds)? as usize);
        }

        Ok(config)
    }
}

/// Counts and timeouts: zero is rejected along with non-numbers.
fn parse_positive(key: &str, raw: &str) -> Result<u64> {
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(AssistantError::ConfigError(format!(
            "{} must be a positive integer, got '{}'",
            key, raw
        ))),
    }
}

fn parse_temperature(raw: &str) -> Result<f32> {
    match raw.parse::<f32>() {
        Ok(value) if (0.0..=2.0).contains(&value) => Ok(value),
        _ => Err(AssistantError::ConfigError(format!(
            "LLM_TEMPERATURE must be a number between 0 and 2, got '{}'",
            raw
        ))),
    }
}
