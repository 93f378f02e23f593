use crate::adapters::http::DEFAULT_ENDPOINT;
use crate::core::executor::RetryPolicy;
use crate::core::summarizer::SummarizerSettings;
use crate::domain::model::ModelProfile;
use crate::utils::error::{DigestError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_one_of, validate_path, validate_positive_number,
    validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var regex"));

const REASONING_EFFORTS: [&str; 4] = ["minimal", "low", "medium", "high"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub chapter: ProfileConfig,
    pub book: ProfileConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub model: Option<String>,
    pub reasoning_effort: Option<String>,
    pub max_completion_tokens: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: Option<String>,
    pub max_chapter_chars: Option<usize>,
    pub error_display_ms: Option<u64>,
}

impl ProfileConfig {
    /// Fills unset fields from `defaults`.
    pub fn resolve(&self, defaults: ModelProfile) -> ModelProfile {
        ModelProfile {
            model: self.model.clone().unwrap_or(defaults.model),
            reasoning_effort: self
                .reasoning_effort
                .clone()
                .unwrap_or(defaults.reasoning_effort),
            max_completion_tokens: self
                .max_completion_tokens
                .unwrap_or(defaults.max_completion_tokens),
            timeout_ms: self.timeout_ms.unwrap_or(defaults.timeout_ms),
            prompt: self.prompt.clone().or(defaults.prompt),
        }
    }
}

impl SummarizerConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DigestError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| DigestError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn endpoint(&self) -> &str {
        self.api.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    /// Configured key, ignoring placeholders whose variable was not set.
    pub fn api_key(&self) -> Option<String> {
        self.api
            .api_key
            .as_ref()
            .filter(|key| !ENV_VAR.is_match(key))
            .cloned()
    }

    pub fn api_key_env(&self) -> &str {
        self.api.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY")
    }

    pub fn output_path(&self) -> &str {
        self.output.path.as_deref().unwrap_or("./summaries")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self.retry.max_attempts.unwrap_or(defaults.max_attempts),
            base_delay: self
                .retry
                .base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
        }
    }

    pub fn summarizer_settings(&self) -> SummarizerSettings {
        let defaults = SummarizerSettings::default();
        SummarizerSettings {
            chapter: self.chapter.resolve(defaults.chapter),
            book: self.book.resolve(defaults.book),
            max_chapter_chars: self
                .output
                .max_chapter_chars
                .unwrap_or(defaults.max_chapter_chars),
            error_display_delay: self
                .output
                .error_display_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.error_display_delay),
        }
    }
}

fn validate_profile(section: &str, profile: &ModelProfile) -> Result<()> {
    validate_non_empty_string(&format!("{section}.model"), &profile.model)?;
    validate_one_of(
        &format!("{section}.reasoning_effort"),
        &profile.reasoning_effort,
        &REASONING_EFFORTS,
    )?;
    validate_positive_number(
        &format!("{section}.max_completion_tokens"),
        u64::from(profile.max_completion_tokens),
        1,
    )?;
    validate_positive_number(&format!("{section}.timeout_ms"), profile.timeout_ms, 1)?;
    Ok(())
}

impl Validate for SummarizerConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api.endpoint", self.endpoint())?;
        validate_path("output.path", self.output_path())?;
        validate_range("retry.max_attempts", self.retry_policy().max_attempts, 1, 10)?;

        let settings = self.summarizer_settings();
        validate_profile("chapter", &settings.chapter)?;
        validate_profile("book", &settings.book)?;
        validate_positive_number(
            "output.max_chapter_chars",
            settings.max_chapter_chars as u64,
            1,
        )?;
        Ok(())
    }
}
