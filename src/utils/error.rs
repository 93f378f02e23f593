use thiserror::Error;

#[derive(Error, Debug)]
pub enum DigestError {
    #[error("API request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("No API key was provided")]
    NoCredential,

    #[error("Request rejected ({status}): {message}")]
    FatalRequestError { status: u16, message: String },

    #[error("Request failed, will retry: {reason}")]
    RetryableRequestError { reason: String },

    #[error("{context} failed after {attempts} attempts: {last_reason}")]
    ExhaustedRetries {
        context: String,
        attempts: u32,
        last_reason: String,
    },

    #[error("The book has no chapters to summarize")]
    NoChapters,

    #[error("Chapter not found: {selector}")]
    ChapterNotFound { selector: String },

    #[error("Book error: {message}")]
    BookError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

impl DigestError {
    /// Whether another attempt of the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            DigestError::RetryableRequestError { .. } => true,
            DigestError::HttpError(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            DigestError::NoCredential => "Summarization cancelled: no API key".to_string(),
            DigestError::FatalRequestError { status, .. } => {
                format!("The summarization service rejected the request (HTTP {})", status)
            }
            DigestError::ExhaustedRetries { context, attempts, .. } => {
                format!("{} did not succeed after {} attempts", context, attempts)
            }
            DigestError::NoChapters => "This book has no chapters with text".to_string(),
            DigestError::ChapterNotFound { selector } => {
                format!("No chapter matches '{}'", selector)
            }
            DigestError::BookError { message } => format!("Could not read the book: {}", message),
            DigestError::ConfigError { .. }
            | DigestError::InvalidConfigValueError { .. }
            | DigestError::MissingConfigError { .. }
            | DigestError::ConfigValidationError { .. } => format!("Invalid configuration: {}", self),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DigestError::NoCredential => "Set OPENAI_API_KEY or api.api_key in the config file",
            DigestError::FatalRequestError { status: 401 | 403, .. } => {
                "Check that the API key is valid and has access to the model"
            }
            DigestError::FatalRequestError { .. } => "Check the model name and request limits in the config",
            DigestError::ExhaustedRetries { .. } | DigestError::RetryableRequestError { .. } => {
                "The service is busy or unreachable; try again later"
            }
            DigestError::HttpError(_) => "Check the network connection and the api.endpoint setting",
            DigestError::NoChapters => {
                "Make sure the file is a text EPUB and not a scanned or image-only book"
            }
            DigestError::ChapterNotFound { .. } => "Run the `toc` command to list chapter numbers",
            DigestError::BookError { .. } => "Make sure the file exists and is a valid EPUB",
            DigestError::ConfigError { .. }
            | DigestError::InvalidConfigValueError { .. }
            | DigestError::MissingConfigError { .. }
            | DigestError::ConfigValidationError { .. } => "Fix the configuration file and retry",
            DigestError::IoError(_) => "Check file permissions and the output path",
            DigestError::SerializationError(_) => "The service returned an unexpected response",
        }
    }
}

pub type Result<T> = std::result::Result<T, DigestError>;
