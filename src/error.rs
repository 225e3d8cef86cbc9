//! Error types for the voice bot.
//!
//! Uses thiserror for ergonomic error definitions. Every variant carries a
//! stable code that ends up in structured log fields.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Resource errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // External service errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("VK API error {code}: {message}")]
    VkApi { code: i64, message: String },

    #[error("VK request failed: {0}")]
    Vk(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Audio processing failed: {0}")]
    Audio(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::VkApi { .. } => "VK_API_ERROR",
            Self::Vk(_) => "VK_ERROR",
            Self::Synthesis(_) => "SYNTHESIS_ERROR",
            Self::Audio(_) => "AUDIO_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Other(_) => "UNKNOWN_ERROR",
        }
    }

    /// Whether the failure came from the network side rather than our data.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Vk(_))
            || matches!(self, Self::VkApi { code, .. } if *code == 6 || *code == 10)
    }
}

// Convenience conversions
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Vk(format!("HTTP request failed: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("JSON parsing error: {}", err))
    }
}
