//! Error types for causegraph operations.
//!
//! This module provides the error hierarchy used across the pipeline, with
//! structured error codes and a transient/permanent split that drives the
//! retry policy for external services.

use thiserror::Error;

/// Result type alias for causegraph operations.
pub type CgResult<T> = Result<T, CausegraphError>;

/// Main error type for all causegraph operations.
#[derive(Error, Debug)]
pub enum CausegraphError {
    /// Malformed input data (bad descriptor, bad vector).
    #[error("Data error: {message}")]
    Data { message: String, code: ErrorCode },

    /// A required input artifact is absent or empty. Fatal for a run.
    #[error("Missing input: {message}")]
    MissingInput { message: String, code: ErrorCode },

    /// Embedding generation failed.
    #[error("Embedding error: {message}")]
    Embedding {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// LLM operation failed.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication failed.
    #[error("Authentication error: {message}")]
    Authentication { message: String, code: ErrorCode },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {message}")]
    RateLimit { message: String, code: ErrorCode },

    /// Network error.
    #[error("Network error: {message}")]
    Network {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Data (DATA_xxx)
    DataMalformedDescriptor,
    DataInvalidVector,
    DataDimensionMismatch,
    DataLengthMismatch,

    // Input (IN_xxx)
    InputMissing,
    InputEmpty,

    // Authentication (AUTH_xxx)
    AuthInvalidKey,

    // Rate Limit (RATE_xxx)
    RateLimitExceeded,

    // Embedding (EMB_xxx)
    EmbConnectionFailed,
    EmbGenerationFailed,

    // LLM (LLM_xxx)
    LlmGenerationFailed,
    LlmInvalidResponse,

    // Network (NET_xxx)
    NetConnectionFailed,

    // Parse (PARSE_xxx)
    ParseInvalidJson,

    // Configuration (CFG_xxx)
    ConfigInvalid,

    // IO (IO_xxx)
    IoFailed,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DataMalformedDescriptor => "DATA_001",
            ErrorCode::DataInvalidVector => "DATA_002",
            ErrorCode::DataDimensionMismatch => "DATA_003",
            ErrorCode::DataLengthMismatch => "DATA_004",
            ErrorCode::InputMissing => "IN_001",
            ErrorCode::InputEmpty => "IN_002",
            ErrorCode::AuthInvalidKey => "AUTH_001",
            ErrorCode::RateLimitExceeded => "RATE_001",
            ErrorCode::EmbConnectionFailed => "EMB_001",
            ErrorCode::EmbGenerationFailed => "EMB_002",
            ErrorCode::LlmGenerationFailed => "LLM_001",
            ErrorCode::LlmInvalidResponse => "LLM_002",
            ErrorCode::NetConnectionFailed => "NET_001",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ConfigInvalid => "CFG_001",
            ErrorCode::IoFailed => "IO_001",
        }
    }
}

impl CausegraphError {
    /// Create a data error for a malformed descriptor or record.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
            code: ErrorCode::DataMalformedDescriptor,
        }
    }

    /// Create a data error for an unusable embedding vector.
    pub fn invalid_vector(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
            code: ErrorCode::DataInvalidVector,
        }
    }

    /// Create a data error with an explicit code.
    pub fn data(message: impl Into<String>, code: ErrorCode) -> Self {
        Self::Data {
            message: message.into(),
            code,
        }
    }

    /// Create a missing-input error.
    pub fn missing_input(message: impl Into<String>) -> Self {
        Self::MissingInput {
            message: message.into(),
            code: ErrorCode::InputMissing,
        }
    }

    /// Create an empty-input error.
    pub fn empty_input(message: impl Into<String>) -> Self {
        Self::MissingInput {
            message: message.into(),
            code: ErrorCode::InputEmpty,
        }
    }

    /// Create an embedding error.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
            code: ErrorCode::EmbGenerationFailed,
            source: None,
        }
    }

    /// Create an embedding error for a provider that could not be reached.
    pub fn embedding_connection(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
            code: ErrorCode::EmbConnectionFailed,
            source: None,
        }
    }

    /// Create an LLM error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            source: None,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: ErrorCode::NetConnectionFailed,
            source: None,
        }
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            code: ErrorCode::AuthInvalidKey,
        }
    }

    /// Create a rate limit error.
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit {
            message: message.into(),
            code: ErrorCode::RateLimitExceeded,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Data { code, .. } => *code,
            Self::MissingInput { code, .. } => *code,
            Self::Embedding { code, .. } => *code,
            Self::Llm { code, .. } => *code,
            Self::Authentication { code, .. } => *code,
            Self::RateLimit { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            Self::Configuration(_) => ErrorCode::ConfigInvalid,
            Self::Io(_) => ErrorCode::IoFailed,
            Self::Serialization(_) => ErrorCode::ParseInvalidJson,
        }
    }

    /// Whether retrying the failed operation may succeed.
    ///
    /// External-service failures are transient; bad input and bad
    /// configuration are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Embedding { .. } | Self::Llm { .. } | Self::RateLimit { .. } | Self::Network { .. }
        )
    }

    /// Whether the run must halt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingInput { .. } | Self::Configuration(_))
    }

    /// Convert from HTTP status code returned by an external service.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::authentication(body),
            429 => Self::rate_limit(body),
            400..=499 => Self::Configuration(format!("HTTP {}: {}", status, body)),
            _ => Self::network(format!("HTTP {}: {}", status, body)),
        }
    }
}
