//! Error types for market-ingest
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use serde::Serialize;
use thiserror::Error;

/// The main error type for market-ingest
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Persistence Errors
    // ============================================================================
    #[error("Invalid identifier '{name}': {message}")]
    Sanitization { name: String, message: String },

    #[error("Schema error on table '{table}': {message}")]
    Schema { table: String, message: String },

    #[error("Write failed on table '{table}': {message}")]
    Write { table: String, message: String },

    #[error("Unknown database '{name}'")]
    UnknownDatabase { name: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Fetch from '{source_name}' failed: {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("JSONPath error: {message}")]
    JsonPath { message: String },

    #[error("Failed to extract records from path '{path}': {message}")]
    RecordExtraction { path: String, message: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("CSV parsing error: {message}")]
    CsvParse { message: String },

    #[error("Archive error: {message}")]
    Archive { message: String },

    // ============================================================================
    // Scheduling Errors
    // ============================================================================
    #[error("Unknown job '{name}'")]
    UnknownJob { name: String },

    #[error("Scheduler error: {message}")]
    Scheduler { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Coarse classification of an error, reported with unit results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Sanitization,
    Schema,
    Write,
    Fetch,
    Config,
    Internal,
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an identifier validation error
    pub fn sanitization(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sanitization {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a schema error
    pub fn schema(table: impl Into<String>, message: impl ToString) -> Self {
        Self::Schema {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a write error
    pub fn write(table: impl Into<String>, message: impl ToString) -> Self {
        Self::Write {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a fetch error
    pub fn fetch(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a JSONPath error
    pub fn json_path(message: impl Into<String>) -> Self {
        Self::JsonPath {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a CSV error
    pub fn csv(message: impl ToString) -> Self {
        Self::CsvParse {
            message: message.to_string(),
        }
    }

    /// Create an archive error
    pub fn archive(message: impl ToString) -> Self {
        Self::Archive {
            message: message.to_string(),
        }
    }

    /// Create a scheduler error
    pub fn scheduler(message: impl ToString) -> Self {
        Self::Scheduler {
            message: message.to_string(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Classify the error for reporting
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Sanitization { .. } => ErrorKind::Sanitization,
            Error::Schema { .. } | Error::UnknownDatabase { .. } => ErrorKind::Schema,
            Error::Write { .. } => ErrorKind::Write,
            Error::Http(_)
            | Error::HttpStatus { .. }
            | Error::RateLimited { .. }
            | Error::Timeout { .. }
            | Error::MaxRetriesExceeded { .. }
            | Error::InvalidUrl(_)
            | Error::Fetch { .. }
            | Error::JsonPath { .. }
            | Error::RecordExtraction { .. }
            | Error::Decode { .. }
            | Error::CsvParse { .. }
            | Error::Archive { .. }
            | Error::JsonParse(_) => ErrorKind::Fetch,
            Error::Config { .. }
            | Error::MissingConfigField { .. }
            | Error::InvalidConfigValue { .. }
            | Error::YamlParse(_)
            | Error::UnknownJob { .. } => ErrorKind::Config,
            _ => ErrorKind::Internal,
        }
    }
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for market-ingest
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
