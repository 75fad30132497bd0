// src/error.rs

//! Unified error handling for the aggregator.

use std::fmt;

use thiserror::Error;

/// Result type alias for aggregator operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML document could not be mapped
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// XML document is not well-formed
    #[error("XML read error: {0}")]
    XmlRead(#[from] quick_xml::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Database driver error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage used before `initialize` or after `close`
    #[error("Database pool is not initialized")]
    PoolNotInitialized,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A single platform record could not be mapped
    #[error("Extraction error for {blog}: {message}")]
    Extract { blog: String, message: String },

    /// Outbound request failed or returned an unusable status
    #[error("Fetch error for {context}: {message}")]
    Fetch { context: String, message: String },

    /// Upstream reported the resource as missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream answered with a server error
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an extraction error tagged with the owning blog.
    pub fn extract(blog: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Extract {
            blog: blog.into(),
            message: message.to_string(),
        }
    }

    /// Create a fetch error with context.
    pub fn fetch(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Whether the failure means the database connection itself broke.
    ///
    /// Only these are worth retrying; pool-acquire timeouts, constraint
    /// violations and application errors surface immediately.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Database(err) => match err {
                sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::WorkerCrashed => true,
                sqlx::Error::Database(db) => db
                    .code()
                    .is_some_and(|code| is_connection_sqlstate(&code)),
                _ => false,
            },
            _ => false,
        }
    }
}

/// SQLSTATE class 08 (connection exception) and the admin/crash shutdown codes.
fn is_connection_sqlstate(code: &str) -> bool {
    code.starts_with("08") || matches!(code, "57P01" | "57P02" | "57P03")
}
