//! Custom error types for watch-duty-crawler

use serde::Serialize;
use thiserror::Error;

/// Main error type for crawler operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid root URL: {0}")]
    InvalidRootUrl(String),

    #[error("Navigation timeout: {0}")]
    NavigationTimeout(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Renderer unavailable: {0}")]
    RendererUnavailable(String),

    #[error("Site not found: {0}")]
    SiteNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Stable machine-readable code reported to callers of a crawl
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::TomlParse(_) | Error::TomlSerialize(_) => "CONFIG_ERROR",
            Error::Database(_) => "UNEXPECTED_DB_ERROR",
            Error::InvalidRootUrl(_) => "INVALID_ROOT_URL",
            Error::NavigationTimeout(_) => "NAVIGATION_TIMEOUT",
            Error::Navigation(_) => "NAVIGATION_FAILED",
            Error::RendererUnavailable(_) => "RENDERER_UNAVAILABLE",
            Error::SiteNotFound(_) => "SITE_NOT_FOUND",
            Error::Io(_) => "IO_ERROR",
            Error::Http(_) => "HTTP_ERROR",
            Error::UrlParse(_) => "INVALID_URL",
            Error::Json(_) => "JSON_ERROR",
            Error::Other(_) => "UNEXPECTED_ERROR",
        }
    }

    /// Whether this error aborts a crawl that is in progress
    pub fn is_navigation_failure(&self) -> bool {
        matches!(self, Error::NavigationTimeout(_) | Error::Navigation(_))
    }
}

/// Structured error payload, `{ "code": "..." }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorCode {
    pub code: String,
}

impl From<&Error> for ErrorCode {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code().to_string(),
        }
    }
}

/// Result type alias for the crawler
pub type Result<T> = std::result::Result<T, Error>;
