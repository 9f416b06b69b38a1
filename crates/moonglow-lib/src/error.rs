//! Unified error type for the moonglow-lib crate.
//!
//! [`MoonglowError`] wraps module-specific errors (`StripError`, `ApiError`)
//! and domain-specific error kinds (`Config`, `Color`). `From` impls allow
//! `?` to propagate across module boundaries seamlessly.

use std::fmt;

use crate::moonraker::ApiError;
use crate::strip::StripError;

/// Unified error type for moonglow-lib operations.
#[derive(Debug)]
pub enum MoonglowError {
    /// Pixel strip error (open, buffered write, commit).
    Strip(StripError),
    /// Printer API error (transport, HTTP status, decode).
    Api(ApiError),
    /// Standard I/O error (config persistence).
    Io(std::io::Error),
    /// Configuration validation error.
    Config(String),
    /// Color parsing error.
    Color(String),
}

impl fmt::Display for MoonglowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoonglowError::Strip(e) => write!(f, "{e}"),
            MoonglowError::Api(e) => write!(f, "{e}"),
            MoonglowError::Io(e) => write!(f, "I/O error: {e}"),
            MoonglowError::Config(e) => write!(f, "Config error: {e}"),
            MoonglowError::Color(e) => write!(f, "Color error: {e}"),
        }
    }
}

impl std::error::Error for MoonglowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MoonglowError::Strip(e) => Some(e),
            MoonglowError::Api(e) => Some(e),
            MoonglowError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StripError> for MoonglowError {
    fn from(e: StripError) -> Self {
        MoonglowError::Strip(e)
    }
}

impl From<ApiError> for MoonglowError {
    fn from(e: ApiError) -> Self {
        MoonglowError::Api(e)
    }
}

impl From<std::io::Error> for MoonglowError {
    fn from(e: std::io::Error) -> Self {
        MoonglowError::Io(e)
    }
}

/// Crate-level Result alias using [`MoonglowError`].
pub type Result<T> = std::result::Result<T, MoonglowError>;
