use std::fmt::{self, Debug, Display};
use std::io;

/// Provides `ModelError` and maps other errors to
/// convert to a `ModelError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum ModelError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    /// A parameter value outside of its legal range.
    IllegalParameterValue(String),
    /// A global property was set more than once.
    ParameterAlreadySet(String),
    /// A malformed contact graph or graph request.
    NetworkError(String),
    ReportError(String),
    ConfigError(String),
}

impl From<io::Error> for ModelError {
    fn from(error: io::Error) -> Self {
        ModelError::IoError(error)
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(error: serde_json::Error) -> Self {
        ModelError::JsonError(error)
    }
}

impl From<csv::Error> for ModelError {
    fn from(error: csv::Error) -> Self {
        ModelError::CsvError(error)
    }
}

impl From<String> for ModelError {
    fn from(error: String) -> Self {
        ModelError::ConfigError(error)
    }
}

impl From<&str> for ModelError {
    fn from(error: &str) -> Self {
        ModelError::ConfigError(error.to_string())
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::IoError(error) => Some(error),
            ModelError::JsonError(error) => Some(error),
            ModelError::CsvError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModelError::IoError(error) => write!(f, "I/O error: {error}"),
            ModelError::JsonError(error) => write!(f, "JSON error: {error}"),
            ModelError::CsvError(error) => write!(f, "CSV error: {error}"),
            ModelError::IllegalParameterValue(message) => {
                write!(f, "Illegal parameter value: {message}")
            }
            ModelError::ParameterAlreadySet(name) => {
                write!(f, "Global property {name} has already been set")
            }
            ModelError::NetworkError(message) => write!(f, "Network error: {message}"),
            ModelError::ReportError(message) => write!(f, "Report error: {message}"),
            ModelError::ConfigError(message) => write!(f, "Configuration error: {message}"),
        }
    }
}
