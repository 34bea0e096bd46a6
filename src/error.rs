// src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KmlError {
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    #[error("Read failure: {0}")]
    ReadFailure(String),

    #[error("Invalid KML document: {0}")]
    InvalidDocument(String),

    #[error("No valid points found in the KML document ({total_candidates} placemarks examined)")]
    NoValidPoints { total_candidates: usize },

    #[error("HTTP request failed: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("URL parsing failed: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("JSON processing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl KmlError {
    /// Creates a `ReadFailure` from a non-success HTTP status and whatever body the
    /// remote host returned.
    pub(crate) fn from_status(status_code: u16, response_body: &str) -> Self {
        let snippet: String = response_body.chars().take(200).collect();
        let reason = match status_code {
            401 | 403 => "access denied by remote host",
            404 => "document not found",
            500..=599 => "remote server error",
            _ => "unexpected response",
        };
        if snippet.trim().is_empty() {
            KmlError::ReadFailure(format!("HTTP {}: {}", status_code, reason))
        } else {
            KmlError::ReadFailure(format!(
                "HTTP {}: {} ({})",
                status_code,
                reason,
                snippet.trim()
            ))
        }
    }

    /// True for every error that means the input bytes could not be obtained.
    pub fn is_read_failure(&self) -> bool {
        matches!(self, KmlError::ReadFailure(_) | KmlError::ReqwestError(_))
    }

    /// The text shown in the viewer's error slot.
    pub fn user_message(&self) -> String {
        match self {
            KmlError::InvalidFileType(_) => "Please select a valid KML file (.kml)".to_string(),
            KmlError::ReadFailure(msg) => format!("Error reading the file: {}", msg),
            KmlError::ReqwestError(_) => "Error loading the KML file from URL".to_string(),
            KmlError::InvalidDocument(msg) => {
                format!("Error processing KML: invalid XML ({})", msg)
            }
            KmlError::NoValidPoints { .. } => {
                "Error processing KML: no valid points were found in the file".to_string()
            }
            other => format!("Error: {}", other),
        }
    }
}
