use std::collections::BTreeMap;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not logged in or session expired")]
    Unauthorized,
    #[error("network error: {0}")]
    Network(String),
    #[error("request rejected: {}", format_fields(.0))]
    Validation(BTreeMap<String, Vec<String>>),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("HTTP {0}")]
    Status(StatusCode),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Status(code) => code.is_server_error() || *code == StatusCode::TOO_MANY_REQUESTS,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

fn format_fields(fields: &BTreeMap<String, Vec<String>>) -> String {
    fields
        .iter()
        .map(|(field, msgs)| format!("{field}: {}", msgs.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}
