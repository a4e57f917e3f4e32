use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Why an export run was aborted.
///
/// The message of each variant is fixed; the cause is kept as the error source
/// so it can be logged without changing what the user sees.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unsuccessful authentication")]
    Authentication(#[source] ApiError),

    #[error("Failed to retrieve user information")]
    UserInfo(#[source] ApiError),

    #[error("Failed to retrieve station data")]
    StationData(#[source] ApiError),

    #[error("Failed to retrieve historical data")]
    HistoricalData(#[source] ApiError),

    #[error("Error creating historical data files")]
    FileWrite(#[source] WriteError),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} for url ({url}){}", detail_suffix(.message))]
    Status {
        url: String,
        status: StatusCode,
        message: Option<String>,
    },

    #[error("failed to parse API JSON (url={url})")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("response from {url} has no `{field}`")]
    MissingField { url: String, field: &'static str },

    #[error("account has no stations")]
    EmptyStationList,
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create directory {}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("station id {0:?} cannot name a file")]
    InvalidStationId(String),

    #[error("failed to write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode station {id}")]
    Encode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

fn detail_suffix(message: &Option<String>) -> String {
    match message {
        Some(m) if !m.is_empty() => format!(": {m}"),
        _ => String::new(),
    }
}

/// Error body the provider returns with non-success statuses.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ProviderErrorResponse {
    #[serde(default)]
    pub(crate) code: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<String>,
}

/// Builds the status error for a failed call, keeping whatever the provider said about it.
pub(crate) fn status_error(status: StatusCode, url: &str, body: &str) -> ApiError {
    let message = serde_json::from_str::<ProviderErrorResponse>(body)
        .ok()
        .and_then(|e| match (e.code, e.message) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (None, Some(message)) => Some(message),
            (Some(code), None) => Some(code),
            (None, None) => None,
        })
        .or_else(|| {
            let body = body.trim();
            (!body.is_empty()).then(|| body.chars().take(200).collect())
        });

    ApiError::Status {
        url: url.to_string(),
        status,
        message,
    }
}
