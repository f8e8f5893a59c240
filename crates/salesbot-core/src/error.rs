//! Error types for webhook access and configuration

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while asking the workflow for a reply
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No endpoint was supplied at all
    #[error("webhook URL is not configured")]
    NotConfigured,

    /// The endpoint was left at the placeholder value
    #[error("webhook URL is still the placeholder {0:?}")]
    Placeholder(String),

    /// The endpoint is not an absolute http(s) URL
    #[error("invalid webhook URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Network failure reaching the endpoint or reading its body
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("HTTP error! status: {}", .0.as_u16())]
    Status(reqwest::StatusCode),

    /// Body was not valid JSON
    #[error("invalid JSON in response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

impl WebhookError {
    /// True for the configuration class of errors, which are reported with
    /// the fixed configuration message rather than the connection message.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NotConfigured | Self::Placeholder(_) | Self::InvalidUrl { .. }
        )
    }
}

/// Config file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
