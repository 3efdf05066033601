use snafu::Snafu;
use std::path::PathBuf;

/// Boxed source for failures raised by a `Transport` implementation.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to build HTTP client: {}", source))]
    BuildClient { source: reqwest::Error },

    #[snafu(display("Failed to {} '{}': {}", method, url, source))]
    Transport {
        method: String,
        url: String,
        source: TransportError,
    },

    #[snafu(display("Gateway responded to {} '{}' with status {}: {}", method, path, status, body))]
    Provisioning {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    #[snafu(display("Health check of {} at '{}' failed: {}", target, url, reason))]
    FatalHealth {
        target: String,
        url: String,
        reason: String,
    },

    #[snafu(display("Failed to retrieve certificate from '{}': {}", cert_path, reason))]
    CertRetrieval { cert_path: String, reason: String },

    #[snafu(display(
        "Failed to parse JWT credential issued for consumer '{}': {}",
        username, source
    ))]
    ParseCredential {
        username: String,
        source: serde_json::Error,
    },

    #[snafu(display("Failed to sign JWT for consumer '{}': {}", username, source))]
    SignToken {
        username: String,
        source: jsonwebtoken::errors::Error,
    },

    #[snafu(display("Failed to read config file '{}': {}", path.display(), source))]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to parse config: {}", source))]
    ParseConfig { source: toml::de::Error },

    #[snafu(display("Invalid config: {}", reason))]
    InvalidConfig { reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
