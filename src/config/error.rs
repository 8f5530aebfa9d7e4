use std::io;

use thiserror::Error;

/// An error found while assembling the startup configuration. All of these are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Local port must be specified")]
    MissingLocalPort,

    #[error("Remote host must be specified")]
    MissingRemoteHost,

    #[error("Key cannot be empty")]
    EmptyKey,

    #[error("TicketTimeHint cannot be empty or 0")]
    ZeroTicketTimeHint,

    #[error("ServerName is {0} bytes long, at most 255 are allowed")]
    ServerNameTooLong(usize),

    #[error("Invalid port in {name}: {value}")]
    InvalidPort { name: &'static str, value: String },

    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Malformed plugin options: {0}")]
    MalformedOptions(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to generate the opaque value: {0}")]
    Random(#[source] io::Error),
}
