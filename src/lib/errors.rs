use std::path::PathBuf;

use config::ConfigError as ConfigLoaderError;
use thiserror::Error;

/// Errors that can occur while loading or validating configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to build (read) the configuration file.
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Failed to deserialize TOML into a struct.
    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Required field is missing.
    #[error("Configuration file {path} is missing `{field}`")]
    MissingField { path: PathBuf, field: &'static str },
    /// Field failed validation.
    #[error("Configuration file {path} has invalid `{field}`: {message}")]
    InvalidField {
        path: PathBuf,
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    /// Helper to wrap `config::ConfigError` as a read failure.
    pub fn from_read_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::FileRead { path, source }
    }

    /// Helper to wrap `config::ConfigError` as a parse failure.
    pub fn from_parse_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::Parse { path, source }
    }
}

/// Failures talking to the registry (config document store or naming directory).
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Network or connection failure; the backend could not be reached.
    #[error("Registry unavailable during {operation}: {message}")]
    Unavailable {
        operation: &'static str,
        message: String,
    },
    /// The backend answered but refused the request (bad id, permissions, ...).
    #[error("Registry rejected {operation} (status={status:?}): {message}")]
    Rejected {
        operation: &'static str,
        status: Option<u16>,
        message: String,
    },
    /// Stored content does not parse as the expected document.
    #[error("Malformed document `{data_id}`: {source}")]
    MalformedDocument {
        data_id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RegistryError {
    pub fn unavailable(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            operation,
            message: err.to_string(),
        }
    }

    pub fn rejected(
        operation: &'static str,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            operation,
            status,
            message: message.into(),
        }
    }

    pub fn malformed(data_id: impl Into<String>, source: serde_json::Error) -> Self {
        Self::MalformedDocument {
            data_id: data_id.into(),
            source,
        }
    }

    /// Short machine-friendly label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::Unavailable { .. } => "registry_unavailable",
            RegistryError::Rejected { .. } => "registry_rejected",
            RegistryError::MalformedDocument { .. } => "malformed_document",
        }
    }
}

/// Raised when a transport name outside the supported set is requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown transport: {requested} (expected one of: stdio, tcp)")]
pub struct UnknownTransport {
    pub requested: String,
}
