/*============================================================
  Synavera Project: Tempyr
  Module: tempyr_core::error
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Centralise Tempyr-Core error types to provide consistent
    diagnostics and exit semantics.

  Security / Safety Notes:
    Error contexts expose only high-level paths and URLs; no
    response bodies or archive contents are echoed.

  Dependencies:
    thiserror for ergonomic error definitions.

  Operational Scope:
    Used across modules to propagate recoverable failures and
    consolidate exit codes for the binary entry point.

  Revision History:
    2026-10-19 COD  Established shared error definitions.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit error taxonomy with actionable context
    - Cancellation kept distinct from failure
    - Stable exit codes for operational tooling
============================================================*/

use std::io;
use std::process::ExitCode;

use thiserror::Error;

/// Result alias for Tempyr-Core operations.
pub type Result<T> = std::result::Result<T, TempyrError>;

/// Enumerates high-level error domains surfaced by Tempyr-Core.
#[derive(Debug, Error)]
pub enum TempyrError {
    #[error("Configuration: {0}")]
    Config(String),
    #[error("Network: {0}")]
    Network(String),
    #[error("Serialization: {0}")]
    Serialization(String),
    #[error("Filesystem: {0}")]
    Filesystem(String),
    #[error("Runtime: {0}")]
    Runtime(String),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("`{file_name}` is already installed")]
    AlreadyInstalled { file_name: String },
    #[error("Not a valid catalog mod URL: {0}")]
    InvalidCatalogUrl(String),
    #[error("No install root configured or detected")]
    NoInstallRoot,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl TempyrError {
    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            TempyrError::Config(_) => ExitCode::from(20),
            TempyrError::NoInstallRoot => ExitCode::from(21),
            TempyrError::InvalidCatalogUrl(_) => ExitCode::from(22),
            TempyrError::Network(_) => ExitCode::from(30),
            TempyrError::Serialization(_) => ExitCode::from(31),
            TempyrError::Filesystem(_) => ExitCode::from(40),
            TempyrError::Io(_) => ExitCode::from(41),
            TempyrError::AlreadyInstalled { .. } => ExitCode::from(42),
            TempyrError::Runtime(_) => ExitCode::from(50),
            TempyrError::Cancelled => ExitCode::from(130),
        }
    }

    /// True when the error represents a cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TempyrError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_distinguished() {
        assert!(TempyrError::Cancelled.is_cancelled());
        assert!(!TempyrError::Network("down".into()).is_cancelled());
    }

    #[test]
    fn io_errors_convert() {
        let err: TempyrError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, TempyrError::Io(_)));
    }
}
