//! Configuration errors.

use crate::validation::ValidationError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to load, save or accept an [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config '{path}': {source}")]
    ReadFile {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file or one of its parent directories could not be written.
    #[error("cannot save config to '{path}': {source}")]
    Persist {
        /// File or directory that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid TOML for this schema.
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The in-memory config could not be rendered as TOML.
    #[error("cannot render config as TOML: {0}")]
    Render(#[from] toml::ser::Error),

    /// The values parsed but are out of range or inconsistent.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl ConfigError {
    pub(crate) fn read_file(path: &Path, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn persist(path: &Path, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn not_found() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "mock")
    }

    #[test]
    fn read_error_names_path_and_keeps_source() {
        let err = ConfigError::read_file(Path::new("/a/config.toml"), not_found());
        let msg = err.to_string();
        assert!(msg.contains("/a/config.toml"), "got: {msg}");
        assert!(err.source().is_some());
    }

    #[test]
    fn persist_error_keeps_path() {
        let err = ConfigError::persist(Path::new("/a/b"), not_found());
        assert!(matches!(err, ConfigError::Persist { ref path, .. } if path == Path::new("/a/b")));
    }

    #[test]
    fn validation_converts() {
        let err: ConfigError = ValidationError::InvalidValue {
            field: "matrix.preset".to_string(),
            reason: "unknown preset 'banded'".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "validation failed: invalid value for 'matrix.preset': unknown preset 'banded'"
        );
    }
}
