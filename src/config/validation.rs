//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (backlog, chunk size, line limit)
//! - Check route shapes (lookup prefix is an absolute URI path)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// Smallest listen backlog the server accepts.
pub const MIN_BACKLOG: u32 = 5;

/// Smallest line limit that still fits a sensible request line.
pub const MIN_LINE_BYTES: usize = 64;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.backlog must be at least 5, got {0}")]
    BacklogTooSmall(u32),

    #[error("listener.max_connections must be at least 1")]
    NoConnections,

    #[error("web_root must not be empty")]
    EmptyWebRoot,

    #[error("backend.host must not be empty")]
    EmptyBackendHost,

    #[error("backend.port must not be zero")]
    ZeroBackendPort,

    #[error("files.chunk_size must be greater than zero")]
    ZeroChunkSize,

    #[error("files.index_file must be a bare file name, got {0:?}")]
    InvalidIndexFile(String),

    #[error("lookup.path_prefix must start with '/', got {0:?}")]
    InvalidLookupPrefix(String),

    #[error("lookup.key_param must not be empty")]
    EmptyKeyParam,

    #[error("limits.max_line_bytes must be at least 64, got {0}")]
    LineLimitTooSmall(usize),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.backlog < MIN_BACKLOG {
        errors.push(ValidationError::BacklogTooSmall(config.listener.backlog));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::NoConnections);
    }
    if config.web_root.is_empty() {
        errors.push(ValidationError::EmptyWebRoot);
    }
    if config.backend.host.trim().is_empty() {
        errors.push(ValidationError::EmptyBackendHost);
    }
    if config.backend.port == 0 {
        errors.push(ValidationError::ZeroBackendPort);
    }
    if config.files.chunk_size == 0 {
        errors.push(ValidationError::ZeroChunkSize);
    }

    let index = &config.files.index_file;
    if index.is_empty() || index.contains('/') || index == "." || index == ".." {
        errors.push(ValidationError::InvalidIndexFile(index.clone()));
    }

    if !config.lookup.path_prefix.starts_with('/') {
        errors.push(ValidationError::InvalidLookupPrefix(
            config.lookup.path_prefix.clone(),
        ));
    }
    if config.lookup.key_param.is_empty() {
        errors.push(ValidationError::EmptyKeyParam);
    }
    if config.limits.max_line_bytes < MIN_LINE_BYTES {
        errors.push(ValidationError::LineLimitTooSmall(config.limits.max_line_bytes));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&ServerConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = ServerConfig::default();
        config.listener.backlog = 1;
        config.files.chunk_size = 0;
        config.files.index_file = "../index.html".to_string();
        config.lookup.path_prefix = "mdb-lookup".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::BacklogTooSmall(1),
                ValidationError::ZeroChunkSize,
                ValidationError::InvalidIndexFile("../index.html".to_string()),
                ValidationError::InvalidLookupPrefix("mdb-lookup".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_missing_backend() {
        let mut config = ServerConfig::default();
        config.backend.host = "  ".to_string();
        config.backend.port = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyBackendHost));
        assert!(errors.contains(&ValidationError::ZeroBackendPort));
    }
}
