//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Command-line override produced an invalid configuration
    #[error("Invalid override for {field}: {message}")]
    InvalidOverride { field: String, message: String },

    /// Drive source could not be created or registered
    #[error("Failed to set up drive source: {message}")]
    SourceSetup { message: String },

    /// Pipeline execution error
    #[error("Pipeline execution failed: {message}")]
    PipelineExecution { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_override(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOverride {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn source_setup(message: impl Into<String>) -> Self {
        Self::SourceSetup {
            message: message.into(),
        }
    }

    pub fn pipeline_execution(message: impl Into<String>) -> Self {
        Self::PipelineExecution {
            message: message.into(),
        }
    }
}
