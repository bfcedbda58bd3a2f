//! Error types for cistep
//!
//! All modules use `CistepResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cistep operations
pub type CistepResult<T> = Result<T, CistepError>;

/// All errors that can occur in cistep
#[derive(Error, Debug)]
pub enum CistepError {
    // Input errors
    #[error("Input required and not supplied: {0}")]
    InputMissing(String),

    #[error("Environment variable not set: {0}")]
    EnvMissing(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    // Cache errors
    #[error("Invalid cache key '{key}': {reason}")]
    CacheKeyInvalid { key: String, reason: String },

    #[error("Cache entry already exists for key: {0}")]
    CacheKeyExists(String),

    #[error("Cache backend error: {0}")]
    CacheBackend(String),

    // Provisioning errors
    #[error("No release asset of {repo} matches '{pattern}'")]
    AssetNotFound { repo: String, pattern: String },

    #[error("Install step failed for {tool}: {reason}")]
    InstallFailed { tool: String, reason: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    // Network errors
    #[error("HTTP request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    // Toolchain errors
    #[error("Required program not found: {name}. {hint}")]
    ProgramNotFound { name: String, hint: String },

    #[error("Could not determine compiler version: {0}")]
    CompilerVersion(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed to start: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command {command} exited with code {code}")]
    ProcessExit { command: String, code: i32 },

    #[error("Process terminated by signal: {0}")]
    ProcessSignaled(String),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(String),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CistepError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create an HTTP error
    pub fn http(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Http {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an install failure for a tool
    pub fn install(tool: impl Into<String>, reason: impl ToString) -> Self {
        Self::InstallFailed {
            tool: tool.into(),
            reason: reason.to_string(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InputMissing(_) => {
                Some("Pass the value as a flag or set the matching INPUT_<NAME> variable")
            }
            Self::EnvMissing(_) => Some("This step expects to run inside a GitHub Actions job"),
            Self::ProcessExit { .. } => Some("Run with -vv to see the full command line"),
            Self::Http { .. } => Some("Check the token inputs and network access of the runner"),
            _ => None,
        }
    }
}
