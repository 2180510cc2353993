//! Error types for addon authors

use thiserror::Error;

/// Errors that addons can return from hooks, constructors and command handlers
#[derive(Error, Debug)]
pub enum AddonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Command execution failed
    #[error("Command failed: {0}")]
    Command(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A command name or alias is already present in the host's command table
    #[error("Command name already registered: {0}")]
    NameCollision(String),

    /// A command name is empty or contains whitespace
    #[error("Invalid command name: '{0}'")]
    InvalidCommandName(String),

    /// A host service the addon needs is not available right now
    #[error("Host service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),
}

impl AddonError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a command error
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command(message.into())
    }
}
