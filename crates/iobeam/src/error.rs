//! Errors raised while dispatching and running commands.

use thiserror::Error;

use crate::poll::PollError;

/// Dispatch and command failures.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Tokens remained after a node was fully parsed.
    #[error("Unrecognized input: {0}")]
    UnrecognizedInput(String),

    /// A subcommand name that the node does not know.
    #[error("Invalid command '{0}'")]
    InvalidCommand(String),

    /// Option values could not be parsed.
    #[error("{0}")]
    Options(#[from] clap::Error),

    #[error(transparent)]
    Client(#[from] iobeam_client::Error),

    #[error(transparent)]
    Config(#[from] iobeam_config::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Poll(#[from] PollError),

    /// Input given to a command was rejected before any request was made.
    #[error("{0}")]
    Input(String),
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;
