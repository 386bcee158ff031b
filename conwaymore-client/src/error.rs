//! Error types shared across the crate.

use thiserror::Error;

/// A frame that violates the wire layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort { expected: usize, actual: usize },

    #[error("snapshot holds {count} cells but the buffer fits {capacity}")]
    CapacityExceeded { count: usize, capacity: usize },

    #[error("unknown client opcode: {0}")]
    UnknownOpcode(u8),

    #[error("unknown command code: {0}")]
    UnknownCommand(u8),

    #[error("{count} cells do not fit in one frame (max {max})")]
    TooManyCells { count: usize, max: usize },

    #[error("coordinate payload is {bytes} bytes, expected {expected} for {count} cells")]
    CoordinateLengthMismatch {
        count: usize,
        bytes: usize,
        expected: usize,
    },
}

/// Failure of the network connection.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("connection closed")]
    Closed,
}

/// Errors raised by the render worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// `Init` was received by a worker that is already running. Fatal.
    #[error("worker already initialised")]
    AlreadyInitialised,

    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("protocol: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("pattern '{0}' does not exist")]
    UnknownPattern(String),

    /// The worker task has ended and no longer accepts messages.
    #[error("worker stopped")]
    Stopped,
}

/// Invalid client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidVar { name: &'static str, value: String },

    #[error("failed to parse globals: {0}")]
    Globals(#[from] serde_json::Error),
}
