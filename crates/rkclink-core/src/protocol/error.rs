//! Protocol errors

use thiserror::Error;

/// Errors that can occur during controller communication
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serial port error: {0}")]
    Serial(String),

    #[error("No response within the read timeout")]
    Timeout,

    #[error("Not connected to controller")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("BCC mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("Malformed frame")]
    MalformedFrame,

    #[error("Unexpected acknowledgment byte: {0:#04x}")]
    UnexpectedAck(u8),

    #[error("Retry budget exhausted without a valid response")]
    RetryExhausted,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
