//! RKC Serial Protocol Communication
//!
//! Implements the RKC FB series half-duplex serial protocol: checksummed
//! STX/ETX frames, the poll (read) and select (write) link procedures, and
//! the NAK retry handshake.

pub mod frame;
mod error;
mod exchange;
pub mod serial;
pub mod transport;

pub use error::ProtocolError;
pub use exchange::{with_controller, ProtocolClient};
pub use serial::{open, SerialSettings};
pub use transport::{SerialTransport, Transport};

/// End of transmission: initiates or terminates the data link
pub const EOT: u8 = 0x04;
/// Enquiry: requests data from the controller
pub const ENQ: u8 = 0x05;
/// Start of text: opens the checksummed frame span
pub const STX: u8 = 0x02;
/// End of text: closes the checksummed frame span (included in the BCC)
pub const ETX: u8 = 0x03;
/// Positive acknowledgment
pub const ACK: u8 = 0x06;
/// Negative acknowledgment: requests retransmission
pub const NAK: u8 = 0x15;

/// Default baud rate for FB series controllers
pub const DEFAULT_BAUD_RATE: u32 = 19200;

/// Default read timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Default number of retries beyond the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Upper bound on a single response frame, in bytes.
/// Real frames are `STX + identifier + value + ETX + BCC`, well under this.
pub const MAX_FRAME_SIZE: usize = 64;

/// Process value (current reading)
pub const ID_PROCESS_VALUE: &str = "M1";
/// Setpoint value (target)
pub const ID_SETPOINT: &str = "S1";
/// Output value
pub const ID_OUTPUT: &str = "O1";
