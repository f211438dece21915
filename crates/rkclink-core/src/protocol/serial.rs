//! Serial port lifecycle
//!
//! Opens and configures the serial link to the controller.

use serialport::{DataBits, FlowControl, Parity, StopBits};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use tracing::debug;

use super::{ProtocolError, SerialTransport, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};

/// Serial line settings for a controller link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Port name (e.g. "/dev/ttyUSB0" or "COM3")
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits per character
    pub data_bits: u8,
    /// Parity ("none", "odd", "even")
    pub parity: String,
    /// Stop bits (1 or 2)
    pub stop_bits: u8,
    /// Read timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: 8,
            parity: "none".to_string(),
            stop_bits: 1,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl SerialSettings {
    fn data_bits(&self) -> Result<DataBits, ProtocolError> {
        match self.data_bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            n => Err(ProtocolError::InvalidInput(format!(
                "unsupported data bits: {n}"
            ))),
        }
    }

    fn parity(&self) -> Result<Parity, ProtocolError> {
        match self.parity.to_ascii_lowercase().as_str() {
            "none" => Ok(Parity::None),
            "odd" => Ok(Parity::Odd),
            "even" => Ok(Parity::Even),
            p => Err(ProtocolError::InvalidInput(format!(
                "unsupported parity: {p:?}"
            ))),
        }
    }

    fn stop_bits(&self) -> Result<StopBits, ProtocolError> {
        match self.stop_bits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            n => Err(ProtocolError::InvalidInput(format!(
                "unsupported stop bits: {n}"
            ))),
        }
    }
}

/// Open and configure the serial port described by `settings`.
///
/// The returned transport starts with cleared driver buffers so a stale
/// partial frame from a previous session cannot leak into the first exchange.
pub fn open(settings: &SerialSettings) -> Result<SerialTransport, ProtocolError> {
    debug!(
        port = %settings.port_name,
        baud = settings.baud_rate,
        "opening serial port"
    );

    let port = serialport::new(&settings.port_name, settings.baud_rate)
        .data_bits(settings.data_bits()?)
        .parity(settings.parity()?)
        .stop_bits(settings.stop_bits()?)
        .flow_control(FlowControl::None)
        // Short port-level timeout; the transport enforces the real deadline
        // with bytes_to_read() polling.
        .timeout(Duration::from_millis(100))
        .open()
        .map_err(|e| ProtocolError::Serial(e.to_string()))?;

    let mut transport = SerialTransport::new(
        port,
        settings.baud_rate,
        Duration::from_millis(settings.timeout_ms),
    );
    transport.clear_buffers()?;
    Ok(transport)
}
