//! Byte transport seam
//!
//! The protocol engine talks to the controller through the [`Transport`]
//! trait, so exchanges can run over a real serial port or a mock in tests.
//!
//! Timeout semantics follow the half-duplex link discipline: a read that
//! produces nothing before the deadline is a normal outcome the retry policy
//! counts, not an error.

use serialport::SerialPort;
use std::io::Read;
use std::time::{Duration, Instant};

use tracing::trace;

use super::{ProtocolError, MAX_FRAME_SIZE};

/// Poll interval for non-blocking serial reads
const READ_POLL_MS: u64 = 2;

/// A half-duplex byte stream carrying one exchange at a time.
pub trait Transport: Send {
    /// Write the whole buffer and wait until it has left the wire.
    fn write_all(&mut self, buf: &[u8]) -> Result<(), ProtocolError>;

    /// Read until `delim` is seen or the transport deadline passes.
    ///
    /// Returns whatever was gathered, including the delimiter when present.
    /// An empty result means the deadline passed with nothing received.
    fn read_until(&mut self, delim: u8) -> Result<Vec<u8>, ProtocolError>;

    /// Read a single byte, or `None` if the deadline passes first.
    fn read_byte(&mut self) -> Result<Option<u8>, ProtocolError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_all(&mut self, buf: &[u8]) -> Result<(), ProtocolError> {
        (**self).write_all(buf)
    }

    fn read_until(&mut self, delim: u8) -> Result<Vec<u8>, ProtocolError> {
        (**self).read_until(delim)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, ProtocolError> {
        (**self).read_byte()
    }
}

/// [`Transport`] over a blocking serial port.
///
/// Reads poll `bytes_to_read()` instead of blocking in `read()`, which keeps
/// the overall deadline accurate on Linux serial drivers.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    baud_rate: u32,
    timeout: Duration,
}

impl SerialTransport {
    /// Wrap an open serial port.
    pub fn new(port: Box<dyn SerialPort>, baud_rate: u32, timeout: Duration) -> Self {
        Self {
            port,
            baud_rate,
            timeout,
        }
    }

    /// Discard anything sitting in the driver buffers.
    pub fn clear_buffers(&mut self) -> Result<(), ProtocolError> {
        self.port
            .clear(serialport::ClearBuffer::All)
            .map_err(|e| ProtocolError::Serial(e.to_string()))
    }

    /// Read bytes into `out` until `stop` says the message is complete or the
    /// deadline passes.
    fn read_while(
        &mut self,
        out: &mut Vec<u8>,
        stop: impl Fn(&[u8]) -> bool,
    ) -> Result<(), ProtocolError> {
        let start = Instant::now();
        let mut byte = [0u8; 1];

        while !stop(out) {
            if start.elapsed() > self.timeout {
                trace!(received = out.len(), "read deadline passed");
                return Ok(());
            }

            let available = self
                .port
                .bytes_to_read()
                .map_err(|e| ProtocolError::Serial(e.to_string()))?;

            if available == 0 {
                std::thread::sleep(Duration::from_millis(READ_POLL_MS));
                continue;
            }

            match self.port.read(&mut byte) {
                Ok(0) => return Ok(()),
                Ok(_) => out.push(byte[0]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::TimedOut
                        || e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(ProtocolError::Io(e)),
            }
        }
        Ok(())
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, buf: &[u8]) -> Result<(), ProtocolError> {
        // write_all lands the bytes in the kernel tty buffer; flush()
        // (tcdrain) can block indefinitely on some drivers, so wait out the
        // transmission time at the configured baud rate instead.
        self.port.write_all(buf)?;

        let baud = self.baud_rate.max(1) as u64;
        // 10 bits per byte: 1 start + 8 data + 1 stop
        let transmit_ms = (buf.len() as u64 * 10 * 1000) / baud;
        let wait_ms = (transmit_ms + 5).max(10);

        trace!(bytes = buf.len(), wait_ms, "wrote to serial port");
        std::thread::sleep(Duration::from_millis(wait_ms));
        Ok(())
    }

    fn read_until(&mut self, delim: u8) -> Result<Vec<u8>, ProtocolError> {
        let mut response = Vec::new();
        self.read_while(&mut response, |buf| {
            buf.last() == Some(&delim) || buf.len() >= MAX_FRAME_SIZE
        })?;
        Ok(response)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, ProtocolError> {
        let mut response = Vec::new();
        self.read_while(&mut response, |buf| !buf.is_empty())?;
        Ok(response.first().copied())
    }
}
