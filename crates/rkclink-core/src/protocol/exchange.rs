//! Poll/select link procedures
//!
//! Implements the two half-duplex exchange state machines over a
//! [`Transport`], including the NAK handshake and the bounded retry budget.

use tracing::{debug, warn};

use super::{
    frame, serial, ProtocolError, SerialSettings, SerialTransport, Transport, ACK,
    DEFAULT_MAX_RETRIES, EOT, ETX, NAK,
};

/// Open the serial link, run `f` against a protocol client, and release the
/// port when done.
///
/// Scoped acquisition for short-lived call sites (one-off reads, scripts)
/// that do not want a long-lived [`ControllerManager`](crate::manager::ControllerManager).
pub fn with_controller<R>(
    settings: &SerialSettings,
    address: &str,
    f: impl FnOnce(&mut ProtocolClient<SerialTransport>) -> Result<R, ProtocolError>,
) -> Result<R, ProtocolError> {
    let transport = serial::open(settings)?;
    let mut client = ProtocolClient::new(transport, address);
    f(&mut client)
}

/// One controller's side of the data link: a transport, the controller
/// address prefixed to every outbound query or message, and the retry budget
/// shared by both procedures.
///
/// Exchanges are strictly sequential; `&mut self` on [`poll`](Self::poll) and
/// [`select`](Self::select) keeps a second exchange from starting before the
/// previous one has fully completed.
pub struct ProtocolClient<T: Transport> {
    transport: T,
    address: String,
    max_retries: u32,
}

impl<T: Transport> ProtocolClient<T> {
    /// Create a client for the controller at `address`.
    pub fn new(transport: T, address: impl Into<String>) -> Self {
        Self {
            transport,
            address: address.into(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Override the retry budget (retries beyond the first attempt).
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// The controller address on the shared line.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Poll (read) procedure: request the value stored under `identifier`.
    ///
    /// Sends EOT and the query once, then reads responses until one passes
    /// BCC validation. An invalid frame is answered with NAK and only the
    /// response read is retried; the query itself has no acknowledgment step
    /// and is never resent. Returns the parsed `(identifier, value)` pair.
    pub fn poll(&mut self, identifier: &str) -> Result<(String, String), ProtocolError> {
        self.poll_memory_area("", identifier)
    }

    /// Poll with an explicit memory area prefix (empty for memory area 1).
    pub fn poll_memory_area(
        &mut self,
        memory_area: &str,
        identifier: &str,
    ) -> Result<(String, String), ProtocolError> {
        self.transport.write_all(&[EOT])?;
        let query = frame::build_poll_query(&self.address, memory_area, identifier);
        self.transport.write_all(&query)?;
        debug!(identifier, query = ?query, "sent poll query");

        let mut attempts = 0;
        loop {
            // BCC is the single byte following ETX
            let mut response = self.transport.read_until(ETX)?;
            if let Some(bcc) = self.transport.read_byte()? {
                response.push(bcc);
            }

            if response.is_empty() {
                debug!(identifier, "no response within the read timeout");
            } else {
                match frame::check_frame(&response) {
                    Ok(()) => {
                        let parsed = frame::parse_frame(&response)?;
                        debug!(identifier = %parsed.0, value = %parsed.1, "poll complete");
                        return Ok(parsed);
                    }
                    Err(err) => {
                        debug!(identifier, %err, response = ?response, "invalid response, sending NAK");
                        self.transport.write_all(&[NAK])?;
                    }
                }
            }

            attempts += 1;
            if attempts > self.max_retries {
                warn!(identifier, attempts, "poll retry budget exhausted");
                return Err(ProtocolError::RetryExhausted);
            }
        }
    }

    /// Poll a numeric value.
    pub fn poll_number(&mut self, identifier: &str) -> Result<f64, ProtocolError> {
        let (_, value) = self.poll(identifier)?;
        frame::parse_value(&value)
    }

    /// Select (write) procedure: store `value` under `identifier`.
    ///
    /// A NAK from the controller requests retransmission of the whole
    /// message, so the full sequence restarts from EOT; the retransmit loop
    /// is bounded by the retry budget. Any acknowledgment other than ACK or
    /// NAK is not retryable; a missing acknowledgment is a timeout.
    pub fn select(&mut self, identifier: &str, value: &str) -> Result<(), ProtocolError> {
        let message = frame::build_select_message(&self.address, identifier, value);

        for attempt in 0..=self.max_retries {
            self.transport.write_all(&[EOT])?;
            self.transport.write_all(&message)?;
            debug!(identifier, value, attempt, message = ?message, "sent select message");

            match self.transport.read_byte()? {
                Some(ACK) => {
                    // Terminate the data link
                    self.transport.write_all(&[EOT])?;
                    debug!(identifier, value, "select acknowledged");
                    return Ok(());
                }
                Some(NAK) => {
                    debug!(identifier, attempt, "received NAK, retransmitting");
                }
                Some(other) => {
                    warn!(identifier, ack = other, "unexpected acknowledgment");
                    return Err(ProtocolError::UnexpectedAck(other));
                }
                None => {
                    warn!(identifier, "no acknowledgment within the read timeout");
                    return Err(ProtocolError::Timeout);
                }
            }
        }

        warn!(identifier, "select retry budget exhausted");
        Err(ProtocolError::RetryExhausted)
    }
}
