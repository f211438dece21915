//! Frame encoding/decoding
//!
//! Implements the RKC poll/select wire format with the BCC checksum trailer.
//!
//! Response frame layout:
//! - STX
//! - 2 bytes: identifier (e.g. "M1")
//! - N bytes: ASCII value
//! - ETX
//! - 1 byte: BCC (XOR of identifier through ETX inclusive)

use super::{ProtocolError, ENQ, ETX, STX};

/// Widest value a controller field can carry: 7 characters with exactly one
/// fractional digit, e.g. `-0150.0` or `00100.0`.
pub const VALUE_WIDTH: usize = 7;

/// Compute the Block Check Character: the XOR fold over every input byte.
pub fn compute_bcc(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Build a poll query: `address ++ memory_area ++ identifier ++ ENQ`.
///
/// The query carries no checksum; ENQ is fire-and-forget.
pub fn build_poll_query(address: &str, memory_area: &str, identifier: &str) -> Vec<u8> {
    let mut query = Vec::with_capacity(address.len() + memory_area.len() + identifier.len() + 1);
    query.extend_from_slice(address.as_bytes());
    query.extend_from_slice(memory_area.as_bytes());
    query.extend_from_slice(identifier.as_bytes());
    query.push(ENQ);
    query
}

/// Build a select message: `address ++ STX ++ identifier ++ value ++ ETX ++ BCC`.
///
/// The BCC protects `identifier ++ value ++ ETX`; the address prefix is
/// outside the checksummed span.
pub fn build_select_message(address: &str, identifier: &str, value: &str) -> Vec<u8> {
    let mut span = Vec::with_capacity(identifier.len() + value.len() + 1);
    span.extend_from_slice(identifier.as_bytes());
    span.extend_from_slice(value.as_bytes());
    span.push(ETX);
    let bcc = compute_bcc(&span);

    let mut message = Vec::with_capacity(address.len() + span.len() + 2);
    message.extend_from_slice(address.as_bytes());
    message.push(STX);
    message.extend_from_slice(&span);
    message.push(bcc);
    message
}

/// Check a response frame against its BCC trailer.
///
/// Locates STX and ETX, recomputes the BCC over the span between STX
/// (exclusive) and ETX (inclusive), and compares it to the byte immediately
/// following ETX. A frame missing either delimiter or the trailer cannot be
/// validated and is [`MalformedFrame`](ProtocolError::MalformedFrame).
pub fn check_frame(response: &[u8]) -> Result<(), ProtocolError> {
    let (stx, etx) = delimiters(response).ok_or(ProtocolError::MalformedFrame)?;
    let received = *response.get(etx + 1).ok_or(ProtocolError::MalformedFrame)?;
    let expected = compute_bcc(&response[stx + 1..=etx]);
    if expected != received {
        return Err(ProtocolError::ChecksumMismatch {
            expected,
            actual: received,
        });
    }
    Ok(())
}

/// Whether a response frame passes BCC validation. See [`check_frame`].
pub fn validate_frame(response: &[u8]) -> bool {
    check_frame(response).is_ok()
}

/// Parse a response frame into `(identifier, value)`.
///
/// The identifier is the first 2 characters after STX; the value is the
/// remainder up to (not including) ETX. Checksum validation is separate, see
/// [`check_frame`].
pub fn parse_frame(response: &[u8]) -> Result<(String, String), ProtocolError> {
    let (stx, etx) = delimiters(response).ok_or(ProtocolError::MalformedFrame)?;
    let body = &response[stx + 1..etx];
    if body.len() < 2 {
        return Err(ProtocolError::MalformedFrame);
    }
    // Split on the raw bytes: the identifier is exactly 2 bytes, and a
    // corrupted body must come back as an error, never a panic
    let (identifier, value) = body.split_at(2);
    let identifier =
        std::str::from_utf8(identifier).map_err(|_| ProtocolError::MalformedFrame)?;
    let value = std::str::from_utf8(value).map_err(|_| ProtocolError::MalformedFrame)?;
    Ok((identifier.to_string(), value.to_string()))
}

/// Format a value as the controller's fixed 7-character field with one
/// fractional digit, e.g. `-0150.0` / `00100.0`.
pub fn format_value(value: f64) -> Result<String, ProtocolError> {
    if !value.is_finite() {
        return Err(ProtocolError::InvalidInput(format!(
            "value must be a finite number, got {value}"
        )));
    }
    let formatted = format!("{value:07.1}");
    if formatted.len() != VALUE_WIDTH {
        return Err(ProtocolError::InvalidInput(format!(
            "value {value} does not fit the {VALUE_WIDTH}-character field"
        )));
    }
    Ok(formatted)
}

/// Parse a wire-formatted value field back to a number.
pub fn parse_value(field: &str) -> Result<f64, ProtocolError> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|_| ProtocolError::InvalidInput(format!("unparseable value field {field:?}")))
}

fn delimiters(response: &[u8]) -> Option<(usize, usize)> {
    let stx = response.iter().position(|b| *b == STX)?;
    let etx = response.iter().position(|b| *b == ETX)?;
    if etx <= stx {
        return None;
    }
    Some((stx, etx))
}
