//! Shared test doubles for the controller link.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use rkclink_core::datalog::{StatusRecord, StatusSink};
use rkclink_core::protocol::{frame, ProtocolError, Transport, ETX, STX};

#[derive(Default)]
struct WireState {
    rx: VecDeque<u8>,
    writes: Vec<Vec<u8>>,
}

/// Handle onto a scripted wire: queue controller responses and inspect what
/// the library wrote, while the transport endpoint is owned by the manager.
#[derive(Clone, Default)]
pub struct WireHandle {
    state: Arc<Mutex<WireState>>,
}

impl WireHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The transport endpoint to hand to the library.
    pub fn transport(&self) -> MockWire {
        MockWire {
            state: Arc::clone(&self.state),
        }
    }

    /// Queue raw bytes as the controller's next transmission.
    pub fn queue_bytes(&self, bytes: &[u8]) {
        self.state.lock().unwrap().rx.extend(bytes.iter().copied());
    }

    /// Queue a valid checksummed response frame for `identifier`/`value`.
    pub fn queue_frame(&self, identifier: &str, value: &str) {
        let mut span = Vec::new();
        span.extend_from_slice(identifier.as_bytes());
        span.extend_from_slice(value.as_bytes());
        span.push(ETX);
        let bcc = frame::compute_bcc(&span);

        let mut bytes = vec![STX];
        bytes.extend_from_slice(&span);
        bytes.push(bcc);
        self.queue_bytes(&bytes);
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes.len()
    }
}

/// Transport endpoint of a [`WireHandle`]. An empty receive queue behaves
/// like a read timeout.
pub struct MockWire {
    state: Arc<Mutex<WireState>>,
}

impl Transport for MockWire {
    fn write_all(&mut self, buf: &[u8]) -> Result<(), ProtocolError> {
        self.state.lock().unwrap().writes.push(buf.to_vec());
        Ok(())
    }

    fn read_until(&mut self, delim: u8) -> Result<Vec<u8>, ProtocolError> {
        let mut state = self.state.lock().unwrap();
        let mut out = Vec::new();
        while let Some(b) = state.rx.pop_front() {
            out.push(b);
            if b == delim {
                break;
            }
        }
        Ok(out)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, ProtocolError> {
        Ok(self.state.lock().unwrap().rx.pop_front())
    }
}

/// Sink that collects records in memory.
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<StatusRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<StatusRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

impl StatusSink for MemorySink {
    fn append(&self, record: &StatusRecord) -> std::io::Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
