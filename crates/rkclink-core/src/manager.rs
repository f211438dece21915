//! Connection management
//!
//! Owns the single serial link to the controller, serializes every exchange
//! behind one lock, and caches the last successfully observed readings for
//! concurrent consumers.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, RwLock};

use tracing::{debug, info, warn};

use crate::protocol::{
    self, frame, ProtocolClient, ProtocolError, SerialSettings, Transport, DEFAULT_MAX_RETRIES,
    ID_OUTPUT, ID_PROCESS_VALUE, ID_SETPOINT,
};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Connecting (liveness check in progress)
    Connecting,
    /// Connected and ready
    Connected,
}

/// Manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Serial line settings
    pub serial: SerialSettings,
    /// Controller address on the shared line (e.g. "01")
    pub address: String,
    /// Retries beyond the first attempt, for both poll and select
    pub max_retries: u32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            serial: SerialSettings::default(),
            address: "00".to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Last-known controller readings.
///
/// Fields stay `None` until the first successful read of the corresponding
/// identifier and are never cleared by a transient failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Process value (M1)
    pub current_temperature: Option<f64>,
    /// Setpoint value (S1)
    pub target_temperature: Option<f64>,
    /// Output value (O1)
    pub output_value: Option<f64>,
}

struct Inner {
    client: Option<ProtocolClient<Box<dyn Transport>>>,
}

/// Owner of the controller link.
///
/// All transport-touching operations go through one mutex, so the periodic
/// sampler and on-demand callers can share an `Arc<ControllerManager>`
/// without interleaving their exchanges on the wire. Snapshot reads
/// ([`cached_status`](Self::cached_status), [`is_connected`](Self::is_connected))
/// never wait behind an in-flight exchange.
pub struct ControllerManager {
    config: ManagerConfig,
    inner: Mutex<Inner>,
    state: RwLock<ConnectionState>,
    cache: RwLock<StatusSnapshot>,
}

impl ControllerManager {
    /// Create a manager (not yet connected).
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner { client: None }),
            state: RwLock::new(ConnectionState::Disconnected),
            cache: RwLock::new(StatusSnapshot::default()),
        }
    }

    /// Open the configured serial port and verify the link with a test poll
    /// of the process value.
    ///
    /// A successful poll is the proof of liveness: the manager transitions to
    /// Connected and caches the returned reading. Any failure releases the
    /// transport and leaves the manager Disconnected.
    pub fn connect(&self) -> Result<(), ProtocolError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.client.is_some() {
            debug!("already connected");
            return Ok(());
        }

        self.set_state(ConnectionState::Connecting);
        let transport = match protocol::open(&self.config.serial) {
            Ok(t) => t,
            Err(e) => {
                warn!(port = %self.config.serial.port_name, error = %e, "failed to open port");
                self.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        self.establish(&mut inner, Box::new(transport))
    }

    /// Connect over an already open transport.
    ///
    /// Same liveness check as [`connect`](Self::connect); used for non-serial
    /// links and by tests.
    pub fn connect_with<T: Transport + 'static>(
        &self,
        transport: T,
    ) -> Result<(), ProtocolError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.client.is_some() {
            return Err(ProtocolError::AlreadyConnected);
        }
        self.set_state(ConnectionState::Connecting);
        self.establish(&mut inner, Box::new(transport))
    }

    fn establish(
        &self,
        inner: &mut Inner,
        transport: Box<dyn Transport>,
    ) -> Result<(), ProtocolError> {
        let mut client = ProtocolClient::new(transport, self.config.address.clone())
            .with_max_retries(self.config.max_retries);

        match client.poll_number(ID_PROCESS_VALUE) {
            Ok(pv) => {
                info!(address = %self.config.address, pv, "connected to controller");
                inner.client = Some(client);
                self.set_state(ConnectionState::Connected);
                self.update_cache(|cache| cache.current_temperature = Some(pv));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "liveness poll failed, releasing transport");
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Release the transport. Best effort; always ends Disconnected.
    pub fn disconnect(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.client.take().is_some() {
            info!("disconnected from controller");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether the manager currently considers the link up.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Last-known readings without touching the transport.
    pub fn cached_status(&self) -> StatusSnapshot {
        *self.cache.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Read the process value, setpoint, and output value.
    ///
    /// Performs three sequential poll exchanges (M1, S1, O1), updating the
    /// cache after each success. A failure mid-sequence is logged and the
    /// cache as of that point is returned; only `NotConnected` is reported
    /// as an error, before the transport is touched.
    pub fn get_status(&self) -> Result<StatusSnapshot, ProtocolError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let client = inner.client.as_mut().ok_or(ProtocolError::NotConnected)?;

        let reads: [(&str, fn(&mut StatusSnapshot, f64)); 3] = [
            (ID_PROCESS_VALUE, |c, v| c.current_temperature = Some(v)),
            (ID_SETPOINT, |c, v| c.target_temperature = Some(v)),
            (ID_OUTPUT, |c, v| c.output_value = Some(v)),
        ];

        for (identifier, store) in reads {
            match client.poll_number(identifier) {
                Ok(value) => self.update_cache(|cache| store(cache, value)),
                Err(e) => {
                    warn!(identifier, error = %e, "status poll failed, returning cached values");
                    return Ok(self.cached_status());
                }
            }
        }

        let snapshot = self.cached_status();
        debug!(?snapshot, "status refreshed");
        Ok(snapshot)
    }

    /// Set the target temperature (setpoint S1).
    ///
    /// The value is validated and wire-formatted before any I/O; the cached
    /// target is only updated once the controller has acknowledged the
    /// select message.
    pub fn set_temperature(&self, value: f64) -> Result<(), ProtocolError> {
        let field = frame::format_value(value)?;

        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let client = inner.client.as_mut().ok_or(ProtocolError::NotConnected)?;

        client.select(ID_SETPOINT, &field)?;
        self.update_cache(|cache| cache.target_temperature = Some(value));
        info!(setpoint = %field, "setpoint updated");
        Ok(())
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn update_cache(&self, update: impl FnOnce(&mut StatusSnapshot)) {
        update(&mut self.cache.write().unwrap_or_else(|e| e.into_inner()));
    }
}

impl Drop for ControllerManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}
