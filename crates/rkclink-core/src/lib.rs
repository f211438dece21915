//! # rkclink Core Library
//!
//! Serial communication with RKC FB series temperature controllers.
//!
//! This library provides:
//! - The RKC half-duplex serial protocol (STX/ETX framing, BCC checksums,
//!   poll/select exchanges with bounded retries)
//! - A connection manager that owns the single serial link, serializes
//!   concurrent callers, and caches the last-known readings
//! - A background sampler that periodically refreshes the status and appends
//!   it to a CSV status log
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rkclink_core::prelude::*;
//!
//! let manager = Arc::new(ControllerManager::new(ManagerConfig {
//!     serial: SerialSettings {
//!         port_name: "/dev/ttyUSB0".into(),
//!         ..Default::default()
//!     },
//!     address: "01".into(),
//!     ..Default::default()
//! }));
//! manager.connect()?;
//!
//! let sink = Arc::new(CsvStatusLog::open("logs/status.csv")?);
//! let token = tokio_util::sync::CancellationToken::new();
//! let sampler = Sampler::new(manager.clone(), sink, DEFAULT_POLL_INTERVAL);
//! let handle = sampler.spawn(token.clone());
//!
//! // ... serve requests against `manager` ...
//!
//! token.cancel();
//! handle.await?;
//! manager.disconnect();
//! ```

#![warn(missing_docs)]

pub mod datalog;
pub mod manager;
pub mod protocol;
pub mod sampler;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::datalog::{CsvStatusLog, StatusRecord, StatusSink};
    pub use crate::manager::{ConnectionState, ControllerManager, ManagerConfig, StatusSnapshot};
    pub use crate::protocol::{ProtocolClient, ProtocolError, SerialSettings, Transport};
    pub use crate::sampler::{Sampler, DEFAULT_POLL_INTERVAL};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
