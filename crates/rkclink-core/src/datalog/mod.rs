//! Status logging
//!
//! Timestamped controller readings and the sink the background sampler
//! forwards them to.

mod csv;

pub use csv::CsvStatusLog;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::manager::StatusSnapshot;

/// One sampled status, timestamped at the moment the readings came back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Sample time
    pub timestamp: DateTime<Local>,
    /// Process value (M1)
    pub current_temperature: Option<f64>,
    /// Setpoint value (S1)
    pub target_temperature: Option<f64>,
    /// Output value (O1)
    pub output_value: Option<f64>,
}

impl StatusRecord {
    /// Build a record from a manager snapshot.
    pub fn new(timestamp: DateTime<Local>, snapshot: StatusSnapshot) -> Self {
        Self {
            timestamp,
            current_temperature: snapshot.current_temperature,
            target_temperature: snapshot.target_temperature,
            output_value: snapshot.output_value,
        }
    }
}

/// Destination for sampled status records.
pub trait StatusSink: Send + Sync {
    /// Append one record.
    fn append(&self, record: &StatusRecord) -> std::io::Result<()>;
}
