//! Background sampler
//!
//! Periodically refreshes the controller status through the manager and
//! forwards each snapshot to a [`StatusSink`]. When the link is down, a tick
//! attempts reconnection instead of sampling.

use chrono::Local;
use std::sync::Arc;
use std::time::Duration;

use tokio::task;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::datalog::{StatusRecord, StatusSink};
use crate::manager::ControllerManager;

/// Default sampling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Periodic status sampling loop.
///
/// Ticks on a fixed cadence: the next tick is scheduled at
/// `previous_tick + interval` rather than `now + interval`, so exchange
/// latency does not accumulate into drift. A tick that overruns starts the
/// next one immediately instead of bursting to catch up.
pub struct Sampler {
    manager: Arc<ControllerManager>,
    sink: Arc<dyn StatusSink>,
    interval: Duration,
}

impl Sampler {
    /// Create a sampler over `manager`, forwarding snapshots to `sink`.
    pub fn new(
        manager: Arc<ControllerManager>,
        sink: Arc<dyn StatusSink>,
        interval: Duration,
    ) -> Self {
        Self {
            manager,
            sink,
            interval,
        }
    }

    /// Spawn the loop on the current tokio runtime.
    pub fn spawn(self, token: CancellationToken) -> task::JoinHandle<()> {
        tokio::spawn(self.run(token))
    }

    /// Run the sampling loop until `token` is cancelled.
    ///
    /// Cancellation is honored at the sleep between ticks; an in-flight
    /// exchange always completes first, since aborting mid-exchange would
    /// leave the half-duplex line in an undefined state. Failures inside a
    /// tick are logged and the loop continues.
    pub async fn run(self, token: CancellationToken) {
        info!(interval = ?self.interval, "sampler started");
        let mut next = Instant::now();

        loop {
            next += self.interval;

            if self.manager.is_connected() {
                self.sample_tick().await;
            } else {
                self.reconnect_tick().await;
            }

            tokio::select! {
                _ = token.cancelled() => {
                    info!("sampler cancelled");
                    break;
                }
                _ = time::sleep_until(next) => {}
            }
        }

        info!("sampler stopped");
    }

    async fn sample_tick(&self) {
        let manager = Arc::clone(&self.manager);
        // The exchange blocks on serial reads; keep it off the async runtime
        match task::spawn_blocking(move || manager.get_status()).await {
            Ok(Ok(snapshot)) => {
                let record = StatusRecord::new(Local::now(), snapshot);
                if let Err(e) = self.sink.append(&record) {
                    error!(error = %e, "failed to append status record");
                }
            }
            Ok(Err(e)) => warn!(error = %e, "status read failed"),
            Err(e) => error!(error = %e, "status task failed"),
        }
    }

    async fn reconnect_tick(&self) {
        warn!("controller not connected, attempting reconnect");
        let manager = Arc::clone(&self.manager);
        match task::spawn_blocking(move || manager.connect()).await {
            Ok(Ok(())) => info!("reconnected to controller"),
            Ok(Err(e)) => warn!(error = %e, "reconnect attempt failed"),
            Err(e) => error!(error = %e, "reconnect task failed"),
        }
    }
}
