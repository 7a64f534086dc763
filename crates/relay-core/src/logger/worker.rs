//! The logger worker: single steady-state consumer of the log ring.

use super::Logger;
use crate::error::CoreError;
use crate::lifecycle::{Worker, WorkerContext};
use crate::record::Level;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Records emitted per acquisition of the logging mutex, so producers
/// doing synchronous emission are never starved for long.
const DRAIN_BATCH: usize = 256;

/// Pause between polls of an empty ring.
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Drains the log ring until shutdown, then waits for every other
/// registered thread before the final drain, so records emitted between
/// the shutdown signal and a peer's last breath still reach the sinks.
pub struct LoggerWorker {
    logger: Arc<Logger>,
}

impl LoggerWorker {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }
}

impl Worker for LoggerWorker {
    fn body(&mut self, ctx: &WorkerContext) -> Result<(), CoreError> {
        self.logger.set_worker_live(true);

        while !ctx.shutdown_requested() {
            if self.logger.drain(DRAIN_BATCH) == 0 {
                thread::sleep(IDLE_SLEEP);
            }
        }

        // Peers may still be producing their final records.
        ctx.wait_others(None)?;
        self.logger.drain(usize::MAX);

        // From here on emission is synchronous again; this worker is done
        // consuming.
        self.logger.set_worker_live(false);
        self.logger
            .log(Level::Info, ctx.label(), format_args!("logger shutting down"));
        Ok(())
    }
}
