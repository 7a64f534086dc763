//! Declarative thread launcher.
//!
//! The launcher constructs the process-wide values (clock, shutdown
//! latch, logger, registry) exactly once, then walks a start table in
//! order, registering and spawning each entry. Suppression from
//! configuration skips non-essential entries; the logger entry is always
//! present and always essential.

use crate::clock::Clock;
use crate::config::Config;
use crate::error::CoreError;
use crate::lifecycle::{self, Worker, WorkerContext};
use crate::logger::worker::LoggerWorker;
use crate::logger::{Logger, LOGGER_LABEL};
use crate::mailbox::DEFAULT_MAILBOX_CAPACITY;
use crate::record::Level;
use crate::registry::{Registry, ThreadState, MAIN_LABEL};
use crate::shutdown::ShutdownLatch;
use std::sync::Arc;
use std::time::Duration;

/// One row of the start table.
pub struct StartEntry {
    pub label: String,
    pub essential: bool,
    pub mailbox_capacity: usize,
    pub worker: Box<dyn Worker>,
}

/// Ordered list of threads to bring up; table order is start order.
#[derive(Default)]
pub struct StartTable {
    entries: Vec<StartEntry>,
}

impl StartTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a non-essential thread (subject to suppression).
    pub fn thread(self, label: &str, worker: impl Worker) -> Self {
        self.entry(label, false, DEFAULT_MAILBOX_CAPACITY, worker)
    }

    /// Adds an essential thread (never suppressed).
    pub fn essential_thread(self, label: &str, worker: impl Worker) -> Self {
        self.entry(label, true, DEFAULT_MAILBOX_CAPACITY, worker)
    }

    /// Fully-specified row.
    pub fn entry(
        mut self,
        label: &str,
        essential: bool,
        mailbox_capacity: usize,
        worker: impl Worker,
    ) -> Self {
        self.entries.push(StartEntry {
            label: label.to_owned(),
            essential,
            mailbox_capacity,
            worker: Box::new(worker),
        });
        self
    }
}

/// Handle to the running substrate, returned by [`Core::launch`].
pub struct Core {
    registry: Arc<Registry>,
    logger: Arc<Logger>,
    shutdown: Arc<ShutdownLatch>,
    clock: Arc<Clock>,
    config: Arc<Config>,
}

impl Core {
    /// Brings the substrate up: process-wide values, main-thread context,
    /// then every table entry in order.
    ///
    /// The only fatal error paths are logger construction and main-thread
    /// bookkeeping; a worker whose `pre_create` hook fails is marked
    /// Failed and skipped rather than aborting the launch.
    pub fn launch(table: StartTable, config: Config) -> Result<Self, CoreError> {
        let config = Arc::new(config);
        let clock = Arc::new(Clock::new());
        let shutdown = Arc::new(ShutdownLatch::new());
        let logger = Arc::new(Logger::from_config(Arc::clone(&clock), &config)?);
        let registry = Arc::new(Registry::new(Arc::clone(&shutdown)));

        let core = Self {
            registry,
            logger,
            shutdown,
            clock,
            config,
        };

        // The main thread gets a context too, so its logging macros and
        // registry shorthands work like any worker's.
        lifecycle::install_context(core.context(MAIN_LABEL));

        let mut entries = table.entries;
        if !entries.iter().any(|e| e.label == LOGGER_LABEL) {
            entries.insert(
                0,
                StartEntry {
                    label: LOGGER_LABEL.to_owned(),
                    essential: true,
                    mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
                    worker: Box::new(LoggerWorker::new(Arc::clone(&core.logger))),
                },
            );
        }

        for mut entry in entries {
            let essential = entry.essential || entry.label == LOGGER_LABEL;
            if !essential && core.config.is_suppressed(&entry.label) {
                core.logger.log(
                    Level::Notice,
                    MAIN_LABEL,
                    format_args!("thread `{}` suppressed by configuration", entry.label),
                );
                continue;
            }

            core.registry
                .register(&entry.label, entry.mailbox_capacity, true)?;
            let ctx = core.context(&entry.label);

            if let Err(err) = entry.worker.pre_create(&ctx) {
                core.logger.log(
                    Level::Error,
                    MAIN_LABEL,
                    format_args!("pre_create failed for `{}`: {err}", entry.label),
                );
                let _ = core
                    .registry
                    .update_state(&entry.label, ThreadState::Failed);
                continue;
            }

            let handle = lifecycle::spawn(ctx, entry.worker)?;
            core.registry.set_handle(&entry.label, handle)?;
        }

        Ok(core)
    }

    fn context(&self, label: &str) -> WorkerContext {
        WorkerContext::new(
            label,
            Arc::clone(&self.registry),
            Arc::clone(&self.logger),
            Arc::clone(&self.shutdown),
            Arc::clone(&self.clock),
            self.config.logger_wait(),
        )
    }

    #[inline]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[inline]
    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    #[inline]
    pub fn shutdown_latch(&self) -> &Arc<ShutdownLatch> {
        &self.shutdown
    }

    #[inline]
    pub fn clock(&self) -> &Arc<Clock> {
        &self.clock
    }

    #[inline]
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Latches the shutdown signal; workers observe it on their next
    /// poll.
    pub fn signal_shutdown(&self) {
        self.shutdown.signal();
    }

    /// Blocks until every worker except main and the logger is terminal.
    /// The logger stays up on purpose: it outlives the others to drain
    /// their final records.
    pub fn wait_for_workers(&self, timeout: Option<Duration>) -> Result<(), CoreError> {
        let deadline = timeout.map(|t| std::time::Instant::now() + t);
        loop {
            let pending = self
                .registry
                .labels()
                .into_iter()
                .filter(|l| l != MAIN_LABEL && l != LOGGER_LABEL)
                .any(|l| !self.registry.get_state(&l).is_terminal());
            if !pending {
                return Ok(());
            }
            if let Some(deadline) = deadline {
                if std::time::Instant::now() >= deadline {
                    return Err(CoreError::QueueTimeout);
                }
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    /// Full cooperative teardown: signal shutdown, retire the main
    /// thread's entry so the logger's fan-out wait can complete, then
    /// join and clear the registry.
    pub fn join(self) -> Result<(), CoreError> {
        self.shutdown.signal();
        self.registry
            .update_state(MAIN_LABEL, ThreadState::Terminated)?;
        self.registry.cleanup();
        Ok(())
    }
}

impl std::fmt::Debug for Core {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core")
            .field("registry", &self.registry)
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}
