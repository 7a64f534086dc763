//! relay-core - Concurrency Substrate for the Multi-Threaded Relay
//!
//! Everything above the raw ring lives here: the thread registry with
//! per-thread mailboxes, the deferred logging pipeline with its single
//! worker, the cooperative shutdown latch, and the declarative launcher
//! that wires them together.
//!
//! # Architecture
//!
//! ```text
//! any thread               log ring              logger worker
//! ──────────               ────────              ─────────────
//! log_info!() ─────────▶ [r0][r1][r2] ────────▶ sinks (file/console)
//! never blocks             lock-free             sole consumer
//!
//! worker A ── Message ──▶ mailbox of B ────────▶ worker B
//!             (via registry, addressed by label)
//! ```
//!
//! Threads are registered in a single insertion-ordered table; the
//! lifecycle wrapper runs each worker's hooks in a fixed sequence and
//! maps their outcomes onto a monotonic state machine. Shutdown is a
//! one-shot latch every loop polls; the logger worker drains last.
//!
//! # Example
//!
//! ```no_run
//! use relay_core::{log_info, Config, Core, CoreError, StartTable, Worker, WorkerContext};
//! use std::time::Duration;
//!
//! struct Heartbeat;
//!
//! impl Worker for Heartbeat {
//!     fn body(&mut self, ctx: &WorkerContext) -> Result<(), CoreError> {
//!         while !ctx.shutdown_requested() {
//!             log_info!("still here");
//!             std::thread::sleep(Duration::from_millis(100));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), CoreError> {
//!     let core = Core::launch(
//!         StartTable::new().thread("HEARTBEAT", Heartbeat),
//!         Config::new(),
//!     )?;
//!     std::thread::sleep(Duration::from_millis(350));
//!     core.join()
//! }
//! ```

pub mod clock;
pub mod config;
mod error;
mod event;
pub mod lifecycle;
mod launcher;
pub mod logger;
mod macros;
mod mailbox;
mod message;
mod record;
pub mod registry;
mod shutdown;

pub use clock::{Clock, Granularity, Timestamp, WallTime};
pub use config::{Config, LogDestination, DEFAULT_LOG_FILE_SIZE};
pub use error::CoreError;
pub use lifecycle::{current_label, Worker, WorkerContext};
pub use launcher::{Core, StartEntry, StartTable};
pub use logger::{ConsoleSink, FileSink, Formatter, LogSink, Logger, LOGGER_LABEL, LOG_RING_CAPACITY};
pub use mailbox::{Mailbox, DEFAULT_MAILBOX_CAPACITY};
pub use message::{Message, MessageType, MESSAGE_CONTENT_CAP};
pub use record::{Level, LogRecord, LABEL_CAP, TEXT_CAP};
pub use registry::{EntryInfo, Registry, ThreadState, MAIN_LABEL, MAX_THREADS};
pub use shutdown::ShutdownLatch;
