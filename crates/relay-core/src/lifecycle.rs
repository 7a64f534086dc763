//! Thread lifecycle wrapper.
//!
//! Every registered thread runs the same bring-up and tear-down sequence:
//! install the thread-local context, initialize the timestamp path, mark
//! Running, wait for the logger thread (unless this *is* the logger),
//! then hand control to the worker's hooks and map their results onto the
//! registry's state machine.

use crate::clock::Clock;
use crate::error::CoreError;
use crate::logger::{Logger, LOGGER_LABEL};
use crate::message::Message;
use crate::record::Level;
use crate::registry::{Registry, ThreadState};
use crate::shutdown::ShutdownLatch;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Poll interval for the startup wait on the logger thread.
const LOGGER_POLL: Duration = Duration::from_millis(10);

/// Everything a worker needs from the substrate, threaded into its hooks
/// and mirrored into a thread-local so the `log_*` macros work anywhere
/// on the thread.
#[derive(Clone)]
pub struct WorkerContext {
    label: Arc<str>,
    registry: Arc<Registry>,
    logger: Arc<Logger>,
    shutdown: Arc<ShutdownLatch>,
    clock: Arc<Clock>,
    logger_wait: Duration,
}

impl WorkerContext {
    /// Assembled by the launcher for each start-table entry; public for
    /// embedders that drive the lifecycle without a start table.
    pub fn new(
        label: &str,
        registry: Arc<Registry>,
        logger: Arc<Logger>,
        shutdown: Arc<ShutdownLatch>,
        clock: Arc<Clock>,
        logger_wait: Duration,
    ) -> Self {
        Self {
            label: Arc::from(label),
            registry,
            logger,
            shutdown,
            clock,
            logger_wait,
        }
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
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
    pub fn shutdown(&self) -> &Arc<ShutdownLatch> {
        &self.shutdown
    }

    #[inline]
    pub fn clock(&self) -> &Arc<Clock> {
        &self.clock
    }

    /// Workers must poll this at least every 100 ms while running.
    #[inline]
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.is_signalled()
    }

    /// Blocks until every registered thread other than this one is
    /// terminal.
    pub fn wait_others(&self, timeout: Option<Duration>) -> Result<(), CoreError> {
        self.registry.wait_others(&self.label, timeout)
    }

    /// Sends to another thread's mailbox by label.
    pub fn push_message(
        &self,
        target: &str,
        msg: &Message,
        timeout: Duration,
    ) -> Result<(), CoreError> {
        self.registry.push_message(target, msg, timeout)
    }

    /// Receives from this thread's own mailbox.
    pub fn pop_message(&self, timeout: Duration) -> Result<Message, CoreError> {
        self.registry.pop_message(&self.label, timeout)
    }

    /// Emits a record attributed to this thread.
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) -> bool {
        self.logger.log(level, &self.label, args)
    }
}

impl fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerContext")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

thread_local! {
    static CURRENT: RefCell<Option<WorkerContext>> = const { RefCell::new(None) };
}

pub(crate) fn install_context(ctx: WorkerContext) {
    CURRENT.with(|current| *current.borrow_mut() = Some(ctx));
}

/// Runs `f` with the calling thread's installed context, if any. The
/// logging macros route through here.
pub fn with_current<R>(f: impl FnOnce(&WorkerContext) -> R) -> Option<R> {
    CURRENT.with(|current| current.borrow().as_ref().map(f))
}

/// Label of the calling thread, failing when it was never started through
/// the lifecycle wrapper (or the launcher, for the main thread).
pub fn current_label() -> Result<String, CoreError> {
    with_current(|ctx| ctx.label().to_owned()).ok_or(CoreError::RegistryUninitialized)
}

/// Hook bundle for one registered thread.
///
/// `pre_create` runs on the launching thread before the kernel thread
/// exists; everything else runs on the thread itself. Defaults are no-ops
/// except `init`, which touches the timestamp path.
pub trait Worker: Send + 'static {
    /// Launcher-side hook before the thread is created.
    fn pre_create(&mut self, ctx: &WorkerContext) -> Result<(), CoreError> {
        let _ = ctx;
        Ok(())
    }

    /// First hook on the new thread, before the Running transition.
    fn post_create(&mut self, ctx: &WorkerContext) -> Result<(), CoreError> {
        let _ = ctx;
        Ok(())
    }

    /// Per-thread initialization; a failure marks the entry Failed and
    /// skips `body`.
    fn init(&mut self, ctx: &WorkerContext) -> Result<(), CoreError> {
        let _ = ctx.clock().now();
        Ok(())
    }

    /// The worker's main loop. Must poll `ctx.shutdown_requested()` at
    /// least every 100 ms.
    fn body(&mut self, ctx: &WorkerContext) -> Result<(), CoreError>;

    /// Tear-down hook; runs whether `body` succeeded or failed.
    fn exit(&mut self) {}
}

/// Spawns a registered entry's thread running the lifecycle sequence.
/// The entry must already exist in the context's registry.
pub fn spawn(
    ctx: WorkerContext,
    worker: Box<dyn Worker>,
) -> Result<JoinHandle<()>, CoreError> {
    let name = ctx.label().to_owned();
    let handle = thread::Builder::new()
        .name(name)
        .spawn(move || run(&ctx, worker))?;
    Ok(handle)
}

/// The lifecycle sequence proper. Final states: Terminated on success,
/// Failed on a hook failure or logger-wait expiry.
fn run(ctx: &WorkerContext, mut worker: Box<dyn Worker>) {
    install_context(ctx.clone());
    let _ = ctx.clock().now();

    if let Err(err) = worker.post_create(ctx) {
        fail(ctx, "post_create hook failed", &err);
        return;
    }

    if let Err(err) = ctx.registry().update_state(ctx.label(), ThreadState::Running) {
        fail(ctx, "could not enter Running state", &err);
        return;
    }

    // Workers hold their first records until the logger consumes; a
    // logger that never comes up would wedge them, so the wait is bounded.
    if ctx.label() != LOGGER_LABEL && !wait_for_logger(ctx) {
        fail(ctx, "logger did not reach Running", &CoreError::LoggerTimeout);
        return;
    }

    if let Err(err) = worker.init(ctx) {
        fail(ctx, "init hook failed", &err);
        return;
    }

    let body_result = worker.body(ctx);
    worker.exit();

    match body_result {
        Ok(()) => {
            let _ = ctx
                .registry()
                .update_state(ctx.label(), ThreadState::Terminated);
        }
        Err(err) => fail(ctx, "body failed", &err),
    }
}

fn wait_for_logger(ctx: &WorkerContext) -> bool {
    let deadline = Instant::now() + ctx.logger_wait;
    loop {
        if ctx.registry().get_state(LOGGER_LABEL) == ThreadState::Running {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(LOGGER_POLL);
    }
}

fn fail(ctx: &WorkerContext, what: &str, err: &CoreError) {
    ctx.log(Level::Error, format_args!("{what}: {err}"));
    let _ = ctx.registry().update_state(ctx.label(), ThreadState::Failed);
}
