//! Producer-side logging macros.
//!
//! Each macro resolves the calling thread's installed context and hands a
//! formatted record to the pipeline. On a thread that was never started
//! through the lifecycle wrapper the macros are silent no-ops; explicit
//! callers can always use [`Logger::log`](crate::Logger::log) directly.

/// Emits a record at an explicit level through the calling thread's
/// context.
#[macro_export]
macro_rules! log_at {
    ($level:expr, $($arg:tt)*) => {{
        let _ = $crate::lifecycle::with_current(|ctx| {
            ctx.log($level, format_args!($($arg)*))
        });
    }};
}

#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => { $crate::log_at!($crate::Level::Trace, $($arg)*) };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::log_at!($crate::Level::Debug, $($arg)*) };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::log_at!($crate::Level::Info, $($arg)*) };
}

#[macro_export]
macro_rules! log_notice {
    ($($arg:tt)*) => { $crate::log_at!($crate::Level::Notice, $($arg)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::log_at!($crate::Level::Warn, $($arg)*) };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::log_at!($crate::Level::Error, $($arg)*) };
}

#[macro_export]
macro_rules! log_critical {
    ($($arg:tt)*) => { $crate::log_at!($crate::Level::Critical, $($arg)*) };
}

#[macro_export]
macro_rules! log_fatal {
    ($($arg:tt)*) => { $crate::log_at!($crate::Level::Fatal, $($arg)*) };
}
