//! Low-level debug output.
//!
//! Debug output is the channel of last resort. It is used when the normal
//! message path cannot be trusted: a block close that matches nothing, a
//! block left open by a raw `return`, or a usage error raised while a
//! feedback handler is already being run. It is also the only output
//! available before any [`Context`] exists.
//!
//! # Sink Resolution
//!
//! 1. The sink configured on the context's [`Config`], if any.
//! 2. The process-wide sink set with [`install_debug_sink`], if any.
//! 3. Standard error when the `std` feature is enabled, otherwise nothing.
//!
//! # Testing
//!
//! [`CapturingDebugSink`] records every line, which lets tests assert that a
//! mismatch was reported:
//!
//! ```
//! use hexer::{Config, Context, debug::CapturingDebugSink};
//!
//! let sink = CapturingDebugSink::new();
//! let config = Config::builder().debug_sink(sink.clone()).build();
//! let context = Context::new(&config);
//! let frame = context.enter_frame();
//! let _ = context.end_block(frame.id(), hexer::Disposition::NormalEnd, hexer::here!());
//! assert_eq!(sink.count(), 1);
//! ```
//!
//! [`Context`]: crate::Context
//! [`Config`]: crate::Config

mod sink_lock;

use alloc::{string::String, vec::Vec};
use core::fmt;

use triomphe::Arc;
use unsize::CoerceUnsize;

use self::sink_lock::SinkLock;

/// Destination for low-level debug output.
pub trait DebugSink: 'static + Send + Sync {
    /// Writes one line of debug output. The line carries no trailing newline.
    fn write_debug(&self, args: fmt::Arguments<'_>);
}

/// Shared, type-erased debug sink.
pub type SharedDebugSink = Arc<dyn DebugSink>;

pub(crate) fn share(sink: impl DebugSink) -> SharedDebugSink {
    Arc::new(sink).unsize(unsize::Coercion!(to dyn DebugSink))
}

static GLOBAL_SINK: SinkLock<SharedDebugSink> = SinkLock::new();

/// Installs the process-wide debug sink, replacing any earlier one.
///
/// Contexts whose [`Config`](crate::Config) names a sink keep using that
/// sink.
pub fn install_debug_sink(sink: impl DebugSink) {
    GLOBAL_SINK.replace(Some(share(sink)));
}

/// Removes the process-wide debug sink, falling back to the default.
pub fn uninstall_debug_sink() {
    GLOBAL_SINK.replace(None);
}

/// Writes a debug line through the process-wide sink.
///
/// This is the only output path that does not need a context. Prefer the
/// [`debug_print!`](crate::debug_print) macro.
pub fn debug_print(args: fmt::Arguments<'_>) {
    match GLOBAL_SINK.get() {
        Some(sink) => sink.write_debug(args),
        None => default_sink_write(args),
    }
}

/// Writes through `sink` when present, through [`debug_print`] otherwise.
pub(crate) fn write_via(sink: Option<&SharedDebugSink>, args: fmt::Arguments<'_>) {
    match sink {
        Some(sink) => sink.write_debug(args),
        None => debug_print(args),
    }
}

#[cfg(feature = "std")]
fn default_sink_write(args: fmt::Arguments<'_>) {
    StderrSink.write_debug(args);
}

#[cfg(not(feature = "std"))]
fn default_sink_write(_args: fmt::Arguments<'_>) {}

/// Sink that writes each line to standard error.
#[cfg(feature = "std")]
#[derive(Copy, Clone, Debug, Default)]
pub struct StderrSink;

#[cfg(feature = "std")]
impl DebugSink for StderrSink {
    fn write_debug(&self, args: fmt::Arguments<'_>) {
        use std::io::Write;

        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_fmt(format_args!("hexer: {args}\n"));
    }
}

/// Sink that discards everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopSink;

impl DebugSink for NoopSink {
    fn write_debug(&self, _args: fmt::Arguments<'_>) {}
}

/// Sink that keeps every line in memory.
///
/// Clones share the same buffer.
#[derive(Clone, Default)]
pub struct CapturingDebugSink {
    lines: Arc<spin::Mutex<Vec<String>>>,
}

impl CapturingDebugSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lines written so far.
    pub fn count(&self) -> usize {
        self.lines.lock().len()
    }

    /// Copies out every line written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Removes and returns every line written so far.
    pub fn take(&self) -> Vec<String> {
        core::mem::take(&mut *self.lines.lock())
    }
}

impl fmt::Debug for CapturingDebugSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturingDebugSink")
            .field("count", &self.count())
            .finish()
    }
}

impl DebugSink for CapturingDebugSink {
    fn write_debug(&self, args: fmt::Arguments<'_>) {
        self.lines.lock().push(alloc::fmt::format(args));
    }
}
