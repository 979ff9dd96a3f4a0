#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Forwards hexer diagnostics into the `tracing` ecosystem.
//!
//! # How It Works
//!
//! - [`TracingFeedbackHandler`] emits one `tracing` event for every message
//!   a context commits, as it is committed. The event level follows the
//!   message severity.
//! - [`TracingDebugSink`] sends hexer's low-level debug output (mismatched
//!   blocks, usage errors raised during delivery) to `tracing` at `WARN`.
//! - [`log_messages`] drains a context's queue into `tracing` after the fact.
//!
//! # Quick Start
//!
//! ```
//! use hexer::{Config, Context, Severity};
//! use hexer_tracing::{TracingDebugSink, TracingFeedbackHandler};
//!
//! let config = Config::builder().debug_sink(TracingDebugSink).build();
//! let context = Context::new(&config);
//! TracingFeedbackHandler::new().install(&context);
//!
//! let frame = context.enter_frame();
//! let block = frame.begin(Severity::Warning);
//! block.set_summary("cache miss").unwrap();
//! block.end().unwrap(); // emits a WARN event with target "hexer"
//! ```
//!
//! # Environment Variables
//!
//! - `HEXER_TRACING` - Comma-separated options:
//!   - `skip-internal` - Do not forward messages raised by hexer itself

use std::{fmt, sync::OnceLock};

use hexer::{Context, FeedbackHandler, Message, Severity, debug::DebugSink};
use tracing::Level;

/// Target used for forwarded messages.
pub const MESSAGE_TARGET: &str = "hexer";

/// Target used for forwarded debug output.
pub const DEBUG_TARGET: &str = "hexer::debug";

#[derive(Debug)]
struct HexerTracingEnvOptions {
    skip_internal: bool,
}

impl HexerTracingEnvOptions {
    fn get() -> &'static Self {
        static HEXER_TRACING_FLAGS: OnceLock<HexerTracingEnvOptions> = OnceLock::new();

        HEXER_TRACING_FLAGS.get_or_init(|| {
            let mut skip_internal = false;

            if let Some(var) = std::env::var_os("HEXER_TRACING") {
                for v in var.to_string_lossy().split(',') {
                    if v.trim().eq_ignore_ascii_case("skip-internal") {
                        skip_internal = true;
                    }
                }
            }

            HexerTracingEnvOptions { skip_internal }
        })
    }
}

/// Maps a message severity to the level its event is emitted at.
///
/// [`emit`] applies the same mapping. It spells the match out itself
/// because `tracing` needs the level of each event callsite as a constant.
pub fn level_for(severity: Severity) -> Level {
    match severity {
        Severity::Info => Level::INFO,
        Severity::Warning => Level::WARN,
        Severity::Error => Level::ERROR,
    }
}

/// Emits `message` as a `tracing` event at the level [`level_for`] gives its
/// severity.
pub fn emit(message: &Message) {
    macro_rules! emit_at {
        ($level:expr) => {
            tracing::event!(
                target: MESSAGE_TARGET,
                $level,
                id = message.id().unwrap_or_default(),
                internal = message.is_internal(),
                disposition = %message.disposition(),
                location = %message.source_location(),
                details = message.details().unwrap_or_default(),
                tags = %Tags(message),
                "{message}"
            )
        };
    }

    // Keep in step with `level_for`.
    match message.severity() {
        Severity::Info => emit_at!(Level::INFO),
        Severity::Warning => emit_at!(Level::WARN),
        Severity::Error => emit_at!(Level::ERROR),
    }
}

struct Tags<'a>(&'a Message);

impl fmt::Display for Tags<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, tag) in self.0.tags().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            f.write_str(tag)?;
        }
        Ok(())
    }
}

/// Feedback handler that emits every committed message as an event.
#[derive(Copy, Clone, Debug)]
pub struct TracingFeedbackHandler {
    /// Whether messages flagged `INTERNAL` are forwarded.
    pub forward_internal: bool,
}

impl TracingFeedbackHandler {
    /// Creates a handler configured from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `HEXER_TRACING` - Comma-separated options:
    ///   - `skip-internal` - Do not forward messages raised by hexer itself
    pub fn new() -> Self {
        Self {
            forward_internal: !HexerTracingEnvOptions::get().skip_internal,
        }
    }

    /// Wraps this handler for [`Context::set_feedback_handler`].
    pub fn into_handler(self) -> FeedbackHandler {
        FeedbackHandler::new(move |_context, message| {
            if self.forward_internal || !message.is_internal() {
                emit(message);
            }
        })
    }

    /// Installs this handler on `context`, replacing the current one.
    pub fn install(self, context: &Context) {
        context.set_feedback_handler(Some(self.into_handler()));
    }
}

impl Default for TracingFeedbackHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Debug sink that emits each line as a `WARN` event.
#[derive(Copy, Clone, Debug, Default)]
pub struct TracingDebugSink;

impl DebugSink for TracingDebugSink {
    fn write_debug(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(target: DEBUG_TARGET, "{args}");
    }
}

/// Drains every queued message of `context` into `tracing`, oldest first.
///
/// Returns the number of messages drained. Messages are drained even when
/// no subscriber is interested in them.
pub fn log_messages(context: &Context) -> usize {
    let mut drained = 0;
    while let Some(message) = context.next_message() {
        emit(&message);
        drained += 1;
    }
    drained
}
