//! Process-level configuration handed to every new context.
//!
//! A [`Config`] names the collaborators a context works with: the allocator
//! that is charged for message text, the debug sink used for mismatch
//! reports, the formatter used by [`print_message`], and the maximum block
//! nesting depth. Contexts clone the configuration when they are created, so
//! a `Config` should be fully built before the first context uses it.
//!
//! ```
//! use hexer::{Config, Context, allocator::Budget, debug::NoopSink};
//!
//! let config = Config::builder()
//!     .allocator(Budget::new(64 * 1024))
//!     .debug_sink(NoopSink)
//!     .max_depth(16)
//!     .build();
//! let context = Context::new(&config);
//! assert_eq!(context.config().max_depth(), 16);
//! ```
//!
//! [`print_message`]: crate::print_message

use core::fmt;

use hexer_internals::BlockStack;
use triomphe::Arc;
use unsize::CoerceUnsize;

use crate::{
    allocator::{Allocator, Unbounded},
    debug::{self, DebugSink, SharedDebugSink},
    formatter::{MessageFormatter, PlainFormatter},
};

/// Shared configuration for contexts.
///
/// Cloning is cheap; clones share their collaborators.
#[derive(Clone)]
pub struct Config {
    allocator: Arc<dyn Allocator>,
    debug_sink: Option<SharedDebugSink>,
    formatter: Arc<dyn MessageFormatter>,
    max_depth: usize,
}

impl Config {
    /// Starts building a configuration from the defaults.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// The allocator charged for message text.
    pub fn allocator(&self) -> &dyn Allocator {
        &*self.allocator
    }

    /// The configured debug sink, if one was set.
    ///
    /// `None` means debug output goes through the process-wide sink.
    pub fn debug_sink(&self) -> Option<&SharedDebugSink> {
        self.debug_sink.as_ref()
    }

    /// The formatter used when printing messages.
    pub fn formatter(&self) -> &dyn MessageFormatter {
        &*self.formatter
    }

    /// Maximum number of simultaneously open blocks per context.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Writes one line of debug output through this configuration's sink.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        debug::write_via(self.debug_sink.as_ref(), args);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allocator: Arc::new(Unbounded).unsize(unsize::Coercion!(to dyn Allocator)),
            debug_sink: None,
            formatter: Arc::new(PlainFormatter::default())
                .unsize(unsize::Coercion!(to dyn MessageFormatter)),
            max_depth: BlockStack::<()>::DEFAULT_MAX_DEPTH,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("allocator_available", &self.allocator.available())
            .field("debug_sink", &self.debug_sink.is_some())
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

/// Builder returned by [`Config::builder`].
#[derive(Debug)]
#[must_use]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Sets the allocator charged for message text.
    pub fn allocator(mut self, allocator: impl Allocator) -> Self {
        self.config.allocator = Arc::new(allocator).unsize(unsize::Coercion!(to dyn Allocator));
        self
    }

    /// Sets the sink used for this configuration's debug output.
    pub fn debug_sink(mut self, sink: impl DebugSink) -> Self {
        self.config.debug_sink = Some(debug::share(sink));
        self
    }

    /// Sets the formatter used when printing messages.
    pub fn formatter(mut self, formatter: impl MessageFormatter) -> Self {
        self.config.formatter =
            Arc::new(formatter).unsize(unsize::Coercion!(to dyn MessageFormatter));
        self
    }

    /// Sets the maximum block nesting depth.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Finishes the configuration.
    pub fn build(self) -> Config {
        self.config
    }
}
