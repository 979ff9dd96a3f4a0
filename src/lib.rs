#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
#![forbid(unsafe_code)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Structured, hierarchical diagnostic messages for code that cannot rely on
//! exceptions.
//!
//! ## Overview
//!
//! hexer lets code open nested *blocks*, build one diagnostic message in
//! each, and have the messages surface to the caller in a well-defined
//! order no matter how the blocks are left: by running to the end, by
//! `break`, `continue`, a jump out of a labelled block, or a `return`.
//!
//! The order is always the order in which blocks *closed*, never the order
//! in which they were opened:
//!
//! ```
//! use hexer::{Config, Context, Severity};
//!
//! let context = Context::new(&Config::default());
//! let frame = context.enter_frame();
//!
//! let outer = frame.begin(Severity::Info);
//! outer.set_id("outer").unwrap();
//! {
//!     let inner = frame.begin(Severity::Info);
//!     inner.set_id("inner").unwrap();
//!     inner.end().unwrap();
//! }
//! outer.end().unwrap();
//!
//! assert_eq!(context.next_message().unwrap().id(), Some("inner"));
//! assert_eq!(context.next_message().unwrap().id(), Some("outer"));
//! assert!(context.next_message().is_none());
//! ```
//!
//! ## Core Concepts
//!
//! - A [`Context`] owns one block stack and one message queue. It belongs to
//!   exactly one thread; with the `std` feature, [`current_context`] hands
//!   out one per thread.
//! - A [`Frame`] identifies one activation of one function. Every block is
//!   owned by the frame that opened it, which is how the engine tells a
//!   callee's forgotten block apart from ordinary nesting.
//! - A [`Block`] is an open block. It is left through an explicit exit that
//!   records the [`Disposition`]. A block that is merely dropped, like a
//!   block skipped by a raw `return`, is a usage error: it is reported on
//!   the [debug sink](debug) and produces no message.
//! - A [`Message`] is the immutable result of a closed block. Committed
//!   messages are queued for [`Context::next_message`] and passed to the
//!   context's [`FeedbackHandler`] at the same time.
//!
//! ## Usage Errors
//!
//! The engine never panics on misuse. Mistakes are reported as messages
//! flagged [`MessageFlags::INTERNAL`] (or on the debug sink when the message
//! path itself is busy) and as a [`HexerError`] return value.
//!
//! ## Collaborators
//!
//! A [`Config`] supplies the [`Allocator`](allocator::Allocator) charged for
//! message text, the [`DebugSink`](debug::DebugSink), the
//! [`MessageFormatter`] and the nesting limit. The `hexer-tracing` crate
//! forwards messages into `tracing`.
//!
//! For the packed severity/flag word and the block stack itself, see the
//! [`hexer-internals`] crate.
//!
//! [`hexer-internals`]: hexer_internals

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

#[macro_use]
mod macros;

pub mod allocator;
pub mod debug;
pub mod extensions;
pub mod prelude;
pub mod stream;

mod block;
mod config;
mod context;
mod error;
mod feedback;
mod formatter;
mod frame;
mod message;
mod queue;

pub use hexer_internals::{
    BlockSerial, Disposition, FrameId, MessageFlags, Severity, SourceLocation, TypeAndFlags,
};

#[cfg(feature = "std")]
pub use self::context::current_context;
pub use self::{
    block::Block,
    config::{Config, ConfigBuilder},
    context::Context,
    error::{HexerError, StreamError},
    feedback::FeedbackHandler,
    formatter::{MessageFormatter, PlainFormatter, print_message, print_messages},
    frame::Frame,
    message::{Message, TAG_DATA_LOSS, TAG_TRUNCATED, Tags},
};

#[doc(hidden)]
pub mod __private {
    #[doc(hidden)]
    pub use core::{file, format_args, line};

    #[doc(hidden)]
    #[inline]
    pub fn type_name_of<T>(_: T) -> &'static str {
        core::any::type_name::<T>()
    }

    /// Reduces the type name of a marker fn to the name of the function it
    /// was declared in.
    #[doc(hidden)]
    pub fn function_name_of(marker: &'static str) -> &'static str {
        let mut path = marker.strip_suffix("::__hexer_marker").unwrap_or(marker);
        while let Some(outer) = path.strip_suffix("::{{closure}}") {
            path = outer;
        }
        path.rsplit("::").next().unwrap_or(path)
    }

}
