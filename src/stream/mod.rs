//! Output streams used by formatters.
//!
//! A [`Stream`] is what a [`MessageFormatter`] writes to. The usual stream is
//! a [`StreamHandle`] wrapping a [`StreamBackend`] such as [`FmtStream`] or
//! (with `std`) [`IoStream`].
//!
//! # Expired Streams
//!
//! Finalizing a handle swaps its backend for a *canary*. Writing to a
//! canary performs no I/O: it commits an internal Error message describing
//! where the stream was created, where it was finalized and what was about to
//! be written, then fails with [`StreamError::Expired`]. A use-after-finalize
//! bug therefore shows up in the same diagnostic channel as everything else.
//!
//! ```
//! use hexer::{Config, Context, StreamError, stream::{FmtStream, Stream, StreamHandle}};
//!
//! let context = Context::new(&Config::default());
//! let mut out = String::new();
//! let mut stream = StreamHandle::new(FmtStream::new(&mut out));
//! stream.write_line(&context, "hello").unwrap();
//! stream.finalize().unwrap();
//!
//! assert_eq!(stream.write_line(&context, "too late"), Err(StreamError::Expired));
//! let report = context.next_message().unwrap();
//! assert_eq!(report.id(), Some("canary_stream_write_line"));
//! drop(stream);
//! assert_eq!(out, "hello\n");
//! ```
//!
//! [`MessageFormatter`]: crate::MessageFormatter

mod canary;
mod fmt_stream;
#[cfg(feature = "std")]
mod io_stream;

use alloc::{boxed::Box, string::String};
use core::fmt::Arguments;

use hexer_internals::SourceLocation;

pub use self::fmt_stream::FmtStream;
#[cfg(feature = "std")]
pub use self::io_stream::IoStream;
use crate::{context::Context, error::StreamError};

/// Destination a formatter writes to.
///
/// Every method returns the number of bytes written.
pub trait Stream {
    /// Writes `text` followed by a newline.
    fn write_line(&mut self, context: &Context, text: &str) -> Result<usize, StreamError>;

    /// Writes `text` as is.
    fn write_text(&mut self, context: &Context, text: &str) -> Result<usize, StreamError>;

    /// Writes formatted text.
    fn write_fmt(&mut self, context: &Context, args: Arguments<'_>)
    -> Result<usize, StreamError>;
}

/// A raw writer that a [`StreamHandle`] forwards to.
pub trait StreamBackend {
    /// Writes `text`, returning the number of bytes written.
    fn write_str(&mut self, text: &str) -> Result<usize, StreamError>;

    /// Writes formatted text.
    fn write_args(&mut self, args: Arguments<'_>) -> Result<usize, StreamError> {
        match args.as_str() {
            Some(text) => self.write_str(text),
            None => self.write_str(&alloc::fmt::format(args)),
        }
    }

    /// Flushes buffered output.
    fn flush(&mut self) -> Result<(), StreamError> {
        Ok(())
    }
}

/// A stream that remembers where it was created and finalized.
pub struct StreamHandle<'a> {
    /// `None` once the stream has expired.
    backend: Option<Box<dyn StreamBackend + 'a>>,
    init_at: SourceLocation,
    final_at: SourceLocation,
}

impl<'a> StreamHandle<'a> {
    /// Wraps `backend`, recording the caller as the creation site.
    #[track_caller]
    pub fn new(backend: impl StreamBackend + 'a) -> Self {
        Self {
            backend: Some(Box::new(backend)),
            init_at: SourceLocation::caller(),
            final_at: SourceLocation::UNKNOWN,
        }
    }

    /// A stream that was never connected to a backend.
    ///
    /// Every write is reported exactly as a write to a finalized stream.
    #[track_caller]
    pub fn expired() -> Self {
        Self {
            backend: None,
            init_at: SourceLocation::caller(),
            final_at: SourceLocation::UNKNOWN,
        }
    }

    /// Flushes and detaches the backend. Later writes are reported as errors.
    #[track_caller]
    pub fn finalize(&mut self) -> Result<(), StreamError> {
        self.final_at = SourceLocation::caller();
        match self.backend.take() {
            Some(mut backend) => backend.flush(),
            None => Ok(()),
        }
    }

    /// Returns `true` once the stream no longer accepts writes.
    pub fn is_expired(&self) -> bool {
        self.backend.is_none()
    }

    /// Where the stream was created.
    pub fn init_location(&self) -> SourceLocation {
        self.init_at
    }

    /// Where the stream was finalized, if it was.
    pub fn final_location(&self) -> SourceLocation {
        self.final_at
    }

    fn canary(&self) -> canary::Canary {
        canary::Canary {
            init_at: self.init_at,
            final_at: self.final_at,
        }
    }
}

impl core::fmt::Debug for StreamHandle<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("expired", &self.is_expired())
            .field("init_at", &self.init_at)
            .field("final_at", &self.final_at)
            .finish()
    }
}

impl Stream for StreamHandle<'_> {
    fn write_line(&mut self, context: &Context, text: &str) -> Result<usize, StreamError> {
        match &mut self.backend {
            Some(backend) => Ok(backend.write_str(text)? + backend.write_str("\n")?),
            None => Err(self.canary().write_line(context, text)),
        }
    }

    fn write_text(&mut self, context: &Context, text: &str) -> Result<usize, StreamError> {
        match &mut self.backend {
            Some(backend) => backend.write_str(text),
            None => Err(self.canary().write_text(context, text)),
        }
    }

    fn write_fmt(
        &mut self,
        context: &Context,
        args: Arguments<'_>,
    ) -> Result<usize, StreamError> {
        match &mut self.backend {
            Some(backend) => backend.write_args(args),
            None => Err(self.canary().write_fmt(context, args)),
        }
    }
}

/// In-memory backend, mostly useful in tests.
#[derive(Clone, Debug, Default)]
pub struct StringStream {
    buffer: String,
}

impl StringStream {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Consumes the stream, returning its buffer.
    pub fn into_string(self) -> String {
        self.buffer
    }
}

impl StreamBackend for StringStream {
    fn write_str(&mut self, text: &str) -> Result<usize, StreamError> {
        self.buffer.push_str(text);
        Ok(text.len())
    }
}

impl<B: StreamBackend + ?Sized> StreamBackend for &mut B {
    fn write_str(&mut self, text: &str) -> Result<usize, StreamError> {
        (**self).write_str(text)
    }

    fn write_args(&mut self, args: Arguments<'_>) -> Result<usize, StreamError> {
        (**self).write_args(args)
    }

    fn flush(&mut self) -> Result<(), StreamError> {
        (**self).flush()
    }
}

#[cfg(test)]
mod tests {
    use hexer_internals::Severity;

    use super::*;
    use crate::config::Config;

    #[test]
    fn test_live_writes() {
        let context = Context::new(&Config::default());
        let mut buffer = StringStream::new();
        let mut stream = StreamHandle::new(&mut buffer);
        assert_eq!(stream.write_line(&context, "ab").unwrap(), 3);
        assert_eq!(stream.write_text(&context, "cd").unwrap(), 2);
        assert_eq!(stream.write_fmt(&context, format_args!("{}", 42)).unwrap(), 2);
        stream.finalize().unwrap();
        drop(stream);
        assert_eq!(buffer.as_str(), "ab\ncd42");
        assert_eq!(context.message_count(), 0);
    }

    #[test]
    fn test_expired_write_is_reported() {
        let context = Context::new(&Config::default());
        let mut buffer = StringStream::new();
        let mut stream = StreamHandle::new(&mut buffer);
        stream.finalize().unwrap();
        assert!(stream.is_expired());

        assert_eq!(
            stream.write_text(&context, "first\nsecond"),
            Err(StreamError::Expired)
        );
        assert_eq!(
            stream.write_fmt(&context, format_args!("n={}", 1)),
            Err(StreamError::Expired)
        );

        let text = context.next_message().unwrap();
        assert_eq!(text.id(), Some("canary_stream_write_text"));
        assert_eq!(text.severity(), Severity::Error);
        assert!(text.is_internal());
        assert!(text.details().unwrap().ends_with(": \nfirst\nsecond\n"));

        let formatted = context.next_message().unwrap();
        assert_eq!(formatted.id(), Some("canary_stream_write_fmtstr"));
        assert!(formatted.details().unwrap().contains("\"n=1\""));
        drop(stream);
        assert_eq!(buffer.as_str(), "");
    }

    #[test]
    fn test_never_connected_stream() {
        let context = Context::new(&Config::default());
        let mut stream = StreamHandle::expired();
        assert_eq!(stream.write_line(&context, "x"), Err(StreamError::Expired));
        assert_eq!(context.error_count(), 1);
    }
}
