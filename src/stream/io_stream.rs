use std::io;

use super::StreamBackend;
use crate::error::StreamError;

/// Backend writing to any [`std::io::Write`] implementor.
///
/// ```
/// use hexer::{Config, Context, stream::{IoStream, Stream, StreamHandle}};
///
/// let context = Context::new(&Config::default());
/// let mut stream = StreamHandle::new(IoStream::new(std::io::stdout()));
/// stream.write_line(&context, "ready").unwrap();
/// stream.finalize().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct IoStream<W> {
    inner: W,
}

impl<W: io::Write> IoStream<W> {
    /// Wraps `inner`.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: io::Write> StreamBackend for IoStream<W> {
    fn write_str(&mut self, text: &str) -> Result<usize, StreamError> {
        self.inner
            .write_all(text.as_bytes())
            .map_err(|_| StreamError::Backend)?;
        Ok(text.len())
    }

    fn flush(&mut self) -> Result<(), StreamError> {
        self.inner.flush().map_err(|_| StreamError::Backend)
    }
}
