use core::fmt;

use super::StreamBackend;
use crate::error::StreamError;

/// Backend writing to any [`core::fmt::Write`] implementor.
#[derive(Debug, Default)]
pub struct FmtStream<W> {
    inner: W,
}

impl<W: fmt::Write> FmtStream<W> {
    /// Wraps `inner`.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: fmt::Write> StreamBackend for FmtStream<W> {
    fn write_str(&mut self, text: &str) -> Result<usize, StreamError> {
        self.inner
            .write_str(text)
            .map_err(|_| StreamError::Backend)?;
        Ok(text.len())
    }
}
