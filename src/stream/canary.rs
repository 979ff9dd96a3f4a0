//! Error reporting for writes to expired streams.

use alloc::format;
use core::fmt::{self, Arguments};

use hexer_internals::{Severity, SourceLocation};

use crate::{context::Context, error::StreamError, message::InternalMessage};

/// Stand-in backend of a finalized [`StreamHandle`](super::StreamHandle).
pub(super) struct Canary {
    pub(super) init_at: SourceLocation,
    pub(super) final_at: SourceLocation,
}

impl Canary {
    pub(super) fn write_line(&self, context: &Context, text: &str) -> StreamError {
        self.report(
            context,
            "canary_stream_write_line",
            "write_line() called on an expired stream.",
            text,
        )
    }

    pub(super) fn write_text(&self, context: &Context, text: &str) -> StreamError {
        self.report(
            context,
            "canary_stream_write_text",
            "write_text() called on an expired stream.",
            text,
        )
    }

    pub(super) fn write_fmt(&self, context: &Context, args: Arguments<'_>) -> StreamError {
        let text = alloc::fmt::format(args);
        self.report(
            context,
            "canary_stream_write_fmtstr",
            "write_fmt() called on an expired stream.",
            &text,
        )
    }

    fn report(
        &self,
        context: &Context,
        id: &'static str,
        summary: &'static str,
        text: &str,
    ) -> StreamError {
        let details = format!(
            "This stream was initialized at {}. The stream was finalized at {}. \
             The text that was to be printed is as follows: {}",
            self.init_at,
            self.final_at,
            Placed(text),
        );
        context.report_internal(
            InternalMessage::new(Severity::Error, id, summary, self.final_at),
            details,
        );
        StreamError::Expired
    }
}

/// Displays text so that its boundaries stay visible inside a sentence.
///
/// Single-line text is quoted. Multi-line text is put on its own lines, with
/// a trailing newline added only when the text lacks one.
struct Placed<'a>(&'a str);

impl fmt::Display for Placed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.0;
        let trailing = text.ends_with('\n');
        let mut newlines = text.matches('\n').count();
        if trailing {
            newlines -= 1;
        }

        if newlines == 0 {
            write!(f, "{text:?}")
        } else if trailing {
            write!(f, "\n{text}")
        } else {
            write!(f, "\n{text}\n")
        }
    }
}
