//! Turning messages into text.

use alloc::{format, string::String, vec::Vec};
use core::fmt::Write as _;

use crate::{context::Context, error::StreamError, message::Message, stream::Stream};

/// Writes one message to a [`Stream`].
pub trait MessageFormatter: 'static + Send + Sync {
    /// Formats `message` onto `stream`, returning the bytes written.
    fn format(
        &self,
        context: &Context,
        message: &Message,
        stream: &mut dyn Stream,
    ) -> Result<usize, StreamError>;
}

/// Plain-text formatter.
///
/// ```text
/// error[parse_failed]: Could not parse the configuration.
///   expected a number on line 3
///   at src/config.rs:41 (load_config)
///   tags: io, retry
/// ```
#[derive(Copy, Clone, Debug)]
pub struct PlainFormatter {
    /// Whether to print where the message's block was opened.
    pub show_location: bool,
    /// Whether to print the message's tags.
    pub show_tags: bool,
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self {
            show_location: true,
            show_tags: true,
        }
    }
}

impl PlainFormatter {
    /// The first line: severity, id, flags and summary.
    fn headline(&self, message: &Message) -> String {
        let mut line = String::new();
        let _ = write!(line, "{}", message.severity());
        if let Some(id) = message.id() {
            let _ = write!(line, "[{id}]");
        }
        if message.is_internal() {
            line.push_str(" (internal)");
        }
        line.push(':');
        match message.summary() {
            Some(summary) => {
                line.push(' ');
                line.push_str(summary);
            }
            None if message.id().is_none() => line.push_str(" (no summary)"),
            None => {}
        }
        line
    }
}

impl MessageFormatter for PlainFormatter {
    fn format(
        &self,
        context: &Context,
        message: &Message,
        stream: &mut dyn Stream,
    ) -> Result<usize, StreamError> {
        let mut written = stream.write_line(context, &self.headline(message))?;

        if let Some(details) = message.details() {
            for line in details.lines() {
                written += stream.write_line(context, &format!("  {line}"))?;
            }
        }
        if self.show_location && !message.source_location().is_unknown() {
            let line = format!("  at {}", message.source_location());
            written += stream.write_line(context, &line)?;
        }
        if self.show_tags && message.tags().len() > 0 {
            let tags: Vec<&str> = message.tags().collect();
            written += stream.write_line(context, &format!("  tags: {}", tags.join(", ")))?;
        }
        Ok(written)
    }
}

/// Formats `message` onto `stream` with the context's configured formatter.
pub fn print_message(
    context: &Context,
    message: &Message,
    stream: &mut dyn Stream,
) -> Result<usize, StreamError> {
    context.config().formatter().format(context, message, stream)
}

/// Drains the context's queue onto `stream`, oldest first.
///
/// Returns the number of messages printed. On a stream error the message
/// being printed stays queued and the error is returned.
pub fn print_messages(context: &Context, stream: &mut dyn Stream) -> Result<usize, StreamError> {
    let mut printed = 0;
    while let Some(message) = context.peek_message() {
        print_message(context, &message, stream)?;
        let _ = context.next_message();
        printed += 1;
    }
    Ok(printed)
}

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use hexer_internals::Severity;

    use super::*;
    use crate::{
        config::Config,
        stream::{FmtStream, StreamHandle},
    };

    #[test]
    fn test_plain_format() {
        let context = Context::new(&Config::default());
        let frame = context.enter_frame();
        let block = frame.begin(Severity::Error);
        block.set_id("parse_failed").unwrap();
        block.set_summary("Could not parse.").unwrap();
        crate::details!(block, "line {}\nsecond", 3).unwrap();
        block.add_tag("io").unwrap();
        block.end().unwrap();

        let mut out = String::new();
        let mut stream = StreamHandle::new(FmtStream::new(&mut out));
        let printed = print_messages(&context, &mut stream).unwrap();
        drop(stream);

        assert_eq!(printed, 1);
        assert_eq!(context.message_count(), 0);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "error[parse_failed]: Could not parse.");
        assert_eq!(lines[1], "  line 3");
        assert_eq!(lines[2], "  second");
        assert!(lines[3].starts_with("  at "));
        assert_eq!(lines[4], "  tags: io");
    }
}
