//! The committed-message queue of one context.

use alloc::collections::VecDeque;

use hexer_internals::Severity;

use crate::message::Message;

#[derive(Debug)]
struct Entry {
    message: Message,
    /// Bytes charged to the allocator for this message.
    charge: usize,
}

/// FIFO of committed messages, in commit order.
#[derive(Debug, Default)]
pub(crate) struct MessageQueue {
    entries: VecDeque<Entry>,
}

impl MessageQueue {
    pub(crate) fn push(&mut self, message: Message, charge: usize) {
        self.entries.push_back(Entry { message, charge });
    }

    /// Removes the oldest message together with its charge.
    pub(crate) fn pop(&mut self) -> Option<(Message, usize)> {
        self.entries
            .pop_front()
            .map(|entry| (entry.message, entry.charge))
    }

    pub(crate) fn front(&self) -> Option<&Message> {
        self.entries.front().map(|entry| &entry.message)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn count_severity(&self, severity: Severity) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.message.severity() == severity)
            .count()
    }

    /// Removes everything. Returns the number of messages and their total
    /// charge.
    pub(crate) fn clear(&mut self) -> (usize, usize) {
        let count = self.entries.len();
        let charge = self.entries.drain(..).map(|entry| entry.charge).sum();
        (count, charge)
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use hexer_internals::SourceLocation;

    use super::*;
    use crate::{allocator::Unbounded, message::InternalMessage};

    fn message(id: &'static str, severity: Severity) -> Message {
        InternalMessage::new(severity, id, "s", SourceLocation::UNKNOWN)
            .build(String::new(), &Unbounded)
            .0
    }

    #[test]
    fn test_fifo() {
        let mut queue = MessageQueue::default();
        queue.push(message("a", Severity::Info), 1);
        queue.push(message("b", Severity::Error), 2);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.count_severity(Severity::Error), 1);
        assert_eq!(queue.front().and_then(Message::id), Some("a"));

        let (first, charge) = queue.pop().unwrap();
        assert_eq!(first.id(), Some("a"));
        assert_eq!(charge, 1);
        assert_eq!(queue.clear(), (1, 2));
        assert!(queue.pop().is_none());
    }
}
