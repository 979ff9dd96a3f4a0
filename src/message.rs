//! Committed diagnostic messages and the pending state they are built from.
//!
//! A [`Message`] is what a closed block leaves behind. It is immutable and
//! cheap to clone: the data lives behind a [`triomphe::Arc`], so the copy
//! handed to a feedback handler and the copy kept in the queue are the same
//! allocation.

use alloc::{borrow::Cow, string::String, vec::Vec};
use core::fmt;

use hexer_internals::{Disposition, MessageFlags, Severity, SourceLocation, TypeAndFlags};
use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;
use triomphe::Arc;

use crate::{allocator::Allocator, error::HexerError};

/// Ordered set of tags attached to a message.
pub type Tags = IndexSet<Cow<'static, str>, FxBuildHasher>;

/// Tag added when details had to be shortened to fit the allocator.
pub const TAG_TRUNCATED: &str = "truncated";

/// Tag carried by the message reporting mutations after `commit_now`.
pub const TAG_DATA_LOSS: &str = "data loss";

#[derive(Clone, Debug)]
struct MessageData {
    id: Option<Cow<'static, str>>,
    kind: TypeAndFlags,
    summary: Option<Cow<'static, str>>,
    details: Option<String>,
    tags: Tags,
    opened_at: SourceLocation,
    closed_at: SourceLocation,
    disposition: Disposition,
}

impl MessageData {
    fn new(severity: Severity, opened_at: SourceLocation) -> Self {
        Self {
            id: None,
            kind: TypeAndFlags::from(severity),
            summary: None,
            details: None,
            tags: Tags::default(),
            opened_at,
            closed_at: SourceLocation::UNKNOWN,
            disposition: Disposition::Open,
        }
    }
}

/// One committed diagnostic record.
///
/// ```
/// use hexer::{Config, Context, Severity};
///
/// let context = Context::new(&Config::default());
/// let frame = context.enter_frame();
/// let block = frame.begin(Severity::Warning);
/// block.set_id("disk_low").unwrap();
/// block.set_summary("Disk space is running low.").unwrap();
/// block.end().unwrap();
///
/// let message = context.next_message().unwrap();
/// assert_eq!(message.id(), Some("disk_low"));
/// assert_eq!(message.severity(), Severity::Warning);
/// assert_eq!(message.to_string(), "Disk space is running low.");
/// ```
#[derive(Clone)]
pub struct Message {
    data: Arc<MessageData>,
}

impl Message {
    /// Short machine-readable identifier, if one was set.
    pub fn id(&self) -> Option<&str> {
        self.data.id.as_deref()
    }

    /// The message severity.
    pub fn severity(&self) -> Severity {
        self.data.kind.severity()
    }

    /// The message flags.
    pub fn flags(&self) -> MessageFlags {
        self.data.kind.flags()
    }

    /// Severity and flags together, packable into the wire word.
    pub fn type_and_flags(&self) -> TypeAndFlags {
        self.data.kind
    }

    /// Returns `true` if the engine itself raised this message.
    pub fn is_internal(&self) -> bool {
        self.flags().contains(MessageFlags::INTERNAL)
    }

    /// One-line human-readable summary, if one was set.
    pub fn summary(&self) -> Option<&str> {
        self.data.summary.as_deref()
    }

    /// Longer free-form text, if any was set.
    pub fn details(&self) -> Option<&str> {
        self.data.details.as_deref()
    }

    /// Tags in insertion order.
    pub fn tags(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.data.tags.iter().map(|tag| &**tag)
    }

    /// Returns `true` if the message carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.data.tags.contains(tag)
    }

    /// Where the block that produced the message was opened.
    pub fn source_location(&self) -> SourceLocation {
        self.data.opened_at
    }

    /// Where the message was committed.
    pub fn closed_at(&self) -> SourceLocation {
        self.data.closed_at
    }

    /// How the producing block was exited.
    ///
    /// [`Disposition::Open`] for messages committed with `commit_now`.
    pub fn disposition(&self) -> Disposition {
        self.data.disposition
    }

    /// Returns `true` if both values share the same allocation.
    pub fn ptr_eq(&self, other: &Message) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

fn owned_len(text: Option<&Cow<'static, str>>) -> usize {
    match text {
        Some(Cow::Owned(text)) => text.len(),
        _ => 0,
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = &*self.data;
        f.debug_struct("Message")
            .field("id", &data.id)
            .field("severity", &data.kind.severity())
            .field("flags", &data.kind.flags())
            .field("summary", &data.summary)
            .field("details", &data.details)
            .field("tags", &data.tags)
            .field("opened_at", &data.opened_at)
            .field("closed_at", &data.closed_at)
            .field("disposition", &data.disposition)
            .finish()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.summary(), self.id()) {
            (Some(summary), _) => f.write_str(summary),
            (None, Some(id)) => f.write_str(id),
            (None, None) => write!(f, "{} at {}", self.severity(), self.source_location()),
        }
    }
}

impl core::error::Error for Message {}

/// The message of a block that is still open.
///
/// Every byte of owned text is charged to the context's allocator when it is
/// stored; `charged` always equals the text currently held.
#[derive(Debug)]
pub(crate) struct PendingMessage {
    data: MessageData,
    charged: usize,
    touched: bool,
    committed: bool,
    discarded: Vec<&'static str>,
}

impl PendingMessage {
    pub(crate) fn new(severity: Severity, opened_at: SourceLocation) -> Self {
        Self {
            data: MessageData::new(severity, opened_at),
            charged: 0,
            touched: false,
            committed: false,
            discarded: Vec::new(),
        }
    }

    pub(crate) fn is_touched(&self) -> bool {
        self.touched
    }

    pub(crate) fn is_committed(&self) -> bool {
        self.committed
    }

    pub(crate) fn charged(&self) -> usize {
        self.charged
    }

    /// Records an operation that arrived after `commit_now`.
    pub(crate) fn record_discarded(&mut self, operation: &'static str) {
        self.discarded.push(operation);
    }

    pub(crate) fn discarded(&self) -> &[&'static str] {
        &self.discarded
    }

    pub(crate) fn set_id(
        &mut self,
        id: Cow<'static, str>,
        allocator: &dyn Allocator,
    ) -> Result<(), HexerError> {
        let old = owned_len(self.data.id.as_ref());
        self.recharge(old, owned_len(Some(&id)), allocator)?;
        self.data.id = Some(id);
        self.touched = true;
        Ok(())
    }

    pub(crate) fn set_summary(
        &mut self,
        summary: Cow<'static, str>,
        allocator: &dyn Allocator,
    ) -> Result<(), HexerError> {
        let old = owned_len(self.data.summary.as_ref());
        self.recharge(old, owned_len(Some(&summary)), allocator)?;
        self.data.summary = Some(summary);
        self.touched = true;
        Ok(())
    }

    /// Stores `details`, shortening them until the allocator accepts them.
    ///
    /// Returns `true` if the text had to be truncated.
    pub(crate) fn set_details(&mut self, details: String, allocator: &dyn Allocator) -> bool {
        let old = self.data.details.as_ref().map_or(0, String::len);
        allocator.release(old);
        self.charged -= old;

        let (details, truncated) = fit_text(details, allocator);
        self.charged += details.len();
        self.data.details = Some(details);
        if truncated {
            self.data.tags.insert(Cow::Borrowed(TAG_TRUNCATED));
        }
        self.touched = true;
        truncated
    }

    pub(crate) fn set_severity(&mut self, severity: Severity) {
        self.data.kind = self.data.kind.with_severity(severity);
        self.touched = true;
    }

    pub(crate) fn set_flags(&mut self, flags: MessageFlags) {
        self.data.kind = self.data.kind.with_flags(flags);
        self.touched = true;
    }

    pub(crate) fn add_tag(
        &mut self,
        tag: Cow<'static, str>,
        allocator: &dyn Allocator,
    ) -> Result<(), HexerError> {
        self.touched = true;
        if self.data.tags.contains(&tag) {
            return Ok(());
        }
        self.recharge(0, owned_len(Some(&tag)), allocator)?;
        self.data.tags.insert(tag);
        Ok(())
    }

    /// Moves the message out, leaving this pending state committed.
    ///
    /// The returned charge now belongs to the caller.
    pub(crate) fn take(
        &mut self,
        closed_at: SourceLocation,
        disposition: Disposition,
    ) -> (Message, usize) {
        let opened_at = self.data.opened_at;
        let severity = self.data.kind.severity();
        let mut data = core::mem::replace(&mut self.data, MessageData::new(severity, opened_at));
        data.closed_at = closed_at;
        data.disposition = disposition;
        self.committed = true;
        let charge = core::mem::take(&mut self.charged);
        (
            Message {
                data: Arc::new(data),
            },
            charge,
        )
    }

    fn recharge(
        &mut self,
        old: usize,
        new: usize,
        allocator: &dyn Allocator,
    ) -> Result<(), HexerError> {
        if new > old {
            allocator
                .reserve(new - old)
                .map_err(|error| HexerError::AllocationRefused {
                    requested: error.requested,
                })?;
        } else {
            allocator.release(old - new);
        }
        self.charged = self.charged + new - old;
        Ok(())
    }
}

/// Reserves room for `text`, halving it at a char boundary until the
/// allocator agrees.
pub(crate) fn fit_text(mut text: String, allocator: &dyn Allocator) -> (String, bool) {
    let mut truncated = false;
    while !text.is_empty() && allocator.reserve(text.len()).is_err() {
        let mut cut = text.len() / 2;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        truncated = true;
    }
    (text, truncated)
}

/// Builder for messages the engine raises about itself.
#[derive(Debug)]
pub(crate) struct InternalMessage {
    data: MessageData,
}

impl InternalMessage {
    pub(crate) fn new(
        severity: Severity,
        id: &'static str,
        summary: &'static str,
        location: SourceLocation,
    ) -> Self {
        let mut data = MessageData::new(severity, location);
        data.kind = data.kind.with_flags(MessageFlags::INTERNAL);
        data.id = Some(Cow::Borrowed(id));
        data.summary = Some(Cow::Borrowed(summary));
        data.closed_at = location;
        data.disposition = Disposition::NormalEnd;
        Self { data }
    }

    pub(crate) fn id(&self) -> &str {
        self.data.id.as_deref().unwrap_or_default()
    }

    pub(crate) fn tag(mut self, tag: &'static str) -> Self {
        self.data.tags.insert(Cow::Borrowed(tag));
        self
    }

    /// Finishes the message, charging the details best-effort.
    pub(crate) fn build(mut self, details: String, allocator: &dyn Allocator) -> (Message, usize) {
        let (details, truncated) = fit_text(details, allocator);
        if truncated {
            self.data.tags.insert(Cow::Borrowed(TAG_TRUNCATED));
        }
        let charge = details.len();
        if !details.is_empty() {
            self.data.details = Some(details);
        }
        (
            Message {
                data: Arc::new(self.data),
            },
            charge,
        )
    }
}
