//! Block bookkeeping: activation identity, dispositions and the block stack.
//!
//! A *block* is one open `begin ... end` region in the caller's control
//! flow. Blocks are opened in some activation (one call of one function,
//! identified by a [`FrameId`]) and are expected to close in the same
//! activation, innermost first.
//!
//! [`BlockStack`] keeps the open blocks of one context in open order. Every
//! close event is resolved by [`BlockStack::close`], which walks from the
//! innermost block outward to find the block the event belongs to:
//!
//! ```text
//!   open A (frame 1)
//!     call -> open B (frame 2), returns without closing B
//!   close (frame 1)
//!
//!   stack before: [A(1), B(2)]    walk: B(2) != 1, A(1) == 1 -> match A
//!   outcome:      closed = A, abandoned = [B]
//! ```
//!
//! The stack never commits anything itself. The caller decides what to do
//! with [`CloseOutcome::closed`] (commit its payload) and with every
//! [`AbandonedBlock`] (report the mismatch and discard the payload).

use alloc::vec::Vec;
use core::{cell::Cell, fmt, num::NonZeroU64};

use crate::location::SourceLocation;

/// Opaque identity of one function activation.
///
/// Ids come from a [`FrameCounter`] and are never reused within a context,
/// so recursive calls of the same function get distinct ids.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(NonZeroU64);

impl FrameId {
    /// Returns the raw counter value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameId({})", self.0)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic source of [`FrameId`]s.
#[derive(Debug)]
pub struct FrameCounter {
    /// The last id handed out, zero before the first one.
    last: Cell<u64>,
}

impl FrameCounter {
    /// Creates a counter whose first id is `1`.
    pub const fn new() -> Self {
        Self { last: Cell::new(0) }
    }

    /// Hands out the next id.
    pub fn next_id(&self) -> FrameId {
        let next = self
            .last
            .get()
            .checked_add(1)
            .and_then(NonZeroU64::new)
            .unwrap_or(NonZeroU64::MIN);
        self.last.set(next.get());
        FrameId(next)
    }
}

impl Default for FrameCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of one opened block, unique within its [`BlockStack`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockSerial(u64);

impl BlockSerial {
    /// Returns the raw serial number.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// The manner in which a block was exited.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// The block has not been exited yet.
    #[default]
    Open,
    /// The body ran to its natural end.
    NormalEnd,
    /// The body left through a `continue`.
    Continue,
    /// The body left through a `break`.
    Break,
    /// The body jumped to a label outside the block.
    Goto,
    /// The body returned from the enclosing function.
    Return,
}

impl Disposition {
    /// Returns `true` for every disposition except [`Disposition::Open`].
    #[inline]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Disposition::Open)
    }

    /// Lowercase name used in diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Disposition::Open => "open",
            Disposition::NormalEnd => "end",
            Disposition::Continue => "continue",
            Disposition::Break => "break",
            Disposition::Goto => "goto",
            Disposition::Return => "return",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A block that is currently open.
#[derive(Debug)]
pub struct OpenBlock<P> {
    /// The activation that opened the block.
    pub frame: FrameId,
    /// The block's identity.
    pub serial: BlockSerial,
    /// Where the block was opened.
    pub opened_at: SourceLocation,
    /// Caller data attached to the block.
    pub payload: P,
}

/// A block whose open and close events were matched.
#[derive(Debug)]
pub struct ClosedBlock<P> {
    /// The activation that opened and closed the block.
    pub frame: FrameId,
    /// The block's identity.
    pub serial: BlockSerial,
    /// Where the block was opened.
    pub opened_at: SourceLocation,
    /// Where the block was closed.
    pub closed_at: SourceLocation,
    /// How the block was exited. Never [`Disposition::Open`].
    pub disposition: Disposition,
    /// Caller data attached to the block.
    pub payload: P,
}

/// Why an open block was removed without being matched to a close event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AbandonReason {
    /// A block opened by a callee was still open when an enclosing
    /// activation closed one of its own blocks.
    UnclosedInCallee,
    /// An enclosing block of the same activation was closed first.
    ClosedOutOfOrder,
    /// The activation that opened the block exited.
    FrameExited,
    /// The block's owner discarded it without recording an exit.
    Discarded,
    /// The owning context was torn down.
    ContextDropped,
}

impl AbandonReason {
    /// Human-readable explanation used in debug output.
    pub const fn describe(self) -> &'static str {
        match self {
            AbandonReason::UnclosedInCallee => {
                "was still open when an enclosing block of a calling function closed"
            }
            AbandonReason::ClosedOutOfOrder => {
                "was still open when an enclosing block of the same function closed"
            }
            AbandonReason::FrameExited => "was still open when its function returned",
            AbandonReason::Discarded => "was discarded without a recorded exit",
            AbandonReason::ContextDropped => "was still open when its context was dropped",
        }
    }
}

/// An open block that was removed from the stack without a matching close.
#[derive(Debug)]
pub struct AbandonedBlock<P> {
    /// Why the block was removed.
    pub reason: AbandonReason,
    /// The removed block.
    pub block: OpenBlock<P>,
}

/// Which open block a close event is aimed at.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CloseTarget {
    /// The innermost block opened by this activation.
    Innermost(FrameId),
    /// One specific block.
    Block(BlockSerial),
}

/// The result of resolving a single close event.
#[derive(Debug)]
pub struct CloseOutcome<P> {
    /// The matched block, or `None` when the close event matched no open
    /// block.
    pub closed: Option<ClosedBlock<P>>,
    /// Blocks that sat above the matched block, innermost first.
    pub abandoned: Vec<AbandonedBlock<P>>,
}

impl<P> CloseOutcome<P> {
    /// Returns `true` if the close event matched no open block.
    pub fn is_unmatched(&self) -> bool {
        self.closed.is_none()
    }
}

/// Error returned when opening a block would exceed the configured depth.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DepthExceeded {
    /// The configured maximum depth.
    pub limit: usize,
}

impl fmt::Display for DepthExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block nesting depth limit of {} exceeded", self.limit)
    }
}

impl core::error::Error for DepthExceeded {}

/// The open blocks of one context, in open order.
#[derive(Debug)]
pub struct BlockStack<P> {
    /// Open blocks, outermost first.
    open: Vec<OpenBlock<P>>,
    /// Serial number for the next opened block.
    next_serial: u64,
    /// Maximum number of simultaneously open blocks.
    max_depth: usize,
}

impl<P> Default for BlockStack<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> BlockStack<P> {
    /// The depth limit used by [`BlockStack::new`].
    pub const DEFAULT_MAX_DEPTH: usize = 64;

    /// Creates an empty stack with [`Self::DEFAULT_MAX_DEPTH`].
    pub const fn new() -> Self {
        Self::with_max_depth(Self::DEFAULT_MAX_DEPTH)
    }

    /// Creates an empty stack that refuses to open more than `max_depth`
    /// blocks at once.
    pub const fn with_max_depth(max_depth: usize) -> Self {
        Self {
            open: Vec::new(),
            next_serial: 0,
            max_depth,
        }
    }

    /// Number of currently open blocks.
    #[inline]
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Returns `true` if no block is open.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// The configured depth limit.
    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Opens a block.
    pub fn push(
        &mut self,
        frame: FrameId,
        opened_at: SourceLocation,
        payload: P,
    ) -> Result<BlockSerial, DepthExceeded> {
        if self.open.len() >= self.max_depth {
            return Err(DepthExceeded {
                limit: self.max_depth,
            });
        }

        let serial = BlockSerial(self.next_serial);
        self.next_serial += 1;
        self.open.push(OpenBlock {
            frame,
            serial,
            opened_at,
            payload,
        });
        Ok(serial)
    }

    /// The most recently opened block that is still open.
    #[inline]
    pub fn innermost(&self) -> Option<&OpenBlock<P>> {
        self.open.last()
    }

    /// Mutable access to the innermost block.
    #[inline]
    pub fn innermost_mut(&mut self) -> Option<&mut OpenBlock<P>> {
        self.open.last_mut()
    }

    /// Looks up an open block by serial.
    pub fn get(&self, serial: BlockSerial) -> Option<&OpenBlock<P>> {
        self.open.iter().rev().find(|block| block.serial == serial)
    }

    /// Iterates over the open blocks, innermost first.
    pub fn iter(&self) -> impl Iterator<Item = &OpenBlock<P>> {
        self.open.iter().rev()
    }

    /// Resolves a close event.
    ///
    /// The stack is walked from the innermost block outward until a block
    /// matching `target` is found. Every block above the match is abandoned:
    /// blocks from other activations with [`AbandonReason::UnclosedInCallee`],
    /// blocks from the matched block's own activation with
    /// [`AbandonReason::ClosedOutOfOrder`]. If nothing matches, the stack is
    /// left untouched and [`CloseOutcome::closed`] is `None`.
    ///
    /// Passing [`Disposition::Open`] records the block as
    /// [`Disposition::NormalEnd`].
    pub fn close(
        &mut self,
        target: CloseTarget,
        disposition: Disposition,
        closed_at: SourceLocation,
    ) -> CloseOutcome<P> {
        let position = match target {
            CloseTarget::Innermost(frame) => self.open.iter().rposition(|b| b.frame == frame),
            CloseTarget::Block(serial) => self.open.iter().rposition(|b| b.serial == serial),
        };

        let Some(index) = position else {
            return CloseOutcome {
                closed: None,
                abandoned: Vec::new(),
            };
        };

        let frame = self.open[index].frame;
        let abandoned = self.split_above(index, |block| {
            if block.frame == frame {
                AbandonReason::ClosedOutOfOrder
            } else {
                AbandonReason::UnclosedInCallee
            }
        });

        let disposition = if disposition.is_terminal() {
            disposition
        } else {
            Disposition::NormalEnd
        };

        let closed = self.open.pop().map(|block| ClosedBlock {
            frame: block.frame,
            serial: block.serial,
            opened_at: block.opened_at,
            closed_at,
            disposition,
            payload: block.payload,
        });

        CloseOutcome { closed, abandoned }
    }

    /// Removes one block (and everything above it) without a close event.
    ///
    /// Returns the removed blocks innermost first; the requested block is
    /// last and carries `reason`. Returns an empty list if the block is no
    /// longer open.
    pub fn abandon(&mut self, serial: BlockSerial, reason: AbandonReason) -> Vec<AbandonedBlock<P>> {
        let Some(index) = self.open.iter().rposition(|b| b.serial == serial) else {
            return Vec::new();
        };

        let frame = self.open[index].frame;
        let mut abandoned = self.split_above(index, |block| {
            if block.frame == frame {
                AbandonReason::ClosedOutOfOrder
            } else {
                AbandonReason::UnclosedInCallee
            }
        });
        abandoned.extend(self.open.pop().map(|block| AbandonedBlock { reason, block }));
        abandoned
    }

    /// Removes every block opened by `frame`, plus anything opened above the
    /// outermost of them.
    ///
    /// Called when an activation exits. Any block it still owns was left open
    /// by a raw return.
    pub fn abandon_frame(&mut self, frame: FrameId) -> Vec<AbandonedBlock<P>> {
        let Some(index) = self.open.iter().position(|b| b.frame == frame) else {
            return Vec::new();
        };

        let mut abandoned = Vec::with_capacity(self.open.len() - index);
        while self.open.len() > index {
            if let Some(block) = self.open.pop() {
                let reason = if block.frame == frame {
                    AbandonReason::FrameExited
                } else {
                    AbandonReason::UnclosedInCallee
                };
                abandoned.push(AbandonedBlock { reason, block });
            }
        }
        abandoned
    }

    /// Removes every open block, innermost first.
    pub fn drain(&mut self, reason: AbandonReason) -> Vec<AbandonedBlock<P>> {
        self.split_above_inclusive(0, |_| reason)
    }

    /// Pops every block above `index`, innermost first.
    fn split_above(
        &mut self,
        index: usize,
        reason: impl Fn(&OpenBlock<P>) -> AbandonReason,
    ) -> Vec<AbandonedBlock<P>> {
        self.split_above_inclusive(index + 1, reason)
    }

    /// Pops every block at or above `index`, innermost first.
    fn split_above_inclusive(
        &mut self,
        index: usize,
        reason: impl Fn(&OpenBlock<P>) -> AbandonReason,
    ) -> Vec<AbandonedBlock<P>> {
        if index >= self.open.len() {
            return Vec::new();
        }
        self.open
            .drain(index..)
            .rev()
            .map(|block| AbandonedBlock {
                reason: reason(&block),
                block,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn here(line: u32) -> SourceLocation {
        SourceLocation::new("block.rs", "test", line)
    }

    #[test]
    fn test_frame_ids_are_unique() {
        let counter = FrameCounter::new();
        let a = counter.next_id();
        let b = counter.next_id();
        let c = counter.next_id();
        assert_eq!(a.get(), 1);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_same_frame_nesting_closes_innermost() {
        let counter = FrameCounter::new();
        let frame = counter.next_id();
        let mut stack = BlockStack::new();
        stack.push(frame, here(1), "outer").unwrap();
        stack.push(frame, here(2), "inner").unwrap();

        let first = stack.close(CloseTarget::Innermost(frame), Disposition::NormalEnd, here(3));
        assert!(first.abandoned.is_empty());
        assert_eq!(first.closed.unwrap().payload, "inner");

        let second = stack.close(CloseTarget::Innermost(frame), Disposition::Break, here(4));
        let closed = second.closed.unwrap();
        assert_eq!(closed.payload, "outer");
        assert_eq!(closed.disposition, Disposition::Break);
        assert_eq!(closed.closed_at.line, 4);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_close_skips_unclosed_callee_blocks() {
        let counter = FrameCounter::new();
        let caller = counter.next_id();
        let callee = counter.next_id();
        let mut stack = BlockStack::new();
        stack.push(caller, here(1), "outer").unwrap();
        stack.push(callee, here(10), "leaked").unwrap();

        let outcome = stack.close(CloseTarget::Innermost(caller), Disposition::NormalEnd, here(2));
        assert_eq!(outcome.closed.unwrap().payload, "outer");
        assert_eq!(outcome.abandoned.len(), 1);
        assert_eq!(outcome.abandoned[0].reason, AbandonReason::UnclosedInCallee);
        assert_eq!(outcome.abandoned[0].block.payload, "leaked");
        assert!(stack.is_empty());
    }

    #[test]
    fn test_recursive_activations_do_not_collide() {
        let counter = FrameCounter::new();
        let first_call = counter.next_id();
        let recursive_call = counter.next_id();
        let mut stack = BlockStack::new();
        stack.push(first_call, here(1), "first").unwrap();
        stack.push(recursive_call, here(1), "second").unwrap();

        let outcome = stack.close(CloseTarget::Innermost(first_call), Disposition::Return, here(5));
        assert_eq!(outcome.closed.unwrap().payload, "first");
        assert_eq!(outcome.abandoned.len(), 1);
    }

    #[test]
    fn test_unmatched_close_leaves_stack_untouched() {
        let counter = FrameCounter::new();
        let frame = counter.next_id();
        let stranger = counter.next_id();
        let mut stack = BlockStack::new();
        stack.push(frame, here(1), ()).unwrap();

        let outcome = stack.close(CloseTarget::Innermost(stranger), Disposition::NormalEnd, here(2));
        assert!(outcome.is_unmatched());
        assert!(outcome.abandoned.is_empty());
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_close_by_serial_out_of_order() {
        let counter = FrameCounter::new();
        let frame = counter.next_id();
        let mut stack = BlockStack::new();
        let outer = stack.push(frame, here(1), "outer").unwrap();
        stack.push(frame, here(2), "inner").unwrap();

        let outcome = stack.close(CloseTarget::Block(outer), Disposition::NormalEnd, here(3));
        assert_eq!(outcome.closed.unwrap().payload, "outer");
        assert_eq!(outcome.abandoned[0].reason, AbandonReason::ClosedOutOfOrder);
    }

    #[test]
    fn test_open_disposition_is_recorded_as_normal_end() {
        let counter = FrameCounter::new();
        let frame = counter.next_id();
        let mut stack = BlockStack::new();
        stack.push(frame, here(1), ()).unwrap();
        let outcome = stack.close(CloseTarget::Innermost(frame), Disposition::Open, here(2));
        assert_eq!(outcome.closed.unwrap().disposition, Disposition::NormalEnd);
    }

    #[test]
    fn test_abandon_frame() {
        let counter = FrameCounter::new();
        let caller = counter.next_id();
        let callee = counter.next_id();
        let grandchild = counter.next_id();
        let mut stack = BlockStack::new();
        stack.push(caller, here(1), 1).unwrap();
        stack.push(callee, here(2), 2).unwrap();
        stack.push(grandchild, here(3), 3).unwrap();
        stack.push(callee, here(4), 4).unwrap();

        let abandoned = stack.abandon_frame(callee);
        let payloads: Vec<_> = abandoned.iter().map(|a| a.block.payload).collect();
        assert_eq!(payloads, vec![4, 3, 2]);
        assert_eq!(abandoned[1].reason, AbandonReason::UnclosedInCallee);
        assert_eq!(abandoned[2].reason, AbandonReason::FrameExited);
        assert_eq!(stack.depth(), 1);

        assert!(stack.abandon_frame(callee).is_empty());
    }

    #[test]
    fn test_abandon_single_block() {
        let counter = FrameCounter::new();
        let frame = counter.next_id();
        let mut stack = BlockStack::new();
        stack.push(frame, here(1), "kept").unwrap();
        let doomed = stack.push(frame, here(2), "doomed").unwrap();

        let abandoned = stack.abandon(doomed, AbandonReason::Discarded);
        assert_eq!(abandoned.len(), 1);
        assert_eq!(abandoned[0].reason, AbandonReason::Discarded);
        assert_eq!(stack.innermost().unwrap().payload, "kept");
        assert!(stack.abandon(doomed, AbandonReason::Discarded).is_empty());
    }

    #[test]
    fn test_depth_limit() {
        let counter = FrameCounter::new();
        let frame = counter.next_id();
        let mut stack = BlockStack::with_max_depth(2);
        stack.push(frame, here(1), ()).unwrap();
        stack.push(frame, here(2), ()).unwrap();
        assert_eq!(stack.push(frame, here(3), ()), Err(DepthExceeded { limit: 2 }));
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_drain() {
        let counter = FrameCounter::new();
        let frame = counter.next_id();
        let mut stack = BlockStack::new();
        stack.push(frame, here(1), 1).unwrap();
        stack.push(frame, here(2), 2).unwrap();
        let drained = stack.drain(AbandonReason::ContextDropped);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].block.payload, 2);
        assert!(stack.is_empty());
    }
}
