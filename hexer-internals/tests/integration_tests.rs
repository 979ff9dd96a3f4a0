//! Integration tests for the hexer-internals block stack.
//!
//! These drive [`BlockStack`] the way the engine does: every close event is
//! resolved immediately, matched payloads are appended to a queue, abandoned
//! payloads are counted as mismatches. The queue must always come out in
//! close order.
//!
//! ## Ordering Tests
//! - `test_close_order_not_open_order`: inner/outer nesting
//! - `test_sibling_interleaving`: shallow sibling, then deep siblings
//! - `test_nine_block_document`: a larger mixed document
//!
//! ## Mismatch Tests
//! - `test_raw_return_in_callee`: callee leaves a block open, caller closes
//! - `test_frame_exit_reports_leaked_blocks`: activation exit cleanup
//! - `test_stray_close`: close with nothing open

use hexer_internals::{
    AbandonReason, BlockStack, CloseTarget, Disposition, FrameCounter, FrameId, SourceLocation,
};

/// Minimal stand-in for the engine: a stack plus a committed-payload queue.
struct Harness {
    frames: FrameCounter,
    stack: BlockStack<&'static str>,
    queue: Vec<&'static str>,
    mismatches: Vec<(&'static str, AbandonReason)>,
    stray_closes: usize,
}

impl Harness {
    fn new() -> Self {
        Self {
            frames: FrameCounter::new(),
            stack: BlockStack::new(),
            queue: Vec::new(),
            mismatches: Vec::new(),
            stray_closes: 0,
        }
    }

    fn frame(&self) -> FrameId {
        self.frames.next_id()
    }

    #[track_caller]
    fn begin(&mut self, frame: FrameId, id: &'static str) {
        self.stack
            .push(frame, SourceLocation::caller(), id)
            .expect("depth limit");
    }

    #[track_caller]
    fn end(&mut self, frame: FrameId) {
        let outcome = self.stack.close(
            CloseTarget::Innermost(frame),
            Disposition::NormalEnd,
            SourceLocation::caller(),
        );
        for abandoned in outcome.abandoned {
            self.mismatches
                .push((abandoned.block.payload, abandoned.reason));
        }
        match outcome.closed {
            Some(closed) => self.queue.push(closed.payload),
            None => self.stray_closes += 1,
        }
    }

    fn exit_frame(&mut self, frame: FrameId) {
        for abandoned in self.stack.abandon_frame(frame) {
            self.mismatches
                .push((abandoned.block.payload, abandoned.reason));
        }
    }
}

#[test]
fn test_close_order_not_open_order() {
    let mut h = Harness::new();
    let f = h.frame();
    h.begin(f, "outer");
    h.begin(f, "inner");
    h.end(f);
    h.end(f);

    assert_eq!(h.queue, ["inner", "outer"]);
    assert!(h.mismatches.is_empty());
}

#[test]
fn test_sibling_interleaving() {
    let mut h = Harness::new();
    let f = h.frame();
    h.begin(f, "shallow01");
    h.end(f);
    h.begin(f, "middle01");
    h.begin(f, "deep01");
    h.end(f);
    h.begin(f, "deep02");
    h.end(f);
    h.end(f);

    assert_eq!(h.queue, ["shallow01", "deep01", "deep02", "middle01"]);
}

#[test]
fn test_nine_block_document() {
    let mut h = Harness::new();
    let f = h.frame();
    h.begin(f, "shallow01");
    h.end(f);
    h.begin(f, "shallow02");
    {
        h.begin(f, "middle01");
        {
            h.begin(f, "deep01");
            h.end(f);
            h.begin(f, "deep02");
            h.end(f);
        }
        h.end(f);
        h.begin(f, "middle02");
        h.end(f);
        h.begin(f, "middle03");
        {
            h.begin(f, "deep03");
            h.end(f);
        }
        h.end(f);
    }
    h.end(f);
    h.begin(f, "shallow03");
    h.end(f);

    assert_eq!(
        h.queue,
        [
            "shallow01",
            "deep01",
            "deep02",
            "middle01",
            "middle02",
            "deep03",
            "middle03",
            "shallow02",
            "shallow03",
        ]
    );
}

#[test]
fn test_cross_call_nesting_is_not_a_mismatch() {
    let mut h = Harness::new();
    let caller = h.frame();
    h.begin(caller, "outer");
    {
        let callee = h.frame();
        h.begin(callee, "callee");
        h.end(callee);
        h.exit_frame(callee);
    }
    h.end(caller);
    h.exit_frame(caller);

    assert_eq!(h.queue, ["callee", "outer"]);
    assert!(h.mismatches.is_empty());
}

#[test]
fn test_raw_return_in_callee() {
    let mut h = Harness::new();
    let caller = h.frame();
    h.begin(caller, "outer");
    {
        let callee = h.frame();
        h.begin(callee, "unmatched");
        // raw return: no end, no frame exit
    }
    h.end(caller);

    assert_eq!(h.queue, ["outer"]);
    assert_eq!(
        h.mismatches,
        [("unmatched", AbandonReason::UnclosedInCallee)]
    );
}

#[test]
fn test_frame_exit_reports_leaked_blocks() {
    let mut h = Harness::new();
    let callee = h.frame();
    h.begin(callee, "unmatched");
    h.exit_frame(callee);

    assert!(h.queue.is_empty());
    assert_eq!(h.mismatches, [("unmatched", AbandonReason::FrameExited)]);
    assert!(h.stack.is_empty());

    // The stack keeps working afterwards.
    let next = h.frame();
    h.begin(next, "after");
    h.end(next);
    assert_eq!(h.queue, ["after"]);
}

#[test]
fn test_stray_close() {
    let mut h = Harness::new();
    let f = h.frame();
    h.end(f);
    assert_eq!(h.stray_closes, 1);
    assert!(h.queue.is_empty());
}

#[test]
fn test_dispositions_are_preserved() {
    let frames = FrameCounter::new();
    let f = frames.next_id();
    let mut stack = BlockStack::new();
    for disposition in [
        Disposition::NormalEnd,
        Disposition::Continue,
        Disposition::Break,
        Disposition::Goto,
        Disposition::Return,
    ] {
        stack.push(f, SourceLocation::UNKNOWN, ()).unwrap();
        let closed = stack
            .close(CloseTarget::Innermost(f), disposition, SourceLocation::UNKNOWN)
            .closed
            .unwrap();
        assert_eq!(closed.disposition, disposition);
        assert!(closed.disposition.is_terminal());
    }
    assert!(!Disposition::Open.is_terminal());
}

#[test]
fn test_auto_traits() {
    static_assertions::assert_impl_all!(BlockStack<String>: Send, Sync);
    static_assertions::assert_impl_all!(FrameId: Copy, Send, Sync);
    static_assertions::assert_not_impl_any!(FrameCounter: Sync, Clone);
}
