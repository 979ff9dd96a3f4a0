//! End-to-end behavior of the public API.
//!
//! ## Ordering Tests
//! - `test_close_order_not_open_order`: inner/outer nesting
//! - `test_nine_block_document`: mixed siblings and nesting
//! - `test_cross_function_nesting`: callee blocks nest inside caller blocks
//!
//! ## Queue Tests
//! - `test_drain_is_idempotent`
//! - `test_feedback_sees_queue_order`: handler and queue agree
//! - `test_feedback_reentrant_commit`: handler commits a message itself
//!
//! ## Exit Tests
//! - `test_loop_exits`, `test_goto_exit`, `test_return_exit`

use std::{cell::RefCell, rc::Rc};

use hexer::{
    Config, Context, Disposition, FeedbackHandler, Frame, MessageFlags, Severity, TypeAndFlags,
    debug::CapturingDebugSink,
    stream::{Stream, StreamHandle, StringStream},
};

fn context() -> (Context, CapturingDebugSink) {
    let sink = CapturingDebugSink::new();
    let config = Config::builder().debug_sink(sink.clone()).build();
    (Context::new(&config), sink)
}

fn drain_ids(context: &Context) -> Vec<String> {
    std::iter::from_fn(|| context.next_message())
        .map(|message| message.id().unwrap_or("<none>").to_string())
        .collect()
}

fn leaf(frame: &Frame<'_>, id: &'static str) {
    let block = frame.begin_info();
    block.set_id(id).unwrap();
    block.end().unwrap();
}

#[test]
fn test_close_order_not_open_order() {
    let (context, sink) = context();
    let frame = context.enter_frame();
    let outer = frame.begin_info();
    outer.set_id("outer").unwrap();
    let inner = frame.begin_error();
    inner.set_id("inner").unwrap();
    inner.end().unwrap();
    outer.end().unwrap();

    assert_eq!(drain_ids(&context), ["inner", "outer"]);
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_nine_block_document() {
    let (context, sink) = context();
    let frame = context.enter_frame();

    leaf(&frame, "shallow01");
    let shallow02 = frame.begin_info();
    shallow02.set_id("shallow02").unwrap();
    {
        let middle01 = frame.begin_info();
        middle01.set_id("middle01").unwrap();
        leaf(&frame, "deep01");
        leaf(&frame, "deep02");
        middle01.end().unwrap();

        leaf(&frame, "middle02");

        let middle03 = frame.begin_info();
        middle03.set_id("middle03").unwrap();
        leaf(&frame, "deep03");
        middle03.end().unwrap();
    }
    shallow02.end().unwrap();
    leaf(&frame, "shallow03");

    assert_eq!(
        drain_ids(&context),
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
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_cross_function_nesting() {
    fn callee(context: &Context) {
        let frame = context.enter_frame();
        leaf(&frame, "callee");
    }

    let (context, sink) = context();
    let frame = context.enter_frame();
    let outer = frame.begin_warning();
    outer.set_id("caller").unwrap();
    callee(&context);
    callee(&context);
    outer.end().unwrap();

    assert_eq!(drain_ids(&context), ["callee", "callee", "caller"]);
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_drain_is_idempotent() {
    let (context, _sink) = context();
    let frame = context.enter_frame();
    leaf(&frame, "only");

    assert_eq!(context.message_count(), 1);
    assert!(context.next_message().is_some());
    assert!(context.next_message().is_none());
    assert!(context.next_message().is_none());
    assert!(context.peek_message().is_none());
    assert_eq!(context.clear_messages(), 0);
    assert_eq!(context.message_count(), 0);
}

#[test]
fn test_feedback_sees_queue_order() {
    let (context, _sink) = context();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let recorder = seen.clone();
    context.set_feedback_handler(Some(FeedbackHandler::new(move |_, message| {
        recorder
            .borrow_mut()
            .push(message.id().unwrap_or_default().to_string());
    })));

    let frame = context.enter_frame();
    let outer = frame.begin_info();
    outer.set_id("outer").unwrap();
    leaf(&frame, "inner");
    // Delivered at commit time, before the queue is drained.
    assert_eq!(*seen.borrow(), ["inner"]);
    outer.end().unwrap();

    let delivered = seen.borrow().clone();
    assert_eq!(drain_ids(&context), delivered);
}

#[test]
fn test_feedback_reentrant_commit() {
    let (context, sink) = context();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let recorder = seen.clone();
    context.set_feedback_handler(Some(FeedbackHandler::new(move |context, message| {
        recorder
            .borrow_mut()
            .push(message.id().unwrap_or_default().to_string());
        if message.id() == Some("first") {
            assert!(context.is_dispatching());
            let frame = context.enter_frame();
            leaf(&frame, "echo");
        }
    })));

    let frame = context.enter_frame();
    leaf(&frame, "first");
    leaf(&frame, "second");

    assert!(!context.is_dispatching());
    assert_eq!(*seen.borrow(), ["first", "echo", "second"]);
    assert_eq!(drain_ids(&context), ["first", "echo", "second"]);
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_removing_the_handler() {
    let (context, _sink) = context();
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();
    context.set_feedback_handler(Some(FeedbackHandler::new(move |_, _| {
        *counter.borrow_mut() += 1;
    })));
    let frame = context.enter_frame();
    leaf(&frame, "counted");
    context.set_feedback_handler(None);
    assert!(context.feedback_handler().is_noop());
    leaf(&frame, "not counted");

    assert_eq!(*calls.borrow(), 1);
    assert_eq!(context.message_count(), 2);
}

#[test]
fn test_message_contents() {
    let (context, _sink) = context();
    let frame = context.enter_frame();
    let block = hexer::begin_info!(frame);
    block.set_id(format!("parse_{}", 7)).unwrap();
    block.set_summary("Could not parse.").unwrap();
    hexer::details!(block, "expected {} fields", 3).unwrap();
    block.set_severity(Severity::Error).unwrap();
    block
        .set_flags(MessageFlags::PROTOCOL | MessageFlags::HTML)
        .unwrap();
    block.add_tag("io").unwrap();
    block.add_tag("io").unwrap();
    block.add_tag("retry").unwrap();
    block.exit_break().unwrap();

    let message = context.next_message().unwrap();
    assert_eq!(message.id(), Some("parse_7"));
    assert_eq!(message.summary(), Some("Could not parse."));
    assert_eq!(message.details(), Some("expected 3 fields"));
    assert_eq!(message.severity(), Severity::Error);
    assert!(!message.is_internal());
    assert_eq!(message.tags().collect::<Vec<_>>(), ["io", "retry"]);
    assert_eq!(message.disposition(), Disposition::Break);
    assert_eq!(
        message.source_location().function,
        Some("test_message_contents")
    );
    assert_eq!(message.to_string(), "Could not parse.");

    let packed = message.type_and_flags().pack();
    assert_eq!(packed, 3 | 0x4000_0000 | 0x2000_0000);
    assert_eq!(TypeAndFlags::unpack(packed), Ok(message.type_and_flags()));
}

#[test]
fn test_loop_exits() {
    let (context, sink) = context();
    let frame = context.enter_frame();
    'outer: for row in 0..3 {
        for column in 0..3 {
            let block = frame.begin_info();
            block.set_id("cell").unwrap();
            if row == 1 {
                hexer::hexer_break!(block, 'outer);
            }
            if column == 0 {
                hexer::hexer_continue!(block);
            }
            hexer::hexer_continue!(block, 'outer);
        }
    }

    let dispositions: Vec<_> = std::iter::from_fn(|| context.next_message())
        .map(|message| message.disposition())
        .collect();
    assert_eq!(
        dispositions,
        [
            Disposition::Continue,
            Disposition::Continue,
            Disposition::Break,
        ]
    );
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_goto_exit() {
    let (context, sink) = context();
    let frame = context.enter_frame();
    let outer = frame.begin_info();
    outer.set_id("outer").unwrap();
    'done: {
        let block = frame.begin_error();
        block.set_id("failed").unwrap();
        hexer::hexer_goto!(block, 'done);
    }
    outer.end().unwrap();

    let message = context.next_message().unwrap();
    assert_eq!(message.id(), Some("failed"));
    assert_eq!(message.disposition(), Disposition::Goto);
    assert_eq!(
        context.next_message().unwrap().disposition(),
        Disposition::NormalEnd
    );
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_return_exit() {
    fn validate(context: &Context, value: u8) {
        let frame = context.enter_frame();
        let block = frame.begin_warning();
        if value > 100 {
            block.set_id("too_large").unwrap();
            hexer::hexer_return!(block);
        }
        block.cancel().unwrap();
    }

    let (context, sink) = context();
    validate(&context, 5);
    validate(&context, 200);

    let message = context.next_message().unwrap();
    assert_eq!(message.id(), Some("too_large"));
    assert_eq!(message.disposition(), Disposition::Return);
    assert!(context.next_message().is_none());
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_print_messages() {
    let (context, _sink) = context();
    let frame = context.enter_frame();
    leaf(&frame, "first");
    leaf(&frame, "second");

    let mut out = StringStream::new();
    let mut stream = StreamHandle::new(&mut out);
    assert_eq!(hexer::print_messages(&context, &mut stream), Ok(2));
    stream.finalize().unwrap();
    drop(stream);

    let headlines: Vec<_> = out
        .as_str()
        .lines()
        .filter(|line| !line.starts_with(' '))
        .collect();
    assert_eq!(headlines, ["info[first]:", "info[second]:"]);
    assert_eq!(context.message_count(), 0);
}

#[test]
fn test_stream_writes() {
    let (context, _sink) = context();
    let mut out = StringStream::new();
    let mut stream = StreamHandle::new(&mut out);
    assert_eq!(stream.write_text(&context, "a"), Ok(1));
    assert_eq!(stream.write_line(&context, "b"), Ok(2));
    assert_eq!(stream.write_fmt(&context, format_args!("{}-{}", 1, 2)), Ok(3));
    drop(stream);
    assert_eq!(out.as_str(), "ab\n1-2");
}

#[test]
fn test_current_context_is_per_thread() {
    let first = hexer::current_context(&Config::default());
    let again = hexer::current_context(&Config::builder().max_depth(1).build());
    assert!(Rc::ptr_eq(&first, &again));
    assert_eq!(again.config().max_depth(), first.config().max_depth());

    let other = std::thread::spawn(|| {
        let context = hexer::current_context(&Config::default());
        let frame = context.enter_frame();
        leaf(&frame, "elsewhere");
        context.message_count()
    })
    .join()
    .unwrap();
    assert_eq!(other, 1);
    assert_eq!(first.message_count(), 0);
}

#[test]
fn test_auto_traits() {
    static_assertions::assert_impl_all!(hexer::Message: Send, Sync, Clone);
    static_assertions::assert_impl_all!(hexer::HexerError: Send, Sync, Copy);
    static_assertions::assert_impl_all!(Config: Send, Sync, Clone);
    static_assertions::assert_not_impl_any!(Context: Send, Sync);
    static_assertions::assert_not_impl_any!(hexer::Block<'static>: Send, Sync);
}
