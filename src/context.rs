//! The per-thread engine: block stack, message queue and feedback dispatch.
//!
//! A [`Context`] is the owner of everything a thread records. Blocks are
//! opened with [`Context::begin_block`] (or, more conveniently, through a
//! [`Frame`]) and closed with [`Context::end_block`]. Every close event is
//! reified immediately: the block stack is walked from the innermost block
//! outward to the block the event belongs to, that block's message is
//! committed, and anything left open above it is reported as a mismatch on
//! the debug sink and discarded. Because commits happen exactly when close
//! events happen, queue order is close order.
//!
//! Message-building calls ([`set_id`], [`set_summary`], [`set_details_fmt`],
//! ...) only ever touch the innermost open block.
//!
//! The context is single-writer: it uses interior mutability and is neither
//! `Send` nor `Sync`. Each thread gets its own through
//! [`current_context`] (with the `std` feature) or creates one explicitly.
//!
//! [`set_id`]: Context::set_id
//! [`set_summary`]: Context::set_summary
//! [`set_details_fmt`]: Context::set_details_fmt

use alloc::{
    borrow::Cow,
    collections::VecDeque,
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::{
    cell::{Cell, Ref, RefCell, RefMut},
    fmt,
};

use hexer_internals::{
    AbandonReason, AbandonedBlock, BlockSerial, BlockStack, CloseTarget, ClosedBlock, Disposition,
    FrameCounter, FrameId, MessageFlags, Severity, SourceLocation,
};

use crate::{
    config::Config,
    error::HexerError,
    extensions::Extensions,
    feedback::FeedbackHandler,
    frame::Frame,
    message::{InternalMessage, Message, PendingMessage, TAG_DATA_LOSS},
    queue::MessageQueue,
};

/// Mutable engine state guarded by one `RefCell`.
///
/// The borrow is never held while user code (feedback handlers) runs.
#[derive(Debug)]
struct State {
    stack: BlockStack<PendingMessage>,
    queue: MessageQueue,
}

/// Messages waiting to be handed to the feedback handler.
#[derive(Debug, Default)]
struct Dispatch {
    backlog: RefCell<VecDeque<Message>>,
    active: Cell<bool>,
}

/// Resets the dispatch flag even if a handler panics.
struct DispatchGuard<'a>(&'a Cell<bool>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// What a message-building call found at the top of the stack.
enum Target {
    Applied(Result<(), HexerError>),
    Discarded,
    NoBlock,
}

/// The owner of one block stack and one message queue.
pub struct Context {
    config: Config,
    frames: FrameCounter,
    state: RefCell<State>,
    dispatch: Dispatch,
    handler: RefCell<FeedbackHandler>,
    extensions: RefCell<Extensions>,
}

impl Context {
    /// Creates a context using the collaborators of `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            frames: FrameCounter::new(),
            state: RefCell::new(State {
                stack: BlockStack::with_max_depth(config.max_depth()),
                queue: MessageQueue::default(),
            }),
            dispatch: Dispatch::default(),
            handler: RefCell::new(FeedbackHandler::noop()),
            extensions: RefCell::new(Extensions::new()),
        }
    }

    /// The configuration this context was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Enters a new function activation.
    ///
    /// Every call returns a frame with a fresh [`FrameId`], so recursive
    /// calls of one function never share an identity.
    #[track_caller]
    pub fn enter_frame(&self) -> Frame<'_> {
        Frame::new(self, self.frames.next_id(), SourceLocation::caller())
    }

    /// Allocates a frame id without creating a [`Frame`] guard.
    ///
    /// For callers driving the low-level API; see [`Context::exit_frame`].
    pub fn new_frame_id(&self) -> FrameId {
        self.frames.next_id()
    }

    /// Number of open blocks.
    pub fn depth(&self) -> usize {
        self.state.borrow().stack.depth()
    }

    /// Serial of the innermost open block.
    pub fn innermost_block(&self) -> Option<BlockSerial> {
        self.state.borrow().stack.innermost().map(|block| block.serial)
    }

    // ----- block lifecycle -----

    /// Opens a block owned by activation `frame`.
    ///
    /// Fails with [`HexerError::DepthExceeded`] when the configured depth is
    /// reached; the failure is also committed as an internal error message.
    pub fn begin_block(
        &self,
        frame: FrameId,
        severity: Severity,
        location: SourceLocation,
    ) -> Result<BlockSerial, HexerError> {
        let pushed = self.state.borrow_mut().stack.push(
            frame,
            location,
            PendingMessage::new(severity, location),
        );

        pushed.map_err(|exceeded| {
            self.report_internal(
                InternalMessage::new(
                    Severity::Error,
                    "depth_exceeded",
                    "Block nesting depth limit exceeded.",
                    location,
                ),
                format!(
                    "A {severity} block could not be opened because {} blocks are already open. \
                     Messages written in it will not be recorded.",
                    exceeded.limit
                ),
            );
            HexerError::from(exceeded)
        })
    }

    /// Closes the innermost block opened by `frame`.
    ///
    /// Blocks of other activations still open above it were left behind by a
    /// callee and are reported on the debug sink and discarded. If `frame`
    /// has no open block, the close is reported and
    /// [`HexerError::UnmatchedClose`] is returned.
    pub fn end_block(
        &self,
        frame: FrameId,
        disposition: Disposition,
        location: SourceLocation,
    ) -> Result<(), HexerError> {
        self.close(CloseTarget::Innermost(frame), disposition, location)
    }

    /// Closes one specific block.
    pub fn close_block(
        &self,
        serial: BlockSerial,
        disposition: Disposition,
        location: SourceLocation,
    ) -> Result<(), HexerError> {
        self.close(CloseTarget::Block(serial), disposition, location)
    }

    /// Closes one specific block without committing its message.
    ///
    /// This is the sanctioned way to leave a block that turned out to have
    /// nothing to report.
    pub fn cancel_block(
        &self,
        serial: BlockSerial,
        location: SourceLocation,
    ) -> Result<(), HexerError> {
        let outcome = self.state.borrow_mut().stack.close(
            CloseTarget::Block(serial),
            Disposition::NormalEnd,
            location,
        );
        self.report_abandoned(outcome.abandoned, location);
        match outcome.closed {
            Some(closed) if closed.payload.is_committed() => {
                self.finish(closed);
                Ok(())
            }
            Some(closed) => {
                self.release(closed.payload.charged());
                Ok(())
            }
            None => Err(HexerError::UnmatchedClose),
        }
    }

    /// Drops one block without a close event: the mismatch path.
    ///
    /// Nothing is committed for the block.
    pub fn discard_block(&self, serial: BlockSerial, location: SourceLocation) {
        let abandoned = self
            .state
            .borrow_mut()
            .stack
            .abandon(serial, AbandonReason::Discarded);
        self.report_abandoned(abandoned, location);
    }

    /// Ends activation `frame`, discarding any block it left open.
    pub fn exit_frame(&self, frame: FrameId, location: SourceLocation) {
        let abandoned = self.state.borrow_mut().stack.abandon_frame(frame);
        self.report_abandoned(abandoned, location);
    }

    fn close(
        &self,
        target: CloseTarget,
        disposition: Disposition,
        location: SourceLocation,
    ) -> Result<(), HexerError> {
        let outcome = self
            .state
            .borrow_mut()
            .stack
            .close(target, disposition, location);
        self.report_abandoned(outcome.abandoned, location);

        match outcome.closed {
            Some(closed) => {
                self.finish(closed);
                Ok(())
            }
            None => {
                self.debug(format_args!(
                    "{location}: block close ({disposition}) does not match any open block; \
                     nothing was committed"
                ));
                Err(HexerError::UnmatchedClose)
            }
        }
    }

    /// Commits whatever a matched block leaves behind.
    fn finish(&self, closed: ClosedBlock<PendingMessage>) {
        let ClosedBlock {
            opened_at,
            closed_at,
            disposition,
            mut payload,
            ..
        } = closed;

        if payload.is_committed() {
            let discarded = payload.discarded();
            if !discarded.is_empty() {
                let details = format!(
                    "The block opened at {opened_at} committed its message early. {} later \
                     operation(s) had no effect: {}. The block closed at {closed_at}.",
                    discarded.len(),
                    discarded.join(", ")
                );
                self.report_internal(
                    InternalMessage::new(
                        Severity::Warning,
                        "data_loss",
                        "Message modified after it was committed.",
                        closed_at,
                    )
                    .tag(TAG_DATA_LOSS),
                    details,
                );
            }
            self.release(payload.charged());
        } else {
            if !payload.is_touched() {
                self.debug(format_args!(
                    "{closed_at}: block opened at {opened_at} closed ({disposition}) without \
                     setting an id, summary or details"
                ));
            }
            let (message, charge) = payload.take(closed_at, disposition);
            self.commit(message, charge);
        }
    }

    fn report_abandoned(
        &self,
        abandoned: Vec<AbandonedBlock<PendingMessage>>,
        location: SourceLocation,
    ) {
        for AbandonedBlock { reason, block } in abandoned {
            self.release(block.payload.charged());
            let fate = if block.payload.is_committed() {
                "its message had already been committed"
            } else {
                "its message was discarded"
            };
            self.debug(format_args!(
                "{location}: block opened at {} by frame {} {}; {fate}",
                block.opened_at,
                block.frame,
                reason.describe(),
            ));

            let discarded = block.payload.discarded();
            if !discarded.is_empty() {
                self.debug(format_args!(
                    "data loss: {} operation(s) on the block opened at {} had no effect after \
                     commit_now: {}",
                    discarded.len(),
                    block.opened_at,
                    discarded.join(", "),
                ));
            }
        }
    }

    // ----- message building -----

    /// Sets the id of the innermost block's message.
    #[track_caller]
    pub fn set_id(&self, id: impl Into<Cow<'static, str>>) -> Result<(), HexerError> {
        let id = id.into();
        self.apply("set_id", |message, allocator| message.set_id(id, allocator))
    }

    /// Sets the summary of the innermost block's message.
    #[track_caller]
    pub fn set_summary(&self, summary: impl Into<Cow<'static, str>>) -> Result<(), HexerError> {
        let summary = summary.into();
        self.apply("set_summary", |message, allocator| {
            message.set_summary(summary, allocator)
        })
    }

    /// Sets the details of the innermost block's message.
    ///
    /// When the allocator refuses the full text, it is shortened until it
    /// fits and the message is tagged `"truncated"`.
    #[track_caller]
    pub fn set_details_fmt(&self, args: fmt::Arguments<'_>) -> Result<(), HexerError> {
        let details = match args.as_str() {
            Some(text) => text.to_string(),
            None => alloc::fmt::format(args),
        };
        self.apply("set_details", |message, allocator| {
            message.set_details(details, allocator);
            Ok(())
        })
    }

    /// Changes the severity of the innermost block's message.
    #[track_caller]
    pub fn set_severity(&self, severity: Severity) -> Result<(), HexerError> {
        self.apply("set_severity", |message, _| {
            message.set_severity(severity);
            Ok(())
        })
    }

    /// Replaces the flags of the innermost block's message.
    #[track_caller]
    pub fn set_flags(&self, flags: MessageFlags) -> Result<(), HexerError> {
        self.apply("set_flags", |message, _| {
            message.set_flags(flags);
            Ok(())
        })
    }

    /// Adds a tag to the innermost block's message.
    #[track_caller]
    pub fn add_tag(&self, tag: impl Into<Cow<'static, str>>) -> Result<(), HexerError> {
        let tag = tag.into();
        self.apply("add_tag", |message, allocator| message.add_tag(tag, allocator))
    }

    /// Commits the innermost block's message now.
    ///
    /// The block stays open. Further message-building calls on it have no
    /// effect; when it closes, a `data_loss` warning lists them.
    #[track_caller]
    pub fn commit_now(&self) -> Result<(), HexerError> {
        let location = SourceLocation::caller();
        let taken = {
            let mut state = self.state.borrow_mut();
            match state.stack.innermost_mut() {
                None => None,
                Some(block) if block.payload.is_committed() => {
                    block.payload.record_discarded("commit_now");
                    return Ok(());
                }
                Some(block) => Some(block.payload.take(location, Disposition::Open)),
            }
        };

        match taken {
            Some((message, charge)) => {
                self.commit(message, charge);
                Ok(())
            }
            None => {
                self.report_no_block("commit_now", location);
                Err(HexerError::NoOpenBlock)
            }
        }
    }

    #[track_caller]
    fn apply(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut PendingMessage, &dyn crate::allocator::Allocator) -> Result<(), HexerError>,
    ) -> Result<(), HexerError> {
        let location = SourceLocation::caller();
        let target = {
            let mut state = self.state.borrow_mut();
            match state.stack.innermost_mut() {
                None => Target::NoBlock,
                Some(block) if block.payload.is_committed() => {
                    block.payload.record_discarded(operation);
                    Target::Discarded
                }
                Some(block) => Target::Applied(f(&mut block.payload, self.config.allocator())),
            }
        };

        match target {
            Target::Applied(result) => result,
            Target::Discarded => Ok(()),
            Target::NoBlock => {
                self.report_no_block(operation, location);
                Err(HexerError::NoOpenBlock)
            }
        }
    }

    fn report_no_block(&self, operation: &'static str, location: SourceLocation) {
        self.report_internal(
            InternalMessage::new(
                Severity::Error,
                "no_open_block",
                "Message operation called outside of any block.",
                location,
            ),
            format!("{operation}() was called at {location} while no block was open."),
        );
    }

    pub(crate) fn report_not_innermost(&self, serial: BlockSerial, location: SourceLocation) {
        let opened_at = {
            let state = self.state.borrow();
            state.stack.get(serial).map(|block| block.opened_at)
        };
        let details = match opened_at {
            Some(opened_at) => format!(
                "The block opened at {opened_at} was used at {location} while a block opened \
                 after it was still open. The call had no effect."
            ),
            None => format!(
                "A block that is no longer open was used at {location}. The call had no effect."
            ),
        };
        self.report_internal(
            InternalMessage::new(
                Severity::Warning,
                "block_not_innermost",
                "Block used while it was not the innermost open block.",
                location,
            ),
            details,
        );
    }

    // ----- commit and dispatch -----

    fn commit(&self, message: Message, charge: usize) {
        self.state.borrow_mut().queue.push(message.clone(), charge);
        self.deliver(message);
    }

    fn deliver(&self, message: Message) {
        self.dispatch.backlog.borrow_mut().push_back(message);
        if self.dispatch.active.replace(true) {
            return;
        }
        let _guard = DispatchGuard(&self.dispatch.active);

        loop {
            let next = self.dispatch.backlog.borrow_mut().pop_front();
            let Some(message) = next else {
                break;
            };
            let handler = self.handler.borrow().clone();
            handler.call(self, &message);
        }
    }

    /// Returns `true` while the feedback handler is being run.
    pub fn is_dispatching(&self) -> bool {
        self.dispatch.active.get()
    }

    /// Commits an engine-raised message, or writes it to the debug sink when
    /// message delivery is already in progress.
    pub(crate) fn report_internal(&self, message: InternalMessage, details: String) {
        if self.is_dispatching() {
            self.debug(format_args!(
                "internal {} raised during message delivery: {details}",
                message.id()
            ));
            return;
        }
        let (message, charge) = message.build(details, self.config.allocator());
        self.commit(message, charge);
    }

    fn release(&self, bytes: usize) {
        if bytes > 0 {
            self.config.allocator().release(bytes);
        }
    }

    /// Writes one line through this context's debug sink.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.config.debug(args);
    }

    // ----- draining -----

    /// Number of queued messages.
    pub fn message_count(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Number of queued Error-severity messages.
    pub fn error_count(&self) -> usize {
        self.state.borrow().queue.count_severity(Severity::Error)
    }

    /// Removes and returns the oldest queued message.
    pub fn next_message(&self) -> Option<Message> {
        let (message, charge) = self.state.borrow_mut().queue.pop()?;
        self.release(charge);
        Some(message)
    }

    /// Returns the oldest queued message without removing it.
    pub fn peek_message(&self) -> Option<Message> {
        self.state.borrow().queue.front().cloned()
    }

    /// Removes every queued message. Returns how many were removed.
    pub fn clear_messages(&self) -> usize {
        let (count, charge) = self.state.borrow_mut().queue.clear();
        self.release(charge);
        count
    }

    // ----- feedback -----

    /// Installs `handler`, or the no-op handler for `None`.
    pub fn set_feedback_handler(&self, handler: Option<FeedbackHandler>) {
        *self.handler.borrow_mut() = handler.unwrap_or_default();
    }

    /// The installed handler. Never unset: the default is the no-op handler.
    pub fn feedback_handler(&self) -> FeedbackHandler {
        self.handler.borrow().clone()
    }

    // ----- extensions -----

    /// Caller-defined data attached to this context.
    pub fn extensions(&self) -> Ref<'_, Extensions> {
        self.extensions.borrow()
    }

    /// Mutable access to the caller-defined data.
    pub fn extensions_mut(&self) -> RefMut<'_, Extensions> {
        self.extensions.borrow_mut()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Context")
            .field("depth", &state.stack.depth())
            .field("messages", &state.queue.len())
            .field("handler", &*self.handler.borrow())
            .finish_non_exhaustive()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let abandoned = state.stack.drain(AbandonReason::ContextDropped);
        let (_, queued) = state.queue.clear();
        self.release(queued);
        self.report_abandoned(abandoned, SourceLocation::UNKNOWN);
    }
}

#[cfg(feature = "std")]
std::thread_local! {
    static CURRENT: core::cell::OnceCell<alloc::rc::Rc<Context>> =
        const { core::cell::OnceCell::new() };
}

/// Returns this thread's context, creating it from `config` on first use.
///
/// Later calls on the same thread return the same context and ignore their
/// argument.
#[cfg(feature = "std")]
pub fn current_context(config: &Config) -> alloc::rc::Rc<Context> {
    CURRENT.with(|current| {
        current
            .get_or_init(|| alloc::rc::Rc::new(Context::new(config)))
            .clone()
    })
}
