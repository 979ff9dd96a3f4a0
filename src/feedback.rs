//! Real-time delivery of committed messages.
//!
//! Every committed message is pushed to the context's queue *and* passed to
//! the context's [`FeedbackHandler`], in commit order. A handler may itself
//! open blocks and commit messages on the same context; those messages are
//! queued immediately and handed to the handler once the current call
//! returns, so the handler still sees every message exactly once.
//!
//! ```
//! use std::{cell::RefCell, rc::Rc};
//!
//! use hexer::{Config, Context, FeedbackHandler, Severity};
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let context = Context::new(&Config::default());
//! let sink = seen.clone();
//! context.set_feedback_handler(Some(FeedbackHandler::new(move |_, message| {
//!     sink.borrow_mut().push(message.id().map(String::from));
//! })));
//!
//! let frame = context.enter_frame();
//! let block = frame.begin(Severity::Info);
//! block.set_id("ready").unwrap();
//! block.end().unwrap();
//!
//! assert_eq!(*seen.borrow(), [Some("ready".to_string())]);
//! assert_eq!(context.message_count(), 1);
//! ```

use alloc::rc::Rc;
use core::fmt;

use crate::{context::Context, message::Message};

type Callback = dyn Fn(&Context, &Message);

/// Callback invoked for every committed message.
///
/// User data is whatever the closure captures. Cloning is cheap.
#[derive(Clone, Default)]
pub struct FeedbackHandler {
    callback: Option<Rc<Callback>>,
}

impl FeedbackHandler {
    /// Wraps a closure.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Context, &Message) + 'static,
    {
        Self {
            callback: Some(Rc::new(callback)),
        }
    }

    /// The handler that ignores every message.
    pub const fn noop() -> Self {
        Self { callback: None }
    }

    /// Returns `true` for [`FeedbackHandler::noop`].
    pub fn is_noop(&self) -> bool {
        self.callback.is_none()
    }

    /// Returns `true` if both handlers wrap the same closure.
    pub fn ptr_eq(&self, other: &FeedbackHandler) -> bool {
        match (&self.callback, &other.callback) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    pub(crate) fn call(&self, context: &Context, message: &Message) {
        if let Some(callback) = &self.callback {
            callback(context, message);
        }
    }
}

impl fmt::Debug for FeedbackHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_noop() {
            f.write_str("FeedbackHandler(noop)")
        } else {
            f.write_str("FeedbackHandler(..)")
        }
    }
}
