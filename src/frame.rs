//! Activation tokens.

use core::fmt;

use hexer_internals::{FrameId, Severity, SourceLocation};

use crate::{block::Block, context::Context};

/// One activation of one function, as seen by a [`Context`].
///
/// Create one at the top of every function that opens blocks. Blocks opened
/// through the frame are owned by it; when the frame is dropped, any block it
/// still owns was left open by a raw `return` and is reported on the debug
/// sink and discarded.
///
/// ```
/// use hexer::{Config, Context, Severity};
///
/// fn parse(context: &Context, input: &str) -> Option<u32> {
///     let frame = context.enter_frame();
///     let block = frame.begin(Severity::Error);
///     match input.parse() {
///         Ok(value) => {
///             block.cancel().unwrap();
///             Some(value)
///         }
///         Err(_) => {
///             block.set_id("parse_failed").unwrap();
///             block.end_and_return(None)
///         }
///     }
/// }
///
/// let context = Context::new(&Config::default());
/// assert_eq!(parse(&context, "12"), Some(12));
/// assert_eq!(parse(&context, "x"), None);
/// assert_eq!(context.message_count(), 1);
/// ```
pub struct Frame<'c> {
    context: &'c Context,
    id: FrameId,
    entered_at: SourceLocation,
}

impl<'c> Frame<'c> {
    pub(crate) fn new(context: &'c Context, id: FrameId, entered_at: SourceLocation) -> Self {
        Self {
            context,
            id,
            entered_at,
        }
    }

    /// The activation's identity.
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// The context this frame belongs to.
    pub fn context(&self) -> &'c Context {
        self.context
    }

    /// Where the frame was entered.
    pub fn entered_at(&self) -> SourceLocation {
        self.entered_at
    }

    /// Opens a block at the caller's location.
    #[track_caller]
    pub fn begin(&self, severity: Severity) -> Block<'_> {
        self.begin_at(severity, SourceLocation::caller())
    }

    /// Opens a block at `location`.
    ///
    /// If the depth limit is reached the returned block is inert: its
    /// operations do nothing and report [`HexerError::DepthExceeded`].
    ///
    /// [`HexerError::DepthExceeded`]: crate::HexerError::DepthExceeded
    pub fn begin_at(&self, severity: Severity, location: SourceLocation) -> Block<'_> {
        let serial = self.context.begin_block(self.id, severity, location).ok();
        Block::new(self.context, serial)
    }

    /// Opens an Info block at the caller's location.
    #[track_caller]
    pub fn begin_info(&self) -> Block<'_> {
        self.begin(Severity::Info)
    }

    /// Opens a Warning block at the caller's location.
    #[track_caller]
    pub fn begin_warning(&self) -> Block<'_> {
        self.begin(Severity::Warning)
    }

    /// Opens an Error block at the caller's location.
    #[track_caller]
    pub fn begin_error(&self) -> Block<'_> {
        self.begin(Severity::Error)
    }
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id)
            .field("entered_at", &self.entered_at)
            .finish()
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        self.context.exit_frame(self.id, self.entered_at);
    }
}
