//! The block guard.

use alloc::borrow::Cow;
use core::{fmt, mem::ManuallyDrop};

use hexer_internals::{BlockSerial, Disposition, MessageFlags, Severity, SourceLocation};

use crate::{context::Context, error::HexerError};

/// An open message-building block.
///
/// Created by [`Frame::begin`](crate::Frame::begin). The block must be left
/// through one of its exits, which consume the guard and record how control
/// left the block:
///
/// | exit                  | disposition                  |
/// |-----------------------|------------------------------|
/// | [`end`]               | [`Disposition::NormalEnd`]   |
/// | [`exit_continue`]     | [`Disposition::Continue`]    |
/// | [`exit_break`]        | [`Disposition::Break`]       |
/// | [`exit_goto`]         | [`Disposition::Goto`]        |
/// | [`exit_return`]       | [`Disposition::Return`]      |
/// | [`end_and_return`]    | [`Disposition::Return`]      |
///
/// [`cancel`] closes the block without committing anything. A guard that is
/// dropped without any of these is a usage error: the drop is reported on
/// the debug sink and the block's message is discarded.
///
/// Message-building methods act on this block only while it is the innermost
/// open block of its context; otherwise they fail with
/// [`HexerError::BlockNotInnermost`].
///
/// [`end`]: Block::end
/// [`exit_continue`]: Block::exit_continue
/// [`exit_break`]: Block::exit_break
/// [`exit_goto`]: Block::exit_goto
/// [`exit_return`]: Block::exit_return
/// [`end_and_return`]: Block::end_and_return
/// [`cancel`]: Block::cancel
#[must_use = "a block must be closed through one of its exits"]
pub struct Block<'f> {
    context: &'f Context,
    /// `None` for an inert block that could not be opened.
    serial: Option<BlockSerial>,
}

impl<'f> Block<'f> {
    pub(crate) fn new(context: &'f Context, serial: Option<BlockSerial>) -> Self {
        Self { context, serial }
    }

    /// The block's identity, or `None` if the block is inert.
    pub fn serial(&self) -> Option<BlockSerial> {
        self.serial
    }

    /// Returns `true` if the depth limit prevented this block from opening.
    pub fn is_inert(&self) -> bool {
        self.serial.is_none()
    }

    /// Sets the message id.
    #[track_caller]
    pub fn set_id(&self, id: impl Into<Cow<'static, str>>) -> Result<(), HexerError> {
        self.innermost()?;
        self.context.set_id(id)
    }

    /// Sets the message summary.
    #[track_caller]
    pub fn set_summary(&self, summary: impl Into<Cow<'static, str>>) -> Result<(), HexerError> {
        self.innermost()?;
        self.context.set_summary(summary)
    }

    /// Sets the message details. Prefer the [`details!`](crate::details)
    /// macro.
    #[track_caller]
    pub fn set_details_fmt(&self, args: fmt::Arguments<'_>) -> Result<(), HexerError> {
        self.innermost()?;
        self.context.set_details_fmt(args)
    }

    /// Changes the message severity.
    #[track_caller]
    pub fn set_severity(&self, severity: Severity) -> Result<(), HexerError> {
        self.innermost()?;
        self.context.set_severity(severity)
    }

    /// Replaces the message flags.
    #[track_caller]
    pub fn set_flags(&self, flags: MessageFlags) -> Result<(), HexerError> {
        self.innermost()?;
        self.context.set_flags(flags)
    }

    /// Adds a tag to the message.
    #[track_caller]
    pub fn add_tag(&self, tag: impl Into<Cow<'static, str>>) -> Result<(), HexerError> {
        self.innermost()?;
        self.context.add_tag(tag)
    }

    /// Commits the message now; see [`Context::commit_now`].
    #[track_caller]
    pub fn commit_now(&self) -> Result<(), HexerError> {
        self.innermost()?;
        self.context.commit_now()
    }

    /// Leaves the block at the end of its body.
    #[track_caller]
    pub fn end(self) -> Result<(), HexerError> {
        self.exit(Disposition::NormalEnd, SourceLocation::caller())
    }

    /// Leaves the block through a `continue`.
    #[track_caller]
    pub fn exit_continue(self) -> Result<(), HexerError> {
        self.exit(Disposition::Continue, SourceLocation::caller())
    }

    /// Leaves the block through a `break`.
    #[track_caller]
    pub fn exit_break(self) -> Result<(), HexerError> {
        self.exit(Disposition::Break, SourceLocation::caller())
    }

    /// Leaves the block through a jump to a label outside it.
    #[track_caller]
    pub fn exit_goto(self) -> Result<(), HexerError> {
        self.exit(Disposition::Goto, SourceLocation::caller())
    }

    /// Leaves the block through a `return` from the enclosing function.
    #[track_caller]
    pub fn exit_return(self) -> Result<(), HexerError> {
        self.exit(Disposition::Return, SourceLocation::caller())
    }

    /// Leaves the block through a `return` and passes `value` through.
    ///
    /// ```
    /// # use hexer::{Config, Context};
    /// fn lookup(context: &Context) -> Option<u8> {
    ///     let frame = context.enter_frame();
    ///     let block = frame.begin_warning();
    ///     block.set_id("lookup_miss").unwrap();
    ///     block.end_and_return(None)
    /// }
    /// # let context = Context::new(&Config::default());
    /// # assert_eq!(lookup(&context), None);
    /// # assert_eq!(context.next_message().unwrap().disposition(), hexer::Disposition::Return);
    /// ```
    #[track_caller]
    pub fn end_and_return<T>(self, value: T) -> T {
        let _ = self.exit(Disposition::Return, SourceLocation::caller());
        value
    }

    /// Leaves the block with an explicit disposition and location.
    pub fn exit(self, disposition: Disposition, location: SourceLocation) -> Result<(), HexerError> {
        let this = ManuallyDrop::new(self);
        match this.serial {
            Some(serial) => this.context.close_block(serial, disposition, location),
            None => Ok(()),
        }
    }

    /// Closes the block without committing a message.
    #[track_caller]
    pub fn cancel(self) -> Result<(), HexerError> {
        let this = ManuallyDrop::new(self);
        match this.serial {
            Some(serial) => this
                .context
                .cancel_block(serial, SourceLocation::caller()),
            None => Ok(()),
        }
    }

    /// Drops the block through the mismatch path, as a raw `return` would.
    #[track_caller]
    pub fn discard(self) {
        let this = ManuallyDrop::new(self);
        if let Some(serial) = this.serial {
            this.context.discard_block(serial, SourceLocation::caller());
        }
    }

    #[track_caller]
    fn innermost(&self) -> Result<(), HexerError> {
        let Some(serial) = self.serial else {
            return Err(HexerError::DepthExceeded {
                limit: self.context.config().max_depth(),
            });
        };
        if self.context.innermost_block() == Some(serial) {
            return Ok(());
        }
        self.context.report_not_innermost(serial, SourceLocation::caller());
        Err(HexerError::BlockNotInnermost)
    }
}

impl fmt::Debug for Block<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("serial", &self.serial)
            .finish()
    }
}

impl Drop for Block<'_> {
    fn drop(&mut self) {
        if let Some(serial) = self.serial {
            self.context.discard_block(serial, SourceLocation::UNKNOWN);
        }
    }
}
