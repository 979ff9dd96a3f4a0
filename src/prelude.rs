//! Commonly used items for convenient importing.
//!
//! ```
//! use hexer::prelude::*;
//!
//! fn open(context: &Context, path: &str) -> Result<(), HexerError> {
//!     let frame = context.enter_frame();
//!     let block = begin_error!(frame);
//!     block.set_id("open_failed")?;
//!     details!(block, "could not open {path}")?;
//!     block.end()
//! }
//!
//! let context = Context::new(&Config::default());
//! open(&context, "settings.toml").unwrap();
//! assert_eq!(context.error_count(), 1);
//! ```

pub use crate::{
    Block, Config, Context, Disposition, FeedbackHandler, Frame, HexerError, Message,
    MessageFlags, Severity, begin_error, begin_info, begin_warning, details, here, hexer_break,
    hexer_continue, hexer_goto, hexer_return,
};
