/// Expands to the [`SourceLocation`](crate::SourceLocation) of the
/// invocation, including the enclosing function's name.
///
/// ```
/// fn load() -> hexer::SourceLocation {
///     hexer::here!()
/// }
///
/// let location = load();
/// assert_eq!(location.function, Some("load"));
/// assert!(location.file.ends_with(".rs"));
/// ```
#[macro_export]
macro_rules! here {
    () => {
        $crate::SourceLocation::new(
            $crate::__private::file!(),
            $crate::function_name!(),
            $crate::__private::line!(),
        )
    };
}

/// Expands to the name of the enclosing function as a `&'static str`.
///
/// Closures report the function they are defined in.
#[macro_export]
macro_rules! function_name {
    () => {{
        fn __hexer_marker() {}
        $crate::__private::function_name_of($crate::__private::type_name_of(__hexer_marker))
    }};
}

/// Opens an Info block on a [`Frame`](crate::Frame), recording the
/// enclosing function.
///
/// ```
/// use hexer::{Config, Context};
///
/// let context = Context::new(&Config::default());
/// let frame = context.enter_frame();
/// let block = hexer::begin_info!(frame);
/// block.set_id("started").unwrap();
/// block.end().unwrap();
/// assert!(context.next_message().unwrap().source_location().function.is_some());
/// ```
#[macro_export]
macro_rules! begin_info {
    ($frame:expr) => {
        $frame.begin_at($crate::Severity::Info, $crate::here!())
    };
}

/// Opens a Warning block; see [`begin_info!`].
#[macro_export]
macro_rules! begin_warning {
    ($frame:expr) => {
        $frame.begin_at($crate::Severity::Warning, $crate::here!())
    };
}

/// Opens an Error block; see [`begin_info!`].
#[macro_export]
macro_rules! begin_error {
    ($frame:expr) => {
        $frame.begin_at($crate::Severity::Error, $crate::here!())
    };
}

/// Sets the details of a block's (or a context's innermost) message from a
/// format string.
///
/// Evaluates to the `Result` of the call.
#[macro_export]
macro_rules! details {
    ($target:expr, $($arg:tt)*) => {
        $target.set_details_fmt($crate::__private::format_args!($($arg)*))
    };
}

/// Closes a block with [`Disposition::Break`](crate::Disposition::Break)
/// and breaks out of the enclosing (or labelled) loop.
///
/// ```
/// use hexer::{Config, Context, Disposition};
///
/// let context = Context::new(&Config::default());
/// let frame = context.enter_frame();
/// for attempt in 0.. {
///     let block = frame.begin_info();
///     block.set_id("attempt").unwrap();
///     if attempt == 2 {
///         hexer::hexer_break!(block);
///     }
///     hexer::hexer_continue!(block);
/// }
///
/// let dispositions: Vec<_> = std::iter::from_fn(|| context.next_message())
///     .map(|message| message.disposition())
///     .collect();
/// assert_eq!(
///     dispositions,
///     [Disposition::Continue, Disposition::Continue, Disposition::Break]
/// );
/// ```
#[macro_export]
macro_rules! hexer_break {
    ($block:expr) => {{
        let _ = $block.exit_break();
        break;
    }};
    ($block:expr, $label:lifetime) => {{
        let _ = $block.exit_break();
        break $label;
    }};
}

/// Closes a block with
/// [`Disposition::Continue`](crate::Disposition::Continue) and continues the
/// enclosing (or labelled) loop.
#[macro_export]
macro_rules! hexer_continue {
    ($block:expr) => {{
        let _ = $block.exit_continue();
        continue;
    }};
    ($block:expr, $label:lifetime) => {{
        let _ = $block.exit_continue();
        continue $label;
    }};
}

/// Closes a block with [`Disposition::Goto`](crate::Disposition::Goto) and
/// jumps to the end of a labelled block.
///
/// ```
/// use hexer::{Config, Context, Disposition};
///
/// let context = Context::new(&Config::default());
/// let frame = context.enter_frame();
/// 'cleanup: {
///     let block = frame.begin_error();
///     block.set_id("open_failed").unwrap();
///     hexer::hexer_goto!(block, 'cleanup);
/// }
/// assert_eq!(context.next_message().unwrap().disposition(), Disposition::Goto);
/// ```
#[macro_export]
macro_rules! hexer_goto {
    ($block:expr, $label:lifetime) => {{
        let _ = $block.exit_goto();
        break $label;
    }};
}

/// Closes a block with [`Disposition::Return`](crate::Disposition::Return)
/// and returns from the enclosing function.
///
/// ```
/// use hexer::{Config, Context};
///
/// fn check(context: &Context, value: i32) -> Result<i32, ()> {
///     let frame = context.enter_frame();
///     let block = frame.begin_error();
///     if value < 0 {
///         block.set_id("negative").unwrap();
///         hexer::hexer_return!(block, Err(()));
///     }
///     block.cancel().unwrap();
///     Ok(value)
/// }
///
/// let context = Context::new(&Config::default());
/// assert_eq!(check(&context, -1), Err(()));
/// assert_eq!(check(&context, 1), Ok(1));
/// assert_eq!(context.message_count(), 1);
/// ```
#[macro_export]
macro_rules! hexer_return {
    ($block:expr) => {{
        let _ = $block.exit_return();
        return;
    }};
    ($block:expr, $value:expr) => {
        return $block.end_and_return($value)
    };
}

/// Writes a line to the process-wide debug sink.
///
/// Usable without any context, for example during early initialization.
#[macro_export]
macro_rules! debug_print {
    ($($arg:tt)*) => {
        $crate::debug::debug_print($crate::__private::format_args!($($arg)*))
    };
}
