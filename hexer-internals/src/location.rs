//! Source coordinates recorded at block open and close.

use core::fmt;

/// A file/function/line triple.
///
/// The function name is optional because `#[track_caller]` only provides the
/// file and line; the `here!()` macro in the main crate fills it in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// The source file path.
    pub file: &'static str,
    /// The enclosing function, when known.
    pub function: Option<&'static str>,
    /// The 1-based line number.
    pub line: u32,
}

impl SourceLocation {
    /// Placeholder used for locations that were never recorded.
    pub const UNKNOWN: SourceLocation = SourceLocation {
        file: "N/A",
        function: None,
        line: 0,
    };

    /// Creates a location with a known function name.
    #[inline]
    pub const fn new(file: &'static str, function: &'static str, line: u32) -> Self {
        Self {
            file,
            function: Some(function),
            line,
        }
    }

    /// Captures the caller's file and line.
    #[track_caller]
    #[inline]
    pub fn caller() -> Self {
        let location = core::panic::Location::caller();
        Self {
            file: location.file(),
            function: None,
            line: location.line(),
        }
    }

    /// Returns `true` for [`SourceLocation::UNKNOWN`].
    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.function {
            Some(function) => write!(f, "{}:{} ({})", self.file, self.line, function),
            None => write!(f, "{}:{}", self.file, self.line),
        }
    }
}

impl From<&'static core::panic::Location<'static>> for SourceLocation {
    fn from(location: &'static core::panic::Location<'static>) -> Self {
        Self {
            file: location.file(),
            function: None,
            line: location.line(),
        }
    }
}
