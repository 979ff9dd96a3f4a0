//! Message severity and flag bits.
//!
//! Severity and flags share a single `u32` so that a message's classification
//! can be stored or transmitted as one word. The severity occupies the low
//! bits and grows upwards; the flags occupy the high bits and grow downwards.
//! The bits between [`TYPE_MASK`] and [`FLAG_MASK`] are reserved.
//!
//! | Bits            | Meaning                        |
//! |-----------------|--------------------------------|
//! | `0x0000_003F`   | Severity (`1`, `2` or `3`)     |
//! | `0x8000_0000`   | [`MessageFlags::INTERNAL`]     |
//! | `0x4000_0000`   | [`MessageFlags::PROTOCOL`]     |
//! | `0x2000_0000`   | [`MessageFlags::HTML`]         |

use core::{fmt, ops};

/// Mask selecting the severity bits of a packed word.
pub const TYPE_MASK: u32 = 0x0000_003F;

/// Mask selecting the flag bits of a packed word.
pub const FLAG_MASK: u32 = 0xFFF0_0000;

/// How serious a message is.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum Severity {
    /// Informational feedback.
    Info = 1,
    /// Something unexpected that did not stop the operation.
    Warning = 2,
    /// The operation failed.
    Error = 3,
}

impl Severity {
    /// All severities, from least to most serious.
    pub const ALL: [Severity; 3] = [Severity::Info, Severity::Warning, Severity::Error];

    /// Returns the packed representation of this severity.
    #[inline]
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Decodes a severity from the low bits of a packed word.
    ///
    /// Bits outside [`TYPE_MASK`] are ignored.
    #[inline]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits & TYPE_MASK {
            1 => Some(Severity::Info),
            2 => Some(Severity::Warning),
            3 => Some(Severity::Error),
            _ => None,
        }
    }

    /// Lowercase name used when printing messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of message flags.
///
/// Only bits inside [`FLAG_MASK`] are ever stored.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct MessageFlags(u32);

impl MessageFlags {
    /// The empty flag set.
    pub const NONE: MessageFlags = MessageFlags(0);

    /// The message originated inside the engine itself, usually because a
    /// caller misused the API.
    pub const INTERNAL: MessageFlags = MessageFlags(0x8000_0000);

    /// The message is not meant for humans (XML, JSON, binary payloads).
    pub const PROTOCOL: MessageFlags = MessageFlags(0x4000_0000);

    /// The message text is HTML. The engine never renders it; this is a hint
    /// for formatters that can.
    pub const HTML: MessageFlags = MessageFlags(0x2000_0000);

    /// Every flag defined by this version, with its name.
    pub const DEFINED: [(MessageFlags, &'static str); 3] = [
        (MessageFlags::INTERNAL, "INTERNAL"),
        (MessageFlags::PROTOCOL, "PROTOCOL"),
        (MessageFlags::HTML, "HTML"),
    ];

    /// Returns the raw bits.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Builds a flag set from raw bits, discarding anything outside
    /// [`FLAG_MASK`].
    #[inline]
    pub const fn from_bits_truncate(bits: u32) -> Self {
        MessageFlags(bits & FLAG_MASK)
    }

    /// Returns `true` if no flag is set.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every flag in `other` is also set in `self`.
    #[inline]
    pub const fn contains(self, other: MessageFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets every flag in `other`.
    #[inline]
    pub fn insert(&mut self, other: MessageFlags) {
        self.0 |= other.0;
    }

    /// Clears every flag in `other`.
    #[inline]
    pub fn remove(&mut self, other: MessageFlags) {
        self.0 &= !other.0;
    }

    /// Returns the union of two flag sets.
    #[inline]
    pub const fn union(self, other: MessageFlags) -> Self {
        MessageFlags(self.0 | other.0)
    }
}

impl ops::BitOr for MessageFlags {
    type Output = MessageFlags;

    fn bitor(self, rhs: MessageFlags) -> MessageFlags {
        self.union(rhs)
    }
}

impl ops::BitOrAssign for MessageFlags {
    fn bitor_assign(&mut self, rhs: MessageFlags) {
        self.insert(rhs);
    }
}

impl fmt::Debug for MessageFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }

        let mut first = true;
        let mut rest = self.0;
        for (flag, name) in Self::DEFINED {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                first = false;
                f.write_str(name)?;
                rest &= !flag.0;
            }
        }
        if rest != 0 {
            if !first {
                f.write_str(" | ")?;
            }
            write!(f, "{rest:#010x}")?;
        }
        Ok(())
    }
}

/// Error returned when a packed word does not hold a valid severity.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InvalidTypeAndFlags(pub u32);

impl fmt::Display for InvalidTypeAndFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "packed message word {:#010x} does not contain a valid severity",
            self.0
        )
    }
}

impl core::error::Error for InvalidTypeAndFlags {}

/// A severity and a flag set packed into one `u32`.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct TypeAndFlags {
    /// The severity half.
    severity: Severity,
    /// The flag half.
    flags: MessageFlags,
}

impl TypeAndFlags {
    /// Combines a severity with a flag set.
    #[inline]
    pub const fn new(severity: Severity, flags: MessageFlags) -> Self {
        Self { severity, flags }
    }

    /// Returns the severity half.
    #[inline]
    pub const fn severity(self) -> Severity {
        self.severity
    }

    /// Returns the flag half.
    #[inline]
    pub const fn flags(self) -> MessageFlags {
        self.flags
    }

    /// Replaces the severity, keeping the flags.
    #[inline]
    pub const fn with_severity(self, severity: Severity) -> Self {
        Self { severity, ..self }
    }

    /// Replaces the flags, keeping the severity.
    #[inline]
    pub const fn with_flags(self, flags: MessageFlags) -> Self {
        Self { flags, ..self }
    }

    /// Packs into the wire representation.
    #[inline]
    pub const fn pack(self) -> u32 {
        self.severity.bits() | self.flags.bits()
    }

    /// Unpacks a wire word.
    ///
    /// Reserved bits are ignored. Fails if the severity bits do not name a
    /// known severity.
    pub const fn unpack(bits: u32) -> Result<Self, InvalidTypeAndFlags> {
        match Severity::from_bits(bits) {
            Some(severity) => Ok(Self {
                severity,
                flags: MessageFlags::from_bits_truncate(bits),
            }),
            None => Err(InvalidTypeAndFlags(bits)),
        }
    }
}

impl fmt::Debug for TypeAndFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeAndFlags")
            .field("severity", &self.severity)
            .field("flags", &self.flags)
            .finish()
    }
}

impl From<Severity> for TypeAndFlags {
    fn from(severity: Severity) -> Self {
        Self::new(severity, MessageFlags::NONE)
    }
}
