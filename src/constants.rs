//! On-wire QAP1 protocol constants.
//!
//! See <https://github.com/s-u/Rserve/blob/master/src/Rsrv.h> for the
//! authoritative list these are transcribed from.

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// First four bytes of the 32-byte handshake banner.
pub const HANDSHAKE_BANNER: &[u8; 4] = b"Rsrv";

/// Ack word indicating success; anything else is an error ack.
pub const RESP_OK: u32 = 0x01_0001;

/// Outer (message-body) data-type tags.
#[derive(IntoPrimitive, TryFromPrimitive, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum DtType {
    /// A NUL-terminated string.
    String = 4,
    /// A nested SEXP item.
    Sexp = 10,
}

/// Outbound commands.
#[derive(IntoPrimitive, TryFromPrimitive, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum Command {
    /// Evaluate an expression and return the result.
    Eval = 0x003,
    /// Evaluate an expression, discarding the result.
    EvalVoid = 0x002,
    /// Assign a SEXP value to a variable in the server's workspace.
    SetVariable = 0x020,
}

/// Expression-type tags carried in the low 6 bits of a SEXP header's type byte.
#[derive(IntoPrimitive, TryFromPrimitive, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum XtTag {
    /// `Sexp::Null`.
    Null = 0,
    /// Single string, also used for symbol names on receive.
    Str = 3,
    /// Symbol name (`Sexp::SymName` on receive, emitted as `Str` on send).
    SymName = 5,
    /// Tagged list/lang pair sequence, no tags (`Sexp::Vector`-shaped).
    ListNoTag = 6,
    /// Tagged list/lang pair sequence, with tags (`Sexp::ListTag`).
    ListTag = 7,
    /// Untagged "lang" pairwise sequence (treated like `ListNoTag` on receive).
    LangNoTag = 8,
    /// Tagged "lang" pairwise sequence (treated like `ListTag` on receive).
    LangTag = 9,
    /// An R closure; passed through as an opaque blob.
    Clos = 17,
    /// Ordered sequence of heterogeneous SEXPs.
    Vector = 16,
    /// Ordered sequence of heterogeneous SEXPs (expression-vector variant).
    VectorExp = 26,
    /// Array of 32-bit signed integers, NA-aware.
    ArrayInt = 32,
    /// Array of doubles, NA/Inf/NaN-aware.
    ArrayDouble = 33,
    /// Array of NUL-terminated, 0x01-padded strings.
    ArrayStr = 34,
    /// Array of booleans with a 3-valued NA encoding.
    ArrayBool = 36,
}

bitflags! {
    /// The two modifier bits packed into a SEXP header's type byte alongside
    /// the base `XtTag` value (the low 6 bits).
    pub struct SexpFlags: u8 {
        /// An attribute SEXP precedes the payload.
        const HAS_ATTR = 0x80;
        /// The length is extended by a trailing word.
        const LARGE = 0x40;
    }
}

/// Bit in a SEXP header's type byte: an attribute SEXP precedes the payload.
pub const XT_HAS_ATTR: u8 = SexpFlags::HAS_ATTR.bits;
/// Bit in a SEXP header's type byte: the length is extended by a trailing word.
pub const XT_LARGE: u8 = SexpFlags::LARGE.bits;
/// Mask isolating the base `XtTag` value from the modifier bits above.
pub const XT_BASE_MASK: u8 = 0x3f;

/// NA sentinel for `Sexp::ArrayInt` elements (`INT_MIN`).
pub const NA_INTEGER: i32 = i32::MIN;

/// `(sign, exponent, mantissa)` used to recognise/produce the NA double on the
/// wire. Exponent all-ones with this exact mantissa is NA; exponent all-ones
/// with mantissa zero is +-Inf; anything else with exponent all-ones is NaN.
pub const NA_DOUBLE_MANTISSA: u64 = 0x7a2;

/// Byte used for a single NA element inside an `XT_ARRAY_STR` payload.
pub const NA_STRING_BYTE: u8 = 0xff;

/// Byte used to pad `XT_ARRAY_STR`/`XT_ARRAY_BOOL` payloads to a 4-byte
/// boundary.
pub const PAD_BYTE: u8 = 0x01;

/// `XT_ARRAY_BOOL` element encodings.
pub const BOOL_FALSE: u8 = 0;
/// `XT_ARRAY_BOOL` element encodings.
pub const BOOL_TRUE: u8 = 1;
/// Canonical NA sentinel produced on send.
pub const BOOL_NA: u8 = 2;
/// Alternate NA sentinel accepted on receive only (never produced on send).
pub const BOOL_NA_ALT: u8 = 3;

/// Largest payload length the short (24-bit) header form can carry.
pub const MAX_SHORT_LENGTH: usize = (1 << 24) - 1;
