//! Frame I/O: exact-count byte transport, item headers, endian helpers.
//!
//! Everything above this layer (the decoder and encoder) reads and writes
//! through these functions rather than touching a stream directly, the same
//! separation the teacher draws between `proto.rs`'s raw `byteorder` calls
//! and `client.rs`/`server.rs`'s higher-level command handling.

use std::io::{self, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::constants::{SexpFlags, MAX_SHORT_LENGTH, XT_BASE_MASK};
use crate::error::{Error, Result};
use crate::sexp::RDouble;

/// Read exactly `n` bytes or fail. Short reads are looped internally; a
/// partial read is never surfaced to the caller.
pub fn read_exact(stream: &mut impl Read, n: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    stream.read_exact(&mut buf).map_err(|err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::Transport(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed mid-message",
            ))
        } else {
            Error::Transport(err)
        }
    })?;
    Ok(buf)
}

/// Write the entire buffer or fail.
pub fn write_all(stream: &mut impl Write, bytes: &[u8]) -> Result<()> {
    stream.write_all(bytes)?;
    Ok(())
}

/// Read whatever is currently available without blocking indefinitely. Used
/// only on the error-reply path to capture the server's trailing message.
///
/// This does a single best-effort read into a bounded buffer; transports that
/// need a hard non-blocking guarantee should set a short read timeout (for a
/// `TcpStream`) or non-blocking mode before calling this.
pub fn drain_available(stream: &mut impl Read) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; 4096];
    match stream.read(&mut buf) {
        Ok(n) => {
            buf.truncate(n);
            Ok(buf)
        }
        Err(err)
            if err.kind() == io::ErrorKind::WouldBlock
                || err.kind() == io::ErrorKind::TimedOut =>
        {
            Ok(Vec::new())
        }
        Err(err) => Err(Error::Transport(err)),
    }
}

/// Read an unsigned 32-bit little-endian word.
pub fn read_u32le(stream: &mut impl Read) -> Result<u32> {
    Ok(stream.read_u32::<LE>()?)
}

/// Write an unsigned 32-bit little-endian word.
pub fn write_u32le(stream: &mut impl Write, v: u32) -> Result<()> {
    stream.write_u32::<LE>(v)?;
    Ok(())
}

/// Read a signed 32-bit little-endian word.
pub fn read_i32le(stream: &mut impl Read) -> Result<i32> {
    Ok(stream.read_i32::<LE>()?)
}

/// Write a signed 32-bit little-endian word.
pub fn write_i32le(stream: &mut impl Write, v: i32) -> Result<()> {
    stream.write_i32::<LE>(v)?;
    Ok(())
}

/// Read a single byte.
pub fn read_u8(stream: &mut impl Read) -> Result<u8> {
    Ok(stream.read_u8()?)
}

/// Write a single byte.
pub fn write_u8(stream: &mut impl Write, v: u8) -> Result<()> {
    stream.write_u8(v)?;
    Ok(())
}

/// A decoded item header: the raw type byte (carrying `XT_HAS_ATTR`/
/// `XT_LARGE` modifier bits when this is a SEXP header) and the 24-bit short
/// length that follows it.
#[derive(Debug, Clone, Copy)]
pub struct ItemHeader {
    /// Raw type byte, including any modifier bits.
    pub type_byte: u8,
    /// The 24-bit length field as read off the wire (not yet extended by a
    /// large-length word, if one follows).
    pub length24: u32,
}

impl ItemHeader {
    /// Base tag with the `XT_HAS_ATTR`/`XT_LARGE` modifier bits masked off.
    pub fn base_tag(&self) -> u8 {
        self.type_byte & XT_BASE_MASK
    }

    /// Whether the `XT_HAS_ATTR` modifier bit is set.
    pub fn has_attr(&self) -> bool {
        SexpFlags::from_bits_truncate(self.type_byte).contains(SexpFlags::HAS_ATTR)
    }

    /// Whether the `XT_LARGE` modifier bit is set.
    pub fn is_large(&self) -> bool {
        SexpFlags::from_bits_truncate(self.type_byte).contains(SexpFlags::LARGE)
    }
}

/// Read a 4-byte item header: one type byte followed by a 24-bit
/// little-endian length.
pub fn read_item_header(stream: &mut impl Read) -> Result<ItemHeader> {
    let type_byte = read_u8(stream)?;
    let b0 = read_u8(stream)? as u32;
    let b1 = read_u8(stream)? as u32;
    let b2 = read_u8(stream)? as u32;
    let length24 = b0 | (b1 << 8) | (b2 << 16);
    Ok(ItemHeader { type_byte, length24 })
}

/// Write a 4-byte item header. Fails if `length` does not fit the short
/// (24-bit) form; the large-length send form is not implemented.
pub fn write_item_header(stream: &mut impl Write, type_byte: u8, length: usize) -> Result<()> {
    if length > MAX_SHORT_LENGTH {
        return Err(Error::PayloadTooLarge { len: length });
    }
    write_u8(stream, type_byte)?;
    write_u8(stream, (length & 0xff) as u8)?;
    write_u8(stream, ((length >> 8) & 0xff) as u8)?;
    write_u8(stream, ((length >> 16) & 0xff) as u8)?;
    Ok(())
}

/// Read the extra 32-bit word that extends a large-length SEXP header, and
/// combine it with the already-read 24-bit length per spec: `length24 |
/// (extra << 23)`. The shift-by-23 is preserved verbatim from the source; see
/// the design notes for why this isn't "corrected" to a shift of 24/32.
pub fn read_large_length_extra(stream: &mut impl Read, length24: u32) -> Result<u64> {
    let extra = read_u32le(stream)? as u64;
    Ok(length24 as u64 | (extra << 23))
}

const NA_DOUBLE_MANTISSA_MASK: u64 = 0xf_ffff_ffff_ffff;

/// Decode an 8-byte mixed-endian double as the server sends it: the wire byte
/// order is the reverse of a native little-endian double, so the bytes are
/// reversed before the IEEE-754 fields are inspected. This asymmetry (receive
/// reverses, send does not, see `encode_double`) is preserved verbatim from
/// the source and is not unified even though it looks like a latent bug.
pub fn decode_double(bytes: [u8; 8]) -> RDouble {
    let mut reversed = bytes;
    reversed.reverse();
    let bits = u64::from_le_bytes(reversed);
    let sign = (bits >> 63) & 1;
    let exponent = (bits >> 52) & 0x7ff;
    let mantissa = bits & NA_DOUBLE_MANTISSA_MASK;
    if exponent == 0x7ff {
        if mantissa == 0 {
            if sign == 0 {
                RDouble::PosInf
            } else {
                RDouble::NegInf
            }
        } else if mantissa == crate::constants::NA_DOUBLE_MANTISSA {
            RDouble::NA
        } else {
            RDouble::Value(f64::NAN)
        }
    } else {
        RDouble::Value(f64::from_bits(bits))
    }
}

/// The fixed 8-byte wire sentinel for the NA double, as documented by the
/// protocol. Written as-is by `encode_double`, with no reversal step; it
/// happens to be the byte-reversed form of the canonical NA bit pattern,
/// which is exactly what lets `decode_double`'s reversal-then-interpret
/// recover it. A plain `to_le_bytes()` of the canonical NA bits would *not*
/// round-trip through `decode_double` (see the design notes on the
/// receive/send asymmetry), so this sentinel is hardcoded rather than
/// derived from `na_double_bits()`.
const NA_DOUBLE_WIRE_BYTES: [u8; 8] = [0x7f, 0xf0, 0x00, 0x00, 0x00, 0x00, 0x07, 0xa2];

/// Encode an `RDouble` as eight bytes of plain little-endian IEEE-754 — no
/// byte reversal on send, unlike `decode_double`. Only the NA case gets a
/// special fixed byte pattern (see `NA_DOUBLE_WIRE_BYTES`); a present value or
/// an infinity is written as its ordinary native bit pattern in plain
/// little-endian order, which will *not* decode back to the same value if fed
/// straight into `decode_double` (that asymmetry is intentional, see the
/// design notes).
pub fn encode_double(value: RDouble) -> [u8; 8] {
    match value {
        RDouble::NA => NA_DOUBLE_WIRE_BYTES,
        RDouble::Value(f) => f.to_bits().to_le_bytes(),
        RDouble::PosInf => f64::INFINITY.to_bits().to_le_bytes(),
        RDouble::NegInf => f64::NEG_INFINITY.to_bits().to_le_bytes(),
    }
}
