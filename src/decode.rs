//! The reply decoder: handshake banner, reply envelope, and the recursive
//! SEXP body parser.

use std::io::Read;

use log::debug;
use num_enum::TryFromPrimitive;

use crate::constants::{self, DtType, XtTag, RESP_OK};
use crate::error::{Error, ErrorKind, Result};
use crate::frame;
use crate::sexp::{Na, RDouble, Sexp};

/// Read the 32-byte handshake banner and verify it starts with `"Rsrv"`. The
/// remaining 28 bytes (version, protocol, extra attributes) are read and
/// discarded; this codec does not negotiate on them.
pub fn receive_handshake(stream: &mut impl Read) -> Result<()> {
    let banner = frame::read_exact(stream, 32)?;
    if &banner[0..4] != constants::HANDSHAKE_BANNER {
        return Err(Error::BadHandshake(format!(
            "expected Rsrv banner, got {:?}",
            &banner[0..4]
        )));
    }
    Ok(())
}

/// One or more top-level SEXPs decoded from a reply body.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Exactly one top-level item was present.
    Single(Sexp),
    /// More than one top-level item was present.
    Many(Vec<Sexp>),
}

impl Reply {
    /// Collapse into the single value the codec almost always produces,
    /// keeping the sequence for the rare multi-item case.
    pub fn into_sexp(self) -> Sexp {
        match self {
            Reply::Single(s) => s,
            Reply::Many(items) => Sexp::Vector(items),
        }
    }
}

/// Read a single reply: the 4-byte ack, then either the OK body or the
/// server's error tail.
pub fn receive_reply(stream: &mut impl Read) -> Result<Reply> {
    let ack = frame::read_u32le(stream)?;
    if ack != RESP_OK {
        let code = ((ack >> 24) & 0xff) as u8;
        let tail = frame::drain_available(stream)?;
        debug!("server returned error ack {ack:#010x}, code {code:#04x}");
        return Err(Error::Server {
            kind: ErrorKind::from_code(code),
            tail,
        });
    }
    let length_lo = frame::read_u32le(stream)? as u64;
    let _offset = frame::read_u32le(stream)?;
    let length_hi = frame::read_u32le(stream)? as u64;
    // Shift-by-31 preserved verbatim from the source; see design notes.
    let body_len = length_lo + (length_hi << 31);

    let body = frame::read_exact(stream, body_len as usize)?;
    let mut cursor = &body[..];
    let mut items = Vec::new();
    while !cursor.is_empty() {
        items.push(parse_item(&mut cursor)?);
    }
    if items.len() == 1 {
        Ok(Reply::Single(items.into_iter().next().unwrap()))
    } else {
        Ok(Reply::Many(items))
    }
}

/// Parse one top-level item: an outer `DT_*` header, and for `DT_SEXP`, the
/// SEXP it wraps.
fn parse_item(cursor: &mut &[u8]) -> Result<Sexp> {
    let hdr = frame::read_item_header(cursor)?;
    let dt = DtType::try_from_primitive(hdr.type_byte).map_err(|_| {
        Error::ProtocolDesync(format!("unexpected outer data type {:#04x}", hdr.type_byte))
    })?;
    let length = hdr.length24 as usize;
    let before = cursor.len();
    let value = match dt {
        DtType::Sexp => parse_sexp(cursor)?,
        DtType::String => {
            let bytes = take(cursor, length)?;
            Sexp::Str(cstr_from_bytes(bytes)?)
        }
    };
    let consumed = before - cursor.len();
    if consumed != length {
        return Err(Error::ProtocolDesync(format!(
            "item declared {length} bytes, consumed {consumed}"
        )));
    }
    Ok(value)
}

/// Take exactly `n` bytes from the front of an in-memory cursor, advancing it.
fn take<'a>(cursor: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if cursor.len() < n {
        return Err(Error::ProtocolDesync(format!(
            "need {n} bytes, only {} remain",
            cursor.len()
        )));
    }
    let (head, tail) = cursor.split_at(n);
    *cursor = tail;
    Ok(head)
}

fn cstr_from_bytes(bytes: &[u8]) -> Result<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8(bytes[..end].to_vec())
        .map_err(|e| Error::ProtocolDesync(format!("non-UTF8 string: {e}")))
}

/// Parse the inner SEXP header (type byte with `XT_HAS_ATTR`/`XT_LARGE`
/// modifier bits) and its payload, recursively. Used both for the value
/// nested under a top-level `DT_SEXP` item and for every nested SEXP found
/// inside a `Vector`/`ListTag`/attribute payload, none of which carry an
/// outer `DT_*` wrapper of their own.
fn parse_sexp(cursor: &mut &[u8]) -> Result<Sexp> {
    let mut hdr = frame::read_item_header(cursor)?;
    let mut remaining = hdr.length24 as usize;

    // Flag processing order per spec: has-attr first, then large.
    let attr = if hdr.has_attr() {
        let before = cursor.len();
        let attr_sexp = parse_sexp(cursor)?;
        let attr_wire_size = before - cursor.len();
        remaining = remaining
            .checked_sub(attr_wire_size)
            .ok_or_else(|| Error::ProtocolDesync("attribute SEXP larger than its header length".into()))?;
        hdr = frame::ItemHeader {
            type_byte: hdr.type_byte & !constants::XT_HAS_ATTR,
            length24: remaining as u32,
        };
        Some(attr_sexp)
    } else {
        None
    };

    if hdr.is_large() {
        let extra = frame::read_large_length_extra(cursor, remaining as u32)?;
        remaining = extra as usize;
        hdr = frame::ItemHeader {
            type_byte: hdr.type_byte & !constants::XT_LARGE,
            length24: remaining as u32,
        };
    }

    let base_tag = hdr.base_tag();
    let payload = take(cursor, remaining)?;
    let value = parse_payload(base_tag, payload)?;

    Ok(match attr {
        Some(attr_sexp) => Sexp::HasAttr(Box::new(attr_sexp), Box::new(value)),
        None => value,
    })
}

fn parse_payload(base_tag: u8, payload: &[u8]) -> Result<Sexp> {
    let Ok(tag) = XtTag::try_from_primitive(base_tag) else {
        return Ok(Sexp::Unimplemented(base_tag, payload.to_vec()));
    };
    Ok(match tag {
        XtTag::Null => {
            if !payload.is_empty() {
                return Err(Error::ProtocolDesync("XT_NULL with non-zero length".into()));
            }
            Sexp::Null
        }
        XtTag::Str | XtTag::SymName => {
            let strings = parse_array_str(payload)?;
            let s = match strings.into_iter().next() {
                Some(Na::Some(s)) => s,
                Some(Na::NA) => String::new(),
                None => String::new(),
            };
            if tag == XtTag::SymName {
                Sexp::SymName(s)
            } else {
                Sexp::Str(s)
            }
        }
        XtTag::ArrayStr => Sexp::ArrayStr(parse_array_str(payload)?),
        XtTag::ArrayInt => Sexp::ArrayInt(parse_array_int(payload)?),
        XtTag::ArrayDouble => Sexp::ArrayDouble(parse_array_double(payload)?),
        XtTag::ArrayBool => Sexp::ArrayBool(parse_array_bool(payload)?),
        XtTag::Vector | XtTag::VectorExp | XtTag::ListNoTag | XtTag::LangNoTag => {
            Sexp::Vector(parse_items_until_exhausted(payload)?)
        }
        XtTag::ListTag | XtTag::LangTag => Sexp::ListTag(parse_pairs_until_exhausted(payload)?),
        XtTag::Clos => Sexp::Closure(payload.to_vec()),
    })
}

fn parse_items_until_exhausted(payload: &[u8]) -> Result<Vec<Sexp>> {
    let mut cursor = payload;
    let mut items = Vec::new();
    while !cursor.is_empty() {
        items.push(parse_sexp(&mut cursor)?);
    }
    Ok(items)
}

fn parse_pairs_until_exhausted(payload: &[u8]) -> Result<Vec<(Sexp, Sexp)>> {
    let mut cursor = payload;
    let mut pairs = Vec::new();
    while !cursor.is_empty() {
        // Value precedes key on the wire; see design notes.
        let value = parse_sexp(&mut cursor)?;
        let key = parse_sexp(&mut cursor)?;
        pairs.push((key, value));
    }
    Ok(pairs)
}

fn parse_array_str(payload: &[u8]) -> Result<Vec<Na<String>>> {
    // Drop the trailing 0x01 alignment padding, then split on NUL.
    let end = payload
        .iter()
        .rposition(|&b| b != constants::PAD_BYTE)
        .map(|i| i + 1)
        .unwrap_or(0);
    let trimmed = &payload[..end];
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let mut tokens: Vec<&[u8]> = trimmed.split(|&b| b == 0).collect();
    // A trailing NUL produces one fully-empty trailing token; drop it.
    if matches!(tokens.last(), Some(t) if t.is_empty()) {
        tokens.pop();
    }
    tokens
        .into_iter()
        .map(|tok| {
            if tok == [constants::NA_STRING_BYTE] {
                Ok(Na::NA)
            } else {
                let stripped = strip_leading_pad(tok);
                String::from_utf8(stripped.to_vec())
                    .map(Na::Some)
                    .map_err(|e| Error::ProtocolDesync(format!("non-UTF8 array string: {e}")))
            }
        })
        .collect()
}

fn strip_leading_pad(tok: &[u8]) -> &[u8] {
    let start = tok
        .iter()
        .position(|&b| b != constants::PAD_BYTE)
        .unwrap_or(tok.len());
    &tok[start..]
}

fn parse_array_int(payload: &[u8]) -> Result<Vec<Na<i32>>> {
    if payload.len() % 4 != 0 {
        return Err(Error::ProtocolDesync(format!(
            "XT_ARRAY_INT payload length {} not a multiple of 4",
            payload.len()
        )));
    }
    payload
        .chunks_exact(4)
        .map(|chunk| {
            let v = i32::from_le_bytes(chunk.try_into().unwrap());
            if v == constants::NA_INTEGER {
                Na::NA
            } else {
                Na::Some(v)
            }
        })
        .map(Ok)
        .collect()
}

fn parse_array_double(payload: &[u8]) -> Result<Vec<RDouble>> {
    if payload.len() % 8 != 0 {
        return Err(Error::ProtocolDesync(format!(
            "XT_ARRAY_DOUBLE payload length {} not a multiple of 8",
            payload.len()
        )));
    }
    Ok(payload
        .chunks_exact(8)
        .map(|chunk| frame::decode_double(chunk.try_into().unwrap()))
        .collect())
}

fn parse_array_bool(payload: &[u8]) -> Result<Vec<Na<bool>>> {
    if payload.len() < 4 {
        return Err(Error::ProtocolDesync("XT_ARRAY_BOOL payload missing count word".into()));
    }
    let n = u32::from_le_bytes(payload[0..4].try_into().unwrap()) as usize;
    let data = &payload[4..];
    if data.len() < n {
        return Err(Error::ProtocolDesync(format!(
            "XT_ARRAY_BOOL declares {n} elements but only {} data bytes",
            data.len()
        )));
    }
    data[..n]
        .iter()
        .map(|&b| match b {
            constants::BOOL_FALSE => Ok(Na::Some(false)),
            constants::BOOL_TRUE => Ok(Na::Some(true)),
            constants::BOOL_NA | constants::BOOL_NA_ALT => Ok(Na::NA),
            other => Err(Error::ProtocolDesync(format!(
                "invalid XT_ARRAY_BOOL element byte {other:#04x}"
            ))),
        })
        .collect()
}
