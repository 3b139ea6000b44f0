//! The command encoder: outbound message envelope, SEXP serialisation, and
//! the integer-promotion rule used when building an `ArrayInt` to send.

use std::io::Write;

use crate::constants::{Command, DtType, XtTag, PAD_BYTE, XT_HAS_ATTR};
use crate::error::{Error, Result};
use crate::frame;
use crate::sexp::{Na, RDouble, Sexp, SexpTag};

/// Largest magnitude an `i64` can take while still being exactly
/// representable as an `f64` (2^53).
const MAX_EXACT_DOUBLE_INT: i64 = 1 << 53;

/// Largest magnitude representable as a 32-bit signed int, with `NA_INTEGER`
/// reserved for NA.
const MAX_EXACT_INT32: i64 = i32::MAX as i64;
const MIN_EXACT_INT32: i64 = i32::MIN as i64 + 1; // i32::MIN is reserved for NA

/// Build the least-capable sendable `Sexp` that can hold every element of
/// `values`, in the lattice `Int < Double < Str` (spec §4.3/§9): a single
/// classify-then-join pass, total (never fails).
pub fn promote_ints(values: &[Na<i64>]) -> Sexp {
    let class = values
        .iter()
        .filter_map(|v| v.as_option())
        .map(|&v| classify_one(v))
        .max()
        .unwrap_or(IntClass::Int);
    match class {
        IntClass::Int => Sexp::ArrayInt(
            values
                .iter()
                .cloned()
                .map(|v| v.map(|v| v as i32))
                .collect(),
        ),
        IntClass::Double => Sexp::ArrayDouble(
            values
                .iter()
                .map(|v| match v {
                    Na::Some(v) => RDouble::Value(*v as f64),
                    Na::NA => RDouble::NA,
                })
                .collect(),
        ),
        IntClass::Str => Sexp::ArrayStr(
            values
                .iter()
                .map(|v| match v {
                    Na::Some(v) => Na::Some(v.to_string()),
                    Na::NA => Na::Some("NA".to_string()),
                })
                .collect(),
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum IntClass {
    Int,
    Double,
    Str,
}

fn classify_one(v: i64) -> IntClass {
    if (MIN_EXACT_INT32..=MAX_EXACT_INT32).contains(&v) {
        IntClass::Int
    } else if v.unsigned_abs() <= MAX_EXACT_DOUBLE_INT as u64 {
        IntClass::Double
    } else {
        IntClass::Str
    }
}

/// Write the 16-byte outbound message envelope (`cmd`, `length`, `offset=0`,
/// `length_hi=0`) followed by `body`. Only the 32-bit length form is ever
/// emitted.
fn write_envelope(stream: &mut impl Write, cmd: Command, body: &[u8]) -> Result<()> {
    if body.len() > u32::MAX as usize {
        return Err(Error::PayloadTooLarge { len: body.len() });
    }
    frame::write_u32le(stream, cmd.into())?;
    frame::write_u32le(stream, body.len() as u32)?;
    frame::write_u32le(stream, 0)?; // offset
    frame::write_u32le(stream, 0)?; // length_hi
    frame::write_all(stream, body)?;
    Ok(())
}

/// Send an `Eval` or `EvalVoid` command: a single `DT_STRING` item holding
/// `expr` NUL-terminated, with no `0x01` padding.
pub fn send_eval(stream: &mut impl Write, void: bool, expr: &str) -> Result<()> {
    let mut body = Vec::new();
    write_string_item(&mut body, expr)?;
    write_envelope(
        stream,
        if void { Command::EvalVoid } else { Command::Eval },
        &body,
    )
}

/// Send a `SetVariable` command: a `DT_STRING` item for the name, followed by
/// a `DT_SEXP` item for the value. `type_` is the `type:SexpTag` spec §4.3/
/// §6.2 gives `SetVariable`'s signature; it's checked against `value`'s
/// actual shape and rejected with `Error::TypeMismatch` on mismatch rather
/// than silently sent as whatever `value` happens to be.
pub fn send_set_variable(
    stream: &mut impl Write,
    name: &str,
    type_: SexpTag,
    value: &Sexp,
) -> Result<()> {
    if !type_.matches(value) {
        return Err(Error::TypeMismatch {
            expected: type_,
            actual: value.shape_name().to_string(),
        });
    }
    let mut body = Vec::new();
    write_string_item(&mut body, name)?;
    write_sexp_item(&mut body, value)?;
    write_envelope(stream, Command::SetVariable, &body)
}

/// Write a `DT_STRING` item: NUL-terminated bytes, no alignment padding.
fn write_string_item(out: &mut Vec<u8>, s: &str) -> Result<()> {
    let mut payload = s.as_bytes().to_vec();
    payload.push(0);
    frame::write_item_header(out, DtType::String as u8, payload.len())?;
    out.extend_from_slice(&payload);
    Ok(())
}

/// Write a full `DT_SEXP` item: outer header, then the inner SEXP
/// (header + payload) `value` serialises to. Exposed for callers building a
/// `SetVariable` payload by hand, and for round-trip tests.
pub fn write_sexp_item(out: &mut Vec<u8>, value: &Sexp) -> Result<()> {
    let mut inner = Vec::new();
    write_sexp(&mut inner, value)?;
    frame::write_item_header(out, DtType::Sexp as u8, inner.len())?;
    out.extend_from_slice(&inner);
    Ok(())
}

/// Serialise one SEXP (header with its `XT_*` tag, `XT_HAS_ATTR` bit if
/// wrapped, and payload) into `out`. This is the "nested SEXP" form used both
/// under a `DT_SEXP` item and for every child of a `Vector`/`ListTag`/
/// attribute — none of those carry their own outer `DT_*` wrapper.
pub fn write_sexp(out: &mut Vec<u8>, value: &Sexp) -> Result<()> {
    match value {
        Sexp::HasAttr(attr, inner) => {
            let mut attr_bytes = Vec::new();
            write_sexp(&mut attr_bytes, attr)?;
            let mut inner_payload = Vec::new();
            write_sexp_payload(&mut inner_payload, inner)?;
            let total_len = attr_bytes.len() + inner_payload.len();
            let base_type = wire_tag(inner);
            frame::write_item_header(out, base_type | XT_HAS_ATTR, total_len)?;
            out.extend_from_slice(&attr_bytes);
            out.extend_from_slice(&inner_payload);
            Ok(())
        }
        other => {
            let mut payload = Vec::new();
            write_sexp_payload(&mut payload, other)?;
            frame::write_item_header(out, wire_tag(other), payload.len())?;
            out.extend_from_slice(&payload);
            Ok(())
        }
    }
}

/// The base type byte (low 6 bits, no `XT_HAS_ATTR`/`XT_LARGE` modifiers) a
/// (non-`HasAttr`) SEXP serialises as. `Unimplemented` is the one variant that
/// isn't a fixed `XtTag`: it's bidirectional (a decoded reply can legally
/// contain one, per spec §4.2, and nothing stops a caller from re-sending it
/// nested inside a `Vector`/`HasAttr` they read back), so it re-emits the
/// type byte it was decoded with verbatim instead of mapping to a tag.
fn wire_tag(value: &Sexp) -> u8 {
    match value {
        Sexp::Null => XtTag::Null as u8,
        // The source maps both Str and SymName to symname on send.
        Sexp::Str(_) | Sexp::SymName(_) => XtTag::SymName as u8,
        Sexp::ArrayStr(_) => XtTag::ArrayStr as u8,
        Sexp::ArrayInt(_) => XtTag::ArrayInt as u8,
        Sexp::ArrayDouble(_) => XtTag::ArrayDouble as u8,
        Sexp::ArrayBool(_) => XtTag::ArrayBool as u8,
        Sexp::Vector(_) => XtTag::Vector as u8,
        Sexp::ListTag(_) => XtTag::ListTag as u8,
        Sexp::Closure(_) => XtTag::Clos as u8,
        Sexp::Unimplemented(type_byte, _) => *type_byte,
        Sexp::HasAttr(_, inner) => wire_tag(inner),
    }
}

/// Write just the payload bytes for a SEXP's own tag (no header, no attr
/// wrapper — `write_sexp` handles those).
fn write_sexp_payload(out: &mut Vec<u8>, value: &Sexp) -> Result<()> {
    match value {
        Sexp::Null => {}
        Sexp::Str(s) | Sexp::SymName(s) => {
            out.extend_from_slice(s.as_bytes());
            out.push(0);
        }
        Sexp::ArrayStr(elems) => write_array_str_payload(out, elems),
        Sexp::ArrayInt(elems) => {
            for elem in elems {
                let v = match elem {
                    Na::Some(v) => *v,
                    Na::NA => crate::constants::NA_INTEGER,
                };
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        Sexp::ArrayDouble(elems) => {
            for v in elems {
                out.extend_from_slice(&frame::encode_double(*v));
            }
        }
        Sexp::ArrayBool(elems) => write_array_bool_payload(out, elems),
        Sexp::Vector(items) => {
            for item in items {
                write_sexp(out, item)?;
            }
        }
        Sexp::ListTag(pairs) => {
            for (key, value) in pairs {
                // Value precedes key on the wire; see design notes.
                write_sexp(out, value)?;
                write_sexp(out, key)?;
            }
        }
        Sexp::Closure(bytes) => out.extend_from_slice(bytes),
        Sexp::Unimplemented(_, bytes) => out.extend_from_slice(bytes),
        Sexp::HasAttr(_, inner) => write_sexp_payload(out, inner)?,
    }
    Ok(())
}

fn write_array_str_payload(out: &mut Vec<u8>, elems: &[Na<String>]) {
    let start = out.len();
    for elem in elems {
        match elem {
            Na::Some(s) => out.extend_from_slice(s.as_bytes()),
            Na::NA => out.push(crate::constants::NA_STRING_BYTE),
        }
        out.push(0);
    }
    pad_to_4(out, start);
}

fn write_array_bool_payload(out: &mut Vec<u8>, elems: &[Na<bool>]) {
    let start = out.len();
    out.extend_from_slice(&(elems.len() as u32).to_le_bytes());
    for elem in elems {
        let byte = match elem {
            Na::Some(false) => crate::constants::BOOL_FALSE,
            Na::Some(true) => crate::constants::BOOL_TRUE,
            Na::NA => crate::constants::BOOL_NA,
        };
        out.push(byte);
    }
    pad_to_4(out, start);
}

/// Pad `out` with `0x01` bytes so that `out.len() - start` is a multiple of 4.
fn pad_to_4(out: &mut Vec<u8>, start: usize) {
    let written = out.len() - start;
    let pad = (4 - written % 4) % 4;
    out.extend(std::iter::repeat(PAD_BYTE).take(pad));
}
