//! `Connection<IO>`: pairs a transport with the three public operations from
//! spec §6.2 into ergonomic per-command methods.
//!
//! Grounded on the teacher's `Client<IO>` (`client.rs`): own the stream, do
//! the handshake in `new`, expose one method per command, and factor the
//! reply-unwrapping boilerplate into a private helper (`get_reply_data`/
//! `get_ack` there; [`unwrap_scalar`] here).

use std::io::{Read, Write};

use log::{debug, warn};

use crate::decode;
use crate::encode;
use crate::error::Result;
use crate::sexp::{Sexp, SexpTag};

/// An open QAP1 session: a handshaken transport plus one method per command.
/// Only one request may be outstanding at a time (spec §5); the caller must
/// serialise calls externally if sharing a connection across threads.
#[derive(Debug)]
pub struct Connection<IO> {
    stream: IO,
}

impl<IO: Read + Write> Connection<IO> {
    /// Perform the handshake over an already-open transport and return a
    /// ready-to-use connection. Opening/closing the transport itself is out
    /// of scope (spec §1) — the caller supplies an already-connected `IO`.
    pub fn connect(mut stream: IO) -> Result<Self> {
        decode::receive_handshake(&mut stream)?;
        debug!("handshake complete");
        Ok(Self { stream })
    }

    /// `Eval`: evaluate `expr` on the server and return its result.
    pub fn eval(&mut self, expr: &str) -> Result<Sexp> {
        debug!("eval: {expr}");
        encode::send_eval(&mut self.stream, false, expr)?;
        self.read_reply()
    }

    /// `EvalVoid`: evaluate `expr`, discarding whatever it returns.
    pub fn eval_void(&mut self, expr: &str) -> Result<()> {
        debug!("eval_void: {expr}");
        encode::send_eval(&mut self.stream, true, expr)?;
        self.read_reply()?;
        Ok(())
    }

    /// `SetVariable`: assign `value` to `name` in the server's workspace.
    /// `type_` is the declared `SexpTag` spec §4.3/§6.2 gives as part of the
    /// command's signature; it must match `value`'s actual shape.
    pub fn set_variable(&mut self, name: &str, type_: SexpTag, value: &Sexp) -> Result<()> {
        debug!("set_variable: {name}");
        encode::send_set_variable(&mut self.stream, name, type_, value)?;
        self.read_reply()?;
        Ok(())
    }

    fn read_reply(&mut self) -> Result<Sexp> {
        match decode::receive_reply(&mut self.stream) {
            Ok(reply) => Ok(reply.into_sexp()),
            Err(err) => {
                warn!("server reported an error: {err}");
                Err(err)
            }
        }
    }
}

/// Strip a `HasAttr` wrapper and, for a length-1 `Vector`, return the sole
/// element — the small result-unwrapping helper spec.md's purpose section
/// names but never details. Returns the attribute-stripped value as-is if it
/// isn't a length-1 `Vector`.
pub fn unwrap_scalar(sexp: &Sexp) -> &Sexp {
    let (inner, _attr) = sexp.strip_attr();
    match inner {
        Sexp::Vector(items) if items.len() == 1 => &items[0],
        other => other,
    }
}

// Re-exported so callers that need the rare multi-item path can match on it
// directly instead of going through `eval`'s always-collapsed `Sexp`.
pub use crate::decode::Reply as RawReply;
