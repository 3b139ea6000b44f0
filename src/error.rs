//! Structured error types for the QAP1 codec.

use std::fmt;
use std::io;

use crate::sexp::SexpTag;

/// Reasons a frame, decode, or encode operation can fail.
#[derive(Debug)]
pub enum Error {
    /// The underlying transport failed to read or write.
    Transport(io::Error),
    /// The 32-byte handshake banner was missing or malformed.
    BadHandshake(String),
    /// Declared item length and bytes actually consumed disagreed, or an item
    /// header was structurally impossible.
    ProtocolDesync(String),
    /// A SEXP payload would require more than 2^24 - 1 bytes; the large-length
    /// send form is not implemented.
    PayloadTooLarge {
        /// The payload length that would have been required.
        len: usize,
    },
    /// `SetVariable`'s declared `type:SexpTag` (spec §4.3/§6.2) did not match
    /// the shape of the value passed alongside it.
    TypeMismatch {
        /// The tag the caller declared.
        expected: SexpTag,
        /// A short description of the value's actual shape.
        actual: String,
    },
    /// The server replied with a non-OK ack.
    Server {
        /// The mapped error kind (see §4.4 of the protocol).
        kind: ErrorKind,
        /// Whatever bytes followed the ack on the wire, verbatim.
        tail: Vec<u8>,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(err) => write!(f, "transport error: {err}"),
            Error::BadHandshake(msg) => write!(f, "bad handshake: {msg}"),
            Error::ProtocolDesync(msg) => write!(f, "protocol desync: {msg}"),
            Error::PayloadTooLarge { len } => {
                write!(f, "payload of {len} bytes exceeds the 2^24-1 short length form")
            }
            Error::TypeMismatch { expected, actual } => {
                write!(f, "declared type {expected:?} does not match value shape {actual}")
            }
            Error::Server { kind, tail } => {
                write!(f, "server error {kind:?}: {}", String::from_utf8_lossy(tail))
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Transport(err)
    }
}

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Named server-side error kinds, mapped from the single error byte carried in
/// a non-OK ack (see spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Authentication failed.
    AuthFailed,
    /// Connection is already closed/broken.
    ConnectionBroken,
    /// Unrecognised/invalid command.
    InvalidCommand,
    /// Invalid parameter(s) for the given command.
    InvalidParameters,
    /// An R-level error occurred while evaluating the request.
    RErrorOccurred,
    /// I/O error on the server side.
    IoError,
    /// A requested file is not open.
    FileNotOpen,
    /// Access to the requested resource was denied.
    AccessDenied,
    /// The command is recognised but not supported by this server.
    UnsupportedCommand,
    /// The command is entirely unknown to this server.
    UnknownCommand,
    /// Data overflowed an internal buffer.
    DataOverflow,
    /// The requested object is too big to handle.
    ObjectTooBig,
    /// The server ran out of memory.
    OutOfMemory,
    /// The control pipe to the R process was closed.
    ControlPipeClosed,
    /// The session is currently busy with another request.
    SessionBusy,
    /// The server failed to detach the session.
    UnableToDetachSession,
    /// Any code not in the table above, carrying the raw byte.
    Unknown(u8),
}

/// The sixteen documented QAP1 error codes.
mod codes {
    pub const ERR_AUTH_FAILED: u8 = 0x41;
    pub const ERR_CONN_BROKEN: u8 = 0x42;
    pub const ERR_INV_CMD: u8 = 0x43;
    pub const ERR_INV_PAR: u8 = 0x44;
    pub const ERR_R_ERROR: u8 = 0x45;
    pub const ERR_IO_ERROR: u8 = 0x46;
    pub const ERR_NOT_OPEN: u8 = 0x47;
    pub const ERR_ACCESS_DENIED: u8 = 0x48;
    pub const ERR_UNSUPPORTED_CMD: u8 = 0x49;
    pub const ERR_UNKNOWN_CMD: u8 = 0x4a;
    pub const ERR_DATA_OVERFLOW: u8 = 0x4b;
    pub const ERR_OBJECT_TOO_BIG: u8 = 0x4c;
    pub const ERR_OUT_OF_MEM: u8 = 0x4d;
    pub const ERR_CTRL_CLOSED: u8 = 0x4e;
    pub const ERR_SESSION_BUSY: u8 = 0x50;
    pub const ERR_DETACH_FAILED: u8 = 0x51;
}

impl ErrorKind {
    /// Map a raw server error byte onto a named kind. Total: every byte value
    /// maps to something, with `Unknown(code)` as the catch-all.
    pub fn from_code(code: u8) -> Self {
        use codes::*;
        match code {
            ERR_AUTH_FAILED => ErrorKind::AuthFailed,
            ERR_CONN_BROKEN => ErrorKind::ConnectionBroken,
            ERR_INV_CMD => ErrorKind::InvalidCommand,
            ERR_INV_PAR => ErrorKind::InvalidParameters,
            ERR_R_ERROR => ErrorKind::RErrorOccurred,
            ERR_IO_ERROR => ErrorKind::IoError,
            ERR_NOT_OPEN => ErrorKind::FileNotOpen,
            ERR_ACCESS_DENIED => ErrorKind::AccessDenied,
            ERR_UNSUPPORTED_CMD => ErrorKind::UnsupportedCommand,
            ERR_UNKNOWN_CMD => ErrorKind::UnknownCommand,
            ERR_DATA_OVERFLOW => ErrorKind::DataOverflow,
            ERR_OBJECT_TOO_BIG => ErrorKind::ObjectTooBig,
            ERR_OUT_OF_MEM => ErrorKind::OutOfMemory,
            ERR_CTRL_CLOSED => ErrorKind::ControlPipeClosed,
            ERR_SESSION_BUSY => ErrorKind::SessionBusy,
            ERR_DETACH_FAILED => ErrorKind::UnableToDetachSession,
            other => ErrorKind::Unknown(other),
        }
    }
}
