//! Client-side codec and transport adapter for the QAP1 binary protocol
//! spoken by an R-language compute server (Rserve).
//!
//! The hard part is the wire codec: variable-length tagged SEXP values with
//! optional attribute prefixes, a "large" length form, non-IEEE sentinel
//! encodings for NA/infinities, 4-byte alignment padding for string arrays,
//! and a promotion rule for outbound integers that exceed the server's
//! 32-bit range. Socket lifecycle, connection pooling, retries, and R-level
//! semantics beyond what the wire requires are out of scope; see
//! [`Connection`] for the thin layer that ties the codec to a transport.

#![allow(clippy::upper_case_acronyms)]

pub mod connection;
pub mod constants;
pub mod dataframe;
pub mod decode;
pub mod encode;
pub mod error;
pub mod sexp;

mod frame;

pub use connection::{unwrap_scalar, Connection};
pub use dataframe::{Column, DataFrame};
pub use decode::Reply;
pub use error::{Error, ErrorKind, Result};
pub use sexp::{Na, RDouble, Sexp, SexpTag};
