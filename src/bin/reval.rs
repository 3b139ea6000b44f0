//! Demo CLI: connect to an Rserve server, evaluate an expression, print the
//! resulting SEXP.
//!
//! Mirrors the teacher's `src/bin/client.rs` shape: a `clap::Parser` args
//! struct, `color_eyre::install()` + `env_logger::init()` at the top of
//! `main`, `.wrap_err(...)` on each fallible step. Socket connect/close is
//! out of scope for the codec itself (spec §1), so this does the bare
//! minimum: a plain `TcpStream::connect`, no pooling or retries.

use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use std::net::TcpStream;

use qap1::Connection;

#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Args {
    /// Host the Rserve server is listening on.
    #[clap(short = 'H', long, default_value = "localhost")]
    host: String,

    /// Port the Rserve server is listening on.
    #[clap(short, long, default_value_t = 6311)]
    port: u16,

    /// Assign the expression's result to this variable instead of evaluating
    /// it for its return value.
    #[clap(long)]
    set: Option<String>,

    /// The R expression to evaluate.
    expr: String,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let args = Args::parse();

    let stream = TcpStream::connect((args.host.as_str(), args.port))
        .wrap_err_with(|| format!("connecting to {}:{}", args.host, args.port))?;
    let mut conn = Connection::connect(stream).wrap_err("handshake failed")?;

    match args.set {
        Some(name) => {
            conn.eval_void(&format!("{name} <- {}", args.expr))
                .wrap_err("set failed")?;
            println!("ok");
        }
        None => {
            let result = conn.eval(&args.expr).wrap_err("eval failed")?;
            println!("{:#?}", qap1::unwrap_scalar(&result));
        }
    }

    Ok(())
}
