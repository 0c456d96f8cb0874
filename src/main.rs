//! Purpose: `bookstored` server binary entry point.
//! Role: Parses args, builds the runtime, runs the HTTP server.
//! Invariants: Startup failures are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]

use std::net::SocketAddr;

use clap::Parser;
use serde_json::json;

use bookstore::api::{Error, ErrorKind, to_exit_code};

mod serve;

use serve::ServeConfig;

#[derive(Debug, Parser)]
#[command(
    name = "bookstored",
    version,
    about = "Minimal bookstore record service over HTTP"
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Storage backend name.
    #[arg(long, default_value = "mem")]
    backend: String,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<(), Error> {
    let config = ServeConfig {
        bind: cli.bind,
        backend: cli.backend,
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to start runtime")
                .with_source(err)
        })?;
    runtime.block_on(serve::serve(config))
}

fn emit_error(err: &Error) {
    let mut body = json!({
        "error": {
            "kind": format!("{:?}", err.kind()),
            "message": err.message().unwrap_or("error"),
        }
    });
    if let Some(hint) = err.hint() {
        body["error"]["hint"] = json!(hint);
    }
    if let Some(id) = err.id() {
        body["error"]["id"] = json!(id);
    }
    eprintln!("{body}");
}
