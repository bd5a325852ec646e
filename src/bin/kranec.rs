//! kranec: send one command to a running krane
//!
//! Usage: `kranec <command> [argument]`, e.g. `kranec activate_workspace 3`.

use std::io::{Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::process::ExitCode;

use anyhow::{Context, Result};
use krane_ipc::{Message, socket_path};

fn send(message: &Message) -> Result<String> {
    let path = socket_path();
    let mut stream = UnixStream::connect(&path)
        .with_context(|| format!("Failed to connect to {:?}; is krane running?", path))?;

    stream
        .write_all(&message.encode())
        .context("Failed to send command")?;
    stream.shutdown(Shutdown::Write)?;

    let mut reply = String::new();
    stream
        .read_to_string(&mut reply)
        .context("Failed to read reply")?;

    Ok(reply)
}

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);

    let Some(name) = args.next() else {
        eprintln!("usage: kranec <command> [argument]");
        return ExitCode::from(2);
    };

    let rest: Vec<String> = args.collect();
    let arg = (!rest.is_empty()).then(|| rest.join(" "));

    match send(&Message::new(name, arg)) {
        Ok(reply) if reply.is_empty() => ExitCode::SUCCESS,
        Ok(reply) => {
            eprintln!("kranec: {}", reply);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("kranec: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
