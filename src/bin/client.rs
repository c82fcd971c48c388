use std::process::ExitCode;

use clap::Parser;

use rudp_xfer::client;

/// Reliable file transfer over UDP — receiver.
///
/// Writes the transferred file to `received.file` in the current
/// directory.
#[derive(Parser, Debug)]
struct Args {
    /// Sender's hostname or IP address.
    host: String,
    /// Sender's port.
    port: u16,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match client::receive(&args.host, args.port) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("client error: {e}");
            ExitCode::FAILURE
        }
    }
}
