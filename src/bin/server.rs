use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use log::error;

use rudp_xfer::server;

/// Reliable file transfer over UDP — sender.
#[derive(Parser, Debug)]
struct Args {
    /// Port to listen on.
    port: u16,
    /// File to serve to each connecting client.
    file: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let bind_addr: SocketAddr = match format!("0.0.0.0:{}", args.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("invalid port {}: {e}", args.port);
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed)) {
            error!("failed to install Ctrl-C handler: {e}");
        }
    }

    match server::serve(bind_addr, &args.file, shutdown) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("server error: {e}");
            ExitCode::FAILURE
        }
    }
}
