//! Receiver-side top-level supervisor: resolve, connect, receive, single-shot.

use std::fs::File;

use log::info;

use crate::conn;
use crate::net::Endpoint;
use crate::recv_engine;
use crate::Error;

/// Fixed local output path.
pub const OUTPUT_FILE: &str = "received.file";

pub fn receive(host: &str, port: u16) -> Result<(), Error> {
    let mut ep = Endpoint::connect((host, port))
        .map_err(|e| Error::AddrResolution(format!("{host}:{port}: {e}")))?;

    let conn = conn::client_handshake(&mut ep).map_err(Error::Io)?;

    let mut outfile = File::create(OUTPUT_FILE).map_err(Error::Io)?;
    let after_transfer = recv_engine::run(&mut ep, &mut outfile, conn).map_err(Error::Io)?;
    outfile.sync_all().map_err(Error::Io)?;

    conn::teardown_receiver(&mut ep, after_transfer.seq, after_transfer.ack).map_err(Error::Io)?;
    info!("transfer complete, wrote {}", OUTPUT_FILE);
    Ok(())
}
