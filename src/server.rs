//! Sender-side top-level supervisor: listen/accept/serve, one client at a
//! time, looping until signalled to stop.

use std::fs::File;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info, warn};

use crate::conn::{self, ConnVars};
use crate::net::Endpoint;
use crate::{send_engine, Error};

/// Runs the accept loop until `shutdown` is observed. Each iteration binds
/// to the next client, streams `file_path`, tears the connection down, and
/// loops back to listening — one failed transfer never prevents serving
/// the next client.
pub fn serve(bind_addr: SocketAddr, file_path: &Path, shutdown: Arc<AtomicBool>) -> Result<(), Error> {
    if !file_path.is_file() {
        return Err(Error::MissingInputFile(file_path.to_path_buf()));
    }

    let mut ep = Endpoint::bind(bind_addr).map_err(Error::Io)?;
    info!("listening on {bind_addr}");

    while !shutdown.load(Ordering::Relaxed) {
        ep.reset_peer();

        let syn = match ep.accept() {
            Ok(syn) => syn,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                info!("shutdown requested while listening, exiting");
                return Ok(());
            }
            Err(e) => return Err(Error::Io(e)),
        };

        match serve_one(&mut ep, &syn, file_path) {
            Ok(()) => info!("transfer complete"),
            Err(e) => warn!("transfer aborted: {e}"),
        }
    }

    info!("shutdown requested, exiting accept loop");
    Ok(())
}

fn serve_one(ep: &mut Endpoint, syn: &crate::packet::Packet, file_path: &Path) -> io::Result<()> {
    let conn: ConnVars = conn::server_handshake(ep, syn)?;

    let mut file = File::open(file_path)?;
    let after_transfer = send_engine::run(&mut file, ep, conn)?;

    conn::teardown_sender(ep, after_transfer.seq, after_transfer.ack)?;
    Ok(())
}
