//! Thin socket layer. The connection state machine, send engine and
//! receive engine are written against the [`Transport`] trait so the exact
//! same engine code drives a real [`Endpoint`] socket in production and a
//! deterministic, possibly-lossy mock in tests.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::packet::{Packet, WIRE_SZ};

/// Outcome of one bounded `recv` attempt.
#[derive(Debug)]
pub enum RecvOutcome {
    Packet(Packet),
    /// The receive timeout elapsed with nothing arriving.
    Timeout,
    /// The peer's port is unreachable (e.g. it has already exited) — the
    /// UDP analogue of `ECONNREFUSED`.
    Refused,
}

/// What a connection's send/recv engines need from a socket once a peer is
/// known. Production code implements this over [`Endpoint`]; tests
/// implement it over in-memory queues.
pub trait Transport {
    fn send(&mut self, packet: &Packet) -> io::Result<()>;
    fn recv_timeout(&mut self, timeout: Duration) -> io::Result<RecvOutcome>;
}

/// A UDP socket with an application-level notion of "the current peer":
/// once a flow's first datagram pins `peer`, datagrams arriving from any
/// other source on the same port are ignored for the rest of that flow.
/// Rather than lean on `connect(2)` (which is awkward to undo between
/// successive clients on one socket), the filtering is done here
/// explicitly.
pub struct Endpoint {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
}

impl Endpoint {
    /// Bind the well-known port the sender listens on (no peer pinned yet).
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        Ok(Endpoint { socket, peer: None })
    }

    /// Bind an ephemeral local port and pin the peer immediately — the
    /// receiver always knows where it's going.
    pub fn connect<A: ToSocketAddrs>(peer: A) -> io::Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        let peer = peer
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "address did not resolve"))?;
        Ok(Endpoint {
            socket,
            peer: Some(peer),
        })
    }

    /// Forget the current peer so the next [`Endpoint::accept`] may bind to
    /// anyone — called between successive clients on the sender.
    pub fn reset_peer(&mut self) {
        self.peer = None;
    }

    /// Block with no timeout until a SYN arrives from some source, pin the
    /// peer to that source, and return the decoded SYN packet.
    pub fn accept(&mut self) -> io::Result<Packet> {
        self.socket.set_read_timeout(None)?;
        let mut buf = [0u8; WIRE_SZ];
        loop {
            let (n, src) = self.socket.recv_from(&mut buf)?;
            let Ok(packet) = Packet::decode(&buf[..n]) else {
                warn!("discarding malformed frame of {n} bytes while listening");
                continue;
            };
            if !packet.syn {
                debug!("discarding non-SYN packet from {src} while listening");
                continue;
            }
            self.peer = Some(src);
            return Ok(packet);
        }
    }
}

impl Transport for Endpoint {
    fn send(&mut self, packet: &Packet) -> io::Result<()> {
        let peer = self
            .peer
            .expect("send() called before a peer was established");
        let wire = packet.encode();
        self.socket.send_to(&wire, peer)?;
        Ok(())
    }

    fn recv_timeout(&mut self, timeout: Duration) -> io::Result<RecvOutcome> {
        let peer = self
            .peer
            .expect("recv_timeout() called before a peer was established");
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; WIRE_SZ];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(RecvOutcome::Timeout);
            }
            self.socket.set_read_timeout(Some(remaining))?;

            match self.socket.recv_from(&mut buf) {
                Ok((n, src)) => {
                    if src != peer {
                        debug!("ignoring datagram from unexpected source {src}");
                        continue;
                    }
                    let packet = match Packet::decode(&buf[..n]) {
                        Ok(packet) => packet,
                        Err(e) => {
                            debug!("discarding malformed frame from {src}: {e}");
                            continue;
                        }
                    };
                    return Ok(RecvOutcome::Packet(packet));
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    return Ok(RecvOutcome::Timeout);
                }
                Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                    return Ok(RecvOutcome::Refused);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
