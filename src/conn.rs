//! Connection state machine: handshake and graceful teardown.
//!
//! ```text
//!   CLOSED --(send SYN)--> SYN_SENT --(rcv SYN,ACK / snd ACK)--> ESTABLISHED   (client)
//!   CLOSED --(rcv SYN / snd SYN,ACK)--> SYN_WAIT --(rcv ACK)--> ESTABLISHED    (server)
//!
//!   ESTABLISHED --(snd FIN)--> FIN_WAIT --(rcv FIN,ACK / snd ACK)--> CLOSED    (sender)
//!   ESTABLISHED --(rcv FIN / snd FIN,ACK)--> CLOSE_WAIT --(silence)--> CLOSED  (receiver)
//! ```
//!
//! Loss is tolerated by retrying on the 500ms [`crate::timer::RTO`]. The
//! client's final handshake ACK is the one exception: it is sent exactly
//! once, since its loss is absorbed by the first data segment.

use std::time::Instant;

use log::{debug, info};

use crate::net::{RecvOutcome, Transport};
use crate::packet::Packet;
use crate::seq::{add, random_isn, SEQ_MAX};
use crate::timer::{CLOSE_WAIT, RTO};

/// Sequence/ack state a finished handshake hands to the send or receive engine.
#[derive(Debug, Clone, Copy)]
pub struct ConnVars {
    pub seq: u16,
    pub ack: u16,
}

/// Receiver-side (client) three-way handshake: send SYN, wait for SYN-ACK,
/// send ACK.
pub fn client_handshake<T: Transport>(ep: &mut T) -> std::io::Result<ConnVars> {
    let isn_c = random_isn() as u16;
    let syn = Packet::new(isn_c, 0)
        .with_syn()
        .with_window(SEQ_MAX as u16);

    let resp = loop {
        ep.send(&syn)?;
        match ep.recv_timeout(RTO)? {
            RecvOutcome::Timeout | RecvOutcome::Refused => {
                debug!("handshake: SYN unanswered, retrying");
                continue;
            }
            RecvOutcome::Packet(p) => {
                if p.syn && p.ack && p.ack_number == add(isn_c as u32, 1) as u16 {
                    break p;
                }
                debug!("handshake: discarding unexpected packet while awaiting SYN-ACK");
            }
        }
    };

    let seq = add(resp.ack_number as u32, 1) as u16;
    let ack = add(resp.seq_number as u32, 1) as u16;

    // Sent exactly once: a loss here is absorbed by the first data segment.
    let final_ack = Packet::new(resp.ack_number, ack)
        .with_ack()
        .with_window(SEQ_MAX as u16);
    ep.send(&final_ack)?;

    info!("handshake complete (client)");
    Ok(ConnVars { seq, ack })
}

/// Sender-side (server) three-way handshake. The caller has already
/// observed the SYN via [`crate::net::Endpoint::accept`].
pub fn server_handshake<T: Transport>(ep: &mut T, syn: &Packet) -> std::io::Result<ConnVars> {
    let isn_s = random_isn() as u16;
    let ack = add(syn.seq_number as u32, 1) as u16;
    let synack = Packet::new(isn_s, ack)
        .with_syn()
        .with_ack()
        .with_window(SEQ_MAX as u16);

    loop {
        ep.send(&synack)?;
        match ep.recv_timeout(RTO)? {
            RecvOutcome::Timeout | RecvOutcome::Refused => {
                debug!("handshake: SYN-ACK unanswered, retrying");
                continue;
            }
            RecvOutcome::Packet(p) => {
                if p.ack && p.ack_number == add(isn_s as u32, 1) as u16 {
                    break;
                }
                debug!("handshake: discarding unexpected packet while awaiting ACK");
            }
        }
    }

    info!("handshake complete (server)");
    Ok(ConnVars {
        seq: add(isn_s as u32, 1) as u16,
        ack,
    })
}

/// Sender-side teardown once the file has been fully streamed.
pub fn teardown_sender<T: Transport>(ep: &mut T, last_seq: u16, ack: u16) -> std::io::Result<()> {
    let fin = Packet::new(last_seq, ack).with_fin();
    let fin_ack_expected = add(last_seq as u32, 1) as u16;

    let resp = loop {
        ep.send(&fin)?;
        match ep.recv_timeout(RTO)? {
            RecvOutcome::Timeout | RecvOutcome::Refused => {
                debug!("teardown: FIN unanswered, retrying");
                continue;
            }
            RecvOutcome::Packet(p) => {
                if p.fin && p.ack && p.ack_number == fin_ack_expected {
                    break p;
                }
                debug!("teardown: discarding unexpected packet while awaiting FIN-ACK");
            }
        }
    };

    let final_ack = Packet::new(resp.ack_number, add(resp.seq_number as u32, 1) as u16).with_ack();
    ep.send(&final_ack)?;

    loop {
        match ep.recv_timeout(CLOSE_WAIT)? {
            RecvOutcome::Timeout | RecvOutcome::Refused => {
                info!("teardown complete (sender)");
                return Ok(());
            }
            RecvOutcome::Packet(p) if p.fin && p.ack => {
                debug!("teardown: duplicate FIN-ACK, retransmitting final ACK");
                ep.send(&final_ack)?;
            }
            RecvOutcome::Packet(_) => continue,
        }
    }
}

/// Receiver-side teardown, entered when the receive engine observes a FIN
/// while ESTABLISHED. `seq`/`ack` are the receiver's running connection
/// variables at the moment the FIN arrived (`ack` already advanced past
/// the FIN byte by the caller).
pub fn teardown_receiver<T: Transport>(ep: &mut T, seq: u16, ack: u16) -> std::io::Result<()> {
    let fin_ack = Packet::new(seq, ack).with_fin().with_ack();
    let final_ack_expected = add(seq as u32, 1) as u16;
    ep.send(&fin_ack)?;

    let mut silence_since = Instant::now();
    loop {
        match ep.recv_timeout(RTO)? {
            RecvOutcome::Timeout => {
                if silence_since.elapsed() >= CLOSE_WAIT {
                    info!("teardown complete (receiver), gave up waiting for final ACK");
                    return Ok(());
                }
                debug!("teardown: retransmitting FIN-ACK");
                ep.send(&fin_ack)?;
            }
            RecvOutcome::Refused => {
                info!("teardown complete (receiver)");
                return Ok(());
            }
            RecvOutcome::Packet(p) if p.ack && !p.fin && p.ack_number == final_ack_expected => {
                info!("teardown complete (receiver)");
                return Ok(());
            }
            RecvOutcome::Packet(_) => {
                silence_since = Instant::now();
            }
        }
    }
}
