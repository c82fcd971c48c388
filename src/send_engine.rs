//! Sender-side reliable send engine: a sliding-window retransmit queue
//! driving the congestion controller against a lossy network.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::time::Instant;

use log::{debug, trace};

use crate::conn::ConnVars;
use crate::congestion::CongestionController;
use crate::net::{RecvOutcome, Transport};
use crate::packet::Packet;
use crate::seq::{add, MSS, SEQ_MAX};
use crate::timer::{self, RTO};

struct OutstandingSegment {
    packet: Packet,
    send_time: Option<Instant>,
    sent: bool,
    /// Diagnostic only — whether this record has ever been retransmitted.
    retransmit: bool,
}

impl OutstandingSegment {
    fn end_seq(&self) -> u16 {
        add(self.packet.seq_number as u32, self.packet.data_len() as u32) as u16
    }
}

/// Drives `file` to completion over `ep`, starting from the sequence/ack
/// state a handshake produced. Returns the connection variables the caller
/// should hand to [`crate::conn::teardown_sender`].
pub fn run<R: Read, T: Transport>(
    file: &mut R,
    ep: &mut T,
    conn: ConnVars,
) -> io::Result<ConnVars> {
    let mut cc = CongestionController::new();
    let mut outstanding: VecDeque<OutstandingSegment> = VecDeque::new();
    let mut next_seq = conn.seq;
    let mut eof = false;
    let mut advertised_window: u32 = SEQ_MAX;

    loop {
        // 1. Refill.
        let mut cwnd_used: u32 = outstanding.iter().map(|s| s.packet.data_len() as u32).sum();
        while cwnd_used < cc.cwnd && !eof {
            let want = (cc.cwnd - cwnd_used).min(MSS) as usize;
            let mut buf = vec![0u8; want];
            let n = file.read(&mut buf)?;
            if n == 0 {
                eof = true;
                break;
            }
            buf.truncate(n);
            let packet = Packet::data_segment(next_seq, conn.ack, &buf);
            trace!("enqueue segment seq={next_seq} len={n}");
            outstanding.push_back(OutstandingSegment {
                packet,
                send_time: None,
                sent: false,
                retransmit: false,
            });
            next_seq = add(next_seq as u32, n as u32) as u16;
            cwnd_used += n as u32;
        }

        // 2. Termination check.
        if eof && outstanding.is_empty() {
            return Ok(ConnVars {
                seq: next_seq,
                ack: conn.ack,
            });
        }

        // 3. Transmit pass.
        let now = Instant::now();
        for seg in outstanding.iter_mut() {
            if !seg.sent {
                ep.send(&seg.packet)?;
                seg.send_time = Some(now);
                seg.sent = true;
            } else if now.duration_since(seg.send_time.unwrap()) > RTO {
                debug!("retransmitting seq={}", seg.packet.seq_number);
                ep.send(&seg.packet)?;
                seg.send_time = Some(now);
                seg.retransmit = true;
            }
        }

        // 4. Wait for an ACK.
        let front_send_time = outstanding.front().and_then(|s| s.send_time).unwrap_or(now);
        let wait = timer::remaining(Instant::now(), front_send_time, RTO);

        match ep.recv_timeout(wait)? {
            RecvOutcome::Timeout => {
                debug!("ack wait timed out, treating head of window as lost");
                if let Some(front) = outstanding.front_mut() {
                    front.sent = false;
                }
                cc.on_timeout(advertised_window);
            }
            RecvOutcome::Refused => {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "peer is no longer reachable",
                ));
            }
            RecvOutcome::Packet(p) if p.ack => {
                advertised_window = p.window_sz() as u32;
                match outstanding.iter().position(|s| s.end_seq() == p.ack_number) {
                    Some(idx) => {
                        outstanding.drain(..=idx);
                        cc.on_new_ack(advertised_window);
                        trace!("new ack={}, cwnd={}, ssthresh={}", p.ack_number, cc.cwnd, cc.ssthresh);
                    }
                    None => {
                        let retransmit_head = cc.on_duplicate_ack(advertised_window);
                        debug!(
                            "duplicate ack={} (count={}), mode={:?}",
                            p.ack_number, cc.duplicate_acks, cc.mode
                        );
                        if retransmit_head {
                            if let Some(front) = outstanding.front_mut() {
                                front.sent = false;
                            }
                        }
                    }
                }
            }
            RecvOutcome::Packet(_) => {
                debug!("ignoring non-ACK packet during data transfer");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// A transport that always acknowledges the most recently sent data
    /// segment's end sequence, advertising a full window. Useful for
    /// exercising the refill/transmit/retire cycle without loss.
    struct LosslessEcho {
        last_data_seq: Option<Packet>,
        sends: u32,
    }

    impl Transport for LosslessEcho {
        fn send(&mut self, packet: &Packet) -> io::Result<()> {
            self.sends += 1;
            if !packet.syn && !packet.fin && packet.data_len() > 0 {
                self.last_data_seq = Some(packet.clone());
            }
            Ok(())
        }

        fn recv_timeout(&mut self, _timeout: std::time::Duration) -> io::Result<RecvOutcome> {
            match self.last_data_seq.take() {
                Some(p) => {
                    let end = add(p.seq_number as u32, p.data_len() as u32) as u16;
                    Ok(RecvOutcome::Packet(
                        Packet::new(end, 0).with_ack().with_window(SEQ_MAX as u16),
                    ))
                }
                None => Ok(RecvOutcome::Timeout),
            }
        }
    }

    #[test]
    fn transfers_small_file_to_completion() {
        let data = b"hello reliable udp world".to_vec();
        let mut file = Cursor::new(data.clone());
        let mut transport = LosslessEcho {
            last_data_seq: None,
            sends: 0,
        };
        let conn = ConnVars { seq: 100, ack: 200 };

        let result = run(&mut file, &mut transport, conn).unwrap();
        assert_eq!(result.seq, add(100, data.len() as u32) as u16);
        assert_eq!(result.ack, 200);
    }

    #[test]
    fn empty_file_terminates_immediately() {
        let mut file = Cursor::new(Vec::<u8>::new());
        let mut transport = LosslessEcho {
            last_data_seq: None,
            sends: 0,
        };
        let conn = ConnVars { seq: 7, ack: 9 };
        let result = run(&mut file, &mut transport, conn).unwrap();
        assert_eq!(result.seq, 7);
        assert_eq!(transport.sends, 0);
    }
}
