//! Receiver-side engine: cumulative acknowledgment with a bounded reorder
//! cache against the wrap-around sequence space.

use std::collections::HashMap;
use std::io::{self, Write};

use log::{debug, trace};

use crate::conn::ConnVars;
use crate::net::{RecvOutcome, Transport};
use crate::packet::Packet;
use crate::seq::{add, in_forward_window, SEQ_MAX};
use crate::timer::RTO;

/// Consumes `ep` into `sink` until a FIN arrives, then returns the
/// connection variables the caller should hand to
/// [`crate::conn::teardown_receiver`].
pub fn run<T: Transport, W: Write>(
    ep: &mut T,
    sink: &mut W,
    conn: ConnVars,
) -> io::Result<ConnVars> {
    let mut ack = conn.ack;
    let mut reorder_cache: HashMap<u16, Packet> = HashMap::new();
    let mut first = true;
    let mut retransmitting = false;

    loop {
        if !first {
            let ack_pkt = Packet::new(0, ack).with_ack().with_window(SEQ_MAX as u16);
            if retransmitting {
                trace!("re-emitting cumulative ack={ack} after timeout");
            }
            ep.send(&ack_pkt)?;
        }
        first = false;

        match ep.recv_timeout(RTO)? {
            RecvOutcome::Timeout => {
                retransmitting = true;
                continue;
            }
            RecvOutcome::Refused => {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "peer is no longer reachable",
                ));
            }
            RecvOutcome::Packet(p) => {
                retransmitting = false;

                if p.fin {
                    return Ok(ConnVars {
                        seq: conn.seq,
                        ack: add(p.seq_number as u32, 1) as u16,
                    });
                }

                if p.seq_number == ack {
                    sink.write_all(p.payload())?;
                    ack = add(ack as u32, p.data_len() as u32) as u16;

                    while let Some(cached) = reorder_cache.remove(&ack) {
                        sink.write_all(cached.payload())?;
                        ack = add(ack as u32, cached.data_len() as u32) as u16;
                    }
                } else if in_forward_window(p.seq_number as u32, ack as u32) {
                    trace!("caching out-of-order segment seq={}", p.seq_number);
                    reorder_cache.entry(p.seq_number).or_insert(p);
                } else {
                    debug!("discarding stale duplicate seq={}", p.seq_number);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    struct ScriptedPeer {
        inbox: VecDeque<RecvOutcome>,
    }

    impl Transport for ScriptedPeer {
        fn send(&mut self, _packet: &Packet) -> io::Result<()> {
            Ok(())
        }

        fn recv_timeout(&mut self, _timeout: Duration) -> io::Result<RecvOutcome> {
            Ok(self.inbox.pop_front().unwrap_or(RecvOutcome::Timeout))
        }
    }

    fn data(seq: u16, payload: &[u8]) -> RecvOutcome {
        RecvOutcome::Packet(Packet::data_segment(seq, 0, payload))
    }

    fn fin(seq: u16) -> RecvOutcome {
        RecvOutcome::Packet(Packet::new(seq, 0).with_fin())
    }

    #[test]
    fn in_order_delivery() {
        let mut peer = ScriptedPeer {
            inbox: VecDeque::from(vec![data(0, b"abc"), data(3, b"def"), fin(6)]),
        };
        let mut out = Vec::new();
        let conn = ConnVars { seq: 0, ack: 0 };
        let result = run(&mut peer, &mut out, conn).unwrap();
        assert_eq!(out, b"abcdef");
        assert_eq!(result.ack, 7);
    }

    #[test]
    fn reorders_out_of_window_arrivals() {
        // Segments arrive 2, 1, 3 (byte offsets), each 1 byte: "b", "a", "c".
        let mut peer = ScriptedPeer {
            inbox: VecDeque::from(vec![data(1, b"b"), data(0, b"a"), data(2, b"c"), fin(3)]),
        };
        let mut out = Vec::new();
        let conn = ConnVars { seq: 0, ack: 0 };
        run(&mut peer, &mut out, conn).unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn duplicate_in_window_segment_is_ignored_by_cache() {
        let mut peer = ScriptedPeer {
            inbox: VecDeque::from(vec![
                data(1, b"b"),
                data(1, b"X"), // duplicate arrival, first-write-wins
                data(0, b"a"),
                fin(2),
            ]),
        };
        let mut out = Vec::new();
        let conn = ConnVars { seq: 0, ack: 0 };
        run(&mut peer, &mut out, conn).unwrap();
        assert_eq!(out, b"ab");
    }

    #[test]
    fn stale_duplicate_outside_window_is_discarded() {
        let mut peer = ScriptedPeer {
            inbox: VecDeque::from(vec![
                data(0, b"a"),
                data(0, b"z"), // stale retransmission of an already-acked byte
                fin(1),
            ]),
        };
        let mut out = Vec::new();
        let conn = ConnVars { seq: 0, ack: 0 };
        run(&mut peer, &mut out, conn).unwrap();
        assert_eq!(out, b"a");
    }
}
