//! Fixed-layout packet codec.
//!
//! Wire layout (network byte order, 8-byte header + 1024-byte payload
//! region = 1032 bytes total):
//!
//! ```text
//!  0       2       4       6  7  8
//!  |-------|-------|-------|--|--|
//!  ack_num  seq_num  meta   fl pad
//! ```
//!
//! `meta` is overloaded: on sender->receiver packets it carries `data_len`,
//! on receiver->sender packets it carries `window_sz`. Flag bits occupy
//! one octet with a fixed order (ack=bit0, syn=bit1, fin=bit2) so peers on
//! heterogeneous endianness interoperate — do not replicate a
//! platform-dependent bitfield layout here.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::err::Error;

pub const HEADER_SZ: usize = 8;
pub const DATA_SZ: usize = 1024;
pub const WIRE_SZ: usize = HEADER_SZ + DATA_SZ;

const FLAG_ACK: u8 = 1 << 0;
const FLAG_SYN: u8 = 1 << 1;
const FLAG_FIN: u8 = 1 << 2;

/// A fixed-size datagram: header fields plus an inline payload buffer.
///
/// `data` always holds `DATA_SZ` bytes; only `meta` of them are meaningful
/// when this packet carries sender->receiver data. Use [`Packet::payload`]
/// to get that meaningful slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub ack_number: u16,
    pub seq_number: u16,
    /// `data_len` on sender->receiver packets, `window_sz` on receiver->sender ones.
    pub meta: u16,
    pub ack: bool,
    pub syn: bool,
    pub fin: bool,
    data: [u8; DATA_SZ],
}

impl Packet {
    pub fn new(seq_number: u16, ack_number: u16) -> Self {
        Packet {
            ack_number,
            seq_number,
            meta: 0,
            ack: false,
            syn: false,
            fin: false,
            data: [0u8; DATA_SZ],
        }
    }

    /// Build a data segment: `meta` is set to `payload.len()`.
    pub fn data_segment(seq_number: u16, ack_number: u16, payload: &[u8]) -> Self {
        assert!(payload.len() <= DATA_SZ, "payload exceeds MSS");
        let mut buf = [0u8; DATA_SZ];
        buf[..payload.len()].copy_from_slice(payload);
        Packet {
            ack_number,
            seq_number,
            meta: payload.len() as u16,
            ack: false,
            syn: false,
            fin: false,
            data: buf,
        }
    }

    pub fn with_ack(mut self) -> Self {
        self.ack = true;
        self
    }

    pub fn with_syn(mut self) -> Self {
        self.syn = true;
        self
    }

    pub fn with_fin(mut self) -> Self {
        self.fin = true;
        self
    }

    pub fn with_window(mut self, window_sz: u16) -> Self {
        self.meta = window_sz;
        self
    }

    /// The meaningful payload bytes, per `meta` interpreted as `data_len`.
    pub fn payload(&self) -> &[u8] {
        &self.data[..(self.meta as usize).min(DATA_SZ)]
    }

    pub fn data_len(&self) -> u16 {
        self.meta
    }

    pub fn window_sz(&self) -> u16 {
        self.meta
    }

    fn flags_byte(&self) -> u8 {
        let mut b = 0u8;
        if self.ack {
            b |= FLAG_ACK;
        }
        if self.syn {
            b |= FLAG_SYN;
        }
        if self.fin {
            b |= FLAG_FIN;
        }
        b
    }

    /// Encode to the fixed wire layout, converting to network byte order.
    pub fn encode(&self) -> [u8; WIRE_SZ] {
        let mut buf = [0u8; WIRE_SZ];
        {
            let mut cursor = Cursor::new(&mut buf[..HEADER_SZ]);
            cursor.write_u16::<BigEndian>(self.ack_number).unwrap();
            cursor.write_u16::<BigEndian>(self.seq_number).unwrap();
            cursor.write_u16::<BigEndian>(self.meta).unwrap();
            cursor.write_u8(self.flags_byte()).unwrap();
            cursor.write_u8(0).unwrap(); // reserved padding
        }
        buf[HEADER_SZ..].copy_from_slice(&self.data);
        buf
    }

    /// Decode from the wire layout, converting back to host byte order.
    ///
    /// Rejects frames shorter than the fixed header as [`Error::InvalidFrame`].
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < HEADER_SZ {
            return Err(Error::InvalidFrame { len: bytes.len() });
        }

        let mut cursor = Cursor::new(&bytes[..HEADER_SZ]);
        let ack_number = cursor.read_u16::<BigEndian>().unwrap();
        let seq_number = cursor.read_u16::<BigEndian>().unwrap();
        let meta = cursor.read_u16::<BigEndian>().unwrap();
        let flags = cursor.read_u8().unwrap();

        let mut data = [0u8; DATA_SZ];
        let available = (bytes.len() - HEADER_SZ).min(DATA_SZ);
        data[..available].copy_from_slice(&bytes[HEADER_SZ..HEADER_SZ + available]);

        Ok(Packet {
            ack_number,
            seq_number,
            meta,
            ack: flags & FLAG_ACK != 0,
            syn: flags & FLAG_SYN != 0,
            fin: flags & FLAG_FIN != 0,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let pkt = Packet::data_segment(1000, 2000, b"hello world").with_ack();
        let wire = pkt.encode();
        assert_eq!(wire.len(), WIRE_SZ);
        let decoded = Packet::decode(&wire).unwrap();
        assert_eq!(decoded, pkt);
        assert_eq!(decoded.payload(), b"hello world");
    }

    #[test]
    fn flag_bit_positions_are_fixed() {
        let pkt = Packet::new(0, 0).with_ack().with_syn();
        let wire = pkt.encode();
        assert_eq!(wire[6] & 0b0000_0111, 0b011);
    }

    #[test]
    fn short_frame_is_rejected() {
        let short = [0u8; HEADER_SZ - 1];
        assert!(matches!(
            Packet::decode(&short),
            Err(Error::InvalidFrame { len }) if len == HEADER_SZ - 1
        ));
    }

    #[test]
    fn decode_tolerates_truncated_payload() {
        let pkt = Packet::data_segment(5, 5, b"ab");
        let wire = pkt.encode();
        // Simulate a shorter-than-WIRE_SZ datagram that still has the full header.
        let short = &wire[..HEADER_SZ + 2];
        let decoded = Packet::decode(short).unwrap();
        assert_eq!(decoded.payload(), b"ab");
    }
}
