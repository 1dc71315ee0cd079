use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// ICMP echo request message type.
pub const ECHO_REQUEST: u8 = 8;

/// Size of the ICMP echo header: type, code, checksum, id, seq.
pub const ECHO_HEADER_SIZE: usize = 8;

const IPV4_MIN_HEADER_SIZE: usize = 20;

/// An ICMP echo request carrying a frame in its payload.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Echo {
    pub id: u16,
    pub seq: u16,
    pub data: Bytes,
}

impl Echo {
    pub fn marshal(&self) -> Bytes {
        let mut raw = BytesMut::with_capacity(ECHO_HEADER_SIZE + self.data.len());
        raw.put_u8(ECHO_REQUEST);
        raw.put_u8(0); // code
        raw.put_u16(0); // checksum, patched below
        raw.put_u16(self.id);
        raw.put_u16(self.seq);
        raw.extend_from_slice(&self.data);

        let sum = checksum(&raw);
        raw[2..4].copy_from_slice(&sum.to_be_bytes());

        raw.freeze()
    }

    /// Parses an ICMP message (IP header already stripped). Anything
    /// that is not an echo request is rejected.
    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        if raw.len() < ECHO_HEADER_SIZE {
            return Err(Error::ErrIcmpTooShort);
        }

        let mut header = &raw[..ECHO_HEADER_SIZE];
        let typ = header.get_u8();
        let _code = header.get_u8();
        let _checksum = header.get_u16();
        let id = header.get_u16();
        let seq = header.get_u16();

        if typ != ECHO_REQUEST {
            return Err(Error::ErrIcmpNotEcho);
        }

        Ok(Echo {
            id,
            seq,
            data: Bytes::copy_from_slice(&raw[ECHO_HEADER_SIZE..]),
        })
    }
}

/// Strips the IPv4 header a raw socket hands us, yielding the ICMP
/// message.
pub fn strip_ipv4_header(raw: &[u8]) -> Result<&[u8]> {
    if raw.len() < IPV4_MIN_HEADER_SIZE {
        return Err(Error::ErrIpv4Header);
    }

    let version = raw[0] >> 4;
    let header_len = ((raw[0] & 0x0f) as usize) * 4;
    if version != 4 || header_len < IPV4_MIN_HEADER_SIZE || raw.len() < header_len {
        return Err(Error::ErrIpv4Header);
    }

    Ok(&raw[header_len..])
}

/// RFC 1071 internet checksum.
fn checksum(data: &[u8]) -> u16 {
    let mut sum = 0u32;

    for pair in data.chunks(2) {
        let word = if pair.len() == 2 {
            u16::from_be_bytes([pair[0], pair[1]])
        } else {
            u16::from_be_bytes([pair[0], 0])
        };
        sum = sum.wrapping_add(u32::from(word));
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }

    !(sum as u16)
}
