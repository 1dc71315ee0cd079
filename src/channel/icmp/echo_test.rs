use bytes::Bytes;

use super::echo::*;
use crate::error::Error;
use crate::packet::Packet;

#[test]
fn test_echo_marshal_layout() {
    let echo = Echo {
        id: 0x1234,
        seq: 0x0001,
        data: Bytes::from_static(b"ping"),
    };

    let raw = echo.marshal();
    assert_eq!(raw.len(), ECHO_HEADER_SIZE + 4);
    assert_eq!(raw[0], ECHO_REQUEST);
    assert_eq!(raw[1], 0); // code
    assert_eq!(&raw[4..6], &[0x12, 0x34]); // id
    assert_eq!(&raw[6..8], &[0x00, 0x01]); // seq
    assert_eq!(&raw[8..], b"ping");
}

#[test]
fn test_echo_checksum_verifies() {
    let echo = Echo {
        id: 7,
        seq: 3,
        data: Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef, 0x01]),
    };

    // Re-summing a marshalled message, checksum included, must yield 0.
    let raw = echo.marshal();
    let mut sum = 0u32;
    for pair in raw.chunks(2) {
        let word = if pair.len() == 2 {
            u16::from_be_bytes([pair[0], pair[1]])
        } else {
            u16::from_be_bytes([pair[0], 0])
        };
        sum += u32::from(word);
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    assert_eq!(sum as u16, 0xffff);
}

#[test]
fn test_echo_round_trip() {
    let echo = Echo {
        id: 0xbeef,
        seq: 42,
        data: Bytes::from_static(b"payload"),
    };

    let parsed = Echo::unmarshal(&echo.marshal()).unwrap();
    assert_eq!(parsed, echo);
}

#[test]
fn test_echo_round_trip_carries_frame() {
    let packet = Packet::new(0, 1, 5, Bytes::from_static(b"hello"));
    let echo = Echo {
        id: (std::process::id() & 0xffff) as u16,
        seq: 0,
        data: packet.encode(),
    };

    let parsed = Echo::unmarshal(&echo.marshal()).unwrap();
    let decoded = Packet::decode(&parsed.data).unwrap();
    assert_eq!(&decoded.payload()[..], b"hello");
}

#[test]
fn test_unmarshal_rejects_non_echo() {
    let mut raw = Echo::default().marshal().to_vec();
    raw[0] = 0; // echo reply
    assert_eq!(Echo::unmarshal(&raw), Err(Error::ErrIcmpNotEcho));
}

#[test]
fn test_unmarshal_rejects_short_message() {
    assert_eq!(Echo::unmarshal(&[8, 0, 0]), Err(Error::ErrIcmpTooShort));
}

#[test]
fn test_strip_ipv4_header() {
    let echo = Echo {
        id: 1,
        seq: 2,
        data: Bytes::from_static(b"x"),
    };

    let mut datagram = vec![0u8; 20];
    datagram[0] = 0x45; // version 4, ihl 5
    datagram.extend_from_slice(&echo.marshal());

    let message = strip_ipv4_header(&datagram).unwrap();
    assert_eq!(Echo::unmarshal(message).unwrap(), echo);
}

#[test]
fn test_strip_ipv4_header_rejects_garbage() {
    assert_eq!(strip_ipv4_header(&[0u8; 4]), Err(Error::ErrIpv4Header));

    let mut datagram = vec![0u8; 24];
    datagram[0] = 0x65; // wrong version
    assert_eq!(strip_ipv4_header(&datagram), Err(Error::ErrIpv4Header));

    let mut datagram = vec![0u8; 24];
    datagram[0] = 0x4f; // ihl larger than the datagram
    assert_eq!(strip_ipv4_header(&datagram), Err(Error::ErrIpv4Header));
}
