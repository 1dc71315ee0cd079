use bytes::Bytes;

use super::*;

fn def_packet() -> Packet {
    Packet::new(0, 1, 4, Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]))
}

#[test]
fn test_packet_creation() {
    let p = def_packet();
    assert_eq!(p.seq_number, 0);
    assert_eq!(p.seq_total, 1);
    assert_eq!(p.data_size, 4);
    assert_eq!(&p.data[..], &[0xde, 0xad, 0xbe, 0xef]);
}

#[test]
fn test_packet_encode() {
    let raw = def_packet().encode();
    assert_eq!(raw.len(), HEADER_SIZE + 4);
    assert_eq!(&raw[0..4], &[0x00, 0x00, 0x00, 0x00]); // seq number
    assert_eq!(&raw[4..8], &[0x00, 0x00, 0x00, 0x01]); // seq total
    assert_eq!(&raw[8..12], &[0x00, 0x00, 0x00, 0x04]); // data size
    assert_eq!(&raw[12..], &[0xde, 0xad, 0xbe, 0xef]); // data
}

#[test]
fn test_packet_encode_keeps_padding() {
    // "hello" padded to a 16 byte slot, the way the dns channel frames it.
    let mut data = b"hello".to_vec();
    data.resize(16, 0x00);
    let p = Packet::new(0, 1, 5, Bytes::from(data));

    let raw = p.encode();
    assert_eq!(raw.len(), HEADER_SIZE + 16);
    assert_eq!(
        &raw[..],
        &[
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x68, 0x65,
            0x6c, 0x6c, 0x6f, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ]
    );
    assert_eq!(&p.payload()[..], b"hello");
}

#[test]
fn test_packet_decode() {
    let raw = def_packet().encode();
    let p = Packet::decode(&raw).unwrap();
    assert_eq!(p, def_packet());
}

#[test]
fn test_packet_decode_strips_padding() {
    let mut data = b"hello".to_vec();
    data.resize(16, 0x00);
    let raw = Packet::new(0, 1, 5, Bytes::from(data)).encode();

    let p = Packet::decode(&raw).unwrap();
    assert_eq!(p.data_size, 5);
    assert_eq!(&p.data[..], b"hello");
}

#[test]
fn test_packet_hex() {
    assert_eq!(def_packet().hex(), "000000000000000100000004deadbeef");
}

#[test]
fn test_decode_short_packet() {
    assert_eq!(Packet::decode(&[0x00]), Err(Error::ErrPacketTooShort));

    let raw = def_packet().encode();
    for n in 0..HEADER_SIZE {
        assert_eq!(Packet::decode(&raw[..n]), Err(Error::ErrPacketTooShort));
    }
}

#[test]
fn test_decode_malformed_packet() {
    let mut p = def_packet();
    p.data_size += 1;
    let raw = p.encode();
    assert_eq!(Packet::decode(&raw), Err(Error::ErrPacketDataSize));
}

#[test]
fn test_to_chunks_empty() {
    assert!(to_chunks(&[], 16).is_empty());
}

#[test]
fn test_to_chunks_exact_multiple() {
    let buffer = vec![0xau8; 32];
    let chunks = to_chunks(&buffer, 16);
    assert_eq!(chunks.len(), 2);
    for chunk in &chunks {
        assert_eq!(chunk.data.len(), 16);
        assert_eq!(chunk.size, 16);
    }
}

#[test]
fn test_to_chunks_short_final() {
    let buffer: Vec<u8> = (0u8..20).collect();
    let chunks = to_chunks(&buffer, 16);
    assert_eq!(chunks.len(), 2);

    assert_eq!(chunks[0].size, 16);
    assert_eq!(&chunks[0].data[..], &buffer[..16]);

    assert_eq!(chunks[1].size, 4);
    assert_eq!(chunks[1].data.len(), 16);
    assert_eq!(&chunks[1].data[..4], &buffer[16..]);
    assert_eq!(&chunks[1].data[4..], &[0u8; 12]);
}

#[test]
fn test_to_chunks_sizes_sum_to_input() {
    for len in [1usize, 15, 16, 17, 100, 255, 256] {
        let buffer = vec![0x55u8; len];
        let chunks = to_chunks(&buffer, 16);
        assert_eq!(chunks.len(), len.div_ceil(16));
        let total: u32 = chunks.iter().map(|c| c.size).sum();
        assert_eq!(total as usize, len);
    }
}
