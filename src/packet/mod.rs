#[cfg(test)]
mod packet_test;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Size of the wire header: seq_number, seq_total and data_size,
/// each a big-endian u32.
pub const HEADER_SIZE: usize = 12;

/// Packet is the fixed-layout frame every framing channel carries.
///
/// `data` may be longer than `data_size` on fixed-slot substrates, where
/// the payload is zero-padded to the substrate chunk size; `data_size` is
/// always the number of meaningful bytes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Packet {
    pub seq_number: u32,
    pub seq_total: u32,
    pub data_size: u32,
    pub data: Bytes,
}

impl Packet {
    pub fn new(seq_number: u32, seq_total: u32, data_size: u32, data: Bytes) -> Self {
        Packet {
            seq_number,
            seq_total,
            data_size,
            data,
        }
    }

    /// The header followed by `data` verbatim, padding included.
    pub fn encode(&self) -> Bytes {
        let mut raw = BytesMut::with_capacity(HEADER_SIZE + self.data.len());
        raw.put_u32(self.seq_number);
        raw.put_u32(self.seq_total);
        raw.put_u32(self.data_size);
        raw.extend_from_slice(&self.data);
        raw.freeze()
    }

    pub fn decode(raw: &[u8]) -> Result<Self> {
        if raw.len() < HEADER_SIZE {
            return Err(Error::ErrPacketTooShort);
        }

        let mut header = &raw[..HEADER_SIZE];
        let seq_number = header.get_u32();
        let seq_total = header.get_u32();
        let data_size = header.get_u32();

        if data_size as usize > raw.len() - HEADER_SIZE {
            return Err(Error::ErrPacketDataSize);
        }

        Ok(Packet {
            seq_number,
            seq_total,
            data_size,
            data: Bytes::copy_from_slice(&raw[HEADER_SIZE..HEADER_SIZE + data_size as usize]),
        })
    }

    /// Lowercase hexadecimal of the encoded frame, as carried in DNS
    /// labels and paste bodies.
    pub fn hex(&self) -> String {
        hex::encode(self.encode())
    }

    /// The meaningful bytes of `data`, padding stripped.
    pub fn payload(&self) -> Bytes {
        self.data.slice(..self.data_size as usize)
    }
}

/// A fixed-size slice of a logical write. `data` is always exactly the
/// substrate chunk size, zero-padded if needed; `size` is the number of
/// bytes that came from the caller's buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub data: Bytes,
    pub size: u32,
}

/// Splits `buffer` into `ceil(len / chunk_size)` chunks of exactly
/// `chunk_size` bytes, zero-padding the last one. Empty input yields no
/// chunks.
pub fn to_chunks(buffer: &[u8], chunk_size: usize) -> Vec<Chunk> {
    assert!(chunk_size > 0);

    let mut chunks = Vec::with_capacity(buffer.len().div_ceil(chunk_size));
    for piece in buffer.chunks(chunk_size) {
        let size = piece.len() as u32;
        let data = if piece.len() < chunk_size {
            let mut padded = BytesMut::with_capacity(chunk_size);
            padded.extend_from_slice(piece);
            padded.resize(chunk_size, 0x00);
            padded.freeze()
        } else {
            Bytes::copy_from_slice(piece)
        };

        chunks.push(Chunk { data, size });
    }

    chunks
}
