
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::Bytes;
use tokio::sync::{Mutex, Notify};

use crate::packet::{to_chunks, Packet};

fn next_seqn(current: u32, total: u32) -> u32 {
    // The counter rolls back to 0 after the last packet of a group.
    if current == total.wrapping_sub(1) {
        0
    } else {
        current.wrapping_add(1)
    }
}

#[derive(Default)]
struct SequencerState {
    // Sorted ascending by seq_number after every insertion. Duplicates
    // keep their arrival order.
    queue: Vec<Packet>,
    expected: u32,
}

/// PacketSequencer numbers outgoing packets and reorders incoming ones.
///
/// The send side stamps packets with a monotonic counter that resets
/// after the final packet of a group. The receive side buffers packets
/// offered by a channel's listener task and releases them to `get` in
/// strict sequence order.
#[derive(Default)]
pub struct PacketSequencer {
    send_seqn: AtomicU32,
    state: Mutex<SequencerState>,
    grew: Notify,
}

impl PacketSequencer {
    pub fn new() -> Self {
        PacketSequencer::default()
    }

    /// Builds the next outgoing packet of a group of `total`. `data_size`
    /// is the number of meaningful bytes in `data`, which may be padded.
    pub fn next_packet(&self, data: Bytes, data_size: u32, total: u32) -> Packet {
        let seqn = self.send_seqn.load(Ordering::SeqCst);
        let packet = Packet::new(seqn, total, data_size, data);

        log::debug!("sequencer built a packet with seqn={seqn} tot={total}");

        self.send_seqn.store(next_seqn(seqn, total), Ordering::SeqCst);

        packet
    }

    /// Chunks `buffer` and stamps one packet per chunk, all sharing the
    /// same group total.
    pub fn packets(&self, buffer: &[u8], chunk_size: usize) -> Vec<Packet> {
        let chunks = to_chunks(buffer, chunk_size);
        let total = chunks.len() as u32;

        chunks
            .into_iter()
            .map(|chunk| self.next_packet(chunk.data, chunk.size, total))
            .collect()
    }

    /// Accepts a received packet. Never blocks on the consumer and never
    /// drops: out of order and duplicate packets are queued as-is.
    pub async fn offer(&self, packet: Packet) {
        let mut state = self.state.lock().await;

        log::debug!(
            "adding packet with sequence number {} to queue of {}",
            packet.seq_number,
            state.queue.len()
        );

        state.queue.push(packet);
        state.queue.sort_by_key(|p| p.seq_number);

        self.grew.notify_one();
    }

    /// Waits until the head of the queue carries the expected sequence
    /// number, pops and returns it.
    pub async fn get(&self) -> Packet {
        loop {
            {
                let mut state = self.state.lock().await;
                let expected = state.expected;
                if state
                    .queue
                    .first()
                    .is_some_and(|head| head.seq_number == expected)
                {
                    let packet = state.queue.remove(0);
                    state.expected = next_seqn(packet.seq_number, packet.seq_total);

                    log::debug!(
                        "returning packet with sequence number {} / {}",
                        packet.seq_number,
                        packet.seq_total
                    );

                    return packet;
                }
            }

            self.grew.notified().await;
        }
    }

    pub async fn has_packet(&self) -> bool {
        !self.state.lock().await.queue.is_empty()
    }
}
