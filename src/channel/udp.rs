use std::sync::Arc;

use async_trait::async_trait;
use clap::ArgMatches;
use tokio::net::{lookup_host, UdpSocket};

use super::{Channel, ChannelStats, Direction, StatsCounter};
use crate::error::{Error, Result};
use crate::packet::{to_chunks, Packet};
use crate::sequencer::PacketSequencer;

pub const UDP_CHUNK_SIZE: usize = 128;
pub const UDP_BUFFER_SIZE: usize = 512;

/// Frame-per-datagram carrier. The input direction binds the endpoint
/// and fans received packets into the sequencer from a listener task;
/// the output direction sends one datagram per chunk.
pub struct UdpChannel {
    is_client: bool,
    address: String,
    socket: Option<Arc<UdpSocket>>,
    sequencer: Arc<PacketSequencer>,
    stats: Arc<StatsCounter>,
}

impl UdpChannel {
    pub fn new() -> Self {
        UdpChannel {
            is_client: true,
            address: String::new(),
            socket: None,
            sequencer: Arc::new(PacketSequencer::new()),
            stats: Arc::new(StatsCounter::default()),
        }
    }
}

impl Default for UdpChannel {
    fn default() -> Self {
        UdpChannel::new()
    }
}

#[async_trait]
impl Channel for UdpChannel {
    fn name(&self) -> &'static str {
        "udp"
    }

    fn description(&self) -> &'static str {
        "Send data as UDP packets and read data as UDP packets ( example: udp:192.168.1.24:10013 )."
    }

    fn setup(&mut self, direction: Direction, args: &str, _matches: &ArgMatches) -> Result<()> {
        self.is_client = direction == Direction::Output;

        if args.is_empty() {
            return Err(Error::ErrAddressParse(args.to_owned()));
        }
        self.address = args.to_owned();

        log::debug!("setup udp channel: direction={direction} address={}", self.address);

        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        let addr = lookup_host(self.address.as_str())
            .await?
            .next()
            .ok_or_else(|| Error::ErrAddressParse(self.address.clone()))?;

        if self.is_client {
            let socket = UdpSocket::bind("127.0.0.1:0").await?;
            socket.connect(addr).await?;
            self.socket = Some(Arc::new(socket));
        } else {
            let socket = Arc::new(UdpSocket::bind(addr).await?);
            self.socket = Some(Arc::clone(&socket));

            let sequencer = Arc::clone(&self.sequencer);
            let stats = Arc::clone(&self.stats);
            tokio::spawn(async move {
                log::info!("started udp listener on {addr}");

                let mut buffer = vec![0u8; UDP_BUFFER_SIZE];
                loop {
                    let (n, peer) = match socket.recv_from(&mut buffer).await {
                        Ok(received) => received,
                        Err(e) => {
                            log::warn!("error while reading udp packet: {e}");
                            continue;
                        }
                    };

                    log::debug!("read {n} bytes of udp packet from {peer}");

                    match Packet::decode(&buffer[..n]) {
                        Ok(packet) => {
                            stats.add_read(packet.data_size as usize);
                            sequencer.offer(packet).await;
                        }
                        Err(e) => log::error!("error while decoding udp payload: {e}"),
                    }
                }
            });
        }

        Ok(())
    }

    fn has_reader(&self) -> bool {
        !self.is_client
    }

    fn has_writer(&self) -> bool {
        self.is_client
    }

    async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if self.is_client {
            return Err(Error::ErrChannelNoRead("udp"));
        }

        let packet = self.sequencer.get().await;
        let payload = packet.payload();
        if buf.len() < payload.len() {
            return Err(Error::ErrNeedMoreSpace);
        }
        buf[..payload.len()].copy_from_slice(&payload);

        log::debug!("read {} bytes from udp listener", payload.len());

        Ok(payload.len())
    }

    async fn write(&self, buf: &[u8]) -> Result<usize> {
        if !self.is_client {
            return Err(Error::ErrChannelNoWrite("udp"));
        }
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| Error::Other("udp channel is not started".to_owned()))?;

        log::debug!(
            "writing {} bytes to udp channel as chunks of {UDP_CHUNK_SIZE} bytes",
            buf.len()
        );

        let chunks = to_chunks(buf, UDP_CHUNK_SIZE);
        let total = chunks.len() as u32;
        let mut wrote = 0;

        for chunk in chunks {
            let size = chunk.size as usize;
            let packet = self.sequencer.next_packet(chunk.data, chunk.size, total);

            match socket.send(&packet.encode()).await {
                Ok(_) => {
                    wrote += size;
                    self.stats.add_wrote(size);
                }
                Err(e) => log::error!("error while sending udp packet: {e}"),
            }
        }

        log::debug!("wrote {wrote} bytes to udp channel");

        Ok(wrote)
    }

    fn stats(&self) -> ChannelStats {
        self.stats.snapshot()
    }
}
