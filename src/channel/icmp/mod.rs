pub mod echo;

#[cfg(test)]
mod echo_test;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use clap::ArgMatches;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::net::UdpSocket;

use self::echo::{strip_ipv4_header, Echo};
use super::{Channel, ChannelStats, Direction, StatsCounter};
use crate::error::{Error, Result};
use crate::packet::{to_chunks, Packet};
use crate::sequencer::PacketSequencer;

pub const ICMP_CHUNK_SIZE: usize = 128;
pub const ICMP_BUFFER_SIZE: usize = 512;

/// Covert carrier over ICMP echo requests on a raw IPv4 socket. The
/// input direction listens for echoes and feeds their payloads to the
/// sequencer; the output direction pings the target with one frame per
/// echo.
pub struct IcmpChannel {
    is_client: bool,
    address: Ipv4Addr,
    socket: Option<Arc<UdpSocket>>,
    sequencer: Arc<PacketSequencer>,
    stats: Arc<StatsCounter>,
}

impl IcmpChannel {
    pub fn new() -> Self {
        IcmpChannel {
            is_client: true,
            address: Ipv4Addr::UNSPECIFIED,
            socket: None,
            sequencer: Arc::new(PacketSequencer::new()),
            stats: Arc::new(StatsCounter::default()),
        }
    }

    async fn send_packet(&self, socket: &UdpSocket, packet: &Packet) -> Result<()> {
        log::debug!(
            "encapsulating {} bytes of packet in icmp echo payload for address {}",
            packet.data_size,
            self.address
        );

        let echo = Echo {
            id: (std::process::id() & 0xffff) as u16,
            seq: (packet.seq_number & 0xffff) as u16,
            data: packet.encode(),
        };

        socket
            .send_to(&echo.marshal(), SocketAddr::new(IpAddr::V4(self.address), 0))
            .await?;

        Ok(())
    }
}

impl Default for IcmpChannel {
    fn default() -> Self {
        IcmpChannel::new()
    }
}

/// Raw ICMPv4 socket registered with the tokio reactor.
fn open_socket(bind: Ipv4Addr) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
    socket.set_nonblocking(true)?;
    socket.bind(&SockAddr::from(SocketAddr::new(IpAddr::V4(bind), 0)))?;

    Ok(UdpSocket::from_std(socket.into())?)
}

#[async_trait]
impl Channel for IcmpChannel {
    fn name(&self) -> &'static str {
        "icmp"
    }

    fn description(&self) -> &'static str {
        "Send data as ICMP packets and read data as ICMP packets ( example: icmp:192.168.1.24 or just icmp for 0.0.0.0 )."
    }

    fn setup(&mut self, direction: Direction, args: &str, _matches: &ArgMatches) -> Result<()> {
        self.is_client = direction == Direction::Output;

        if !args.is_empty() {
            self.address = args.parse()?;
        }

        log::debug!("setup icmp channel: direction={direction} address={}", self.address);

        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        if self.is_client {
            self.socket = Some(Arc::new(open_socket(Ipv4Addr::UNSPECIFIED)?));
        } else {
            let socket = Arc::new(open_socket(self.address)?);
            self.socket = Some(Arc::clone(&socket));

            let address = self.address;
            let sequencer = Arc::clone(&self.sequencer);
            let stats = Arc::clone(&self.stats);
            tokio::spawn(async move {
                log::info!("started icmp listener on {address}");

                let mut buffer = vec![0u8; ICMP_BUFFER_SIZE];
                loop {
                    let (n, peer) = match socket.recv_from(&mut buffer).await {
                        Ok(received) => received,
                        Err(e) => {
                            log::warn!("error while reading icmp packet: {e}");
                            continue;
                        }
                    };

                    log::debug!("read {n} bytes of icmp packet from {peer}");

                    let message = match strip_ipv4_header(&buffer[..n]) {
                        Ok(message) => message,
                        Err(e) => {
                            log::warn!("error while parsing icmp packet sent by {peer}: {e}");
                            continue;
                        }
                    };

                    let echo = match Echo::unmarshal(message) {
                        Ok(echo) => echo,
                        Err(Error::ErrIcmpNotEcho) => {
                            log::debug!("icmp packet is not an echo");
                            continue;
                        }
                        Err(e) => {
                            log::warn!("error while parsing icmp packet sent by {peer}: {e}");
                            continue;
                        }
                    };

                    match Packet::decode(&echo.data) {
                        Ok(packet) => {
                            log::debug!(
                                "decoded packet of {} bytes from icmp echo payload (seqn={})",
                                packet.data_size,
                                packet.seq_number
                            );
                            stats.add_read(packet.data_size as usize);
                            sequencer.offer(packet).await;
                        }
                        Err(e) => log::error!("error while decoding icmp payload: {e}"),
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
            return Err(Error::ErrChannelNoRead("icmp"));
        }

        let packet = self.sequencer.get().await;
        let payload = packet.payload();
        if buf.len() < payload.len() {
            return Err(Error::ErrNeedMoreSpace);
        }
        buf[..payload.len()].copy_from_slice(&payload);

        log::debug!("read {} bytes from icmp listener", payload.len());

        Ok(payload.len())
    }

    async fn write(&self, buf: &[u8]) -> Result<usize> {
        if !self.is_client {
            return Err(Error::ErrChannelNoWrite("icmp"));
        }
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| Error::Other("icmp channel is not started".to_owned()))?;

        log::debug!(
            "writing {} bytes to icmp channel as chunks of {ICMP_CHUNK_SIZE} bytes",
            buf.len()
        );

        let chunks = to_chunks(buf, ICMP_CHUNK_SIZE);
        let total = chunks.len() as u32;
        let mut wrote = 0;

        for chunk in chunks {
            let size = chunk.size as usize;
            let packet = self.sequencer.next_packet(chunk.data, chunk.size, total);

            match self.send_packet(socket, &packet).await {
                Ok(()) => {
                    wrote += size;
                    self.stats.add_wrote(size);
                }
                Err(e) => log::error!("error while sending icmp packet: {e}"),
            }
        }

        log::debug!("wrote {wrote} bytes to icmp channel");

        Ok(wrote)
    }

    fn stats(&self) -> ChannelStats {
        self.stats.snapshot()
    }
}
