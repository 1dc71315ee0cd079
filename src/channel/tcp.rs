use std::sync::Arc;

use async_trait::async_trait;
use clap::ArgMatches;
use tokio::net::{lookup_host, TcpListener, TcpStream};

use super::stream::Peer;
use super::{Channel, ChannelStats, Direction, StatsCounter};
use crate::error::{Error, Result};

/// Plain TCP stream carrier. Input direction binds a listener holding a
/// single current peer; output direction dials the endpoint at start.
pub struct TcpChannel {
    is_client: bool,
    address: String,
    peer: Arc<Peer>,
    stats: Arc<StatsCounter>,
}

impl TcpChannel {
    pub fn new() -> Self {
        TcpChannel {
            is_client: true,
            address: String::new(),
            peer: Arc::new(Peer::default()),
            stats: Arc::new(StatsCounter::default()),
        }
    }
}

impl Default for TcpChannel {
    fn default() -> Self {
        TcpChannel::new()
    }
}

#[async_trait]
impl Channel for TcpChannel {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn description(&self) -> &'static str {
        "Read or write data on a TCP server (for input) or client (for output) connection ( example: tcp:127.0.0.1:8080 )."
    }

    fn setup(&mut self, direction: Direction, args: &str, _matches: &ArgMatches) -> Result<()> {
        self.is_client = direction == Direction::Output;

        if args.is_empty() {
            return Err(Error::ErrAddressParse(args.to_owned()));
        }
        self.address = args.to_owned();

        log::debug!("setup tcp channel: direction={direction} address={}", self.address);

        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        let addr = lookup_host(self.address.as_str())
            .await?
            .next()
            .ok_or_else(|| Error::ErrAddressParse(self.address.clone()))?;

        if self.is_client {
            let stream = TcpStream::connect(addr).await?;
            let (reader, writer) = stream.into_split();
            self.peer.set(Box::new(reader), Box::new(writer)).await;
        } else {
            let listener = TcpListener::bind(addr).await?;
            log::info!("started tcp listener on {addr}");

            let peer = Arc::clone(&self.peer);
            tokio::spawn(async move {
                loop {
                    match listener.accept().await {
                        Ok((stream, remote)) => {
                            log::info!("new tcp connection from {remote}");
                            let (reader, writer) = stream.into_split();
                            peer.set(Box::new(reader), Box::new(writer)).await;
                        }
                        Err(e) => {
                            log::warn!("error while accepting tcp connection: {e}");
                            break;
                        }
                    }
                }
            });
        }

        Ok(())
    }

    fn has_reader(&self) -> bool {
        true
    }

    fn has_writer(&self) -> bool {
        true
    }

    async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.peer.read(buf, &self.stats).await
    }

    async fn write(&self, buf: &[u8]) -> Result<usize> {
        self.peer.write(buf, &self.stats).await
    }

    fn stats(&self) -> ChannelStats {
        self.stats.snapshot()
    }
}
