pub mod message;

#[cfg(test)]
mod message_test;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{App, Arg, ArgMatches};
use lazy_static::lazy_static;
use regex::Regex;
use tokio::net::{lookup_host, UdpSocket};

use self::message::Message;
use super::{Channel, ChannelStats, Direction, StatsCounter};
use crate::error::{Error, Result};
use crate::packet::{to_chunks, Packet, HEADER_SIZE};
use crate::sequencer::PacketSequencer;

/// Default payload bytes per query; hex expansion doubles it on the wire.
pub const DNS_CHUNK_SIZE: usize = 16;
pub const DNS_BUFFER_SIZE: usize = 512;

const DNS_DEFAULT_PORT: u16 = 53;
const MAX_LABEL_LEN: usize = 63;
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

lazy_static! {
    static ref DNS_HOST_ADDRESS_PARSER: Regex =
        Regex::new(r"^([^@]+)@([^:]+):(\d+)$").unwrap();
    static ref DNS_ADDRESS_PARSER: Regex = Regex::new(r"^([^:]+):(\d+)$").unwrap();
    static ref DNS_QUESTION_PARSER: Regex = Regex::new(r"^([0-9a-fA-F]+)\.(.+)\.$").unwrap();
}

/// Covert carrier over DNS A queries.
///
/// The writer embeds each frame as the hex first label of a query for
/// `<hex>.<domain>`, sent either straight to a configured resolver or
/// through the system stub resolver. The reader is a tiny DNS server
/// answering every query with an empty reply while feeding decodable
/// first labels to the sequencer.
pub struct DnsChannel {
    is_client: bool,
    domain: Option<String>,
    address: Option<String>,
    port: u16,
    chunk_size: usize,
    socket: Option<Arc<UdpSocket>>,
    sequencer: Arc<PacketSequencer>,
    stats: Arc<StatsCounter>,
}

impl DnsChannel {
    pub fn new() -> Self {
        DnsChannel {
            is_client: true,
            domain: None,
            address: None,
            port: DNS_DEFAULT_PORT,
            chunk_size: DNS_CHUNK_SIZE,
            socket: None,
            sequencer: Arc::new(PacketSequencer::new()),
            stats: Arc::new(StatsCounter::default()),
        }
    }

    async fn lookup(&self, fqdn: &str) -> Result<()> {
        log::info!("resolving {fqdn}");

        match &self.socket {
            Some(socket) => {
                let query = Message::query(rand::random(), fqdn)?;
                socket.send(&query.pack()?).await?;

                // Wait briefly for the reply, which is ignored.
                let mut reply = [0u8; DNS_BUFFER_SIZE];
                match tokio::time::timeout(LOOKUP_TIMEOUT, socket.recv(&mut reply)).await {
                    Ok(received) => {
                        received?;
                    }
                    Err(_) => log::debug!("no reply for {fqdn}"),
                }
            }
            None => {
                // System stub resolver; the port plays no role in the
                // A lookup itself.
                lookup_host((fqdn, 0u16)).await?;
            }
        }

        Ok(())
    }
}

impl Default for DnsChannel {
    fn default() -> Self {
        DnsChannel::new()
    }
}

/// Extracts the hex chunk and the zone from the only question of a
/// query.
fn parse_question(msg: &Message) -> Result<(Vec<u8>, String)> {
    if msg.questions.len() != 1 {
        return Err(Error::ErrQuestionCount);
    }

    let name = &msg.questions[0].name.data;
    let captures = DNS_QUESTION_PARSER
        .captures(name)
        .ok_or(Error::ErrQuestionFormat)?;

    let chunk = hex::decode(&captures[1])?;
    Ok((chunk, captures[2].to_owned()))
}

#[async_trait]
impl Channel for DnsChannel {
    fn name(&self) -> &'static str {
        "dns"
    }

    fn description(&self) -> &'static str {
        "As input, read data from incoming DNS requests (example server: dns:example.com@192.168.1.2:5353), as output write data as DNS requests (example client: dns:example.com@192.168.1.2:5353)."
    }

    fn register<'a>(&self, app: App<'a>) -> App<'a> {
        app.arg(
            Arg::new("dns-chunk-size")
                .long("dns-chunk-size")
                .takes_value(true)
                .default_value("16")
                .help("Payload bytes to pack into a single DNS query."),
        )
    }

    fn setup(&mut self, direction: Direction, args: &str, matches: &ArgMatches) -> Result<()> {
        self.is_client = direction == Direction::Output;

        if let Some(size) = matches.value_of("dns-chunk-size") {
            self.chunk_size = size
                .parse()
                .map_err(|_| Error::ErrDnsChunkSize(0))
                .and_then(|size| if size == 0 { Err(Error::ErrDnsChunkSize(0)) } else { Ok(size) })?;
        }
        // The whole frame is hex encoded into one label, which caps the
        // usable chunk size well below the label limit.
        if 2 * (HEADER_SIZE + self.chunk_size) > MAX_LABEL_LEN {
            return Err(Error::ErrDnsChunkSize(self.chunk_size));
        }

        if let Some(captures) = DNS_HOST_ADDRESS_PARSER.captures(args) {
            self.domain = Some(captures[1].to_owned());
            self.address = Some(captures[2].to_owned());
            self.port = captures[3]
                .parse()
                .map_err(|_| Error::ErrAddressParse(args.to_owned()))?;
        } else if let Some(captures) = DNS_ADDRESS_PARSER.captures(args) {
            self.address = Some(captures[1].to_owned());
            self.port = captures[2]
                .parse()
                .map_err(|_| Error::ErrAddressParse(args.to_owned()))?;
        } else if !args.is_empty() {
            // Bare domain: stub-resolver client, or zone filter with the
            // default bind for a server.
            self.domain = Some(args.to_owned());
        }

        // A writer with no zone to append to makes no sense.
        if self.is_client && self.domain.is_none() {
            return Err(Error::ErrDnsArgs);
        }

        log::debug!(
            "setup dns channel: direction={direction} domain={:?} address={:?} port={}",
            self.domain,
            self.address,
            self.port
        );

        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        if self.is_client {
            if let Some(address) = &self.address {
                let resolver = lookup_host((address.as_str(), self.port))
                    .await?
                    .next()
                    .ok_or_else(|| Error::ErrAddressParse(address.clone()))?;

                let socket = UdpSocket::bind("0.0.0.0:0").await?;
                socket.connect(resolver).await?;
                self.socket = Some(Arc::new(socket));
            }

            log::info!("performing dns lookups ...");
        } else {
            let bind = self.address.clone().unwrap_or_else(|| "0.0.0.0".to_owned());
            let bind = lookup_host((bind.as_str(), self.port))
                .await?
                .next()
                .ok_or_else(|| Error::ErrAddressParse(bind.clone()))?;

            let socket = Arc::new(UdpSocket::bind(bind).await?);
            self.socket = Some(Arc::clone(&socket));

            let zone = self.domain.clone();
            let sequencer = Arc::clone(&self.sequencer);
            let stats = Arc::clone(&self.stats);
            tokio::spawn(async move {
                log::info!("running dns server on {bind} ...");

                let mut buffer = vec![0u8; DNS_BUFFER_SIZE];
                loop {
                    let (n, peer) = match socket.recv_from(&mut buffer).await {
                        Ok(received) => received,
                        Err(e) => {
                            log::warn!("error while reading dns query: {e}");
                            continue;
                        }
                    };

                    let query = match Message::unpack(&buffer[..n]) {
                        Ok(query) => query,
                        Err(e) => {
                            log::warn!("error while parsing dns query from {peer}: {e}");
                            continue;
                        }
                    };

                    match parse_question(&query) {
                        Ok((chunk, question_zone)) => {
                            let zone_matches = match &zone {
                                Some(zone) => *zone == question_zone,
                                None => true,
                            };
                            if zone_matches {
                                match Packet::decode(&chunk) {
                                    Ok(packet) => {
                                        stats.add_read(packet.data_size as usize);
                                        sequencer.offer(packet).await;
                                    }
                                    Err(e) => log::error!("error while decoding dns chunk: {e}"),
                                }
                            } else {
                                log::debug!("discarding query for zone {question_zone}");
                            }
                        }
                        Err(e) => log::error!("error: {e}"),
                    }

                    // Every query gets its empty reply, malformed ones
                    // included.
                    match query.reply().pack() {
                        Ok(raw) => {
                            if let Err(e) = socket.send_to(&raw, peer).await {
                                log::warn!("error while sending dns reply to {peer}: {e}");
                            }
                        }
                        Err(e) => log::warn!("error while packing dns reply: {e}"),
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
            return Err(Error::ErrChannelNoRead("dns"));
        }

        let packet = self.sequencer.get().await;
        let payload = packet.payload();
        if buf.len() < payload.len() {
            return Err(Error::ErrNeedMoreSpace);
        }
        buf[..payload.len()].copy_from_slice(&payload);

        log::debug!("read {} bytes from dns server", payload.len());

        Ok(payload.len())
    }

    async fn write(&self, buf: &[u8]) -> Result<usize> {
        if !self.is_client {
            return Err(Error::ErrChannelNoWrite("dns"));
        }
        let domain = self.domain.as_ref().ok_or(Error::ErrDnsArgs)?;

        let chunks = to_chunks(buf, self.chunk_size);
        let total = chunks.len() as u32;
        let mut wrote = 0;

        for chunk in chunks {
            let size = chunk.size as usize;
            let packet = self.sequencer.next_packet(chunk.data, chunk.size, total);
            let fqdn = format!("{}.{domain}", packet.hex());

            match self.lookup(&fqdn).await {
                Ok(()) => {
                    wrote += size;
                    self.stats.add_wrote(size);
                }
                Err(e) => log::error!("error while resolving {fqdn}: {e}"),
            }
        }

        Ok(wrote)
    }

    fn stats(&self) -> ChannelStats {
        self.stats.snapshot()
    }
}
