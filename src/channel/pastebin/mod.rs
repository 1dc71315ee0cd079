pub mod api;

#[cfg(test)]
mod pastebin_test;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use clap::{App, Arg, ArgMatches};
use lazy_static::lazy_static;
use regex::Regex;

use self::api::{Paste, PastebinApi, XmlPaste, EXPIRE_HOUR, PRIVACY_PRIVATE};
use super::{Channel, ChannelStats, Direction, StatsCounter};
use crate::error::{Error, Result};
use crate::packet::Packet;
use crate::sequencer::PacketSequencer;
use crate::utils;

pub const DEFAULT_STREAM_NAME: &str = "PBSTREAM";
pub const DEFAULT_POLL_TIME_MS: u64 = 1000;

lazy_static! {
    static ref ARGS_PARSER: Regex =
        Regex::new(r"^([a-fA-F0-9]{32})/([a-fA-F0-9]{32})(#.+)?$").unwrap();
}

/// Covert carrier over a pastebin account.
///
/// A write becomes one private paste: hex frame body, title
/// `"SG1 <stream> 0x<unix-ms-hex>"`, one hour expiry. The reader polls
/// the list API, keeps the pastes whose title contains the stream tag
/// and processes them newest-first, deleting each one after reading it
/// unless preservation was asked for.
pub struct PastebinChannel {
    is_client: bool,
    preserve: bool,
    stream: String,
    poll_time: u64,
    api: Option<Arc<PastebinApi>>,
    sequencer: Arc<PacketSequencer>,
    stats: Arc<StatsCounter>,
}

impl PastebinChannel {
    pub fn new() -> Self {
        PastebinChannel {
            is_client: true,
            preserve: false,
            stream: DEFAULT_STREAM_NAME.to_owned(),
            poll_time: DEFAULT_POLL_TIME_MS,
            api: None,
            sequencer: Arc::new(PacketSequencer::new()),
            stats: Arc::new(StatsCounter::default()),
        }
    }
}

impl Default for PastebinChannel {
    fn default() -> Self {
        PastebinChannel::new()
    }
}

struct Poller {
    api: Arc<PastebinApi>,
    stream: String,
    preserve: bool,
    poll_time: u64,
    sequencer: Arc<PacketSequencer>,
    stats: Arc<StatsCounter>,
}

impl Poller {
    async fn run(self) {
        let mut pastes: Vec<XmlPaste> = Vec::new();

        loop {
            if pastes.is_empty() {
                log::debug!("no queued pastes, requesting to api ...");

                match self.api.get_pastes().await {
                    Ok(list) => {
                        log::debug!("filtering {} pastes by stream '{}'", list.len(), self.stream);
                        pastes = list
                            .into_iter()
                            .filter(|p| p.title.contains(&self.stream))
                            .collect();
                        log::debug!("filtered pastes are now {}", pastes.len());
                    }
                    Err(e) => {
                        log::error!("error while requesting pastes: {e}");
                        continue;
                    }
                }
            } else {
                log::debug!("got {} pastes to process", pastes.len());
            }

            let n_available = pastes.len();
            let mut wait = true;
            if n_available > 0 {
                // The title embeds the hex timestamp, so a descending
                // sort puts the most recent paste first. While more
                // than one paste is queued the sleep is skipped and the
                // queue drains back to one.
                pastes.sort_by(|a, b| b.title.cmp(&a.title));
                let next = pastes.remove(0);
                wait = n_available == 1;

                log::debug!("paste to process is {}, requesting to api ...", next.key);

                let body = match self.api.get_paste(&next.key).await {
                    Ok(body) => body,
                    Err(e) => {
                        log::error!("error while requesting paste {}: {e}", next.key);
                        continue;
                    }
                };

                let chunk = match hex::decode(&body) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        log::error!("error while decoding body from hex '{body}': {e}");
                        continue;
                    }
                };

                match Packet::decode(&chunk) {
                    Ok(packet) => {
                        log::debug!("decoded packet of {} bytes", packet.data_size);
                        self.stats.add_read(packet.data_size as usize);
                        self.sequencer.offer(packet).await;
                    }
                    Err(e) => log::error!("error while decoding paste body: {e}"),
                }

                if !self.preserve {
                    log::debug!("deleting paste {}", next.key);
                    if let Err(e) = self.api.delete_paste(&next).await {
                        log::error!("error while deleting paste {}: {e}", next.key);
                    }
                }
            }

            if wait {
                tokio::time::sleep(Duration::from_millis(self.poll_time)).await;
            }
        }
    }
}

#[async_trait]
impl Channel for PastebinChannel {
    fn name(&self) -> &'static str {
        "pastebin"
    }

    fn description(&self) -> &'static str {
        "Read data from pastebin of a given user and write data as pastebins to that user account."
    }

    fn register<'a>(&self, app: App<'a>) -> App<'a> {
        app.arg(
            Arg::new("pastebin-preserve")
                .long("pastebin-preserve")
                .help("Do not delete pastes after reading them."),
        )
        .arg(
            Arg::new("pastebin-poll-time")
                .long("pastebin-poll-time")
                .takes_value(true)
                .default_value("1000")
                .help("Number of milliseconds to wait between one pastebin API request and another."),
        )
    }

    fn setup(&mut self, direction: Direction, args: &str, matches: &ArgMatches) -> Result<()> {
        self.is_client = direction == Direction::Output;

        let captures = ARGS_PARSER.captures(args).ok_or(Error::ErrPastebinArgs)?;
        self.api = Some(Arc::new(PastebinApi::new(&captures[1], &captures[2])));
        if let Some(stream) = captures.get(3) {
            self.stream = stream.as_str()[1..].to_owned();
        }

        self.preserve = matches.is_present("pastebin-preserve");
        if let Some(poll) = matches.value_of("pastebin-poll-time") {
            self.poll_time = poll
                .parse()
                .map_err(|_| Error::ErrAddressParse(poll.to_owned()))?;
        }

        log::debug!(
            "setup pastebin channel: direction={direction} stream='{}' preserve={} poll_time={}",
            self.stream,
            self.preserve,
            self.poll_time
        );

        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        let api = self
            .api
            .clone()
            .ok_or(Error::ErrPastebinArgs)?;

        if self.is_client {
            log::info!("sending data to pastebin ...");
        } else {
            log::info!("running pastebin listener ...");

            let poller = Poller {
                api,
                stream: self.stream.clone(),
                preserve: self.preserve,
                poll_time: self.poll_time,
                sequencer: Arc::clone(&self.sequencer),
                stats: Arc::clone(&self.stats),
            };
            tokio::spawn(poller.run());
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
        let packet = self.sequencer.get().await;
        let payload = packet.payload();
        if buf.len() < payload.len() {
            return Err(Error::ErrNeedMoreSpace);
        }
        buf[..payload.len()].copy_from_slice(&payload);

        log::debug!("read {} bytes from pastebin channel", payload.len());

        Ok(payload.len())
    }

    async fn write(&self, buf: &[u8]) -> Result<usize> {
        let api = self.api.as_ref().ok_or(Error::ErrPastebinArgs)?;

        // A whole write travels as a single packet, however big.
        let packet = self
            .sequencer
            .next_packet(Bytes::copy_from_slice(buf), buf.len() as u32, 1);

        let paste = Paste {
            text: packet.hex(),
            name: format!("SG1 {} 0x{:x}", self.stream, utils::unix_ms()),
            privacy: PRIVACY_PRIVATE,
            expire_date: EXPIRE_HOUR,
        };

        log::info!(
            "sending paste for payload of {} bytes, paste text is {} bytes",
            buf.len(),
            paste.text.len()
        );

        let response = api.create_paste(&paste).await?;
        if response.contains("://") {
            log::info!("{response}");
            self.stats.add_wrote(buf.len());
            Ok(buf.len())
        } else {
            Err(Error::ErrPasteSend(response))
        }
    }

    fn stats(&self) -> ChannelStats {
        self.stats.snapshot()
    }
}
