#[cfg(test)]
mod channel_test;

pub mod console;
pub mod dns;
pub mod icmp;
pub mod pastebin;
pub mod tcp;
pub mod tls;
pub mod udp;

mod stream;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use clap::{App, ArgMatches};

use crate::error::{Error, Result};

/// Which end of the pipeline a channel is bound to. An input channel is
/// read by the driver and typically binds a server/listener role; an
/// output channel is written to and typically binds a client role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// Snapshot of a channel's byte counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStats {
    pub total_read: usize,
    pub total_wrote: usize,
}

/// Shared counters, updated both by the driver thread and by a channel's
/// background listener.
#[derive(Debug, Default)]
pub(crate) struct StatsCounter {
    total_read: AtomicUsize,
    total_wrote: AtomicUsize,
}

impl StatsCounter {
    pub(crate) fn add_read(&self, n: usize) {
        self.total_read.fetch_add(n, Ordering::SeqCst);
    }

    pub(crate) fn add_wrote(&self, n: usize) {
        self.total_wrote.fetch_add(n, Ordering::SeqCst);
    }

    pub(crate) fn snapshot(&self) -> ChannelStats {
        ChannelStats {
            total_read: self.total_read.load(Ordering::SeqCst),
            total_wrote: self.total_wrote.load(Ordering::SeqCst),
        }
    }
}

/// Channel is the transport contract every carrier satisfies, covert or
/// not. A channel is configured from its URI argument string, started
/// once, then driven through `read`/`write` by the pipeline.
#[async_trait]
pub trait Channel {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Contributes the channel's own command line options, if any.
    fn register<'a>(&self, app: App<'a>) -> App<'a> {
        app
    }

    /// Parses the substrate specific argument string and records the
    /// role implied by `direction`.
    fn setup(&mut self, direction: Direction, args: &str, matches: &ArgMatches) -> Result<()>;

    /// Opens sockets and, for listener roles, spawns the background
    /// worker. Must be called exactly once, after `setup`.
    async fn start(&mut self) -> Result<()>;

    fn has_reader(&self) -> bool;

    fn has_writer(&self) -> bool;

    /// Blocks until data is available and copies it into `buf`. Framing
    /// channels surface exactly one packet payload per call. A clean
    /// shutdown of the peer yields `Error::ErrEof`.
    async fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Emits `buf`, chunking and framing it if the substrate requires
    /// it. Returns the number of payload bytes acknowledged as sent.
    async fn write(&self, buf: &[u8]) -> Result<usize>;

    fn stats(&self) -> ChannelStats;
}

/// The immutable table of available channels, freshly constructed. Built
/// once at startup for option registration and again by the factory per
/// endpoint.
pub fn registry() -> Vec<Box<dyn Channel + Send + Sync>> {
    vec![
        Box::new(console::ConsoleChannel::new()),
        Box::new(tcp::TcpChannel::new()),
        Box::new(tls::TlsChannel::new()),
        Box::new(udp::UdpChannel::new()),
        Box::new(icmp::IcmpChannel::new()),
        Box::new(dns::DnsChannel::new()),
        Box::new(pastebin::PastebinChannel::new()),
    ]
}

/// Folds every channel's command line options into `app`.
pub fn register_all(mut app: App<'_>) -> App<'_> {
    for channel in registry() {
        app = channel.register(app);
    }
    app
}

/// Builds and configures the channel named by `uri`, which has the form
/// `scheme:args` (or just `scheme`). `stdin` and `stdout` are accepted
/// as aliases of `console`.
pub fn factory(
    uri: &str,
    direction: Direction,
    matches: &ArgMatches,
) -> Result<Box<dyn Channel + Send + Sync>> {
    if uri.is_empty() {
        return Err(Error::ErrChannelNameEmpty);
    }

    let (name, args) = match uri.split_once(':') {
        Some((name, args)) => (name, args),
        None => (uri, ""),
    };
    let name = match name {
        "stdin" | "stdout" => "console",
        _ => name,
    };

    let mut channel = registry()
        .into_iter()
        .find(|c| c.name() == name)
        .ok_or_else(|| Error::ErrChannelNotRegistered(name.to_owned()))?;

    channel.setup(direction, args, matches)?;

    match direction {
        Direction::Input if !channel.has_reader() => Err(Error::ErrNoReader(name.to_owned())),
        Direction::Output if !channel.has_writer() => Err(Error::ErrNoWriter(name.to_owned())),
        _ => Ok(channel),
    }
}
