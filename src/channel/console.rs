use std::sync::Arc;

use async_trait::async_trait;
use clap::ArgMatches;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

use super::{Channel, ChannelStats, Direction, StatsCounter};
use crate::error::{Error, Result};

/// Unframed carrier over the process standard streams; the default for
/// both ends of the pipeline.
pub struct ConsoleChannel {
    stdin: Mutex<tokio::io::Stdin>,
    stdout: Mutex<tokio::io::Stdout>,
    stats: Arc<StatsCounter>,
}

impl ConsoleChannel {
    pub fn new() -> Self {
        ConsoleChannel {
            stdin: Mutex::new(tokio::io::stdin()),
            stdout: Mutex::new(tokio::io::stdout()),
            stats: Arc::new(StatsCounter::default()),
        }
    }
}

impl Default for ConsoleChannel {
    fn default() -> Self {
        ConsoleChannel::new()
    }
}

#[async_trait]
impl Channel for ConsoleChannel {
    fn name(&self) -> &'static str {
        "console"
    }

    fn description(&self) -> &'static str {
        "Read data from stdin and write data to stdout."
    }

    fn setup(&mut self, _direction: Direction, _args: &str, _matches: &ArgMatches) -> Result<()> {
        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn has_reader(&self) -> bool {
        true
    }

    fn has_writer(&self) -> bool {
        true
    }

    async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let n = self.stdin.lock().await.read(buf).await?;
        if n == 0 {
            return Err(Error::ErrEof);
        }

        self.stats.add_read(n);
        Ok(n)
    }

    async fn write(&self, buf: &[u8]) -> Result<usize> {
        let mut stdout = self.stdout.lock().await;
        stdout.write_all(buf).await?;
        stdout.flush().await?;

        self.stats.add_wrote(buf.len());
        Ok(buf.len())
    }

    fn stats(&self) -> ChannelStats {
        self.stats.snapshot()
    }
}
