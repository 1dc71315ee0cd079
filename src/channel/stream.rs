use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, Notify};

use super::StatsCounter;
use crate::error::{Error, Result};

pub(crate) type DynReader = Box<dyn AsyncRead + Send + Unpin>;
pub(crate) type DynWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// The single current peer of a stream channel.
///
/// Clients install their connection once at start. Servers hold exactly
/// one accepted connection: a later accept replaces the previous peer,
/// which is closed by the swap. Readers and writers blocked in
/// `wait_for_peer` are woken when a peer becomes available.
#[derive(Default)]
pub(crate) struct Peer {
    reader: Mutex<Option<DynReader>>,
    writer: Mutex<Option<DynWriter>>,
    available: Notify,
}

impl Peer {
    pub(crate) async fn set(&self, reader: DynReader, writer: DynWriter) {
        {
            let mut r = self.reader.lock().await;
            let mut w = self.writer.lock().await;
            // Close the previous peer before installing the new one.
            r.take();
            w.take();
            *r = Some(reader);
            *w = Some(writer);
        }
        self.available.notify_waiters();
    }

    pub(crate) async fn wait_for_peer(&self) {
        loop {
            let notified = self.available.notified();
            if self.reader.lock().await.is_some() {
                return;
            }
            notified.await;
        }
    }

    pub(crate) async fn read(&self, buf: &mut [u8], stats: &StatsCounter) -> Result<usize> {
        self.wait_for_peer().await;

        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or(Error::ErrEof)?;
        let n = reader.read(buf).await?;
        if n == 0 {
            return Err(Error::ErrEof);
        }

        stats.add_read(n);
        Ok(n)
    }

    pub(crate) async fn write(&self, buf: &[u8], stats: &StatsCounter) -> Result<usize> {
        self.wait_for_peer().await;

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(Error::ErrEof)?;
        writer.write_all(buf).await?;
        writer.flush().await?;

        stats.add_wrote(buf.len());
        Ok(buf.len())
    }
}
