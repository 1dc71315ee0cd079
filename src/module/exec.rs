use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use tokio::process::Command;

use super::Module;
use crate::error::Result;

/// Treats every buffer as a command line, executes it and hands the
/// combined output downstream. Failures to launch become the output
/// instead of aborting the pipeline, so the remote side sees them.
#[derive(Default)]
pub struct Exec;

impl Exec {
    pub fn new() -> Self {
        Exec
    }
}

#[async_trait]
impl Module for Exec {
    fn name(&self) -> &'static str {
        "exec"
    }

    fn description(&self) -> &'static str {
        "Get command from input channel, execute and write output to output channel."
    }

    async fn run(&mut self, buf: &[u8]) -> Result<Bytes> {
        let cmdline = String::from_utf8_lossy(buf);
        let cmdline = cmdline.trim();

        let mut parts = cmdline.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        log::debug!("parsing and executing command line '{cmdline}'");

        match Command::new(cmd).args(parts).output().await {
            Ok(output) => {
                let mut out = BytesMut::with_capacity(output.stdout.len() + output.stderr.len());
                out.put_slice(&output.stdout);
                out.put_slice(&output.stderr);
                Ok(out.freeze())
            }
            Err(e) => {
                log::warn!("error while executing '{cmdline}': {e}");
                Ok(Bytes::from(e.to_string().into_bytes()))
            }
        }
    }
}
