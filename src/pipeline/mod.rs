
use std::time::Duration;

use bytes::Bytes;

use crate::channel::Channel;
use crate::error::{Error, Result};
use crate::module::Module;

pub const DEFAULT_BUFFER_SIZE: usize = 512;

/// Drives the tunnel: read a buffer from the input channel, run it
/// through the transform chain in order, write the result to the output
/// channel. A clean EOF from the input ends the loop successfully; any
/// other error stops it and is returned.
pub async fn run(
    input: &(dyn Channel + Send + Sync),
    output: &(dyn Channel + Send + Sync),
    modules: &mut [Box<dyn Module + Send + Sync>],
    buffer_size: usize,
    delay_ms: u64,
) -> Result<()> {
    loop {
        // A fresh buffer every iteration, in case a transform holds on
        // to the one it returned.
        let mut buffer = vec![0u8; buffer_size];

        let n = match input.read(&mut buffer).await {
            Ok(n) => n,
            Err(Error::ErrEof) => {
                log::debug!("input channel eof");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if n > 0 {
            let mut data = Bytes::copy_from_slice(&buffer[..n]);
            for module in modules.iter_mut() {
                data = module.run(&data).await?;
            }

            output.write(&data).await?;
        }

        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }
}
