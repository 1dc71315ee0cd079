use async_trait::async_trait;
use bytes::Bytes;

use super::Module;
use crate::error::Result;

/// The identity transform; the default module.
#[derive(Default)]
pub struct Raw;

impl Raw {
    pub fn new() -> Self {
        Raw
    }
}

#[async_trait]
impl Module for Raw {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn description(&self) -> &'static str {
        "Read from input and write to output as it is."
    }

    async fn run(&mut self, buf: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(buf))
    }
}
