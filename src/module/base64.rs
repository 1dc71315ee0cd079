use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use clap::{App, Arg, ArgMatches};

use super::Module;
use crate::error::{Error, Result};

/// Base64 encodes or decodes every buffer that passes through.
pub struct Base64 {
    encode: bool,
}

impl Base64 {
    pub fn new() -> Self {
        Base64 { encode: true }
    }
}

impl Default for Base64 {
    fn default() -> Self {
        Base64::new()
    }
}

#[async_trait]
impl Module for Base64 {
    fn name(&self) -> &'static str {
        "base64"
    }

    fn description(&self) -> &'static str {
        "Read from input, encode or decode in base64 and write to output ( use --base64-mode argument )."
    }

    fn register<'a>(&self, app: App<'a>) -> App<'a> {
        app.arg(
            Arg::new("base64-mode")
                .long("base64-mode")
                .takes_value(true)
                .default_value("encode")
                .help("Base64 mode, can be 'encode' or 'decode'."),
        )
    }

    fn setup(&mut self, matches: &ArgMatches) -> Result<()> {
        self.encode = match matches.value_of("base64-mode") {
            Some("encode") | None => true,
            Some("decode") => false,
            Some(_) => return Err(Error::ErrBase64Mode),
        };
        Ok(())
    }

    async fn run(&mut self, buf: &[u8]) -> Result<Bytes> {
        if self.encode {
            Ok(Bytes::from(STANDARD.encode(buf).into_bytes()))
        } else {
            Ok(Bytes::from(STANDARD.decode(buf)?))
        }
    }
}
