#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! A data tunnel: bytes are read from an input channel, piped through an
//! ordered chain of transform modules and written to an output channel.
//! Channels include covert carriers (DNS queries, ICMP echoes, pastebin
//! posts) next to TCP, TLS, UDP and the console; covert carriers frame
//! the stream into sequenced packets and reassemble it on the far side.

pub mod channel;
pub mod error;
pub mod module;
pub mod packet;
pub mod pipeline;
pub mod sequencer;
pub mod utils;

pub use error::{Error, Result};

pub const APP_NAME: &str = "sg1";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
