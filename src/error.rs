use std::string::FromUtf8Error;
use std::{io, net};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("channel name can not be empty")]
    ErrChannelNameEmpty,
    #[error("no channel with name {0} has been registered")]
    ErrChannelNotRegistered(String),
    #[error("channel '{0}' can't be used for reading")]
    ErrNoReader(String),
    #[error("channel '{0}' can't be used for writing")]
    ErrNoWriter(String),
    #[error("module name can not be empty")]
    ErrModuleNameEmpty,
    #[error("no module with name {0} has been registered")]
    ErrModuleNotRegistered(String),
    #[error("could not parse address from '{0}'")]
    ErrAddressParse(String),

    #[error("{0} channel can't be used for reading in this direction")]
    ErrChannelNoRead(&'static str),
    #[error("{0} channel can't be used for writing in this direction")]
    ErrChannelNoWrite(&'static str),

    #[error("packet buffer is too short for the header")]
    ErrPacketTooShort,
    #[error("packet data size exceeds the available payload")]
    ErrPacketDataSize,
    #[error("need more space in the read buffer")]
    ErrNeedMoreSpace,
    #[error("eof")]
    ErrEof,

    #[error("insufficient data for base length type")]
    ErrBaseLen,
    #[error("insufficient data for calculated length type")]
    ErrCalcLen,
    #[error("segment length too long")]
    ErrSegTooLong,
    #[error("zero length segment")]
    ErrZeroSegLen,
    #[error("too many pointers (>10)")]
    ErrTooManyPtr,
    #[error("invalid pointer")]
    ErrInvalidPtr,
    #[error("name is not in canonical format (it must end with a .)")]
    ErrNonCanonicalName,
    #[error("unexpected number of questions")]
    ErrQuestionCount,
    #[error("could not parse dns query question")]
    ErrQuestionFormat,
    #[error("usage: dns:domain@resolver:port (writer) or dns:[domain@]host:port (reader)")]
    ErrDnsArgs,
    #[error("dns chunk size {0} makes the query label longer than 63 characters")]
    ErrDnsChunkSize(usize),

    #[error("icmp message is too short")]
    ErrIcmpTooShort,
    #[error("icmp message is not an echo request")]
    ErrIcmpNotEcho,
    #[error("ipv4 header is malformed")]
    ErrIpv4Header,

    #[error("usage: pastebin:YOUR-API-DEV-KEY/YOUR-API-USER-KEY(#stream_name)?")]
    ErrPastebinArgs,
    #[error("could not send paste: {0}")]
    ErrPasteSend(String),
    #[error("got response code {0}")]
    ErrHttpStatus(u16),

    #[error("no --tls-pem file specified")]
    ErrTlsNoPem,
    #[error("no --tls-key file specified")]
    ErrTlsNoKey,
    #[error("no private key found in key file")]
    ErrTlsNoKeyFound,

    #[error("no AES key specified")]
    ErrAesNoKey,
    #[error("AES key must be 16, 24 or 32 bytes")]
    ErrAesKeySize,
    #[error("AES buffer is too short to carry an IV")]
    ErrAesShortBuffer,
    #[error("invalid AES mode, can be 'encrypt' or 'decrypt'")]
    ErrAesMode,
    #[error("invalid base64 mode, can be 'encode' or 'decode'")]
    ErrBase64Mode,

    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] FromUtf8Error),
    #[error("parse addr: {0}")]
    ParseIp(#[from] net::AddrParseError),
    #[error("tls error: {0}")]
    Tls(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("{0}")]
    Io(#[source] IoError),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}

impl From<rustls::Error> for Error {
    fn from(e: rustls::Error) -> Self {
        Error::Tls(e.to_string())
    }
}

impl From<rcgen::Error> for Error {
    fn from(e: rcgen::Error) -> Self {
        Error::Tls(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}
