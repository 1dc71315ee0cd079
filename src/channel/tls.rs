use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{App, Arg, ArgMatches};
use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, KeyPair,
    KeyUsagePurpose, SerialNumber,
};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::WebPkiSupportedAlgorithms;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName};
use tokio::net::{lookup_host, TcpListener, TcpStream};
use tokio_rustls::{TlsAcceptor, TlsConnector};

use super::stream::Peer;
use super::{Channel, ChannelStats, Direction, StatsCounter};
use crate::error::{Error, Result};

const CERT_ORGANIZATION: &str = "SG1 Co";
const CERT_VALIDITY_HOURS: i64 = 24;

/// TLS stream carrier over the same single-peer plumbing as TCP.
///
/// The server side answers with the certificate given via `--tls-pem` /
/// `--tls-key`, or with a freshly generated ephemeral one when neither
/// is supplied. The client side accepts whatever certificate the server
/// presents and performs no hostname validation.
pub struct TlsChannel {
    is_client: bool,
    address: String,
    host: String,
    server_config: Option<Arc<rustls::ServerConfig>>,
    client_config: Option<Arc<rustls::ClientConfig>>,
    peer: Arc<Peer>,
    stats: Arc<StatsCounter>,
}

impl TlsChannel {
    pub fn new() -> Self {
        TlsChannel {
            is_client: true,
            address: String::new(),
            host: String::new(),
            server_config: None,
            client_config: None,
            peer: Arc::new(Peer::default()),
            stats: Arc::new(StatsCounter::default()),
        }
    }
}

impl Default for TlsChannel {
    fn default() -> Self {
        TlsChannel::new()
    }
}

/// Self-signed ECDSA P-521 identity: `O = SG1 Co`, random 128 bit
/// serial, valid for 24 hours.
fn generate_identity() -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let key_pair = KeyPair::generate_for(&rcgen::PKCS_ECDSA_P521_SHA512)?;

    let mut params = CertificateParams::new(vec!["sg1".to_owned()])?;

    let mut dname = DistinguishedName::new();
    dname.push(DnType::OrganizationName, CERT_ORGANIZATION);
    params.distinguished_name = dname;

    let serial: u128 = rand::random();
    params.serial_number = Some(SerialNumber::from_slice(&serial.to_be_bytes()));

    let now = time::OffsetDateTime::now_utc();
    params.not_before = now;
    params.not_after = now + time::Duration::hours(CERT_VALIDITY_HOURS);

    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
        KeyUsagePurpose::KeyCertSign,
    ];
    params.extended_key_usages = vec![
        ExtendedKeyUsagePurpose::ServerAuth,
        ExtendedKeyUsagePurpose::ClientAuth,
    ];

    let cert = params.self_signed(&key_pair)?;

    Ok((
        vec![cert.der().clone()],
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der())),
    ))
}

fn load_identity(
    pem_path: &str,
    key_path: &str,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let mut reader = BufReader::new(File::open(pem_path)?);
    let certs = rustls_pemfile::certs(&mut reader).collect::<std::result::Result<Vec<_>, _>>()?;

    let mut reader = BufReader::new(File::open(key_path)?);
    let key = rustls_pemfile::private_key(&mut reader)?.ok_or(Error::ErrTlsNoKeyFound)?;

    Ok((certs, key))
}

/// Accepts any server certificate; signatures are still checked so the
/// session is encrypted, just not authenticated.
#[derive(Debug)]
struct NoServerVerification {
    supported_algorithms: WebPkiSupportedAlgorithms,
}

impl Default for NoServerVerification {
    fn default() -> Self {
        NoServerVerification {
            supported_algorithms: rustls::crypto::aws_lc_rs::default_provider()
                .signature_verification_algorithms,
        }
    }
}

impl ServerCertVerifier for NoServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.supported_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.supported_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.supported_algorithms.supported_schemes()
    }
}

#[async_trait]
impl Channel for TlsChannel {
    fn name(&self) -> &'static str {
        "tls"
    }

    fn description(&self) -> &'static str {
        "Read or write data on a TLS server (for input) or client (for output) connection, generates an ephemeral certificate unless --tls-pem and --tls-key are given ( example: tls:127.0.0.1:8083 )."
    }

    fn register<'a>(&self, app: App<'a>) -> App<'a> {
        app.arg(
            Arg::new("tls-pem")
                .long("tls-pem")
                .takes_value(true)
                .help("PEM file for the TLS connection."),
        )
        .arg(
            Arg::new("tls-key")
                .long("tls-key")
                .takes_value(true)
                .help("KEY file for the TLS connection."),
        )
    }

    fn setup(&mut self, direction: Direction, args: &str, matches: &ArgMatches) -> Result<()> {
        self.is_client = direction == Direction::Output;

        if args.is_empty() {
            return Err(Error::ErrAddressParse(args.to_owned()));
        }
        self.address = args.to_owned();
        self.host = match self.address.rsplit_once(':') {
            Some((host, _port)) => host.to_owned(),
            None => self.address.clone(),
        };

        let identity = match (matches.value_of("tls-pem"), matches.value_of("tls-key")) {
            (Some(pem), Some(key)) => Some(load_identity(pem, key)?),
            (Some(_), None) => return Err(Error::ErrTlsNoKey),
            (None, Some(_)) => return Err(Error::ErrTlsNoPem),
            (None, None) => None,
        };

        if self.is_client {
            let config = rustls::ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoServerVerification::default()))
                .with_no_client_auth();
            self.client_config = Some(Arc::new(config));
        } else {
            let (certs, key) = match identity {
                Some(identity) => identity,
                None => {
                    log::info!("generating ephemeral tls certificate");
                    generate_identity()?
                }
            };
            let config = rustls::ServerConfig::builder()
                .with_no_client_auth()
                .with_single_cert(certs, key)?;
            self.server_config = Some(Arc::new(config));
        }

        log::debug!("setup tls channel: direction={direction} address={}", self.address);

        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        let addr = lookup_host(self.address.as_str())
            .await?
            .next()
            .ok_or_else(|| Error::ErrAddressParse(self.address.clone()))?;

        if self.is_client {
            let config = self
                .client_config
                .clone()
                .ok_or_else(|| Error::Tls("tls client is not configured".to_owned()))?;
            let server_name = ServerName::try_from(self.host.clone())
                .map_err(|_| Error::ErrAddressParse(self.host.clone()))?;

            let stream = TcpStream::connect(addr).await?;
            let stream = TlsConnector::from(config)
                .connect(server_name, stream)
                .await?;
            let (reader, writer) = tokio::io::split(stream);
            self.peer.set(Box::new(reader), Box::new(writer)).await;
        } else {
            let config = self
                .server_config
                .clone()
                .ok_or_else(|| Error::Tls("tls server is not configured".to_owned()))?;
            let acceptor = TlsAcceptor::from(config);

            let listener = TcpListener::bind(addr).await?;
            log::info!("started tls listener on {addr}");

            let peer = Arc::clone(&self.peer);
            tokio::spawn(async move {
                loop {
                    let (stream, remote) = match listener.accept().await {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            log::warn!("error while accepting tls connection: {e}");
                            break;
                        }
                    };

                    match acceptor.accept(stream).await {
                        Ok(stream) => {
                            log::info!("new tls connection from {remote}");
                            let (reader, writer) = tokio::io::split(stream);
                            peer.set(Box::new(reader), Box::new(writer)).await;
                        }
                        Err(e) => log::warn!("tls handshake with {remote} failed: {e}"),
                    }
                }
            });
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
        self.peer.read(buf, &self.stats).await
    }

    async fn write(&self, buf: &[u8]) -> Result<usize> {
        self.peer.write(buf, &self.stats).await
    }

    fn stats(&self) -> ChannelStats {
        self.stats.snapshot()
    }
}
