//! The SMTP client itself: connection handling, session handshake, and
//! the command/reply plumbing.

use std::sync::Arc;

use base64::Engine as _;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{
    ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
};

use crate::config::SmtpConfig;
use crate::error::{ClientError, Result};
use crate::response::Response;

/// Initial size of the reply read buffer.
const BUFFER_SIZE: usize = 8192;

/// Cap on reply buffer growth (1MB).
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Chunk size used when streaming message bodies into DATA.
const BODY_CHUNK: usize = 8192;

/// The underlying connection, plain TCP or TLS-wrapped.
enum Connection {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Connection {
    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Plain(stream) => stream.write_all(data).await?,
            Self::Tls(stream) => stream.write_all(data).await?,
        }
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = match self {
            Self::Plain(stream) => stream.read(buf).await?,
            Self::Tls(stream) => stream.read(buf).await?,
        };
        if n == 0 {
            return Err(ClientError::Closed);
        }
        Ok(n)
    }
}

fn tls_connector(accept_invalid_certs: bool) -> Result<TlsConnector> {
    let mut root_store = RootCertStore::empty();

    let certs = rustls_native_certs::load_native_certs();
    for cert in certs.certs {
        root_store
            .add(cert)
            .map_err(|e| ClientError::Tls(format!("failed to add certificate: {e}")))?;
    }
    if !certs.errors.is_empty() {
        tracing::warn!(?certs.errors, "some system certificates could not be loaded");
    }

    let mut config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    // Test rigs with self-signed certificates only.
    if accept_invalid_certs {
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(NoVerifier));
    }

    Ok(TlsConnector::from(Arc::new(config)))
}

fn server_name(host: &str) -> Result<ServerName<'static>> {
    ServerName::try_from(host.to_owned())
        .map_err(|e| ClientError::Tls(format!("invalid server name {host:?}: {e}")))
}

fn refused(during: &'static str, reply: &Response) -> ClientError {
    ClientError::HandshakeRefused {
        during,
        code: reply.code,
        message: reply.message(),
    }
}

/// An outbound SMTP session over a single connection.
pub struct SmtpClient {
    connection: Option<Connection>,
    buffer: Vec<u8>,
    filled: usize,
    tls: bool,
}

impl SmtpClient {
    /// Connects to the configured target. When `secure` is set the socket
    /// is wrapped in TLS immediately (implicit TLS); the greeting is not
    /// read here.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP connect or the TLS wrap fails.
    pub async fn connect(config: &SmtpConfig) -> Result<Self> {
        let stream = TcpStream::connect(config.address()).await?;

        let (connection, tls) = if config.secure {
            let connector = tls_connector(config.accept_invalid_certs)?;
            let stream = connector
                .connect(server_name(&config.host)?, stream)
                .await
                .map_err(|e| ClientError::Tls(e.to_string()))?;
            (Connection::Tls(Box::new(stream)), true)
        } else {
            (Connection::Plain(stream), false)
        };

        Ok(Self {
            connection: Some(connection),
            buffer: vec![0; BUFFER_SIZE],
            filled: 0,
            tls,
        })
    }

    /// Runs the session handshake: greeting, EHLO (HELO fallback for
    /// servers that do not speak ESMTP), opportunistic STARTTLS with a
    /// fresh EHLO afterwards (RFC 3207), and AUTH PLAIN when credentials
    /// are configured.
    ///
    /// # Errors
    ///
    /// Any refusal here is [`ClientError::HandshakeRefused`]: there is no
    /// usable session to salvage.
    pub async fn handshake(&mut self, config: &SmtpConfig) -> Result<()> {
        let greeting = self.read_response().await?;
        if !greeting.is_success() {
            return Err(refused("greeting", &greeting));
        }

        let mut ehlo = self.ehlo(&config.helo_name).await?;
        if ehlo.is_permanent_error() {
            ehlo = self.command(&format!("HELO {}", config.helo_name)).await?;
        }
        if !ehlo.is_success() {
            return Err(refused("EHLO", &ehlo));
        }

        if !self.tls && ehlo.advertises("STARTTLS") {
            let reply = self.command("STARTTLS").await?;
            if reply.is_success() {
                self.upgrade_tls(config).await?;
                let reply = self.ehlo(&config.helo_name).await?;
                if !reply.is_success() {
                    return Err(refused("EHLO after STARTTLS", &reply));
                }
            }
            // A refused STARTTLS leaves the plain session usable.
        }

        if let Some(credentials) = &config.auth {
            let token = base64::engine::general_purpose::STANDARD
                .encode(format!("\0{}\0{}", credentials.user, credentials.pass));
            let reply = self.command(&format!("AUTH PLAIN {token}")).await?;
            if !reply.is_success() {
                return Err(refused("AUTH", &reply));
            }
        }

        Ok(())
    }

    async fn upgrade_tls(&mut self, config: &SmtpConfig) -> Result<()> {
        let connection = self.connection.take().ok_or(ClientError::Closed)?;
        let Connection::Plain(stream) = connection else {
            return Err(ClientError::Tls("connection is already TLS".to_owned()));
        };

        let connector = tls_connector(config.accept_invalid_certs)?;
        let stream = connector
            .connect(server_name(&config.host)?, stream)
            .await
            .map_err(|e| ClientError::Tls(e.to_string()))?;

        self.connection = Some(Connection::Tls(Box::new(stream)));
        self.tls = true;
        // Anything buffered before the upgrade predates the TLS session.
        self.filled = 0;
        Ok(())
    }

    /// Sends one command line and reads the reply.
    ///
    /// # Errors
    ///
    /// Transport-level failures only; the reply is returned whatever its
    /// code.
    pub async fn command(&mut self, command: &str) -> Result<Response> {
        let data = format!("{command}\r\n");
        self.connection
            .as_mut()
            .ok_or(ClientError::Closed)?
            .write_all(data.as_bytes())
            .await?;
        self.read_response().await
    }

    /// Sends EHLO with the specified name.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be sent or the reply is
    /// malformed.
    pub async fn ehlo(&mut self, name: &str) -> Result<Response> {
        self.command(&format!("EHLO {name}")).await
    }

    /// Sends MAIL FROM.
    ///
    /// # Errors
    ///
    /// Transport-level failures only.
    pub async fn mail_from(&mut self, from: &str) -> Result<Response> {
        self.command(&format!("MAIL FROM:<{from}>")).await
    }

    /// Sends RCPT TO.
    ///
    /// # Errors
    ///
    /// Transport-level failures only.
    pub async fn rcpt_to(&mut self, to: &str) -> Result<Response> {
        self.command(&format!("RCPT TO:<{to}>")).await
    }

    /// Sends DATA. A willing server answers 354.
    ///
    /// # Errors
    ///
    /// Transport-level failures only.
    pub async fn data(&mut self) -> Result<Response> {
        self.command("DATA").await
    }

    /// Sends RSET, clearing any half-built transaction.
    ///
    /// # Errors
    ///
    /// Transport-level failures only.
    pub async fn rset(&mut self) -> Result<Response> {
        self.command("RSET").await
    }

    /// Sends QUIT.
    ///
    /// # Errors
    ///
    /// Transport-level failures only.
    pub async fn quit(&mut self) -> Result<Response> {
        self.command("QUIT").await
    }

    /// Streams the message content after an accepted DATA command,
    /// dot-stuffing lines as RFC 5321 requires, then terminates with a
    /// lone `.` and reads the final reply.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the body or writing to the connection
    /// fails.
    pub async fn send_body<R>(&mut self, mut body: R) -> Result<Response>
    where
        R: AsyncRead + Unpin,
    {
        let connection = self.connection.as_mut().ok_or(ClientError::Closed)?;

        let mut chunk = [0u8; BODY_CHUNK];
        let mut stuffed = Vec::with_capacity(BODY_CHUNK + 16);
        let mut last = b'\n';

        loop {
            let n = body.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            stuffed.clear();
            last = stuff_chunk(last, &chunk[..n], &mut stuffed);
            connection.write_all(&stuffed).await?;
        }

        let terminator: &[u8] = if last == b'\n' { b".\r\n" } else { b"\r\n.\r\n" };
        connection.write_all(terminator).await?;

        self.read_response().await
    }

    /// Reads one complete SMTP reply from the connection.
    async fn read_response(&mut self) -> Result<Response> {
        loop {
            if let Some((response, consumed)) = Response::parse(&self.buffer[..self.filled])? {
                self.buffer.copy_within(consumed..self.filled, 0);
                self.filled -= consumed;
                return Ok(response);
            }

            if self.filled == self.buffer.len() {
                let grown = self.buffer.len() * 2;
                if grown > MAX_BUFFER_SIZE {
                    return Err(ClientError::Protocol(format!(
                        "reply exceeds {MAX_BUFFER_SIZE} bytes"
                    )));
                }
                self.buffer.resize(grown, 0);
            }

            let connection = self.connection.as_mut().ok_or(ClientError::Closed)?;
            let n = connection.read(&mut self.buffer[self.filled..]).await?;
            self.filled += n;
        }
    }
}

/// Copies `chunk` into `out`, doubling any `.` that starts a line.
/// `last` is the byte that preceded the chunk; returns the new last byte.
fn stuff_chunk(mut last: u8, chunk: &[u8], out: &mut Vec<u8>) -> u8 {
    for &byte in chunk {
        if last == b'\n' && byte == b'.' {
            out.push(b'.');
        }
        out.push(byte);
        last = byte;
    }
    last
}

/// A certificate verifier that accepts everything. Test rigs only.
#[derive(Debug)]
struct NoVerifier;

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, tokio_rustls::rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ED25519,
        ]
    }
}
